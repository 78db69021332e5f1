//! Hashtag selection for the ad footer.
//!
//! Tags are keyed on the (lowercased) vehicle headline: one brand block,
//! any number of model blocks, variant keywords, then the always-present
//! base tags.  Output is deduplicated case-insensitively and capped.

/// Hashtag cap for the ad footer.
const MAX_TAGS: usize = 18;

/// Tags present on every ad regardless of vehicle.
const BASE_TAGS: &[&str] = &[
    "#Beauce",
    "#SaintGeorges",
    "#Quebec",
    "#AutoUsagée",
    "#VehiculeOccasion",
    "#DanielGiroux",
];

/// Brand keyword to tag block.  Only the first matching brand applies.
const BRAND_TAGS: &[(&str, &[&str])] = &[
    ("ram", &["#RAM", "#Truck", "#Pickup"]),
    ("jeep", &["#Jeep", "#4x4", "#SUV"]),
    ("dodge", &["#Dodge", "#Performance"]),
    ("chrysler", &["#Chrysler", "#Familiale"]),
    ("alfa", &["#AlfaRomeo", "#Performance"]),
];

/// Model keyword to tag block.  Every matching model applies.
const MODEL_TAGS: &[(&str, &[&str])] = &[
    // Dodge
    ("hornet", &["#Hornet", "#SUV", "#Performance"]),
    ("challenger", &["#Challenger", "#MuscleCar"]),
    ("charger", &["#Charger", "#MuscleCar"]),
    ("durango", &["#Durango", "#SUV"]),
    // RAM
    ("promaster", &["#ProMaster", "#Cargo", "#Van"]),
    ("1500", &["#RAM1500", "#Pickup"]),
    ("2500", &["#RAM2500", "#HeavyDuty"]),
    // Jeep
    ("wagoneer", &["#Wagoneer", "#SUV", "#4x4"]),
    ("wrangler", &["#Wrangler", "#OffRoad", "#4x4"]),
    ("grand cherokee", &["#GrandCherokee", "#LuxurySUV", "#4x4"]),
    ("gladiator", &["#Gladiator", "#Pickup4x4"]),
];

/// Trim-level and drivetrain keywords.
const VARIANT_TAGS: &[(&str, &[&str])] = &[
    ("r/t", &["#RT"]),
    // Helps when "RT" stands alone between spaces.
    (" rt ", &["#RT"]),
    ("plus", &["#Plus"]),
    ("hybrid", &["#Hybride"]),
    ("plug-in", &["#HybrideRechargeable"]),
    ("phev", &["#HybrideRechargeable"]),
    ("awd", &["#AWD"]),
    ("4x4", &["#4x4"]),
    ("4wd", &["#4x4"]),
    ("v8", &["#V8"]),
];

/// Build the hashtag line for a vehicle headline.
pub fn choose_hashtags(title: &str) -> String {
    let t = title.to_lowercase();
    let mut tags: Vec<&str> = Vec::new();

    if let Some((_, btags)) = BRAND_TAGS.iter().find(|(brand, _)| t.contains(brand)) {
        tags.extend_from_slice(btags);
    }

    for (model, mtags) in MODEL_TAGS {
        if t.contains(model) {
            tags.extend_from_slice(mtags);
        }
    }

    for (key, vtags) in VARIANT_TAGS {
        if t.contains(key) {
            tags.extend_from_slice(vtags);
        }
    }

    tags.extend_from_slice(BASE_TAGS);

    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<&str> = Vec::new();
    for tag in tags {
        let k = tag.to_lowercase();
        if !seen.contains(&k) {
            seen.push(k);
            out.push(tag);
        }
    }
    out.truncate(MAX_TAGS);
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_tags_always_present() {
        let tags = choose_hashtags("");
        for base in BASE_TAGS {
            assert!(tags.contains(base), "missing {}", base);
        }
    }

    #[test]
    fn only_first_brand_matches() {
        // "ram" appears before "dodge" in the table.
        let tags = choose_hashtags("RAM 1500 vs DODGE");
        assert!(tags.contains("#RAM"));
        assert!(!tags.contains("#Dodge"));
    }

    #[test]
    fn models_stack_with_brand_and_variant() {
        let tags = choose_hashtags("2022 RAM 1500 BIG HORN 4X4");
        assert!(tags.contains("#RAM"));
        assert!(tags.contains("#RAM1500"));
        assert!(tags.contains("#4x4"));
    }

    #[test]
    fn duplicate_tags_collapse_case_insensitively() {
        // Jeep brand gives #4x4; the 4x4 variant gives it again.
        let tags = choose_hashtags("JEEP WRANGLER 4X4");
        assert_eq!(tags.matches("#4x4").count(), 1);
    }

    #[test]
    fn tag_count_is_capped() {
        let tags = choose_hashtags("jeep grand cherokee wrangler gladiator 4x4 awd v8 plus hybrid");
        assert!(tags.split_whitespace().count() <= MAX_TAGS);
    }

    #[test]
    fn phev_maps_to_rechargeable() {
        let tags = choose_hashtags("DODGE HORNET R/T PHEV");
        assert!(tags.contains("#HybrideRechargeable"));
        assert!(tags.contains("#RT"));
    }
}
