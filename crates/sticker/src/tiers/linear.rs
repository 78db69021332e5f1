//! Flat-text tier: option labels from plain page text, no coordinates.
//!
//! Works on the flattened span text (or any plain-text rendition of the
//! page).  Below the optional-equipment anchor, label lines and price-only
//! lines accumulate in separate queues and are zipped together in reading
//! order.  When an option-shaped prefix filter retains any labels, only
//! those are kept; otherwise the unfiltered labels are used as-is.

use crate::classify::{
    clean_option_line, contains_money_token, is_hard_stop, is_junk, normalize,
    parse_price_only_line,
};
use crate::types::{dedup_groups, OptionGroup};

use super::contains_anchor;

/// Uppercase label prefixes that are overwhelmingly option names rather
/// than footer text, FR + EN.
const KEEP_PREFIXES: &[&str] = &[
    "ENSEMBLE", "ATTELAGE", "COMMANDE", "TAPIS", "ESSIEU", "PNEU", "PNEUS", "CROCHETS", "PLAQUE",
    "AJOUT", "TAXE", "SUPPORT", "SIEGE", "SIÈGE", "PRISE", "BANQUETTE", "BANQ", "DIFFERENTIEL",
    "DIFF", "GROUP", "PACKAGE", "MOPAR", "CLASS", "CARGO", "SAFETY", "PREMIUM", "CUSTOMER",
];

/// Extract option groups from flattened page text.
///
/// Prices are paired with labels positionally and kept on the group for
/// downstream bookkeeping only.  Returns an empty list when the anchor is
/// missing, which sends the pipeline to the OCR tier.
pub fn extract_option_groups_from_text(txt: &str) -> Vec<OptionGroup> {
    let lines: Vec<String> = txt.lines().map(normalize).collect();

    let start = match lines.iter().position(|l| contains_anchor(l)) {
        Some(i) => i,
        None => return Vec::new(),
    };

    let mut labels: Vec<String> = Vec::new();
    let mut prices: Vec<String> = Vec::new();

    for line in &lines[start + 1..] {
        if line.is_empty() {
            continue;
        }
        if is_hard_stop(line) {
            break;
        }

        if let Some(p) = parse_price_only_line(line) {
            prices.push(p);
            continue;
        }

        // Mixed label+price lines are MSRP-style totals here, not options.
        // Strict token only: labels like "PACKAGE 27J" carry bare digits.
        if contains_money_token(line) {
            continue;
        }

        let cand = clean_option_line(line);
        if cand.is_empty() || is_junk(&cand) {
            continue;
        }
        labels.push(cand);
    }

    let filtered: Vec<String> = labels
        .iter()
        .filter(|lb| {
            let up = lb.to_uppercase();
            KEEP_PREFIXES.iter().any(|p| up.starts_with(p))
        })
        .cloned()
        .collect();
    let use_labels = if filtered.is_empty() { labels } else { filtered };

    let groups: Vec<OptionGroup> = use_labels
        .into_iter()
        .zip(prices)
        .map(|(label, price)| OptionGroup::new(label, Some(price)))
        .collect();

    dedup_groups(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
RAM 1500 BIG HORN 4X4
ACCESSOIRES OPTIONNELS
ENSEMBLE REMORQUAGE CLASSE IV
TAPIS PROTECTEURS TOUTES SAISONS
595 $
225 $
LE CONCESSIONNAIRE PEUT VENDRE MOINS CHER
PLAQUE PROTECTRICE
150 $
";

    #[test]
    fn labels_zip_with_prices_in_order() {
        let groups = extract_option_groups_from_text(SAMPLE);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].title, "ENSEMBLE REMORQUAGE CLASSE IV");
        assert_eq!(groups[0].price.as_deref(), Some("595 $"));
        assert_eq!(groups[1].title, "TAPIS PROTECTEURS TOUTES SAISONS");
        assert_eq!(groups[1].price.as_deref(), Some("225 $"));
    }

    #[test]
    fn hard_stop_cuts_off_footer_options() {
        let groups = extract_option_groups_from_text(SAMPLE);
        assert!(groups.iter().all(|g| g.title != "PLAQUE PROTECTRICE"));
    }

    #[test]
    fn missing_anchor_yields_empty() {
        assert!(extract_option_groups_from_text("ENSEMBLE REMORQUAGE\n595 $\n").is_empty());
    }

    #[test]
    fn prefix_filter_drops_footer_noise() {
        let txt = "\
OPTIONAL EQUIPMENT
CUSTOMER PREFERRED PACKAGE 27J
ASSEMBLED IN SALTILLO MEXICO BY STELLANTIS
1,095 $
395 $
";
        let groups = extract_option_groups_from_text(txt);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "CUSTOMER PREFERRED PACKAGE 27J");
        assert_eq!(groups[0].price.as_deref(), Some("1,095 $"));
    }

    #[test]
    fn digit_bearing_labels_are_not_mixed_price_lines() {
        let txt = "\
OPTIONAL EQUIPMENT
CUSTOMER PREFERRED PACKAGE 27J
1,095 $
";
        let groups = extract_option_groups_from_text(txt);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "CUSTOMER PREFERRED PACKAGE 27J");
        assert_eq!(groups[0].price.as_deref(), Some("1,095 $"));
    }

    #[test]
    fn unfiltered_labels_survive_when_no_prefix_matches() {
        let txt = "\
OPTIONAL EQUIPMENT
REMOTE START SYSTEM
295 $
";
        let groups = extract_option_groups_from_text(txt);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "REMOTE START SYSTEM");
    }

    #[test]
    fn mixed_label_price_lines_are_ignored() {
        let txt = "\
OPTIONAL EQUIPMENT
ENSEMBLE REMORQUAGE
TOTAL AVANT TAXES 54 000 $
595 $
";
        let groups = extract_option_groups_from_text(txt);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "ENSEMBLE REMORQUAGE");
    }

    #[test]
    fn extra_prices_without_labels_are_dropped() {
        let txt = "\
OPTIONAL EQUIPMENT
ENSEMBLE REMORQUAGE
595 $
1,995 $
";
        let groups = extract_option_groups_from_text(txt);
        assert_eq!(groups.len(), 1);
    }
}
