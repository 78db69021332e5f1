use serde::{Deserialize, Serialize};

/// Extraction never yields more than this many option groups.
pub const MAX_GROUPS: usize = 12;

/// An option group never carries more than this many detail lines.
pub const MAX_DETAILS: usize = 12;

/// A normalized, positioned line of text extracted from one sticker page.
///
/// Coordinates are PDF user-space points with the origin at the bottom-left
/// of the page, so a *larger* `y0` means *higher* on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Fraction of the line's characters set in a bold-weight font, 0..=1.
    pub bold_ratio: f32,
}

impl Span {
    /// Bounding-box height.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// One factory accessory/package entry recovered from the sticker.
///
/// The `price` field exists only so the extraction tiers can *group* text;
/// it must never reach rendered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub title: String,
    pub price: Option<String>,
    pub details: Vec<String>,
}

impl OptionGroup {
    pub fn new(title: impl Into<String>, price: Option<String>) -> Self {
        OptionGroup {
            title: title.into(),
            price,
            details: Vec::new(),
        }
    }
}

/// Deduplicate groups by lower-cased title, keeping the first occurrence.
/// Applies both caps: at most [`MAX_GROUPS`] groups, each carrying at most
/// [`MAX_DETAILS`] details.
pub fn dedup_groups(groups: Vec<OptionGroup>) -> Vec<OptionGroup> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<OptionGroup> = Vec::new();

    for mut g in groups {
        let key = g.title.trim().to_lowercase();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        g.details.truncate(MAX_DETAILS);
        seen.push(key);
        out.push(g);
    }

    out.truncate(MAX_GROUPS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let groups = vec![
            OptionGroup {
                title: "Trailer Tow Group".into(),
                price: Some("595 $".into()),
                details: vec!["Class IV hitch".into()],
            },
            OptionGroup::new("TRAILER TOW GROUP", None),
        ];

        let out = dedup_groups(groups);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].details, vec!["Class IV hitch".to_string()]);
    }

    #[test]
    fn dedup_drops_empty_titles() {
        let groups = vec![OptionGroup::new("  ", None), OptionGroup::new("A", None)];
        assert_eq!(dedup_groups(groups).len(), 1);
    }

    #[test]
    fn dedup_caps_detail_count() {
        let mut g = OptionGroup::new("Trailer Tow Group", None);
        g.details = (0..20).map(|i| format!("Detail {}", i)).collect();

        let out = dedup_groups(vec![g]);
        assert_eq!(out[0].details.len(), MAX_DETAILS);
        assert_eq!(out[0].details[0], "Detail 0");
    }

    #[test]
    fn dedup_caps_group_count() {
        let groups: Vec<OptionGroup> = (0..20)
            .map(|i| OptionGroup::new(format!("Option {}", i), None))
            .collect();
        assert_eq!(dedup_groups(groups).len(), MAX_GROUPS);
    }
}
