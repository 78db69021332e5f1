//! Option-group extraction tiers, from most to least precise.
//!
//! Each tier turns one representation of the sticker into option groups:
//! [`geometric`] works on positioned spans, [`linear`] on flattened plain
//! text, and [`ocr`] on tesseract output from the embedded page scans.  The
//! pipeline tries them in that order and keeps the first non-empty result.

pub mod geometric;
pub mod linear;
pub mod ocr;

/// Section headers that open the optional-equipment block, FR + EN.  All
/// tiers anchor on these.
pub const ANCHORS: &[&str] = &["ACCESSOIRES OPTIONNELS", "OPTIONAL EQUIPMENT"];

/// True if a line contains one of the section anchors (case-insensitive).
pub fn contains_anchor(text: &str) -> bool {
    let up = text.to_uppercase();
    ANCHORS.iter().any(|a| up.contains(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_matches_both_languages() {
        assert!(contains_anchor("ACCESSOIRES OPTIONNELS"));
        assert!(contains_anchor("** Optional Equipment **"));
        assert!(!contains_anchor("STANDARD EQUIPMENT"));
    }
}
