//! Geometric tier: option groups from positioned spans.
//!
//! Anchors on the optional-equipment header, then walks the label column
//! top-to-bottom.  A label with a price aligned in the price column opens a
//! new group; an unpriced label becomes a detail of the open group.  Option
//! prices are kept internally as grouping anchors and never rendered.

use log::debug;

use super::contains_anchor;
use crate::classify::{
    clean_option_line, contains_money, extract_price, fold, is_hard_stop, is_junk, is_price_only,
};
use crate::types::{dedup_groups, OptionGroup, Span};

/// Column geometry of the optional-equipment block, in PDF points.
///
/// The defaults match the layout Stellantis window stickers have used for
/// years.
#[derive(Debug, Clone, Copy)]
pub struct GeometricConfig {
    /// Left edge of the label column.
    pub label_min_x: f32,
    /// Right edge of the label column.
    pub label_max_x: f32,
    /// Spans starting at or beyond this X are price candidates.
    pub price_min_x: f32,
    /// Labels starting at or beyond this X are indented detail lines.
    pub detail_indent_x: f32,
    /// Maximum Y distance between a label and its aligned price.
    pub price_y_tol: f32,
}

impl Default for GeometricConfig {
    fn default() -> Self {
        GeometricConfig {
            label_min_x: 250.0,
            label_max_x: 445.0,
            price_min_x: 445.0,
            detail_indent_x: 315.0,
            price_y_tol: 6.0,
        }
    }
}

/// Titles that slip through the column filters but are charges, not options.
const BANNED_TITLES: &[&str] = &[
    "destination charge",
    "tariff adjustment",
    "federal a/c excise tax",
    "federal a c excise tax",
];

/// Detail-specific junk on top of the shared blacklist: pure number/dash
/// runs and shipping footer fragments that sit inside the label column.
fn is_junk_detail(text: &str) -> bool {
    if is_junk(text) {
        return true;
    }
    if !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '\u{2013}' | '\u{2014}'))
    {
        return true;
    }
    let low = fold(text);
    ["expedier", "vendu", "concessionnaire", "dealer", "shipped", "sold"]
        .iter()
        .any(|k| low.contains(k))
}

/// Extract option groups from positioned spans.
///
/// Returns an empty list when no anchor is found, which sends the pipeline
/// to the flat-text tier.
pub fn extract_option_groups(spans: &[Span], cfg: &GeometricConfig) -> Vec<OptionGroup> {
    if spans.is_empty() {
        return Vec::new();
    }

    // The options block sits below the lowest anchor occurrence.
    let anchor = spans
        .iter()
        .filter(|sp| contains_anchor(&sp.text))
        .max_by(|a, b| a.y0.partial_cmp(&b.y0).unwrap_or(std::cmp::Ordering::Equal));
    let anchor_y = match anchor {
        Some(sp) => sp.y0,
        None => {
            debug!("no optional-equipment anchor found in spans");
            return Vec::new();
        }
    };

    let mut labels: Vec<&Span> = Vec::new();
    let mut prices: Vec<(f32, String)> = Vec::new();

    for sp in spans {
        if sp.y0 > anchor_y {
            continue;
        }
        let t = clean_option_line(&sp.text);
        if t.is_empty() {
            continue;
        }
        if sp.x0 >= cfg.label_min_x && sp.x0 <= cfg.label_max_x && !is_junk(&t) {
            labels.push(sp);
        }
        if sp.x0 >= cfg.price_min_x && contains_money(&sp.text) {
            if let Some(p) = extract_price(&sp.text) {
                prices.push((sp.y0, p));
            }
        }
    }

    labels.sort_by(|a, b| b.y0.partial_cmp(&a.y0).unwrap_or(std::cmp::Ordering::Equal));

    let nearest_price = |y: f32| -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for (py, p) in &prices {
            let dy = (py - y).abs();
            match best {
                Some((_, best_dy)) if best_dy <= dy => {}
                _ => best = Some((p.as_str(), dy)),
            }
        }
        best.and_then(|(p, dy)| (dy <= cfg.price_y_tol).then_some(p))
    };

    let mut groups: Vec<OptionGroup> = Vec::new();
    let mut current: Option<OptionGroup> = None;

    for sp in labels {
        let text = clean_option_line(&sp.text);
        if text.is_empty() || is_price_only(&text) || is_junk(&text) {
            continue;
        }
        if contains_anchor(&text) {
            continue;
        }
        if is_hard_stop(&text) {
            break;
        }

        if let Some(price) = nearest_price(sp.y0) {
            if let Some(g) = current.take() {
                groups.push(g);
            }
            current = Some(OptionGroup::new(text, Some(price.to_string())));
            continue;
        }

        if let Some(g) = current.as_mut() {
            if is_junk_detail(&text) {
                continue;
            }
            let indented = sp.x0 >= cfg.detail_indent_x;
            if !indented && text.chars().count() > 70 {
                continue;
            }
            if !text.eq_ignore_ascii_case(&g.title) {
                g.details.push(text);
            }
        }
    }
    if let Some(g) = current.take() {
        groups.push(g);
    }

    let cleaned: Vec<OptionGroup> = groups
        .into_iter()
        .filter(|g| {
            let title = g.title.trim();
            if title.is_empty() || is_junk(title) {
                return false;
            }
            if title.to_uppercase().contains("TAXE ACCISE") {
                return false;
            }
            let low = fold(title);
            !BANNED_TITLES.iter().any(|b| low.contains(b))
        })
        .collect();

    dedup_groups(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x0: f32, y0: f32) -> Span {
        Span {
            text: text.to_string(),
            x0,
            y0,
            x1: x0 + 100.0,
            y1: y0 + 8.0,
            bold_ratio: 0.0,
        }
    }

    fn sample_spans() -> Vec<Span> {
        vec![
            span("ACCESSOIRES OPTIONNELS", 260.0, 600.0),
            span("ENSEMBLE REMORQUAGE CLASSE IV", 260.0, 580.0),
            span("595 $", 460.0, 580.0),
            span("ATTELAGE DE REMORQUE", 320.0, 568.0),
            span("CABLAGE 7 BROCHES", 320.0, 556.0),
            span("TAPIS PROTECTEURS TOUTES SAISONS", 260.0, 540.0),
            span("225 $", 460.0, 541.0),
        ]
    }

    #[test]
    fn priced_labels_open_groups_and_indented_lines_attach() {
        let groups = extract_option_groups(&sample_spans(), &GeometricConfig::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].title, "ENSEMBLE REMORQUAGE CLASSE IV");
        assert_eq!(groups[0].price.as_deref(), Some("595 $"));
        assert_eq!(
            groups[0].details,
            vec!["ATTELAGE DE REMORQUE", "CABLAGE 7 BROCHES"]
        );
        assert_eq!(groups[1].title, "TAPIS PROTECTEURS TOUTES SAISONS");
        assert!(groups[1].details.is_empty());
    }

    #[test]
    fn no_anchor_yields_empty() {
        let spans = vec![span("ENSEMBLE REMORQUAGE", 260.0, 580.0), span("595 $", 460.0, 580.0)];
        assert!(extract_option_groups(&spans, &GeometricConfig::default()).is_empty());
    }

    #[test]
    fn spans_above_anchor_are_ignored() {
        let mut spans = sample_spans();
        spans.push(span("RAM 1500 BIG HORN", 260.0, 700.0));
        spans.push(span("48 500 $", 460.0, 700.0));
        let groups = extract_option_groups(&spans, &GeometricConfig::default());
        assert!(groups.iter().all(|g| g.title != "RAM 1500 BIG HORN"));
    }

    #[test]
    fn destination_charge_never_becomes_a_title() {
        let mut spans = sample_spans();
        spans.push(span("DESTINATION CHARGE", 260.0, 520.0));
        spans.push(span("1 995 $", 460.0, 520.0));
        let groups = extract_option_groups(&spans, &GeometricConfig::default());
        assert!(groups
            .iter()
            .all(|g| !g.title.to_lowercase().contains("destination")));
    }

    #[test]
    fn hard_stop_ends_the_scan() {
        let mut spans = sample_spans();
        spans.push(span("THE DEALER MAY SELL FOR LESS", 260.0, 520.0));
        spans.push(span("PLAQUE PROTECTRICE", 260.0, 500.0));
        spans.push(span("150 $", 460.0, 500.0));
        let groups = extract_option_groups(&spans, &GeometricConfig::default());
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.title != "PLAQUE PROTECTRICE"));
    }

    #[test]
    fn price_beyond_tolerance_makes_label_a_detail() {
        let spans = vec![
            span("ACCESSOIRES OPTIONNELS", 260.0, 600.0),
            span("ENSEMBLE REMORQUAGE", 260.0, 580.0),
            span("595 $", 460.0, 580.0),
            // 20 points below any price: no group of its own.
            span("COMMANDE PROXIMITE", 260.0, 560.0),
        ];
        let groups = extract_option_groups(&spans, &GeometricConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].details, vec!["COMMANDE PROXIMITE"]);
    }

    #[test]
    fn duplicate_titles_keep_first() {
        let spans = vec![
            span("ACCESSOIRES OPTIONNELS", 260.0, 600.0),
            span("TAPIS PROTECTEURS", 260.0, 580.0),
            span("225 $", 460.0, 580.0),
            span("Tapis Protecteurs", 260.0, 560.0),
            span("225 $", 460.0, 560.0),
        ];
        let groups = extract_option_groups(&spans, &GeometricConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "TAPIS PROTECTEURS");
    }

    #[test]
    fn long_unindented_line_is_not_a_detail() {
        let long = "CE TEXTE DE BAS DE PAGE EXTREMEMENT LONG NE DEVRAIT JAMAIS APPARAITRE COMME DETAIL"
            .to_string();
        let spans = vec![
            span("ACCESSOIRES OPTIONNELS", 260.0, 600.0),
            span("ENSEMBLE REMORQUAGE", 260.0, 580.0),
            span("595 $", 460.0, 580.0),
            span(&long, 260.0, 560.0),
        ];
        let groups = extract_option_groups(&spans, &GeometricConfig::default());
        assert!(groups[0].details.is_empty());
    }
}
