//! Best-effort headline extraction.
//!
//! The vehicle headline is the visually largest text near the top of the
//! sticker's first page.  Spans are regrouped into lines by Y proximity,
//! price/MSRP boilerplate is filtered out, and the tallest remaining line
//! wins, with bold text and longer text breaking ties.

use crate::classify::{fold, normalize};
use crate::types::Span;

/// Spans within this Y distance belong to the same headline line.
const Y_LINE_TOL: f32 = 3.0;

/// Only the top portion of the page is considered for the headline.
const TOP_FRACTION: f32 = 0.70;

/// Lines containing any of these (accent-folded) fragments are pricing or
/// header boilerplate, never headlines.
const BAD_FRAGMENTS: &[&str] = &[
    "annee modele",
    "manufacturer's suggested retail price",
    "suggested retail price",
    "msrp",
    "p.d.s.f",
    "pdsf",
    "prix de base",
    "prix total",
    "destination",
    "frais d'expedition",
    "frais d expedition",
];

struct TitleLine<'a> {
    parts: Vec<&'a Span>,
    y0: f32,
    y1: f32,
}

impl<'a> TitleLine<'a> {
    fn text(&self) -> String {
        let mut parts: Vec<&&Span> = self.parts.iter().collect();
        parts.sort_by(|a, b| {
            a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal)
        });
        let joined = parts
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        normalize(&joined)
    }

    fn bold_ratio(&self) -> f32 {
        if self.parts.is_empty() {
            return 0.0;
        }
        self.parts.iter().map(|s| s.bold_ratio).sum::<f32>() / self.parts.len() as f32
    }
}

/// Pick the headline line from the page spans, if any qualifies.
pub fn extract_big_title(spans: &[Span]) -> Option<String> {
    if spans.is_empty() {
        return None;
    }

    let mut ordered: Vec<&Span> = spans.iter().filter(|s| !s.text.is_empty()).collect();
    ordered.sort_by(|a, b| {
        b.y0.partial_cmp(&a.y0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<TitleLine> = Vec::new();
    for sp in ordered {
        let mut placed = false;
        for ln in lines.iter_mut() {
            if (ln.y0 - sp.y0).abs() <= Y_LINE_TOL {
                ln.parts.push(sp);
                ln.y0 = ln.y0.max(sp.y0);
                ln.y1 = ln.y1.max(sp.y1);
                placed = true;
                break;
            }
        }
        if !placed {
            lines.push(TitleLine {
                parts: vec![sp],
                y0: sp.y0,
                y1: sp.y1,
            });
        }
    }

    let max_y = spans.iter().map(|s| s.y1).fold(f32::MIN, f32::max);
    let top_cut = max_y * TOP_FRACTION;

    let mut best: Option<(f32, String)> = None;
    for ln in &lines {
        if ln.y1 < top_cut {
            continue;
        }
        let txt = ln.text();
        if txt.is_empty() {
            continue;
        }
        let low = fold(&txt);
        if BAD_FRAGMENTS.iter().any(|b| low.contains(b)) {
            continue;
        }
        if !(8..=90).contains(&txt.chars().count()) {
            continue;
        }

        let h = ln.y1 - ln.y0;
        let br = ln.bold_ratio();
        let len_bonus = (txt.chars().count().min(70)) as f32 * 0.1;
        let score = h * 100.0 + br * 10.0 + len_bonus;

        match &best {
            Some((top, _)) if *top >= score => {}
            _ => best = Some((score, txt)),
        }
    }

    best.map(|(_, txt)| txt)
}
