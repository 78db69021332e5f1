//! Span normalization: PDF content streams -> positioned line spans.
//!
//! Walks a page's content stream with a simplified PDF text-rendering state
//! machine, producing raw positioned runs, then assembles runs into one
//! [`Span`] per visually contiguous piece of a text line.  Runs separated by
//! a wide horizontal gap (distinct layout columns, e.g. the label band and
//! the price band of a sticker) stay separate spans so the geometric tier
//! can tell them apart.

use std::collections::BTreeMap;

use log::debug;

use super::backend::{number, ContentOp, FontInfo, PageId, PdfValue, StickerBackend};
use crate::classify::normalize;
use crate::types::Span;

/// Only the first pages of a sticker carry options; the rest is legal text.
pub const MAX_PAGES: usize = 2;

/// Runs whose Y coordinates differ by less than this share a text row.
const Y_TOLERANCE: f32 = 2.0;

/// Adjacent runs closer than this are concatenated without a space.
const MIN_WORD_GAP: f32 = 1.5;

/// Approximate character width as a fraction of font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Font-name markers that count a character as bold for the bold ratio.
const BOLD_MARKERS: &[&str] = &["bold", "black", "demi", "heavy", "semibold"];

fn is_bold_font(name: &str) -> bool {
    let low = name.to_lowercase();
    BOLD_MARKERS.iter().any(|m| low.contains(m))
}

// ---------------------------------------------------------------------------
// Raw runs
// ---------------------------------------------------------------------------

/// A single positioned run of text emitted by one show-text operator.
#[derive(Debug, Clone)]
struct RawRun {
    text: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    bold: bool,
}

// ---------------------------------------------------------------------------
// Text-state machine
// ---------------------------------------------------------------------------

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Mutable state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_is_bold: bool,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_is_bold: false,
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Rendered size is `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn set_font(&mut self, key: Vec<u8>, base_font: &str, size: f32) {
        self.font_key = key;
        self.font_size = size;
        self.font_is_bold = is_bold_font(base_font);
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [FontInfo]) -> Option<&'a FontInfo> {
    fonts.iter().find(|info| info.name == key)
}

fn estimate_text_width(text: &str, state: &TextState) -> f32 {
    let n = text.chars().count() as f32;
    n * state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale
}

fn advance_after_show(text: &str, state: &mut TextState) {
    let mut total_dx: f32 = 0.0;
    for ch in text.chars() {
        let char_w = state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale;
        total_dx += char_w + state.char_spacing;
        if ch == ' ' {
            total_dx += state.word_spacing;
        }
    }
    state.advance_x(total_dx);
}

fn decode_string(
    val: &PdfValue,
    backend: &dyn StickerBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                super::backend::decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

fn emit_show_string(
    operand: &PdfValue,
    backend: &dyn StickerBackend,
    page_id: PageId,
    state: &mut TextState,
    runs: &mut Vec<RawRun>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    let run = RawRun {
        text: text.clone(),
        x: state.x(),
        y: state.y() + state.text_rise,
        width: estimate_text_width(&text, state),
        height: state.effective_font_size(),
        bold: state.font_is_bold,
    };
    runs.push(run);
    advance_after_show(&text, state);
}

/// TJ arrays mix strings and kerning adjustments; large negative kerning is
/// a word gap.
fn handle_tj_array(
    arr: &[PdfValue],
    backend: &dyn StickerBackend,
    page_id: PageId,
    state: &mut TextState,
    runs: &mut Vec<RawRun>,
) {
    let mut buf = String::new();
    let mut run_x = state.x();
    let run_y = state.y() + state.text_rise;

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &state.font_key);
                if buf.is_empty() {
                    run_x = state.x();
                }
                buf.push_str(&fragment);
                advance_after_show(&fragment, state);
            }
            val => {
                if let Some(adj) = number(val) {
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
                    let gap_threshold =
                        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
                    if dx > gap_threshold && !buf.is_empty() {
                        buf.push(' ');
                    }
                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        runs.push(RawRun {
            text: trimmed.to_string(),
            x: run_x,
            y: run_y,
            width: estimate_text_width(trimmed, state),
            height: state.effective_font_size(),
            bold: state.font_is_bold,
        });
    }
}

fn handle_tf(operands: &[PdfValue], fonts: &[FontInfo], state: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) => n.clone(),
        PdfValue::Str(s) => s.clone(),
        _ => return,
    };
    let size = number(&operands[1]).unwrap_or(0.0);
    if let Some(info) = resolve_font(&key, fonts) {
        let base = info.base_font.as_deref().unwrap_or("");
        state.set_font(key, base, size);
    } else {
        let name = String::from_utf8_lossy(&key).to_string();
        state.set_font(key, &name, size);
    }
}

fn handle_tm(operands: &[PdfValue], state: &mut TextState) {
    if operands.len() < 6 {
        return;
    }
    let vals: Vec<f32> = operands.iter().take(6).filter_map(number).collect();
    if vals.len() == 6 {
        state.text_matrix = [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]];
        state.line_matrix = state.text_matrix;
    }
}

/// Walk a single page's content stream and produce the raw positioned runs.
fn extract_page_runs(
    backend: &dyn StickerBackend,
    page_id: PageId,
    ops: &[ContentOp],
    fonts: &[FontInfo],
) -> Vec<RawRun> {
    let mut state = TextState::default();
    let mut runs: Vec<RawRun> = Vec::new();

    for op in ops {
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {
                // Font state is kept across text objects; some generators
                // reuse the font set earlier.
            }
            "Tf" => handle_tf(&op.operands, fonts, &mut state),
            "Tm" => handle_tm(&op.operands, &mut state),
            "Td" => {
                if op.operands.len() >= 2 {
                    let tx = number(&op.operands[0]).unwrap_or(0.0);
                    let ty = number(&op.operands[1]).unwrap_or(0.0);
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if op.operands.len() >= 2 {
                    let tx = number(&op.operands[0]).unwrap_or(0.0);
                    let ty = number(&op.operands[1]).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.translate_line(0.0, -state.leading),
            "TL" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut runs);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    handle_tj_array(arr, backend, page_id, &mut state, &mut runs);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut runs);
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = number(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = number(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    emit_show_string(&op.operands[2], backend, page_id, &mut state, &mut runs);
                }
            }
            _ => { /* non-text operators */ }
        }
    }

    runs
}

// ---------------------------------------------------------------------------
// Run -> span assembly
// ---------------------------------------------------------------------------

/// Accumulator for one span being assembled from adjacent runs.
struct SpanBuilder {
    text: String,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    chars: usize,
    bold_chars: usize,
    last_end: f32,
    last_height: f32,
}

impl SpanBuilder {
    fn start(run: &RawRun) -> Self {
        let chars = run.text.chars().count();
        SpanBuilder {
            text: run.text.clone(),
            x0: run.x,
            y0: run.y,
            x1: run.x + run.width,
            y1: run.y + run.height,
            chars,
            bold_chars: if run.bold { chars } else { 0 },
            last_end: run.x + run.width,
            last_height: run.height,
        }
    }

    fn push(&mut self, run: &RawRun, with_space: bool) {
        if with_space {
            self.text.push(' ');
        }
        self.text.push_str(&run.text);
        let chars = run.text.chars().count();
        self.chars += chars;
        if run.bold {
            self.bold_chars += chars;
        }
        self.y0 = self.y0.min(run.y);
        self.y1 = self.y1.max(run.y + run.height);
        self.x1 = self.x1.max(run.x + run.width);
        self.last_end = run.x + run.width;
        self.last_height = run.height.max(self.last_height);
    }

    fn finish(self) -> Option<Span> {
        let text = normalize(&self.text);
        if text.is_empty() {
            return None;
        }
        Some(Span {
            text,
            x0: self.x0,
            y0: self.y0,
            x1: self.x1,
            y1: self.y1,
            bold_ratio: if self.chars == 0 {
                0.0
            } else {
                self.bold_chars as f32 / self.chars as f32
            },
        })
    }
}

/// Assemble raw runs into normalized [`Span`]s.
///
/// Runs are bucketed into rows by Y proximity; within a row, runs are merged
/// left-to-right while the horizontal gap stays small (word gaps get a
/// space), and a wide gap starts a new span so distinct layout columns keep
/// distinct bounding boxes.
fn assemble_spans(mut runs: Vec<RawRun>) -> Vec<Span> {
    if runs.is_empty() {
        return Vec::new();
    }

    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows: Vec<Vec<RawRun>> = Vec::new();
    let mut row_y = runs[0].y;
    let mut current: Vec<RawRun> = Vec::new();

    for run in runs {
        if (run.y - row_y).abs() <= Y_TOLERANCE && !current.is_empty() {
            current.push(run);
        } else {
            if !current.is_empty() {
                rows.push(std::mem::take(&mut current));
            }
            row_y = run.y;
            current.push(run);
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }

    let mut spans: Vec<Span> = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut builder: Option<SpanBuilder> = None;
        for run in &row {
            match builder.as_mut() {
                None => builder = Some(SpanBuilder::start(run)),
                Some(b) => {
                    let gap = run.x - b.last_end;
                    let column_break = b.last_height.max(run.height) * 2.0;
                    if gap < MIN_WORD_GAP {
                        b.push(run, false);
                    } else if gap < column_break {
                        b.push(run, true);
                    } else {
                        // Wide gap: a separate layout column.
                        if let Some(span) = builder.take().and_then(SpanBuilder::finish) {
                            spans.push(span);
                        }
                        builder = Some(SpanBuilder::start(run));
                    }
                }
            }
        }
        if let Some(span) = builder.and_then(SpanBuilder::finish) {
            spans.push(span);
        }
    }

    spans
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract normalized spans from the first [`MAX_PAGES`] pages.
///
/// Degrades rather than fails: a page whose content stream cannot be read
/// or decoded contributes nothing, and a document with no readable pages
/// yields an empty list (which sends the pipeline to the fallback tiers).
pub fn extract_spans(backend: &dyn StickerBackend) -> Vec<Span> {
    let pages: BTreeMap<u32, PageId> = backend.pages();
    let mut spans: Vec<Span> = Vec::new();

    for (&page_num, &page_id) in pages.iter().take(MAX_PAGES) {
        let raw = match backend.page_content(page_id) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("page {}: unreadable content stream: {}", page_num, e);
                continue;
            }
        };
        let ops = match backend.decode_content(&raw) {
            Ok(ops) => ops,
            Err(e) => {
                debug!("page {}: content decode failed: {}", page_num, e);
                continue;
            }
        };
        let fonts = backend.page_fonts(page_id).unwrap_or_default();
        let runs = extract_page_runs(backend, page_id, &ops, &fonts);
        spans.extend(assemble_spans(runs));
    }

    spans
}

/// Flatten spans into plain text, one span per line, top-to-bottom then
/// left-to-right.  This is the input shape the flat-text tier expects:
/// price-column spans come out as price-only lines.
pub fn flatten(spans: &[Span]) -> String {
    let mut ordered: Vec<&Span> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        b.y0.partial_cmp(&a.y0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
    });
    ordered
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
