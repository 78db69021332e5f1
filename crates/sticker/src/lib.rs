use log::debug;
use thiserror::Error;

pub mod classify;
pub mod parser;
pub mod tiers;
pub mod title;
pub mod types;

pub use tiers::geometric::GeometricConfig;
pub use types::*;

#[derive(Debug, Error)]
pub enum StickerError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("OCR error: {0}")]
    Ocr(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A parsed window sticker holding all intermediate state.
///
/// Constructed via [`ParsedSticker::from_bytes`].  Keeps the positioned
/// spans and the flattened page text around so vehicle fields and option
/// groups can be read without re-parsing.
pub struct ParsedSticker {
    backend: parser::backend::LopdfBackend,
    spans: Vec<Span>,
    flat_text: String,
}

impl ParsedSticker {
    /// Parse sticker PDF bytes.  Only the first two pages matter; the rest
    /// of the document is legal boilerplate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StickerError> {
        let backend = parser::backend::LopdfBackend::load_bytes(bytes)?;
        let spans = parser::spans::extract_spans(&backend);
        let flat_text = parser::spans::flatten(&spans);
        Ok(ParsedSticker {
            backend,
            spans,
            flat_text,
        })
    }

    /// Extract option groups, trying each tier in turn and keeping the
    /// first non-empty result.
    pub fn option_groups(&self) -> Vec<OptionGroup> {
        self.option_groups_with(&GeometricConfig::default())
    }

    /// As [`option_groups`](Self::option_groups), with explicit column
    /// geometry.
    pub fn option_groups_with(&self, cfg: &GeometricConfig) -> Vec<OptionGroup> {
        let groups = tiers::geometric::extract_option_groups(&self.spans, cfg);
        if !groups.is_empty() {
            return groups;
        }

        debug!("geometric tier found nothing, trying flat text");
        let groups = tiers::linear::extract_option_groups_from_text(&self.flat_text);
        if !groups.is_empty() {
            return groups;
        }

        debug!("flat-text tier found nothing, trying OCR");
        match tiers::ocr::extract_text(&self.backend) {
            Ok(text) if !text.is_empty() => tiers::ocr::parse_ocr_text(&text),
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!("OCR unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// VIN found anywhere in the page text, if any.
    pub fn vin(&self) -> Option<String> {
        classify::extract_vin(&self.flat_text)
    }

    /// Best-effort vehicle headline from the top of the first page.
    pub fn headline(&self) -> Option<String> {
        title::extract_big_title(&self.spans)
    }

    /// True if the sticker mentions a hybrid or plug-in powertrain.
    pub fn is_hybrid(&self) -> bool {
        classify::detect_hybrid(&self.flat_text)
    }

    /// True if the sticker belongs to one of the handled brands.
    pub fn is_allowed_brand(&self) -> bool {
        classify::is_allowed_brand(&self.flat_text)
    }

    /// Whether any text at all was recovered from the PDF's text layer.
    pub fn has_text_layer(&self) -> bool {
        !self.flat_text.trim().is_empty()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn flat_text(&self) -> &str {
        &self.flat_text
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Parse sticker bytes into a [`ParsedSticker`].
pub fn parse(bytes: &[u8]) -> Result<ParsedSticker, StickerError> {
    ParsedSticker::from_bytes(bytes)
}

/// Extract option groups straight from sticker bytes.
pub fn option_groups(bytes: &[u8]) -> Result<Vec<OptionGroup>, StickerError> {
    Ok(ParsedSticker::from_bytes(bytes)?.option_groups())
}

/// Extract the VIN straight from sticker bytes.
pub fn vin(bytes: &[u8]) -> Result<Option<String>, StickerError> {
    Ok(ParsedSticker::from_bytes(bytes)?.vin())
}
