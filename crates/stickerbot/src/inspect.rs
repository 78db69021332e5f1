use crate::prelude::*;
use std::fs;
use std::path::PathBuf;

// Disambiguate println! from prelude
use crate::prelude::println;

use serde::Serialize;
use sticker::types::OptionGroup;
use sticker::ParsedSticker;

#[derive(Debug, clap::Parser)]
#[command(name = "inspect")]
#[command(about = "Dump what the parser sees in a sticker PDF as JSON")]
pub struct App {
    /// Path to the window sticker PDF
    pdf: PathBuf,

    /// Include the positioned spans in the output
    #[clap(long)]
    spans: bool,

    /// Include the flattened page text in the output
    #[clap(long)]
    text: bool,
}

#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub title: Option<String>,
    pub vin: Option<String>,
    pub hybrid: bool,
    pub allowed_brand: bool,
    pub span_count: usize,
    pub groups: Vec<OptionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<sticker::types::Span>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_text: Option<String>,
}

/// Module entry point
pub async fn run(app: App, _global: crate::Global) -> Result<()> {
    let bytes = fs::read(&app.pdf)
        .with_context(|| f!("PDF introuvable: {}", app.pdf.display()))?;
    let sticker = ParsedSticker::from_bytes(&bytes)
        .map_err(|e| eyre!("cannot parse {}: {}", app.pdf.display(), e))?;

    let output = InspectOutput {
        title: sticker.headline(),
        vin: sticker.vin(),
        hybrid: sticker.is_hybrid(),
        allowed_brand: sticker.is_allowed_brand(),
        span_count: sticker.spans().len(),
        groups: sticker.option_groups(),
        spans: app.spans.then(|| sticker.spans().to_vec()),
        flat_text: app.text.then(|| sticker.flat_text().to_string()),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
