use crate::prelude::*;
use std::fs;
use std::path::PathBuf;

// Disambiguate println! from prelude
use crate::prelude::println;

use stickerbot_core::ad::WINDOW_STICKER_URL;

/// Responses smaller than this are error pages, not stickers.
const MIN_PDF_BYTES: usize = 10 * 1024;

#[derive(Debug, clap::Parser)]
#[command(name = "fetch")]
#[command(about = "Download a window sticker PDF by VIN")]
pub struct App {
    /// Vehicle identification number (17 characters)
    vin: String,

    /// Output directory, or a .pdf path for the sticker itself
    #[clap(long, default_value = "/tmp/window_stickers")]
    out: PathBuf,
}

/// Module entry point
pub async fn run(app: App, _global: crate::Global) -> Result<()> {
    let vin = app.vin.trim().to_uppercase();
    if vin.len() != 17 {
        return Err(eyre!("VIN must be exactly 17 characters, got {}", vin.len()));
    }

    let url = f!("{}{}", WINDOW_STICKER_URL, vin);
    log::debug!("fetching {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| eyre!(Error::Network(e.to_string())))?;
    if !response.status().is_success() {
        return Err(eyre!(Error::Network(f!(
            "sticker endpoint returned {}",
            response.status()
        ))));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| eyre!(Error::Network(e.to_string())))?;

    // The endpoint answers 200 with an HTML error page for unknown VINs.
    if !bytes.starts_with(b"%PDF") {
        return Err(eyre!(Error::NotAPdf(f!(
            "response for {} does not start with %PDF",
            vin
        ))));
    }
    if bytes.len() < MIN_PDF_BYTES {
        return Err(eyre!(Error::NotAPdf(f!(
            "response for {} is only {} bytes",
            vin,
            bytes.len()
        ))));
    }

    let (out_dir, out_path) = resolve_out_path(&app.out, &vin);
    fs::create_dir_all(&out_dir)
        .with_context(|| f!("cannot create output directory {}", out_dir.display()))?;
    fs::write(&out_path, &bytes)
        .with_context(|| f!("cannot write {}", out_path.display()))?;

    println!("Écrit: {} ({} octets)", out_path.display(), bytes.len());

    Ok(())
}

/// `--out` is either a .pdf file path or a directory that receives a
/// VIN-keyed filename.
fn resolve_out_path(out: &std::path::Path, vin: &str) -> (PathBuf, PathBuf) {
    let is_pdf = out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        let dir = out
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, out.to_path_buf())
    } else {
        (out.to_path_buf(), out.join(f!("{}.pdf", vin)))
    }
}
