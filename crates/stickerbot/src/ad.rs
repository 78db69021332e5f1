use crate::prelude::*;
use std::fs;
use std::path::PathBuf;

// Disambiguate println! from prelude
use crate::prelude::{eprintln, println};

use sticker::ParsedSticker;
use stickerbot_core::{build_ad, VehicleFields};

#[derive(Debug, clap::Parser)]
#[command(name = "ad")]
#[command(about = "Build a Facebook ad from a window sticker PDF")]
pub struct App {
    /// Path to the window sticker PDF
    pdf: PathBuf,

    /// Output directory, or a .txt path for the ad itself
    #[clap(long, default_value = "/tmp/output_stickers")]
    out: PathBuf,

    /// Ad headline (ideally from the dealership site)
    #[clap(long, default_value = "")]
    title: String,

    /// Vehicle price (from the dealership site)
    #[clap(long, default_value = "")]
    price: String,

    /// Mileage (from the dealership site)
    #[clap(long, default_value = "")]
    mileage: String,

    /// Inventory number (e.g. 06213)
    #[clap(long, default_value = "")]
    stock: String,

    /// VIN (otherwise auto-extracted from the sticker)
    #[clap(long, default_value = "")]
    vin: String,

    /// Dealership line shown in the ad
    #[clap(
        long,
        default_value = "Kennebec Dodge Chrysler — Saint-Georges (Beauce)"
    )]
    dealer: String,

    /// Model year (from the dealership site)
    #[clap(long, default_value = "")]
    year: String,

    /// Transmission (from the dealership site)
    #[clap(long, default_value = "")]
    transmission: String,

    /// Drivetrain (from the dealership site)
    #[clap(long, default_value = "")]
    drivetrain: String,
}

/// Module entry point
pub async fn run(app: App, _global: crate::Global) -> Result<()> {
    if app.price.trim().is_empty() || app.mileage.trim().is_empty() {
        eprintln!("⛔ Prix/KM manquants: ils doivent venir du site (passe --price et --mileage).");
    }

    let bytes = fs::read(&app.pdf)
        .with_context(|| f!("PDF introuvable: {}", app.pdf.display()))?;
    let sticker = ParsedSticker::from_bytes(&bytes)
        .map_err(|e| eyre!("cannot parse {}: {}", app.pdf.display(), e))?;

    // Only handled brands get an ad.
    if sticker.has_text_layer() && !sticker.is_allowed_brand() {
        println!("⛔ Sticker ignoré: marque hors RAM/Dodge/Jeep/Chrysler/Alfa Romeo.");
        return Ok(());
    }

    let vin = if app.vin.trim().is_empty() {
        sticker.vin().unwrap_or_default()
    } else {
        app.vin.trim().to_string()
    };

    // Stock falls back to the PDF's parent directory name, then its stem.
    let auto_stock = app
        .pdf
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .or_else(|| stem_of(&app.pdf))
        .unwrap_or_default();
    let stock_raw = if app.stock.trim().is_empty() {
        auto_stock
    } else {
        app.stock.trim().to_string()
    };
    let stock: String = stock_raw.split_whitespace().collect();
    let stock = if stock.is_empty() {
        stem_of(&app.pdf).unwrap_or_default()
    } else {
        stock
    };

    // Headline priority: site title, then sticker headline, then stock.
    let title = if !app.title.trim().is_empty() {
        app.title.trim().to_string()
    } else {
        sticker
            .headline()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| stock.clone())
    };

    let groups = sticker.option_groups();

    let fields = VehicleFields {
        title,
        price: app.price.trim().to_string(),
        mileage: app.mileage.trim().to_string(),
        stock: stock.clone(),
        vin,
        dealer: app.dealer.trim().to_string(),
        year: app.year.trim().to_string(),
        transmission: app.transmission.trim().to_string(),
        drivetrain: app.drivetrain.trim().to_string(),
    };
    let ad = build_ad(&fields, &groups, sticker.is_hybrid());

    let (out_dir, out_path) = resolve_out_path(&app.out, &stock);
    fs::create_dir_all(&out_dir)
        .with_context(|| f!("cannot create output directory {}", out_dir.display()))?;
    fs::write(&out_path, &ad)
        .with_context(|| f!("cannot write {}", out_path.display()))?;

    println!("Écrit: {}", out_path.display());

    if groups.is_empty() {
        println!("⚠️ Aucun accessoire optionnel détecté (parseur à ajuster pour ce format).");
    }

    Ok(())
}

fn stem_of(path: &std::path::Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// `--out` is either a .txt file path or a directory that receives a
/// stock-keyed filename.
fn resolve_out_path(out: &std::path::Path, stock: &str) -> (PathBuf, PathBuf) {
    let is_txt = out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if is_txt {
        let dir = out
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, out.to_path_buf())
    } else {
        (
            out.to_path_buf(),
            out.join(f!("{}_facebook.txt", stock)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_out_is_used_verbatim() {
        let (dir, path) = resolve_out_path(std::path::Path::new("/tmp/ads/one.txt"), "06213");
        assert_eq!(dir, PathBuf::from("/tmp/ads"));
        assert_eq!(path, PathBuf::from("/tmp/ads/one.txt"));
    }

    #[test]
    fn directory_out_gets_stock_keyed_filename() {
        let (dir, path) = resolve_out_path(std::path::Path::new("/tmp/ads"), "06213");
        assert_eq!(dir, PathBuf::from("/tmp/ads"));
        assert_eq!(path, PathBuf::from("/tmp/ads/06213_facebook.txt"));
    }
}
