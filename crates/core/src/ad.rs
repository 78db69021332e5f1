//! Facebook ad assembly.
//!
//! Takes the vehicle fields scraped from the dealership site plus the
//! option groups read off the window sticker and renders the final ad
//! text.  Sticker option prices are grouping metadata only and are never
//! written to the ad.

use serde::{Deserialize, Serialize};

use sticker::classify::{is_junk, is_price_only};
use sticker::types::{OptionGroup, MAX_DETAILS};

use crate::hashtags::choose_hashtags;

/// Vehicle fields for one ad.  Price, mileage, and the inventory fields
/// come from the dealership site; VIN and title may be sticker fallbacks.
/// Empty strings mean "not available" and the corresponding ad line is
/// omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleFields {
    pub title: String,
    pub price: String,
    pub mileage: String,
    pub stock: String,
    pub vin: String,
    pub dealer: String,
    pub year: String,
    pub transmission: String,
    pub drivetrain: String,
}

impl Default for VehicleFields {
    fn default() -> Self {
        VehicleFields {
            title: String::new(),
            price: String::new(),
            mileage: String::new(),
            stock: String::new(),
            vin: String::new(),
            dealer: "Kennebec Dodge Chrysler — Saint-Georges (Beauce)".to_string(),
            year: String::new(),
            transmission: String::new(),
            drivetrain: String::new(),
        }
    }
}

/// Public window-sticker lookup endpoint, keyed by VIN.
pub const WINDOW_STICKER_URL: &str =
    "https://www.chrysler.com/hostd/windowsticker/getWindowStickerPdf.do?vin=";

/// Render the complete ad.
///
/// Total function: any combination of empty fields and option groups
/// produces a well-formed ad.  Option group prices are never rendered, and
/// detail lines get a final junk/price screen in case a tier let one
/// through.
pub fn build_ad(fields: &VehicleFields, options: &[OptionGroup], is_hybrid: bool) -> String {
    let mut lines: Vec<String> = Vec::new();

    let title = fields.title.trim();

    lines.push(format!("🔥 {} 🔥", title));
    lines.push(String::new());

    if !fields.price.is_empty() {
        lines.push(format!("💥 {} 💥", fields.price));
    }
    if !fields.mileage.is_empty() {
        lines.push(format!("📊 Kilométrage : {}", fields.mileage));
    }
    if !fields.dealer.is_empty() {
        lines.push(format!("📍 {}", fields.dealer));
    }
    lines.push(String::new());

    if is_hybrid {
        lines.push("⚡ Véhicule hybride rechargeable (PHEV)".to_string());
        lines.push(String::new());
    }

    let mut details: Vec<String> = Vec::new();
    if !fields.stock.is_empty() {
        details.push(format!("✅ Inventaire : {}", fields.stock));
    }
    if !fields.year.is_empty() {
        details.push(format!("✅ Année : {}", fields.year));
    }
    if !fields.vin.is_empty() {
        details.push(format!("✅ VIN : {}", fields.vin));
    }
    if !fields.transmission.is_empty() {
        details.push(format!("✅ Transmission : {}", fields.transmission));
    }
    if !fields.drivetrain.is_empty() {
        details.push(format!("✅ Entraînement : {}", fields.drivetrain));
    }
    if !details.is_empty() {
        lines.push("🚗 DÉTAILS".to_string());
        lines.extend(details);
        lines.push(String::new());
    }

    if !options.is_empty() {
        lines.push("✨ ACCESSOIRES OPTIONNELS (Window Sticker)".to_string());
        lines.push(String::new());

        let mut seen_titles: Vec<String> = Vec::new();
        for group in options {
            let t = group.title.trim();
            if t.is_empty() {
                continue;
            }
            let key = t.to_lowercase();
            if seen_titles.contains(&key) {
                continue;
            }
            seen_titles.push(key);

            // The sticker price stays internal, always.
            lines.push(format!("✅  {}", t));

            for d in group.details.iter().take(MAX_DETAILS) {
                let dd = d.trim();
                if dd.is_empty() || is_junk(dd) || is_price_only(dd) {
                    continue;
                }
                lines.push(format!("        ▫️ {}", dd));
            }
        }

        lines.push(String::new());
        lines.push("📌 Le reste des détails est dans le Window Sticker :".to_string());
        lines.push(String::new());
        if !fields.vin.is_empty() {
            lines.push(format!("{}{}", WINDOW_STICKER_URL, fields.vin));
        } else {
            lines.push("(VIN introuvable — ajoute --vin pour générer le lien)".to_string());
        }
        lines.push(String::new());
    }

    lines.push(
        "🔁 J’accepte les échanges : 🚗 auto • 🏍️ moto • 🛥️ bateau • 🛻 VTT • 🏁 côte-à-côte"
            .to_string(),
    );
    lines.push(
        "📸 Envoie-moi les photos + infos de ton échange (année / km / paiement restant) → je te reviens vite."
            .to_string(),
    );
    lines.push(String::new());

    lines.push("👋 Publiée par Daniel Giroux — je réponds vite (pas un robot, promis 😄)".to_string());
    lines.push("📍 Saint-Georges (Beauce) | Prise de possession rapide possible".to_string());
    lines.push("📄 Vente commerciale — 2 taxes applicables".to_string());
    lines.push("✅ Inspection complète — véhicule propre & prêt à partir.".to_string());
    lines.push(String::new());

    lines.push("📩 Écris-moi en privé — ou texte direct".to_string());
    lines.push("📞 Daniel Giroux — 418-222-3939".to_string());
    lines.push(String::new());
    lines.push(choose_hashtags(title));

    format!("{}\n", lines.join("\n").trim())
}
