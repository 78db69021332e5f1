//! OCR tier: last-resort extraction for scanned stickers.
//!
//! Scanned stickers carry no text layer at all; each page is a single
//! embedded scan image.  This tier pulls the largest image XObject off each
//! of the first pages, materializes it as a PNG or JPEG in a temp
//! directory, and runs `tesseract` over it.  The resulting text goes
//! through [`parse_ocr_text`], which reconstructs option groups from
//! price-anchored lines and indentation.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;

use log::{debug, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::classify::{
    clean_option_line, contains_money_token, extract_price_token, is_hard_stop, is_junk,
    is_price_only, normalize, strip_money_tokens, trim_title_edges,
};
use crate::parser::backend::LopdfBackend;
use crate::parser::spans::MAX_PAGES;
use crate::types::{dedup_groups, OptionGroup};
use crate::StickerError;

// ---------------------------------------------------------------------------
// OCR text parsing (pure)
// ---------------------------------------------------------------------------

/// Reconstruct option groups from raw OCR text.
///
/// Lines carrying a price open a group (the price is the anchor, stripped
/// from the title and kept internally); subsequent unpriced lines become
/// details.  Indentation is the only layout signal OCR preserves, so a
/// flush-left line that is very long is treated as footer text, not a
/// detail.
pub fn parse_ocr_text(text: &str) -> Vec<OptionGroup> {
    let lines: Vec<(String, usize)> = text
        .lines()
        .map(|raw| {
            let indent = raw.len() - raw.trim_start_matches(' ').len();
            (normalize(raw), indent)
        })
        .filter(|(t, _)| !t.is_empty())
        .collect();

    let mut groups: Vec<OptionGroup> = Vec::new();
    let mut current: Option<OptionGroup> = None;

    for (line, indent) in lines {
        if is_hard_stop(&line) {
            break;
        }

        // Strict token only: option details often carry bare digit runs
        // ("CABLAGE 7 BROCHES") that must not open a group.
        if contains_money_token(&line) {
            let price = extract_price_token(&line);
            let title = clean_option_line(&trim_title_edges(&strip_money_tokens(&line)));

            if title.is_empty() || is_junk(&title) || is_price_only(&title) {
                continue;
            }

            if let Some(g) = current.take() {
                groups.push(g);
            }
            current = Some(OptionGroup::new(title, price));
            continue;
        }

        if let Some(g) = current.as_mut() {
            let d = clean_option_line(&line);
            if d.is_empty() || is_junk(&d) || is_price_only(&d) {
                continue;
            }
            // Flush-left long lines are page footer paragraphs.
            if indent < 2 && d.chars().count() > 80 {
                continue;
            }
            if !d.eq_ignore_ascii_case(&g.title) {
                g.details.push(d);
            }
        }
    }
    if let Some(g) = current.take() {
        groups.push(g);
    }

    dedup_groups(groups)
}

// ---------------------------------------------------------------------------
// Page scan extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanColor {
    Gray,
    Rgb,
}

/// Pixel metadata of an embedded scan stream.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScanMeta {
    width: u32,
    height: u32,
    bits_per_component: u8,
    channels: u8,
    color: ScanColor,
}

impl ScanMeta {
    /// Expected raw byte count, with per-row bit padding.
    fn expected_byte_count(&self) -> usize {
        let bits_per_row =
            self.width as usize * self.channels as usize * self.bits_per_component as usize;
        bits_per_row.div_ceil(8) * self.height as usize
    }
}

fn scan_meta(dict: &lopdf::Dictionary) -> Option<ScanMeta> {
    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    let bits_per_component = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .map(|v| v as u8)
        .unwrap_or(8);
    let (color, channels) = match dict.get(b"ColorSpace").ok()?.as_name().ok()? {
        b"DeviceGray" => (ScanColor::Gray, 1),
        b"DeviceRGB" => (ScanColor::Rgb, 3),
        _ => return None,
    };
    Some(ScanMeta {
        width,
        height,
        bits_per_component,
        channels,
        color,
    })
}

/// Expand 1/2/4-bit packed components to one byte per component.
fn expand_sub_byte_pixels(raw: &[u8], meta: &ScanMeta) -> Vec<u8> {
    let components_per_row = meta.width as usize * meta.channels as usize;
    let bytes_per_row = (components_per_row * meta.bits_per_component as usize).div_ceil(8);
    let bpc = meta.bits_per_component;
    let max_val = (1u16 << bpc) - 1;

    let mut out = Vec::with_capacity(components_per_row * meta.height as usize);
    for row in 0..meta.height as usize {
        let row_bytes = &raw[row * bytes_per_row..(row + 1) * bytes_per_row];
        let mut count = 0;
        for &byte in row_bytes {
            for i in 0..(8 / bpc as usize) {
                if count >= components_per_row {
                    break;
                }
                let shift = 8 - bpc * (i as u8 + 1);
                let val = (byte >> shift) & (max_val as u8);
                out.push((val as u16 * 255 / max_val) as u8);
                count += 1;
            }
        }
    }
    out
}

/// Re-encode raw scan pixels as PNG bytes.
fn encode_scan_as_png(meta: &ScanMeta, raw: &[u8]) -> Option<Vec<u8>> {
    if raw.len() != meta.expected_byte_count() {
        return None;
    }
    let expanded = if meta.bits_per_component < 8 {
        expand_sub_byte_pixels(raw, meta)
    } else {
        raw.to_vec()
    };

    let dyn_image = match meta.color {
        ScanColor::Gray => {
            let img = image::GrayImage::from_raw(meta.width, meta.height, expanded)?;
            image::DynamicImage::ImageLuma8(img)
        }
        ScanColor::Rgb => {
            let img = image::RgbImage::from_raw(meta.width, meta.height, expanded)?;
            image::DynamicImage::ImageRgb8(img)
        }
    };

    let mut buf = Vec::new();
    dyn_image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .ok()?;
    Some(buf)
}

/// Decode a CCITT Group 4 fax stream (the usual encoding for B/W sticker
/// scans) into PNG bytes.
fn decode_ccitt_scan(dict: &lopdf::Dictionary, raw: &[u8]) -> Option<Vec<u8>> {
    let parms = match dict.get(b"DecodeParms").ok()? {
        lopdf::Object::Dictionary(d) => d,
        lopdf::Object::Array(arr) => arr.first().and_then(|o| o.as_dict().ok())?,
        _ => return None,
    };

    let width = parms.get(b"Columns").ok()?.as_i64().ok()? as u16;
    let height = parms
        .get(b"Rows")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .map(|v| v as u16);
    let k = parms
        .get(b"K")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    // Group 3 (k >= 0) does not occur on these scans.
    if k >= 0 {
        return None;
    }

    let bytes_per_row = (width as usize).div_ceil(8);
    let mut rows: Vec<Vec<u8>> = Vec::new();
    fax::decoder::decode_g4(raw.iter().copied(), width, height, |transitions| {
        let mut row = pack_row_bits(transitions, width);
        row.resize(bytes_per_row, 0);
        rows.push(row);
    })?;
    if rows.is_empty() {
        return None;
    }

    let pixel_data: Vec<u8> = rows.into_iter().flatten().collect();
    let meta = ScanMeta {
        width: width as u32,
        height: pixel_data.len() as u32 / bytes_per_row as u32,
        bits_per_component: 1,
        channels: 1,
        color: ScanColor::Gray,
    };
    encode_scan_as_png(&meta, &pixel_data)
}

/// Convert fax row transitions into packed 1-bit pixels.
fn pack_row_bits(transitions: &[u16], width: u16) -> Vec<u8> {
    let mut row = vec![0u8; (width as usize).div_ceil(8)];
    let mut set_black_run = |start: u16, end: u16| {
        for col in start..end.min(width) {
            row[col as usize / 8] |= 1 << (7 - (col as usize % 8));
        }
    };

    let mut is_black = false;
    let mut prev: u16 = 0;
    for &pos in transitions {
        if is_black {
            set_black_run(prev, pos);
        }
        prev = pos;
        is_black = !is_black;
    }
    if is_black {
        set_black_run(prev, width);
    }
    row
}

fn resolve_object<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(
    doc: &'a lopdf::Document,
    obj: &'a lopdf::Object,
) -> Option<&'a lopdf::Dictionary> {
    match resolve_object(doc, obj) {
        lopdf::Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn first_filter_name(dict: &lopdf::Dictionary) -> Option<String> {
    match dict.get(b"Filter").ok()? {
        lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        lopdf::Object::Array(arr) => arr.first().and_then(|o| match o {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }),
        _ => None,
    }
}

/// An extracted page scan ready to hand to tesseract.
struct PageScan {
    bytes: Vec<u8>,
    /// File extension tesseract will recognize.
    ext: &'static str,
    area: u64,
}

/// Pull the largest image XObject off a page.  Sticker scans are one
/// full-page image; smaller XObjects are logos and barcodes.
fn largest_page_scan(doc: &lopdf::Document, page_id: (u32, u16)) -> Option<PageScan> {
    let page_dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let resources = resolve_dict(doc, page_dict.get(b"Resources").ok()?)?;
    let xobjects = resolve_dict(doc, resources.get(b"XObject").ok()?)?;

    let mut best: Option<PageScan> = None;
    for (_, obj) in xobjects.iter() {
        let stream = match resolve_object(doc, obj) {
            lopdf::Object::Stream(s) => s,
            _ => continue,
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Image");
        if !is_image {
            continue;
        }

        let width = stream
            .dict
            .get(b"Width")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0) as u64;
        let height = stream
            .dict
            .get(b"Height")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0) as u64;
        let area = width * height;

        let scan = match first_filter_name(&stream.dict).as_deref() {
            // JPEG streams pass through untouched.
            Some("DCTDecode") => Some(PageScan {
                bytes: stream.content.clone(),
                ext: "jpg",
                area,
            }),
            Some("CCITTFaxDecode") => {
                decode_ccitt_scan(&stream.dict, &stream.content).map(|bytes| PageScan {
                    bytes,
                    ext: "png",
                    area,
                })
            }
            _ => {
                let raw = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                scan_meta(&stream.dict)
                    .and_then(|meta| encode_scan_as_png(&meta, &raw))
                    .map(|bytes| PageScan {
                        bytes,
                        ext: "png",
                        area,
                    })
            }
        };

        if let Some(scan) = scan {
            match &best {
                Some(b) if b.area >= scan.area => {}
                _ => best = Some(scan),
            }
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tesseract invocation
// ---------------------------------------------------------------------------

fn temp_scan_path(ext: &str) -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    std::env::temp_dir().join(format!("sticker_ocr_{}.{}", suffix, ext))
}

fn run_tesseract(tesseract: &std::path::Path, image: &std::path::Path) -> Option<String> {
    let output = Command::new(tesseract)
        .arg(image)
        .arg("stdout")
        .arg("-l")
        .arg("fra+eng")
        .output()
        .ok()?;
    if !output.status.success() {
        warn!("tesseract exited with {}", output.status);
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run OCR over the embedded scans of the first pages.
///
/// Errors only when tesseract itself is unavailable; pages without a usable
/// scan simply contribute nothing.
pub fn extract_text(backend: &LopdfBackend) -> Result<String, StickerError> {
    let tesseract =
        which::which("tesseract").map_err(|_| StickerError::Ocr("tesseract not found".into()))?;

    let doc = backend.raw_doc();
    let mut texts: Vec<String> = Vec::new();

    for (&page_num, &page_id) in doc.get_pages().iter().take(MAX_PAGES) {
        let Some(scan) = largest_page_scan(doc, page_id) else {
            debug!("page {}: no embedded scan found", page_num);
            continue;
        };

        let path = temp_scan_path(scan.ext);
        if let Err(e) = std::fs::write(&path, &scan.bytes) {
            warn!("page {}: cannot write scan to {:?}: {}", page_num, path, e);
            continue;
        }
        if let Some(text) = run_tesseract(&tesseract, &path) {
            texts.push(text);
        }
        let _ = std::fs::remove_file(&path);
    }

    Ok(texts.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OCR_SAMPLE: &str = "\
ACCESSOIRES OPTIONNELS

ENSEMBLE REMORQUAGE CLASSE IV 595 $
    ATTELAGE DE REMORQUE
    CABLAGE 7 BROCHES
TAPIS PROTECTEURS 225 $
LE CONCESSIONNAIRE PEUT VENDRE MOINS CHER
PLAQUE PROTECTRICE 150 $
";

    #[test]
    fn priced_lines_open_groups_with_price_stripped() {
        let groups = parse_ocr_text(OCR_SAMPLE);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].title, "ENSEMBLE REMORQUAGE CLASSE IV");
        assert_eq!(groups[0].price.as_deref(), Some("595 $"));
        assert_eq!(
            groups[0].details,
            vec!["ATTELAGE DE REMORQUE", "CABLAGE 7 BROCHES"]
        );
        assert_eq!(groups[1].title, "TAPIS PROTECTEURS");
    }

    #[test]
    fn hard_stop_cuts_remaining_lines() {
        let groups = parse_ocr_text(OCR_SAMPLE);
        assert!(groups.iter().all(|g| g.title != "PLAQUE PROTECTRICE"));
    }

    #[test]
    fn charge_lines_never_become_titles() {
        let text = "\
DESTINATION CHARGE 1,995 $
FEDERAL A C EXCISE TAX 100 $
ENSEMBLE REMORQUAGE 595 $
";
        let groups = parse_ocr_text(text);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "ENSEMBLE REMORQUAGE");
    }

    #[test]
    fn price_only_lines_are_not_titles_or_details() {
        let text = "\
ENSEMBLE REMORQUAGE 595 $
$2,395
    CABLAGE 7 BROCHES
";
        let groups = parse_ocr_text(text);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].details, vec!["CABLAGE 7 BROCHES"]);
    }

    #[test]
    fn package_codes_survive_in_titles() {
        let text = "CUSTOMER PREFERRED PACKAGE 27J 1,095 $\n";
        let groups = parse_ocr_text(text);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "CUSTOMER PREFERRED PACKAGE 27J");
        assert_eq!(groups[0].price.as_deref(), Some("1,095 $"));
    }

    #[test]
    fn detail_count_is_capped_per_group() {
        let mut text = String::from("ENSEMBLE REMORQUAGE 595 $\n");
        for i in 0..20 {
            text.push_str(&format!("    DETAIL LIGNE {}\n", i));
        }
        let groups = parse_ocr_text(&text);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].details.len(), crate::types::MAX_DETAILS);
    }

    #[test]
    fn long_flush_left_lines_are_footer_not_detail() {
        let long = "CE VEHICULE EST COUVERT PAR UNE POLITIQUE COMPLETE QUI SERA EXPLIQUEE EN DETAIL AU MOMENT DE LA LIVRAISON DU VEHICULE NEUF";
        let text = format!("ENSEMBLE REMORQUAGE 595 $\n{}\n", long);
        let groups = parse_ocr_text(&text);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].details.is_empty());
    }

    #[test]
    fn empty_text_yields_no_groups() {
        assert!(parse_ocr_text("").is_empty());
    }

    #[test]
    fn expected_byte_count_pads_rows() {
        let meta = ScanMeta {
            width: 10,
            height: 3,
            bits_per_component: 1,
            channels: 1,
            color: ScanColor::Gray,
        };
        assert_eq!(meta.expected_byte_count(), 6);
    }

    #[test]
    fn pack_row_bits_black_run() {
        // First 4 pixels white, last 4 black.
        assert_eq!(pack_row_bits(&[4], 8), vec![0x0F]);
        assert_eq!(pack_row_bits(&[], 8), vec![0x00]);
        assert_eq!(pack_row_bits(&[0], 8), vec![0xFF]);
    }

    #[test]
    fn expand_one_bit_gray() {
        let meta = ScanMeta {
            width: 8,
            height: 1,
            bits_per_component: 1,
            channels: 1,
            color: ScanColor::Gray,
        };
        let expanded = expand_sub_byte_pixels(&[0b1010_0000], &meta);
        assert_eq!(expanded, vec![255, 0, 255, 0, 0, 0, 0, 0]);
    }
}
