//! Shared line classifiers for the sticker extraction tiers.
//!
//! Every tier applies the *same* exclusion rules, so a boilerplate phrase
//! that slips past the geometric pass because of a layout quirk is still
//! rejected by the text and OCR passes.  All predicates are pure, and all
//! pattern tables are immutable statics compiled once.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ---------------------------------------------------------------------------
// Normalization helpers
// ---------------------------------------------------------------------------

/// Collapse whitespace (including NBSP) into single spaces and trim.
pub fn normalize(s: &str) -> String {
    static RE_WS: OnceLock<Regex> = OnceLock::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let replaced = s.replace('\u{00A0}', " ");
    re.replace_all(&replaced, " ").trim().to_string()
}

/// Fold a line for matching: lowercase, strip diacritics, normalize curly
/// apostrophes and dash variants.  All blacklist tables below are stored in
/// this folded form.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '\u{2019}' | '\u{02BC}' => '\'',
            '\u{2212}' | '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            _ => c,
        })
        .collect::<String>()
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Money patterns
// ---------------------------------------------------------------------------

/// Loose monetary pattern: `595`, `$2,395`, `2 395,00 $`, etc.
fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\$\s*)?(\d{1,3}(?:[,\s]\d{3})*(?:[.,]\d{2})?)\s*\$?").unwrap()
    })
}

/// A line that is *nothing but* a monetary amount.
fn price_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:\$\s*)?(\d{1,3}(?:[,\s]\d{3})*(?:[.,]\d{2})?)\s*\$?\s*$").unwrap()
    })
}

/// Strict money token: requires a `$` sign or a decimal part, so model
/// numbers like `1500` in a label survive stripping.
fn money_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\$\s*\d{1,3}(?:[,\s]\d{3})*(?:[.,]\d{2})?|\d{1,3}(?:[,\s]\d{3})*(?:[.,]\d{2})?\s*\$")
            .unwrap()
    })
}

/// Pull the first monetary amount out of a line, normalized to `"1234 $"`.
pub fn extract_price(s: &str) -> Option<String> {
    let s = normalize(s);
    let caps = money_re().captures(&s)?;
    let raw = normalize(&caps[1]).replace(' ', "");
    if raw.is_empty() {
        None
    } else {
        Some(format!("{} $", raw))
    }
}

/// Parse a line consisting solely of a monetary amount, normalized as in
/// [`extract_price`].  Used by the flat-text tier's price queue.
pub fn parse_price_only_line(s: &str) -> Option<String> {
    let caps = price_only_re().captures(s)?;
    let raw = normalize(&caps[1]).replace(' ', "");
    if raw.is_empty() {
        None
    } else {
        Some(format!("{} $", raw))
    }
}

/// True if the line contains any monetary-looking token at all.
pub fn contains_money(s: &str) -> bool {
    money_re().is_match(s)
}

/// True if the line contains a strict money token (a `$` sign or cents).
/// Bare digit runs such as package codes (`27J`) or wire counts
/// (`7 BROCHES`) do not qualify.
pub fn contains_money_token(s: &str) -> bool {
    money_token_re().is_match(s)
}

/// Pull the first strict money token out of a line, normalized as in
/// [`extract_price`].
pub fn extract_price_token(s: &str) -> Option<String> {
    let s = normalize(s);
    let m = money_token_re().find(&s)?;
    extract_price(m.as_str())
}

/// Remove every monetary substring (loose pattern) from a line.
pub fn strip_money(s: &str) -> String {
    money_re().replace_all(s, "").to_string()
}

/// Remove strict money tokens only (amounts with a `$` sign or cents).
pub fn strip_money_tokens(s: &str) -> String {
    money_token_re().replace_all(s, "").to_string()
}

/// True if, once the monetary pattern is removed, fewer than two alphabetic
/// characters remain.  `"$2,395"` and `"595 $"` qualify; `"4x4 595 $"` is
/// borderline and also dropped, matching observed sticker behavior.
pub fn is_price_only(line: &str) -> bool {
    if !contains_money(line) {
        return false;
    }
    let residue = strip_money(line);
    residue.chars().filter(|c| c.is_alphabetic()).count() < 2
}

// ---------------------------------------------------------------------------
// Junk / boilerplate blacklists
// ---------------------------------------------------------------------------

/// Any line longer than this cannot plausibly be an option label.
const MAX_LABEL_LEN: usize = 90;

/// Multilingual boilerplate terms, stored pre-folded (see [`fold`]).
static BANNED_TERMS: &[&str] = &[
    // Pricing header block
    "annee modele",
    "prix de base",
    "prix total",
    "p.d.s.f",
    "pdsf",
    "preparation",
    "frais d'expedition",
    "frais d expedition",
    "destination",
    "freight",
    "shipping",
    "manufacturer's suggested retail price",
    "suggested retail price",
    "msrp",
    "tariff adjustment",
    "total price",
    "base price",
    "federal a/c excise tax",
    // OCR sometimes loses the slash
    "federal a c excise tax",
    "taxe d'accise",
    // Fuel economy / regulatory block
    "energuide",
    "consommation",
    "annual fuel cost",
    "cout annuel",
    "indice",
    "smog",
    "carbon",
    "tailpipe",
    "vehicles.nrcan",
    "vehicules.nrcan",
    "government of canada",
    // Warranty / legal block
    "garantie",
    "assistance routiere",
    "transferable",
    "motopropulseur",
    "fca canada",
    "ce vehicule est fabrique",
    "visitez le site web",
    "contactez",
    "pour de plus amples renseignements",
];

/// True if the line matches the boilerplate blacklist, carries a URL, or is
/// too long to be an option label.
pub fn is_junk(line: &str) -> bool {
    let line = normalize(line);
    if line.is_empty() {
        return true;
    }

    let low = fold(&line);
    if BANNED_TERMS.iter().any(|b| low.contains(b)) {
        return true;
    }

    if low.contains("http") || low.contains("www.") {
        return true;
    }

    line.chars().count() > MAX_LABEL_LEN
}

/// End-of-sticker boilerplate (dealer markup disclaimer, shipping/sold-to
/// footer), FR + EN.  Once one of these is seen, scanning stops entirely.
static HARD_STOP_PHRASES: &[&str] = &[
    // FR
    "le concessionnaire",
    "peut vendre moins cher",
    "expedier a",
    "expedie a",
    "vendu a",
    "par le concessionnaire",
    // EN
    "the dealer",
    "may sell for less",
    "shipped to",
    "sold to",
    "by dealer",
];

pub fn is_hard_stop(line: &str) -> bool {
    let low = fold(line.trim());
    if low == "s.l." {
        return true;
    }
    HARD_STOP_PHRASES.iter().any(|p| low.contains(p))
}

// ---------------------------------------------------------------------------
// Option-line cleanup
// ---------------------------------------------------------------------------

/// Normalize an option label/detail line: drop bare `www.` URLs, collapse
/// runs of spaces.
pub fn clean_option_line(s: &str) -> String {
    static RE_WWW: OnceLock<Regex> = OnceLock::new();
    let re = RE_WWW.get_or_init(|| Regex::new(r"(?i)\bwww\.\S+").unwrap());
    let s = normalize(s);
    normalize(&re.replace_all(&s, ""))
}

/// Strip list-marker punctuation left over after removing a price from a
/// mixed label+price line.
pub fn trim_title_edges(s: &str) -> String {
    s.trim_matches(|c: char| matches!(c, ' ' | '-' | '\u{2013}' | ':' | '\u{2022}' | '\t'))
        .to_string()
}

// ---------------------------------------------------------------------------
// VIN recovery
// ---------------------------------------------------------------------------

/// VIN alphabet excludes I, O, and Q.
fn is_vin_char(c: char) -> bool {
    c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q'))
}

/// Scan arbitrary text for a VIN, tolerating the hyphen/dash chunking some
/// sticker layouts use (e.g. `1C6—RR7LG5NS—241151`).
///
/// Returns exactly 17 characters or nothing; a candidate window containing
/// `I`, `O`, or `Q` is rejected rather than repaired.
pub fn extract_vin(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let t = text.to_uppercase();

    // Contiguous 17-char run.
    static RE_VIN: OnceLock<Regex> = OnceLock::new();
    let re = RE_VIN.get_or_init(|| Regex::new(r"\b([A-HJ-NPR-Z0-9]{17})\b").unwrap());
    if let Some(caps) = re.captures(&t) {
        return Some(caps[1].to_string());
    }

    // Three dash-separated chunks reassembling to 17.
    static RE_CHUNKED: OnceLock<Regex> = OnceLock::new();
    let re_chunked = RE_CHUNKED.get_or_init(|| {
        Regex::new(
            r"\b([A-HJ-NPR-Z0-9]{3,6})\s*[-\u{2013}\u{2014}]\s*([A-HJ-NPR-Z0-9]{4,8})\s*[-\u{2013}\u{2014}]\s*([A-HJ-NPR-Z0-9]{3,8})\b",
        )
        .unwrap()
    });
    if let Some(caps) = re_chunked.captures(&t) {
        let cand: String = format!("{}{}{}", &caps[1], &caps[2], &caps[3])
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if cand.chars().count() == 17 && cand.chars().all(is_vin_char) {
            return Some(cand);
        }
    }

    // Last resort: compact the whole blob and slide a 17-char window.
    let compact: String = t
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let bytes = compact.as_bytes();
    if bytes.len() >= 17 {
        for win in bytes.windows(17) {
            if win.iter().all(|&b| is_vin_char(b as char)) {
                return Some(String::from_utf8_lossy(win).into_owned());
            }
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Vehicle-level sniffers
// ---------------------------------------------------------------------------

static HYBRID_TERMS: &[&str] = &[
    "phev",
    "plug-in",
    "plug in",
    "hybrid",
    "hybride",
    "vehicule hybride",
    "vehicule hybride rechargeable",
    "vhr",
];

/// True if the sticker text mentions a hybrid/PHEV drivetrain.
pub fn detect_hybrid(text: &str) -> bool {
    let low = fold(text);
    HYBRID_TERMS.iter().any(|k| low.contains(k))
}

static ALLOWED_BRANDS: &[&str] = &["ram", "dodge", "jeep", "chrysler", "alfa"];

/// Stellantis brand gate: stickers from other manufacturers are skipped
/// upstream rather than mis-parsed.
pub fn is_allowed_brand(text: &str) -> bool {
    let low = fold(text);
    ALLOWED_BRANDS.iter().any(|b| low.contains(b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- normalize / fold ---------------------------------------------------

    #[test]
    fn normalize_collapses_whitespace_and_nbsp() {
        assert_eq!(normalize("  a\u{00A0}\u{00A0}b\t c \n"), "a b c");
    }

    #[test]
    fn fold_strips_accents_and_curly_quotes() {
        assert_eq!(fold("Année modèle"), "annee modele");
        assert_eq!(fold("Frais d\u{2019}expédition"), "frais d'expedition");
        assert_eq!(fold("A\u{2014}B"), "a-b");
    }

    // -- money --------------------------------------------------------------

    #[test]
    fn extract_price_variants() {
        assert_eq!(extract_price("595 $"), Some("595 $".to_string()));
        assert_eq!(extract_price("$2,395"), Some("2,395 $".to_string()));
        assert_eq!(extract_price("2 395,00 $"), Some("2395,00 $".to_string()));
        assert_eq!(extract_price("no digits here"), None);
    }

    #[test]
    fn parse_price_only_line_rejects_mixed_lines() {
        assert_eq!(parse_price_only_line("  $1,095 "), Some("1,095 $".to_string()));
        assert_eq!(parse_price_only_line("TRAILER TOW 595 $"), None);
    }

    #[test]
    fn price_only_detection() {
        assert!(is_price_only("$2,395"));
        assert!(is_price_only("595 $"));
        assert!(!is_price_only("ENSEMBLE REMORQUAGE"));
        assert!(!is_price_only("CLASS IV RECEIVER HITCH"));
    }

    #[test]
    fn strict_token_ignores_bare_digit_runs() {
        assert!(contains_money_token("ENSEMBLE REMORQUAGE 595 $"));
        assert!(contains_money_token("$2,395"));
        assert!(!contains_money_token("CUSTOMER PREFERRED PACKAGE 27J"));
        assert!(!contains_money_token("CABLAGE 7 BROCHES"));
    }

    #[test]
    fn extract_price_token_skips_leading_codes() {
        assert_eq!(
            extract_price_token("CUSTOMER PREFERRED PACKAGE 27J 1,095 $"),
            Some("1,095 $".to_string())
        );
        assert_eq!(extract_price_token("CABLAGE 7 BROCHES"), None);
    }

    #[test]
    fn strict_strip_preserves_model_numbers() {
        assert_eq!(strip_money_tokens("RAM 1500 EXPRESS"), "RAM 1500 EXPRESS");
        assert_eq!(
            normalize(&strip_money_tokens("ENSEMBLE REMORQUAGE 595 $")),
            "ENSEMBLE REMORQUAGE"
        );
    }

    // -- junk ---------------------------------------------------------------

    #[test]
    fn junk_matches_blacklist_in_both_languages() {
        assert!(is_junk("DESTINATION CHARGE"));
        assert!(is_junk("Frais d'expédition"));
        assert!(is_junk("MANUFACTURER'S SUGGESTED RETAIL PRICE"));
        assert!(is_junk("P.D.S.F. DU VÉHICULE"));
        assert!(is_junk("visitez le site web vehicules.nrcan.gc.ca"));
    }

    #[test]
    fn junk_matches_urls_and_overlong_lines() {
        assert!(is_junk("see http://example.com for details"));
        assert!(is_junk("WWW.RAMTRUCK.CA"));
        assert!(is_junk(&"x".repeat(91)));
        assert!(!is_junk(&"x".repeat(90)));
    }

    #[test]
    fn junk_accepts_ordinary_labels() {
        assert!(!is_junk("ENSEMBLE REMORQUAGE"));
        assert!(!is_junk("Attelage de classe IV"));
        assert!(!is_junk("TRAILER TOW GROUP"));
    }

    #[test]
    fn junk_is_idempotent_on_accepted_lines() {
        // Accepting a line does not change the verdict on re-check.
        let line = "MOPAR SPRAY-IN BEDLINER";
        assert!(!is_junk(line));
        assert!(!is_junk(&clean_option_line(line)));
    }

    // -- hard stop ----------------------------------------------------------

    #[test]
    fn hard_stop_bilingual() {
        assert!(is_hard_stop("THIS VEHICLE WAS SHIPPED TO:"));
        assert!(is_hard_stop("Le concessionnaire peut vendre moins cher"));
        assert!(is_hard_stop("Expédié à : Saint-Georges QC"));
        assert!(is_hard_stop("S.L."));
        assert!(!is_hard_stop("ENSEMBLE REMORQUAGE"));
    }

    // -- VIN ----------------------------------------------------------------

    #[test]
    fn vin_contiguous() {
        let text = "VEHICLE VIN 1C6RR7LG5NS241151 MADE IN MEXICO";
        assert_eq!(extract_vin(text), Some("1C6RR7LG5NS241151".to_string()));
    }

    #[test]
    fn vin_from_dash_chunks() {
        assert_eq!(
            extract_vin("1C6\u{2014}RR7LG5NS\u{2014}241151"),
            Some("1C6RR7LG5NS241151".to_string())
        );
        assert_eq!(
            extract_vin("1C6 - RR7LG5NS - 241151"),
            Some("1C6RR7LG5NS241151".to_string())
        );
    }

    #[test]
    fn vin_rejects_illegal_letters() {
        // 'O' in the candidate window: rejected, not repaired.
        assert_eq!(extract_vin("1C6ORR7LG5NS24115"), None);
    }

    #[test]
    fn vin_sliding_window_over_noise() {
        let text = "serial# *1C6RR7LG5NS241151* printed";
        assert_eq!(extract_vin(text), Some("1C6RR7LG5NS241151".to_string()));
    }

    #[test]
    fn vin_empty_and_short_inputs() {
        assert_eq!(extract_vin(""), None);
        assert_eq!(extract_vin("ABC123"), None);
    }

    #[test]
    fn vin_lowercase_input_is_uppercased() {
        assert_eq!(
            extract_vin("vin: 1c6rr7lg5ns241151"),
            Some("1C6RR7LG5NS241151".to_string())
        );
    }

    // -- cleanup ------------------------------------------------------------

    #[test]
    fn clean_option_line_drops_urls() {
        assert_eq!(clean_option_line("MOPAR  www.mopar.ca  PARTS"), "MOPAR PARTS");
    }

    #[test]
    fn trim_title_edges_strips_markers() {
        assert_eq!(trim_title_edges("- ENSEMBLE REMORQUAGE :"), "ENSEMBLE REMORQUAGE");
        assert_eq!(trim_title_edges("\u{2022} HITCH"), "HITCH");
    }

    // -- sniffers -----------------------------------------------------------

    #[test]
    fn hybrid_detection() {
        assert!(detect_hybrid("Véhicule hybride rechargeable (PHEV)"));
        assert!(detect_hybrid("PLUG-IN HYBRID VEHICLE"));
        assert!(!detect_hybrid("5.7L V8 HEMI MDS VVT ENGINE"));
    }

    #[test]
    fn brand_gate() {
        assert!(is_allowed_brand("RAM 1500 SPORT"));
        assert!(is_allowed_brand("Jeep Grand Cherokee"));
        assert!(!is_allowed_brand("Toyota Corolla"));
    }
}
