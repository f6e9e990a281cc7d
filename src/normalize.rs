//! Channel name cleanup.
//!
//! Two forms are derived from a raw label:
//!
//! * the *display* form keeps the label readable: decorations, inline
//!   attribute tags and quality markers are removed, whitespace collapsed;
//! * the *matching key* is the display form lower-cased with every
//!   non-alphanumeric character dropped. It is only ever compared, never shown.
//!
//! Both are pure functions of their input.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Bracket pairs, ASCII and full-width, applied in this order.
    static ref DECORATIONS: Vec<Regex> = [
        r"\[.*?\]",
        r"\(.*?\)",
        r"【.*?】",
        r"（.*?）",
        r"［.*?］",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// M3U leftovers: the `#EXTINF:...,` prefix, `key="value"` attributes and
    /// stray stream URLs.
    static ref TAGS: Vec<Regex> = [
        r"#EXTINF[^,]*,",
        r#"[A-Za-z][\w-]*="[^"]*""#,
        r"https?://\S+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Longer tokens first so `FHD` is not reduced to a dangling `F`.
    static ref QUALITY: Regex =
        Regex::new(r"(?i)FHD|UHD|4K|1080P|720P|HD|超清|高清|标清|蓝光").unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

fn is_edge_separator(c: char) -> bool {
    c == ',' || c == '，' || c.is_whitespace()
}

fn cleanup_pass(name: &str) -> String {
    let mut out = name.to_string();
    for re in DECORATIONS.iter().chain(TAGS.iter()) {
        out = re.replace_all(&out, "").into_owned();
    }
    out = QUALITY.replace_all(&out, "").into_owned();
    out = WHITESPACE.replace_all(&out, " ").into_owned();
    out.trim_matches(is_edge_separator).to_string()
}

/// Cosmetic cleanup of a raw label, display case preserved.
///
/// Passes repeat until nothing changes: removing one token can splice two
/// fragments into a new one (`H4KD` -> `HD`), and the result must be stable
/// under a second application.
pub fn display_name(raw: &str) -> String {
    let mut current = cleanup_pass(raw);
    loop {
        let next = cleanup_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Lower-case, alphanumeric-only projection of an already cleaned name.
pub fn matching_key(cleaned: &str) -> String {
    cleaned
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalization key of a raw label.
pub fn normalize(raw: &str) -> String {
    matching_key(&display_name(raw))
}
