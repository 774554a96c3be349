// src/normalize.rs
//! Comment text canonicalization.
//!
//! The platform injects relative timestamps ("3d ago", "12h ago") into the
//! rendered comment text, so an unchanged comment would compare unequal on
//! every poll. Normalization strips those, lowercases, collapses whitespace
//! and trims, giving a stable dedup key across cycles and restarts.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Canonicalize raw scraped comment text. Total over any input, including
/// the empty string. Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let mut out = raw.to_lowercase();

    // Relative-timestamp noise: digits, a unit word, the literal "ago".
    static RE_AGO: OnceCell<Regex> = OnceCell::new();
    let re_ago = RE_AGO.get_or_init(|| Regex::new(r"\b\d+\s*[a-z]+\s*ago\b").unwrap());

    // Removal can butt stray digits against a later unit word, so strip to a
    // fixpoint to keep the idempotence invariant airtight.
    loop {
        let stripped = re_ago.replace_all(&out, "").to_string();
        if stripped == out {
            break;
        }
        out = stripped;
    }

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}
