//! Completeness score and distinction
//!
//! Both functions are total: any document, however sparse, yields a score in
//! `0..=100` and a boolean flag.

use crate::document::{is_truthy, ProjectDna, PLACEHOLDER};
use serde_json::Value;

/// Size of the canonical `.faf` schema
pub const TOTAL_SLOTS: u32 = 21;

/// Label that marks a document as Big Orange
pub const DISTINCTION_LABEL: &str = "Big Orange";

/// Short form accepted in `meta.distinction`
const META_DISTINCTION_LABEL: &str = "orange";

const MAX_SCORE: u8 = 100;

/// Completeness score in `0..=100`
///
/// A precomputed `scores.faf_score` is trusted as stored. Otherwise the score
/// is `floor(100 * filled / 21)`, counting top-level keys whose value is
/// present and not the `TBD` placeholder.
#[must_use]
pub fn score(dna: &ProjectDna) -> u8 {
    if let Some(stored) = dna.get_path("scores.faf_score").and_then(stored_score) {
        return stored;
    }

    let filled: u32 = dna
        .as_map()
        .values()
        .filter(|value| is_filled(value))
        .count()
        .try_into()
        .unwrap_or(u32::MAX);

    let computed = filled.saturating_mul(100) / TOTAL_SLOTS;
    u8::try_from(computed.min(u32::from(MAX_SCORE))).unwrap_or(MAX_SCORE)
}

/// Whether the document carries the Big Orange distinction
///
/// Any one of `faf_distinction: Big Orange`, a truthy `x_faf_orange`, or
/// `meta.distinction` naming the label is sufficient.
#[must_use]
pub fn has_distinction(dna: &ProjectDna) -> bool {
    if dna.get_str("faf_distinction") == Some(DISTINCTION_LABEL) {
        return true;
    }
    if dna.get("x_faf_orange").is_some_and(is_truthy) {
        return true;
    }
    matches!(
        dna.get_str("meta.distinction"),
        Some(META_DISTINCTION_LABEL | DISTINCTION_LABEL)
    )
}

fn is_filled(value: &Value) -> bool {
    is_truthy(value) && value.as_str() != Some(PLACEHOLDER)
}

/// Interpret a stored `faf_score`
///
/// Integers and `"85"`/`"85%"` strings are accepted; fractional values are
/// floored. Values outside `0..=100` are clamped so the range holds.
fn stored_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = raw.floor().clamp(0.0, f64::from(MAX_SCORE)) as u8;
    Some(clamped)
}
