//! Doctor name matching for patient imports.
//!
//! Import sheets name doctors loosely ("Delfino", "dott.ssa Delfino Claudia",
//! "DR. DELFINO"). Names are resolved against the backend's master list
//! before anything is sent, so a typo fails locally with a suggestion.

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::ValidationError;

/// Honorifics stripped from the front of a name.
const TITLES: &[&str] = &["dott", "dr", "prof", "d.o"];

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Lowercase, trim and drop a leading honorific.
pub fn normalize_doctor_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    strip_title(&lower).trim().to_string()
}

fn strip_title(name: &str) -> &str {
    for title in TITLES {
        if let Some(rest) = strip_word(name, title) {
            let rest = rest.trim_start();
            if *title == "dott" {
                // dott.ssa, dott. ssa
                if let Some(after) = strip_word(rest, "ssa") {
                    return after.trim_start();
                }
            }
            return rest;
        }
    }
    name
}

/// `word` at the start of `text`, followed by a dot, whitespace or the end.
fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    if let Some(after_dot) = rest.strip_prefix('.') {
        return Some(after_dot);
    }
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn is_title(token: &str) -> bool {
    strip_title(token).is_empty()
}

/// Last token that is not an honorific.
fn surname(name: &str) -> Option<&str> {
    name.split_whitespace().filter(|t| !is_title(t)).last()
}

/// Flexible match between two normalized names.
///
/// Equal names match, as do names with the same surname or any shared token.
pub fn is_doctor_match(input: &str, known: &str) -> bool {
    if input.is_empty() || known.is_empty() {
        return false;
    }
    if input == known {
        return true;
    }
    if let (Some(a), Some(b)) = (surname(input), surname(known)) {
        if a == b {
            return true;
        }
    }
    input
        .split_whitespace()
        .any(|part| known.split_whitespace().any(|k| k == part))
}

/// Resolve a raw name to the master list entry it refers to.
pub fn match_doctor_name<'a>(raw: &str, known: &'a [String]) -> Result<&'a str, ValidationError> {
    let input = normalize_doctor_name(raw);

    if let Some(found) = known
        .iter()
        .find(|name| is_doctor_match(&input, &normalize_doctor_name(name)))
    {
        return Ok(found.as_str());
    }

    Err(ValidationError::UnknownDoctor {
        name: raw.trim().to_string(),
        suggestion: closest(&input, known),
    })
}

fn closest(input: &str, known: &[String]) -> Option<String> {
    if input.is_empty() {
        return None;
    }
    known
        .iter()
        .map(|name| (name, similarity(input, &normalize_doctor_name(name))))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name.clone())
}

/// Best score against the whole name or any single token of it.
fn similarity(input: &str, known: &str) -> f64 {
    known
        .split_whitespace()
        .map(|token| fuzzy_match(input, token))
        .fold(fuzzy_match(input, known), f64::max)
}

/// Jaro-Winkler weighted with normalized Levenshtein.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}

/// "mARIO  rossi" -> "Mario Rossi".
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
