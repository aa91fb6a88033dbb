//! Canonical comparison keys for project names
//!
//! Builds on [`crate::normalize`] with two extra passes over the folded key:
//! generic head tokens (plus the stop-words that follow them) and generic tail
//! tokens are dropped, so "Implementation of the Alpha" and "Alpha impl" both
//! compare as "alpha".

use crate::normalize::{display_form, has_project_prefix, normalize_key};

/// Words that describe the kind of work rather than the project itself.
const GENERIC_HEAD_TOKENS: &[&str] = &["implementation", "implementacion", "impl"];
const GENERIC_TAIL_TOKENS: &[&str] = &["implementation", "implementacion", "impl"];

/// Articles and conjunctions that may follow a generic head token.
const STOPWORDS: &[&str] = &["de", "del", "la", "el", "los", "las", "of", "the", "and", "y"];

/// Drops generic leading tokens and the stop-words right after each of them.
pub fn strip_generic_head(key: &str) -> String {
    let tokens: Vec<&str> = key.split_whitespace().collect();

    let mut start = 0;
    while start < tokens.len() && GENERIC_HEAD_TOKENS.contains(&tokens[start]) {
        start += 1;
        while start < tokens.len() && STOPWORDS.contains(&tokens[start]) {
            start += 1;
        }
    }

    tokens[start..].join(" ")
}

/// Drops generic trailing tokens.
pub fn strip_generic_tail(key: &str) -> String {
    let mut tokens: Vec<&str> = key.split_whitespace().collect();
    while tokens
        .last()
        .is_some_and(|last| GENERIC_TAIL_TOKENS.contains(last))
    {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Key used on both sides of every similarity comparison.
///
/// ```
/// use unify::norm_key;
///
/// assert_eq!(norm_key("Implementación de la Plataforma CRM"), "plataforma crm");
/// assert_eq!(norm_key("Proyecto Alpha Implementation"), "alpha");
/// ```
pub fn norm_key(s: &str) -> String {
    strip_generic_tail(&strip_generic_head(&normalize_key(s)))
}

/// True for short all-caps acronyms ("CRM", "BI", "X").
///
/// The check runs on the display form, so "Proyecto SAP" counts as "SAP".
pub fn is_abbreviation(raw: &str) -> bool {
    let display = display_form(raw);
    let len = display.chars().count();

    (1..=3).contains(&len)
        && display.chars().all(char::is_alphabetic)
        && display.chars().any(char::is_uppercase)
        && !display.chars().any(char::is_lowercase)
}

/// Every derived form of one raw name, computed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameForm {
    /// Trimmed raw observation.
    pub raw: String,
    /// Folded key before generic-token stripping.
    pub raw_key: String,
    /// Comparison key ([`norm_key`]).
    pub key: String,
    /// Human readable label ([`display_form`]).
    pub display: String,
    pub is_abbreviation: bool,
    pub has_prefix: bool,
}

impl NameForm {
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let raw_key = normalize_key(&raw);
        let key = strip_generic_tail(&strip_generic_head(&raw_key));

        Self {
            display: display_form(&raw),
            is_abbreviation: is_abbreviation(&raw),
            has_prefix: has_project_prefix(&raw),
            raw_key,
            key,
            raw,
        }
    }

    /// True when a generic tail token ("implementation") was part of the name.
    pub fn has_generic_tail(&self) -> bool {
        if self.raw_key.is_empty() {
            return false;
        }
        let stripped = strip_generic_tail(&self.raw_key);
        !stripped.is_empty() && stripped != self.raw_key
    }
}
