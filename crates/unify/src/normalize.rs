//! Text folding for name comparison
//!
//! Two views of the same raw string:
//! - [`normalize_key`]: lower-case ASCII-ish key used only for comparisons
//! - [`display_form`]: human readable label (case and punctuation kept)

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Leading "project" word in the languages the mailboxes are written in.
static PROJECT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(proyecto|project|proj\.?|proy\.?)\s+").expect("project prefix regex")
});

/// Same prefix words once punctuation has been folded away.
const PREFIX_TOKENS: &[&str] = &["proyecto", "project", "proj", "proy"];

/// Returns true when the (trimmed) raw string starts with a project prefix.
pub fn has_project_prefix(raw: &str) -> bool {
    PROJECT_PREFIX.is_match(raw.trim())
}

/// Removes every leading project prefix ("Project Proyecto X" -> "X").
///
/// The prefix regex requires trailing whitespace plus content, so a bare
/// "Project" is left alone.
pub fn strip_project_prefix(s: &str) -> &str {
    let mut rest = s.trim();
    while let Some(m) = PROJECT_PREFIX.find(rest) {
        rest = rest[m.end()..].trim_start();
    }
    rest
}

/// Folds a name into its comparison key.
///
/// - trims and strips the project prefix
/// - lower-cases and removes accents (NFKD, combining marks dropped)
/// - every run of characters outside `[a-z0-9]` becomes a single space
/// - collapses whitespace
///
/// Idempotent: `normalize_key(&normalize_key(s)) == normalize_key(s)`.
///
/// # Examples
///
/// ```
/// use unify::normalize_key;
///
/// assert_eq!(normalize_key("  Proyecto   Zeta-2! "), "zeta 2");
/// assert_eq!(normalize_key("Migración Ñandú"), "migracion nandu");
/// assert_eq!(normalize_key(""), "");
/// ```
pub fn normalize_key(s: &str) -> String {
    let unprefixed = strip_project_prefix(s);
    if unprefixed.is_empty() {
        return String::new();
    }

    let folded: String = unprefixed
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut tokens: Vec<&str> = folded.split_whitespace().collect();

    // Accented or punctuated prefixes ("Próyecto: X") only surface after folding.
    while tokens.len() > 1 && PREFIX_TOKENS.contains(&tokens[0]) {
        tokens.remove(0);
    }

    tokens.join(" ")
}

/// Human readable label: prefix removed, whitespace collapsed, case kept.
///
/// ```
/// use unify::display_form;
///
/// assert_eq!(display_form("  Project   Data  Lake "), "Data Lake");
/// assert_eq!(display_form("SAP-IBP"), "SAP-IBP");
/// ```
pub fn display_form(s: &str) -> String {
    strip_project_prefix(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_folding() {
        assert_eq!(normalize_key("Café & Cia"), "cafe cia");
        assert_eq!(normalize_key("  Anne   Souza  "), "anne souza");
        assert_eq!(normalize_key("Müller & Co."), "muller co");
        assert_eq!(normalize_key("François"), "francois");
        assert_eq!(normalize_key("123 ABC"), "123 abc");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn test_normalize_key_strips_prefix() {
        assert_eq!(normalize_key("Proyecto Alpha"), "alpha");
        assert_eq!(normalize_key("proj. Beta"), "beta");
        assert_eq!(normalize_key("PROY. gamma"), "gamma");
        assert_eq!(normalize_key("Project Project Delta"), "delta");
        assert_eq!(normalize_key("Próyecto: Omega"), "omega");
        // a lone prefix word is a name on its own
        assert_eq!(normalize_key("Project"), "project");
    }

    #[test]
    fn test_normalize_key_numbers_are_preserved() {
        let key = normalize_key("  Proyecto   Zeta-2! ");
        assert_eq!(key, normalize_key("ZETA 2"));
        assert_eq!(key, normalize_key("zeta 2"));
        assert_ne!(key, normalize_key("zeta"));
    }

    #[test]
    fn test_normalize_key_idempotent() {
        let samples = [
            "  Proyecto   Zeta-2! ",
            "Project-X",
            "Próyecto Ártico",
            "proj.proj. Weird",
            "Implementación de la Plataforma",
            "ℌello wörld",
            "",
            "!!!",
        ];
        for s in samples {
            let once = normalize_key(s);
            assert_eq!(normalize_key(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_display_form() {
        assert_eq!(display_form("Proyecto   Alpha"), "Alpha");
        assert_eq!(display_form("proj.   SAP  IBP "), "SAP IBP");
        assert_eq!(display_form("Alpha Implementation"), "Alpha Implementation");
        assert_eq!(display_form("Project"), "Project");
        assert_eq!(display_form(""), "");
    }

    #[test]
    fn test_has_project_prefix() {
        assert!(has_project_prefix("  Proyecto Alpha"));
        assert!(has_project_prefix("proj. alpha"));
        assert!(!has_project_prefix("Projection Report"));
        assert!(!has_project_prefix("Project"));
    }
}
