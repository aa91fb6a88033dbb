//! Text helpers for raw email fields
//!
//! Cleaning (zero-width characters, URLs, HTML), reply/signature trimming and
//! small address utilities. Everything here is total: garbage in, empty or
//! default out.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("html tag regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("email regex")
});
static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9.-]+\.[A-Za-z]{2,})").expect("domain regex"));
static LOCAL_PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^<\s]+)@([^>\s]+)").expect("local part regex"));

const ZERO_WIDTH: &[char] = &['\u{200c}', '\u{200b}', '\u{feff}'];

/// Reply/forward markers; the main body ends at the earliest one.
const REPLY_MARKERS: &[&str] = &[
    "-----original message-----",
    "from:",
    "de:",
    "enviado:",
    "sent:",
    "______________________________",
    ">>>>>",
];

const SIGNATURE_MARKERS: &[&str] = &[
    "unsubscribe",
    "confidential",
    "aviso de confidencialidad",
    "best regards",
    "kind regards",
    "saludos",
    "atentamente",
];

/// Subjects that need the previous message in the thread kept as context.
const CONTEXT_SUBJECT_TERMS: &[&str] = &[
    "action needed",
    "approval",
    "endorsement",
    "review required",
];

const MIN_REPLY_CUT: usize = 50;
const MIN_SIGNATURE_CUT: usize = 200;

/// Collapses every whitespace run into a single space and trims.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps at most `max_chars` characters without splitting one.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Lower-case, accent-free, whitespace-collapsed text for keyword scans.
///
/// ```
/// use email_triage::utils::text::fold_text;
///
/// assert_eq!(fold_text("  José   GARCÍA "), "jose garcia");
/// ```
pub fn fold_text(s: &str) -> String {
    let folded: String = s
        .trim()
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    collapse_whitespace(&folded)
}

/// Cleans a raw header or body value.
///
/// Zero-width characters become spaces, links become `[URL]`, HTML tags are
/// removed and the result is truncated to `max_chars` characters.
pub fn normalize_text(raw: &str, max_chars: usize) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if ZERO_WIDTH.contains(&c) { ' ' } else { c })
        .collect();
    let without_urls = URL_RE.replace_all(&spaced, "[URL]");
    let without_tags = TAG_RE.replace_all(&without_urls, " ");
    let collapsed = collapse_whitespace(&without_tags);
    truncate_chars(&collapsed, max_chars).to_string()
}

/// Lower-cases char by char so character offsets line up with the original.
fn lower_aligned(text: &str) -> String {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Character offset of `needle` in `haystack`, starting at character `from`.
fn find_char_offset(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let start = haystack
        .char_indices()
        .nth(from)
        .map(|(byte, _)| byte)
        .unwrap_or(haystack.len());
    haystack[start..]
        .find(needle)
        .map(|byte| from + haystack[start..start + byte].chars().count())
}

fn cut_at_char(text: &str, offset: usize) -> &str {
    truncate_chars(text, offset)
}

/// Main message of an email: quoted replies and signatures removed.
///
/// The body is cut at the earliest reply marker when it lies more than 50
/// characters in. When the subject asks for approval or review, the cut moves
/// to the earliest second occurrence of a marker so the quoted request stays
/// visible. A signature marker found past 200 characters ends the text.
pub fn extract_main(text: &str, subject: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lower = lower_aligned(text);
    let subject_lower = subject.to_lowercase();
    let preserve_context = CONTEXT_SUBJECT_TERMS
        .iter()
        .any(|term| subject_lower.contains(term));

    let first_cut = REPLY_MARKERS
        .iter()
        .filter_map(|marker| find_char_offset(&lower, marker, 0))
        .min();

    let mut cut = first_cut;
    if let (true, Some(first)) = (preserve_context, first_cut) {
        let second_cut = REPLY_MARKERS
            .iter()
            .filter_map(|marker| {
                let first_hit = find_char_offset(&lower, marker, 0)?;
                find_char_offset(&lower, marker, first_hit + 1)
            })
            .min();
        if let Some(second) = second_cut.filter(|second| *second > first) {
            cut = Some(second);
        }
    }

    let mut main = match cut {
        Some(offset) if offset > MIN_REPLY_CUT => cut_at_char(text, offset),
        _ => text,
    };

    for marker in SIGNATURE_MARKERS {
        if let Some(pos) = find_char_offset(&lower, marker, 0) {
            if pos > MIN_SIGNATURE_CUT {
                main = cut_at_char(main, pos);
                break;
            }
        }
    }

    collapse_whitespace(main)
}

/// Domain of the first address in `addr`, lower-cased; empty when none.
pub fn sender_domain(addr: &str) -> String {
    DOMAIN_RE
        .captures(addr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default()
}

/// True when `domain` is one of `trusted` or a subdomain of one.
pub fn is_trusted_domain(domain: &str, trusted: &[String]) -> bool {
    if domain.is_empty() {
        return false;
    }
    let domain = domain.to_lowercase();
    trusted.iter().any(|entry| {
        let entry = entry.trim().to_lowercase();
        !entry.is_empty() && (domain == entry || domain.ends_with(&format!(".{entry}")))
    })
}

/// Every address found in `s`, lower-cased, in order of appearance.
pub fn extract_emails(s: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(s)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Display name for a sender: the name if present, else the address local part.
pub fn clean_sender_display(name: &str, addr: &str) -> String {
    let name = name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    LOCAL_PART_RE
        .captures(addr.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Number of `;`-separated entries across To, Cc and Bcc.
pub fn count_recipients(to: &str, cc: &str, bcc: &str) -> usize {
    [to, cc, bcc]
        .iter()
        .filter(|field| !field.trim().is_empty() && !field.trim().eq_ignore_ascii_case("nan"))
        .map(|field| field.split(';').filter(|x| !x.trim().is_empty()).count())
        .sum()
}

/// Maps localized importance headers onto "high" / "normal".
pub fn normalize_importance(raw: &str) -> String {
    let value = raw.trim().to_lowercase();
    match value.as_str() {
        "high" | "importante" | "alta" => "high".to_string(),
        "" | "normal" => "normal".to_string(),
        _ => value,
    }
}
