//! Turning classifier replies into signal bundles
//!
//! The classifier is an external model: its reply may be bare JSON, JSON in a
//! markdown fence, JSON surrounded by prose, or nothing usable at all. Every
//! path here degrades to defaults instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{ActionLevel, DecisionLevel, EmailType, SignalBundle, Urgency};
use crate::utils::keywords::VAGUE_TASKS;
use crate::utils::text::{clean_sender_display, collapse_whitespace, truncate_chars};

static JSON_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("json fence regex"));
static ANY_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\s*(\{.*?\})\s*```").expect("fence regex"));

pub const MANDATORY_FALLBACK_TASK: &str = "Complete required action";
pub const DECISION_FALLBACK_TASK: &str = "Provide decision";

const MAX_SUMMARY_CHARS: usize = 300;
const MIN_SUMMARY_CHARS: usize = 30;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// Slice from the `{` at `start` to its matching `}`, skipping braces that
/// appear inside JSON strings.
fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort JSON object extraction from a classifier reply.
///
/// Tries, in order: the whole text, a ```` ```json ```` fence, any fence, and
/// every balanced `{...}` block. Returns an empty object when nothing parses
/// or when the reply is valid JSON but not an object.
pub fn safe_extract_json(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return empty_object();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return if value.is_object() { value } else { empty_object() };
    }

    for fence in [&*JSON_FENCE_RE, &*ANY_FENCE_RE] {
        let found = fence
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_object(m.as_str()));
        if let Some(value) = found {
            return value;
        }
    }

    trimmed
        .match_indices('{')
        .filter_map(|(start, _)| balanced_object(trimmed, start))
        .find_map(parse_object)
        .unwrap_or_else(empty_object)
}

/// Text around the email needed to repair a classifier summary.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub subject: &'a str,
    /// Sender line, `Name <address>`.
    pub sender: &'a str,
    pub body: &'a str,
}

/// Drops vague tasks and fills in a generic one when action is still due.
pub fn finalize_tasks(signals: &mut SignalBundle) {
    signals
        .actions
        .retain(|task| !VAGUE_TASKS.any_in(&task.to_lowercase()));

    if signals.actions.is_empty() {
        if signals.action_level == ActionLevel::Mandatory {
            signals.actions.push(MANDATORY_FALLBACK_TASK.to_string());
        } else if signals.decision_level == DecisionLevel::Required {
            signals.actions.push(DECISION_FALLBACK_TASK.to_string());
        }
    }
}

fn first_word(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("Unknown")
}

/// Replaces missing or useless summaries and appends training deadlines.
pub fn finalize_summary(signals: &mut SignalBundle, ctx: &ExtractionContext<'_>) {
    let summary = signals.summary.trim();
    if summary.is_empty()
        || summary == ctx.subject.trim()
        || summary.chars().count() < MIN_SUMMARY_CHARS
    {
        let preview = collapse_whitespace(truncate_chars(ctx.body, 300));
        signals.summary = format!(
            "Email from {} regarding {}. {}",
            first_word(ctx.sender),
            truncate_chars(ctx.subject, 60),
            truncate_chars(&preview, 150)
        )
        .trim_end()
        .to_string();
    }

    let is_training = ctx.subject.to_lowercase().contains("training")
        || ctx.sender.to_lowercase().contains("csod");
    if let (true, Some(deadline)) = (is_training, signals.deadline.as_deref()) {
        if !signals.summary.contains(deadline) {
            signals.summary = format!("{} Deadline: {}.", signals.summary, deadline);
        }
    }

    signals.summary = truncate_chars(&signals.summary, MAX_SUMMARY_CHARS).to_string();
}

/// Full reading of a structured classifier result.
pub fn signals_from_value(value: &Value, ctx: &ExtractionContext<'_>) -> SignalBundle {
    let mut signals = SignalBundle::from_value(value);
    finalize_tasks(&mut signals);
    finalize_summary(&mut signals, ctx);
    signals
}

/// Full reading of a raw classifier reply.
pub fn signals_from_reply(reply: &str, ctx: &ExtractionContext<'_>) -> SignalBundle {
    signals_from_value(&safe_extract_json(reply), ctx)
}

const NOTIFICATION_SENDERS: &[&str] = &["csod.com"];
const ACTION_SUBJECT_TERMS: &[&str] = &["action needed", "required"];
const MANDATORY_BODY_TERMS: &[&str] = &["must complete", "mandatory"];
const IMMEDIATE_SUBJECT_TERMS: &[&str] = &["urgent", "today"];

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}

/// Keyword-only bundle used when no classifier output is available.
pub fn heuristic_signals(
    subject: &str,
    sender_name: &str,
    sender_addr: &str,
    body: &str,
) -> SignalBundle {
    let subject_lower = subject.to_lowercase();
    let body_lower = body.to_lowercase();

    let email_type = if contains_any(&sender_addr.to_lowercase(), NOTIFICATION_SENDERS) {
        EmailType::NotificationSystem
    } else if contains_any(&subject_lower, ACTION_SUBJECT_TERMS) {
        EmailType::ActionRequest
    } else {
        EmailType::FyiInformational
    };

    let action_level = if contains_any(&body_lower, MANDATORY_BODY_TERMS) {
        ActionLevel::Mandatory
    } else {
        ActionLevel::None
    };

    let urgency = if contains_any(&subject_lower, IMMEDIATE_SUBJECT_TERMS) {
        Urgency::Immediate
    } else {
        Urgency::Low
    };

    let display = clean_sender_display(sender_name, sender_addr);
    let mut signals = SignalBundle {
        email_type,
        action_level,
        urgency,
        summary: format!("Email from {}: {}", first_word(&display), truncate_chars(subject, 50)),
        ..SignalBundle::default()
    };
    finalize_tasks(&mut signals);
    signals
}
