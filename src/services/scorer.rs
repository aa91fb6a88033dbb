//! Numeric urgency score (0-100) for one email
//!
//! Starts from 50 and adds independent adjustments; only the final clamp
//! depends on order. The current instant is the sole input besides the
//! signals, so [`score_at`] is the deterministic form used by tests and the
//! batch pipeline.

use chrono::{Local, NaiveDateTime};
use tracing::trace;

use crate::models::{ActionLevel, DecisionLevel, EmailType, SignalBundle, Urgency};
use crate::utils::keywords::{
    CLOSURE_TERMS, HIGH_PRIORITY_MARKERS, MARKETING_TRIGGERS, SCORE_SPAM_TERMS,
};

pub const BASE_SCORE: i32 = 50;
pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

const FLAG_WEIGHT: i32 = 20;
const SPAM_PENALTY: i32 = -30;
const MARKETING_PENALTY: i32 = -15;
const CLOSURE_PENALTY: i32 = -20;
const MARKETING_URGENCY_PENALTY: i32 = -10;
const BLOCKS_OTHERS_WEIGHT: i32 = 25;
const DECISION_PENDING_WEIGHT: i32 = 15;
/// System notifications that demand mandatory action.
const MANDATORY_NOTIFICATION_WEIGHT: i32 = 15;

fn type_weight(email_type: EmailType, action_level: ActionLevel) -> i32 {
    match (email_type, action_level) {
        (EmailType::NotificationSystem, ActionLevel::Mandatory) => MANDATORY_NOTIFICATION_WEIGHT,
        (EmailType::ApprovalRequest | EmailType::DecisionRequired, _) => 25,
        (EmailType::ExternalRequest, _) => 20,
        (EmailType::ActionRequest, _) => 15,
        (EmailType::Meeting, _) => 10,
        (EmailType::ReportUpdate, _) => 5,
        (EmailType::FyiInformational, _) => 0,
        (EmailType::NotificationSystem, _) => -15,
    }
}

fn action_weight(level: ActionLevel) -> i32 {
    match level {
        ActionLevel::Mandatory => 20,
        ActionLevel::Optional => 10,
        ActionLevel::None => 0,
    }
}

fn decision_weight(level: DecisionLevel) -> i32 {
    match level {
        DecisionLevel::Required => 20,
        DecisionLevel::Optional => 10,
        DecisionLevel::None => 0,
    }
}

fn urgency_weight(urgency: Urgency, marketing: bool) -> i32 {
    if marketing {
        return match urgency {
            Urgency::Immediate | Urgency::ShortTerm => MARKETING_URGENCY_PENALTY,
            _ => 0,
        };
    }
    match urgency {
        Urgency::Immediate => 30,
        Urgency::ShortTerm => 20,
        Urgency::MediumTerm => 10,
        Urgency::Low => -5,
    }
}

/// Bonus for a close deadline; days are whole days left, rounded down.
fn deadline_weight(days_left: i64, action_level: ActionLevel) -> i32 {
    match action_level {
        ActionLevel::Mandatory if days_left < 1 => 30,
        ActionLevel::Mandatory if days_left < 3 => 20,
        ActionLevel::Mandatory if days_left < 7 => 10,
        ActionLevel::Optional if days_left < 1 => 10,
        _ => 0,
    }
}

/// Score relative to the current local time.
pub fn score(signals: &SignalBundle, importance: &str, subject: &str) -> u8 {
    score_at(signals, importance, subject, Local::now().naive_local())
}

/// Score relative to `now`.
///
/// `importance` is the normalized header value ("high" counts). Unparseable
/// deadlines are skipped silently.
pub fn score_at(
    signals: &SignalBundle,
    importance: &str,
    subject: &str,
    now: NaiveDateTime,
) -> u8 {
    let raw = raw_score(signals, importance, subject, now);
    let clamped = raw.clamp(MIN_SCORE, MAX_SCORE);
    trace!("Score {} (raw {}) for '{}'", clamped, raw, subject);
    u8::try_from(clamped).unwrap_or_default()
}

/// Sum of all adjustments before clamping; may leave 0..=100.
pub(crate) fn raw_score(
    signals: &SignalBundle,
    importance: &str,
    subject: &str,
    now: NaiveDateTime,
) -> i32 {
    let mut score = BASE_SCORE;
    let subject_lower = subject.to_lowercase();

    if HIGH_PRIORITY_MARKERS
        .iter()
        .any(|marker| subject_lower.contains(marker))
    {
        score += FLAG_WEIGHT;
    }
    if importance.trim().eq_ignore_ascii_case("high") {
        score += FLAG_WEIGHT;
    }

    score += type_weight(signals.email_type, signals.action_level);

    let summary = signals.summary.to_lowercase();
    let project = signals.project.as_deref().unwrap_or_default().to_lowercase();
    let context = format!("{subject_lower} {summary} {project}");

    if SCORE_SPAM_TERMS.any_in(&context) {
        score += SPAM_PENALTY;
    }
    let marketing = MARKETING_TRIGGERS.any_in(&context);
    if marketing {
        score += MARKETING_PENALTY;
    }
    if CLOSURE_TERMS.any_in(&summary) {
        score += CLOSURE_PENALTY;
    }

    score += action_weight(signals.action_level);
    score += decision_weight(signals.decision_level);
    score += urgency_weight(signals.urgency, marketing);

    if signals.blocks_others {
        score += BLOCKS_OTHERS_WEIGHT;
    }
    if signals.decision_pending {
        score += DECISION_PENDING_WEIGHT;
    }

    if !marketing {
        if let Some(deadline) = signals.deadline_at() {
            let days_left = (deadline - now).num_days();
            score += deadline_weight(days_left, signals.action_level);
        }
    }

    score
}
