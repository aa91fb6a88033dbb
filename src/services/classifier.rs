//! Rule cascade from signals and score to a priority tier
//!
//! Rules are evaluated strictly in order and the first match wins. Security
//! verdicts come first and beat every override, including VIP senders and a
//! forced priority.

use tracing::debug;

use crate::models::{
    ActionLevel, EmailType, PriorityTier, SecurityFlags, SignalBundle, Urgency, UserConfig,
};
use crate::utils::keywords::{
    BENEFIT_TERMS, COLLABORATION_BRANDS, SHARING_TERMS, SPAM_INDICATORS, SUPPORT_PHRASES,
};
use crate::utils::text::{is_trusted_domain, sender_domain};

/// Score at or above which an email is High regardless of type.
pub const HIGH_SCORE_THRESHOLD: u8 = 75;
/// Score below which an email without actions is Low.
pub const LOW_SCORE_THRESHOLD: u8 = 30;

/// Everything one classification looks at.
#[derive(Debug, Clone, Copy)]
pub struct PriorityRequest<'a> {
    /// Sender line, ideally `Name <address>`.
    pub sender: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub signals: &'a SignalBundle,
    pub score: u8,
    pub user: &'a UserConfig,
    pub forced_priority: Option<PriorityTier>,
    pub security: SecurityFlags,
}

/// Which rule produced a tier; useful in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityRule {
    Security,
    VipSender,
    Forced,
    CorporateBenefit,
    SharingRequest,
    UrgentOrBlocking,
    HighScore,
    ApprovalOrDecision,
    MandatoryShortTerm,
    UrgentExternal,
    SupportRequest,
    HasActions,
    UntrustedSpam,
    LowScoreNoAction,
    LowUrgencyNoAction,
    Default,
}

#[derive(Debug, Clone, Default)]
pub struct PriorityClassifier {
    trusted_domains: Vec<String>,
}

impl PriorityClassifier {
    pub fn new(trusted_domains: Vec<String>) -> Self {
        Self { trusted_domains }
    }

    fn is_trusted(&self, sender: &str) -> bool {
        is_trusted_domain(&sender_domain(sender), &self.trusted_domains)
    }

    pub fn classify(&self, request: &PriorityRequest<'_>) -> PriorityTier {
        let (tier, rule) = self.evaluate(request);
        debug!("🎯 '{}' -> {} ({:?})", request.subject, tier, rule);
        tier
    }

    /// Tier plus the rule that decided it.
    pub fn evaluate(&self, request: &PriorityRequest<'_>) -> (PriorityTier, PriorityRule) {
        let signals = request.signals;
        let subject = request.subject.to_lowercase();
        let body = request.body.to_lowercase();
        let sender = request.sender.to_lowercase();
        let trusted = self.is_trusted(request.sender);

        if request.security.is_flagged() {
            return (PriorityTier::Low, PriorityRule::Security);
        }
        if request.user.is_vip_sender(request.sender) {
            return (PriorityTier::High, PriorityRule::VipSender);
        }
        if let Some(forced) = request.forced_priority {
            return (forced, PriorityRule::Forced);
        }
        if trusted && BENEFIT_TERMS.any_in(&subject) {
            return (PriorityTier::Medium, PriorityRule::CorporateBenefit);
        }
        if SHARING_TERMS.any_in(&subject) && COLLABORATION_BRANDS.any_in(&sender) {
            return (PriorityTier::High, PriorityRule::SharingRequest);
        }
        if signals.urgency == Urgency::Immediate || signals.blocks_others {
            return (PriorityTier::High, PriorityRule::UrgentOrBlocking);
        }
        if request.score >= HIGH_SCORE_THRESHOLD {
            return (PriorityTier::High, PriorityRule::HighScore);
        }
        if matches!(
            signals.email_type,
            EmailType::ApprovalRequest | EmailType::DecisionRequired
        ) {
            return (PriorityTier::High, PriorityRule::ApprovalOrDecision);
        }
        if signals.action_level == ActionLevel::Mandatory && signals.urgency == Urgency::ShortTerm {
            return (PriorityTier::High, PriorityRule::MandatoryShortTerm);
        }
        if signals.email_type == EmailType::ExternalRequest
            && matches!(signals.urgency, Urgency::Immediate | Urgency::ShortTerm)
        {
            return (PriorityTier::High, PriorityRule::UrgentExternal);
        }
        if SUPPORT_PHRASES.any_in(&body) {
            return (PriorityTier::Medium, PriorityRule::SupportRequest);
        }
        // Medium whatever the score.
        if signals.action_level.has_action() {
            return (PriorityTier::Medium, PriorityRule::HasActions);
        }
        if !trusted && SPAM_INDICATORS.any_in(&format!("{subject} {body}")) {
            return (PriorityTier::Low, PriorityRule::UntrustedSpam);
        }
        if request.score < LOW_SCORE_THRESHOLD && signals.action_level == ActionLevel::None {
            return (PriorityTier::Low, PriorityRule::LowScoreNoAction);
        }
        if signals.urgency == Urgency::Low && signals.action_level == ActionLevel::None {
            return (PriorityTier::Low, PriorityRule::LowUrgencyNoAction);
        }
        (PriorityTier::Medium, PriorityRule::Default)
    }
}
