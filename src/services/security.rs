//! Phishing and spam heuristics
//!
//! Keyword scores over the cleaned subject, body and sender. Trusted domains
//! and whitelist keywords always win over the heuristics, and verdicts
//! supplied with the email replace the computed ones.

use crate::models::{EmailRecord, SecurityFlags};
use crate::utils::keywords::{
    GIFT_TERMS, OFFER_TERMS, PHISHING_SPAM_TERMS, PHISHING_TERMS, SPAM_MARKERS, SPAM_SENDERS,
    TRAINING_TERMS, TRAVEL_TERMS, URGENCY_TERMS, WORK_TOOLS,
};
use crate::utils::logging::log_security_flagged;
use crate::utils::text::{is_trusted_domain, sender_domain, truncate_chars};

pub const MAX_PHISHING_SCORE: u8 = 20;
const PHISHING_THRESHOLD: u8 = 10;
const UNTRUSTED_PHISHING_THRESHOLD: u8 = 7;
const LONG_LOCAL_PART: usize = 20;
/// Characters of body scanned for whitelist keywords.
const WHITELIST_BODY_CHARS: usize = 500;
const URL_PLACEHOLDER: &str = "[url]";

/// Risk score in `0..=20`; higher is more suspicious.
pub fn phishing_score(subject: &str, body: &str, sender_addr: &str) -> u8 {
    let text = format!("{subject} {body} {sender_addr}").to_lowercase();
    let mut score = 0u8;

    if PHISHING_TERMS.any_in(&text) {
        score += 3;
    }
    if PHISHING_SPAM_TERMS.any_in(&text) {
        score += 2;
    }

    score += match URGENCY_TERMS.distinct_in(&text) {
        0 => 0,
        1 => 1,
        _ => 3,
    };

    score += match text.matches(URL_PLACEHOLDER).count() {
        n if n >= 5 => 4,
        n if n >= 3 => 3,
        _ => 0,
    };

    if let Some((local, _)) = sender_addr.split_once('@') {
        if local.chars().count() > LONG_LOCAL_PART {
            score += 1;
        }
    }

    score.min(MAX_PHISHING_SCORE)
}

/// Security verdicts for cleaned email fields.
#[derive(Debug, Clone)]
pub struct SecurityScreen {
    trusted_domains: Vec<String>,
    whitelist_keywords: Vec<String>,
}

impl SecurityScreen {
    pub fn new(trusted_domains: Vec<String>, whitelist_keywords: Vec<String>) -> Self {
        let whitelist_keywords = whitelist_keywords
            .into_iter()
            .map(|kw| kw.trim().to_lowercase())
            .filter(|kw| !kw.is_empty())
            .collect();
        Self {
            trusted_domains,
            whitelist_keywords,
        }
    }

    pub fn is_trusted(&self, sender_addr: &str) -> bool {
        is_trusted_domain(&sender_domain(sender_addr), &self.trusted_domains)
    }

    pub fn is_phishing(&self, subject: &str, body: &str, sender_addr: &str) -> bool {
        let score = phishing_score(subject, body, sender_addr);
        if score >= PHISHING_THRESHOLD {
            return true;
        }
        let domain = sender_domain(sender_addr);
        score >= UNTRUSTED_PHISHING_THRESHOLD
            && !domain.is_empty()
            && !is_trusted_domain(&domain, &self.trusted_domains)
    }

    pub fn is_spam(&self, subject: &str, body: &str, sender_addr: &str) -> bool {
        if self.is_trusted(sender_addr) {
            return false;
        }

        let text = format!("{subject} {body}").to_lowercase();
        let sender = sender_addr.to_lowercase();

        if SPAM_SENDERS.any_in(&sender) || GIFT_TERMS.any_in(&text) {
            return true;
        }

        // Work tools, travel bookings and internal digests are never spam.
        if WORK_TOOLS.any_in(&sender) || WORK_TOOLS.any_in(&text) || TRAVEL_TERMS.any_in(&text) {
            return false;
        }
        if sender.contains("sandoz") && (text.contains("digest") || text.contains("newsletter")) {
            return false;
        }

        let marketing_training = TRAINING_TERMS.any_in(&text)
            && OFFER_TERMS.any_in(&text)
            && !sender.contains("csod.com");
        if marketing_training {
            return true;
        }

        text.matches("unsubscribe").count() >= 2 || SPAM_MARKERS.distinct_in(&text) >= 2
    }

    /// Trusted sender, or a whitelist keyword in subject, sender or body start.
    pub fn is_whitelisted(
        &self,
        subject: &str,
        from_name: &str,
        from_addr: &str,
        body: &str,
    ) -> bool {
        if self.is_trusted(from_addr) {
            return true;
        }
        let text = format!(
            "{subject} {from_name} {from_addr} {}",
            truncate_chars(body, WHITELIST_BODY_CHARS)
        )
        .to_lowercase();
        self.whitelist_keywords.iter().any(|kw| text.contains(kw.as_str()))
    }

    /// Final flags for an email whose text fields are already cleaned.
    ///
    /// Heuristics first, then verdicts carried by the record, then the
    /// whitelist, which clears both flags.
    pub fn assess(&self, email: &EmailRecord) -> SecurityFlags {
        let mut flags = SecurityFlags {
            is_phishing: email
                .is_phishing
                .unwrap_or_else(|| self.is_phishing(&email.subject, &email.body, &email.from_addr)),
            is_spam: email
                .is_spam
                .unwrap_or_else(|| self.is_spam(&email.subject, &email.body, &email.from_addr)),
        };

        if flags.is_flagged()
            && self.is_whitelisted(&email.subject, &email.from_name, &email.from_addr, &email.body)
        {
            flags = SecurityFlags::default();
        }

        if flags.is_flagged() {
            log_security_flagged(&email.subject, flags.is_phishing, flags.is_spam);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> SecurityScreen {
        SecurityScreen::new(
            vec!["sandoz.com".into(), "csod.com".into()],
            vec!["Quip Digest".into(), "flight".into(), "".into()],
        )
    }

    fn record(subject: &str, body: &str, from_addr: &str) -> EmailRecord {
        EmailRecord {
            subject: subject.into(),
            body: body.into(),
            from_addr: from_addr.into(),
            ..EmailRecord::default()
        }
    }

    #[test]
    fn test_phishing_score_components() {
        assert_eq!(phishing_score("Lunch", "See you at noon", "ana@corp.com"), 0);
        // phishing keyword only
        assert_eq!(phishing_score("Reset your password", "", "it@corp.com"), 3);
        // phishing +3, urgency x2 +3
        assert_eq!(phishing_score("URGENT: verify now", "act immediately", "x@y.com"), 6);
        // link-heavy body
        let links = "[URL] ".repeat(5);
        assert_eq!(phishing_score("hi", &links, "x@y.com"), 4);
        let long_local = format!("{}@y.com", "a".repeat(21));
        assert_eq!(phishing_score("hi", "", &long_local), 1);
    }

    #[test]
    fn test_phishing_score_is_capped() {
        let body = format!(
            "verify your password, you have won! urgent asap immediately critical {}",
            "[URL] ".repeat(6)
        );
        let sender = format!("{}@scam.biz", "z".repeat(30));
        assert!(phishing_score("act now", &body, &sender) <= MAX_PHISHING_SCORE);
        assert_eq!(phishing_score("act now", &body, &sender), 13);
    }

    #[test]
    fn test_is_phishing_thresholds() {
        let s = screen();
        // score 9 from an unknown domain
        let subject = "Urgent: verify your account";
        let body = "Act immediately [URL] [URL] [URL]";
        assert_eq!(phishing_score(subject, body, "sec@bank-alerts.biz"), 9);
        assert!(s.is_phishing(subject, body, "sec@bank-alerts.biz"));
        // same text from a trusted domain stays below 10
        assert!(!s.is_phishing(subject, body, "it@sandoz.com"));
        assert!(!s.is_phishing("Lunch", "", "ana@corp.com"));
    }

    #[test]
    fn test_is_spam_rules() {
        let s = screen();
        assert!(!s.is_spam("Newsletter unsubscribe", "unsubscribe", "news@sandoz.com"));
        assert!(s.is_spam("Hello", "", "noreply@shop.biz"));
        assert!(s.is_spam("Tu regalo te espera", "", "ventas@shop.biz"));
        assert!(!s.is_spam("Jira ticket assigned", "newsletter promotional", "bot@tools.io"));
        assert!(!s.is_spam("Tu vuelo a Madrid", "unsubscribe unsubscribe", "info@air.biz"));
        assert!(s.is_spam("Curso gratis de Excel", "", "info@academy.biz"));
        assert!(s.is_spam("Offers", "marketing and promotional content", "info@shop.biz"));
        assert!(s.is_spam("Offers", "unsubscribe here or unsubscribe there", "info@shop.biz"));
        assert!(!s.is_spam("Quarterly plan", "Please review", "boss@partner.biz"));
    }

    #[test]
    fn test_whitelist() {
        let s = screen();
        assert!(s.is_whitelisted("Hi", "", "ana@mail.sandoz.com", ""));
        assert!(s.is_whitelisted("Your QUIP digest", "", "x@y.biz", ""));
        assert!(s.is_whitelisted("Booking", "", "x@y.biz", "Your flight leaves at 9"));
        let far = format!("{} flight", "z".repeat(600));
        assert!(!s.is_whitelisted("Booking", "", "x@y.biz", &far));
    }

    #[test]
    fn test_assess_explicit_flags_and_whitelist() {
        let s = screen();

        let flagged = record("Hello", "", "noreply@shop.biz");
        assert_eq!(
            s.assess(&flagged),
            SecurityFlags { is_phishing: false, is_spam: true }
        );

        let explicit = EmailRecord {
            is_phishing: Some(true),
            is_spam: Some(false),
            ..flagged.clone()
        };
        assert_eq!(
            s.assess(&explicit),
            SecurityFlags { is_phishing: true, is_spam: false }
        );

        let whitelisted = EmailRecord {
            is_phishing: Some(true),
            ..record("Quip digest for you", "", "noreply@shop.biz")
        };
        assert!(!s.assess(&whitelisted).is_flagged());
    }
}
