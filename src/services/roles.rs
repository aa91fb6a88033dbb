//! Where the configured user sits in an email: sender, To or CC
//!
//! Emails where the user is only copied and never addressed by name lose
//! their tasks; someone else is expected to act on them.

use tracing::debug;

use crate::models::{ActionLevel, EmailType, SignalBundle, UserConfig};
use crate::utils::keywords::ACTION_VERBS;
use crate::utils::text::{extract_emails, fold_text};

pub const CC_SUMMARY_PREFIX: &str = "[CC - FYI]";
/// Maximum distance, in characters, between a name and the verb addressed to it.
const VERB_WINDOW: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRole {
    pub is_sender: bool,
    pub is_primary_recipient: bool,
    pub is_cc: bool,
    /// Folded forms of the user's name used for matching.
    pub variations: Vec<String>,
}

impl UserRole {
    pub fn is_cc_only(&self) -> bool {
        self.is_cc && !self.is_primary_recipient && !self.is_sender
    }
}

/// Folded name forms: each comma-separated part, each word of two or more
/// characters, then the full name. Duplicates and empties are dropped.
///
/// `"Pérez, Ana María"` gives `["perez", "ana maria", "ana", "maria", "perez, ana maria"]`.
pub fn name_variations(name: &str) -> Vec<String> {
    let mut variations: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !variations.contains(&candidate) {
            variations.push(candidate);
        }
    };

    for part in name.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        push(fold_text(part));
        for word in part.split_whitespace().map(fold_text) {
            if word.chars().count() >= 2 {
                push(word);
            }
        }
    }
    push(fold_text(name));
    variations
}

fn has_address(field: &str, email: &str) -> bool {
    extract_emails(field).iter().any(|found| found == email)
}

fn has_variation(field: &str, variations: &[String]) -> bool {
    let folded = fold_text(field);
    variations.iter().any(|v| folded.contains(v.as_str()))
}

/// Matches by address when the user's email is configured, by name otherwise.
pub fn identify_user_role(
    user: &UserConfig,
    from_name: &str,
    from_addr: &str,
    to: &str,
    cc: &str,
) -> UserRole {
    let variations = name_variations(&user.name);
    let email = user.email.trim().to_lowercase();

    let (is_sender, is_primary_recipient, is_cc) = if !email.is_empty() {
        (
            has_address(from_addr, &email),
            has_address(to, &email),
            has_address(cc, &email),
        )
    } else {
        (
            has_variation(from_name, &variations) || has_variation(from_addr, &variations),
            has_variation(to, &variations),
            has_variation(cc, &variations),
        )
    };

    UserRole {
        is_sender,
        is_primary_recipient,
        is_cc,
        variations,
    }
}

fn mention_patterns(variation: &str) -> Vec<String> {
    let mut patterns: Vec<String> = [
        "@{v}",
        "dear {v}",
        "hi {v}",
        "hola {v}",
        "{v}, please",
        "{v}, can you",
        "{v}, could you",
        "{v}, podrias",
        "{v}, necesitamos que",
        "{v} -",
        "cc: {v}",
        "{v},",
        "{v}:",
    ]
    .iter()
    .map(|template| template.replace("{v}", variation))
    .collect();
    if let Some(initial) = variation.chars().next() {
        patterns.push(format!("@{initial}"));
    }
    patterns
}

/// An action verb shortly after the first occurrence of the name.
fn verb_follows_name(body: &str, variation: &str) -> bool {
    let Some(name_pos) = body.find(variation) else {
        return false;
    };
    ACTION_VERBS.iter().any(|verb| {
        body[name_pos..]
            .find(verb)
            .map(|offset| body[name_pos..name_pos + offset].chars().count())
            .is_some_and(|distance| distance > 0 && distance < VERB_WINDOW)
    })
}

/// Whether the body addresses the user directly.
pub fn is_user_mentioned(body: &str, variations: &[String]) -> bool {
    let body = fold_text(body);
    variations.iter().filter(|v| !v.is_empty()).any(|variation| {
        verb_follows_name(&body, variation)
            || mention_patterns(variation)
                .iter()
                .any(|pattern| body.contains(pattern.as_str()))
    })
}

/// Turns a CC-only email with tasks into FYI unless the user is addressed.
///
/// Returns true when the bundle was changed.
pub fn apply_cc_downgrade(signals: &mut SignalBundle, role: &UserRole, main_body: &str) -> bool {
    if !role.is_cc_only() || signals.actions.is_empty() {
        return false;
    }
    if is_user_mentioned(main_body, &role.variations) {
        return false;
    }

    signals.actions.clear();
    signals.action_level = ActionLevel::None;
    if !matches!(
        signals.email_type,
        EmailType::FyiInformational | EmailType::NotificationSystem
    ) {
        signals.email_type = EmailType::FyiInformational;
    }
    signals.summary = format!("{CC_SUMMARY_PREFIX} {}", signals.summary);
    debug!("CC-only email downgraded to FYI");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> UserConfig {
        UserConfig {
            name: name.into(),
            email: email.into(),
            ..UserConfig::default()
        }
    }

    fn cc_role() -> UserRole {
        identify_user_role(
            &user("Pérez, Ana", ""),
            "Bob",
            "bob@corp.com",
            "team@corp.com",
            "Ana Perez <ana.perez@corp.com>",
        )
    }

    fn bundle_with_tasks() -> SignalBundle {
        SignalBundle {
            email_type: EmailType::ActionRequest,
            action_level: ActionLevel::Mandatory,
            actions: vec!["Send the deck".into()],
            summary: "Bob asks the team for the deck".into(),
            ..SignalBundle::default()
        }
    }

    #[test]
    fn test_name_variations() {
        assert_eq!(
            name_variations("Pérez, Ana María"),
            vec!["perez", "ana maria", "ana", "maria", "perez, ana maria"]
        );
        assert_eq!(name_variations("Li"), vec!["li"]);
        assert!(name_variations("  ").is_empty());
    }

    #[test]
    fn test_role_by_email() {
        let role = identify_user_role(
            &user("Ana", "Ana@Corp.com"),
            "Ana",
            "someone@corp.com",
            "x@corp.com; ana@corp.com",
            "",
        );
        assert!(!role.is_sender);
        assert!(role.is_primary_recipient);
        assert!(!role.is_cc);
    }

    #[test]
    fn test_role_by_name() {
        let role = cc_role();
        assert!(!role.is_sender);
        assert!(!role.is_primary_recipient);
        assert!(role.is_cc);
        assert!(role.is_cc_only());
    }

    #[test]
    fn test_unconfigured_user_matches_nothing() {
        let role = identify_user_role(&UserConfig::default(), "Bob", "bob@x.com", "a@x.com", "c@x.com");
        assert_eq!(role, UserRole::default());
    }

    #[test]
    fn test_mentions() {
        let variations = name_variations("Ana");
        assert!(is_user_mentioned("Hola Ana, ¿puedes mirarlo?", &variations));
        assert!(is_user_mentioned("Thanks all. Ána, please send it", &variations));
        assert!(is_user_mentioned("ana will review the numbers", &variations));
        assert!(!is_user_mentioned("The team will send the numbers", &variations));
        assert!(!is_user_mentioned("anything", &[]));
    }

    #[test]
    fn test_verb_must_follow_name_closely() {
        let variations = name_variations("Ana");
        let far = format!("ana {} review", "x".repeat(60));
        assert!(!is_user_mentioned(&far, &variations));
        // verb before the name does not count
        assert!(!is_user_mentioned("review done by ana", &variations));
    }

    #[test]
    fn test_cc_downgrade() {
        let mut signals = bundle_with_tasks();
        assert!(apply_cc_downgrade(&mut signals, &cc_role(), "Team, send the deck by Friday"));
        assert!(signals.actions.is_empty());
        assert_eq!(signals.action_level, ActionLevel::None);
        assert_eq!(signals.email_type, EmailType::FyiInformational);
        assert_eq!(signals.summary, "[CC - FYI] Bob asks the team for the deck");
    }

    #[test]
    fn test_cc_downgrade_skipped() {
        let role = cc_role();

        let mut mentioned = bundle_with_tasks();
        assert!(!apply_cc_downgrade(&mut mentioned, &role, "Hi Ana, send the deck"));
        assert_eq!(mentioned, bundle_with_tasks());

        let mut no_tasks = SignalBundle::default();
        assert!(!apply_cc_downgrade(&mut no_tasks, &role, "FYI"));

        let mut notification = SignalBundle {
            email_type: EmailType::NotificationSystem,
            ..bundle_with_tasks()
        };
        assert!(apply_cc_downgrade(&mut notification, &role, "Reminder for the team"));
        assert_eq!(notification.email_type, EmailType::NotificationSystem);

        let direct = UserRole {
            is_primary_recipient: true,
            ..role
        };
        let mut addressed = bundle_with_tasks();
        assert!(!apply_cc_downgrade(&mut addressed, &direct, "Team, send it"));
    }
}
