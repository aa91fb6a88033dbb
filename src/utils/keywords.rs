//! Keyword tables shared by the scorer, classifier and security heuristics
//!
//! Every table is compiled once into an Aho-Corasick automaton. Haystacks are
//! expected to be lower-cased by the caller.

use std::collections::HashSet;

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

/// A fixed list of lower-case terms matched as plain substrings.
pub struct KeywordSet {
    matcher: AhoCorasick,
}

impl KeywordSet {
    pub fn new(terms: &[&str]) -> Self {
        let matcher = AhoCorasick::new(terms).expect("keyword table");
        Self { matcher }
    }

    /// True when any term occurs in `text`.
    pub fn any_in(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Number of distinct terms occurring in `text`.
    pub fn distinct_in(&self, text: &str) -> usize {
        self.matcher
            .find_overlapping_iter(text)
            .map(|m| m.pattern())
            .collect::<HashSet<_>>()
            .len()
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

pub static SCORE_SPAM_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "newsletter",
        "promotional",
        "black friday",
        "sale",
        "unsubscribe",
        "club novartis",
    ])
});

/// Promotional wording that also switches off urgency bonuses.
pub static MARKETING_TRIGGERS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "trial",
        "free access",
        "survey",
        "encuesta",
        "webinar",
        "demo",
        "easyvideo",
        "trail",
    ])
});

pub static CLOSURE_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "confirmed completion",
        "task completed",
        "no action",
        "thanks",
        "got it",
        "acknowledged",
    ])
});

pub const HIGH_PRIORITY_MARKERS: &[&str] = &["[high priority]", "[urgent]"];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

pub static BENEFIT_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["cesta navidad", "lote navidad", "obsequio empresa", "bonus letter"])
});

pub static SHARING_TERMS: Lazy<KeywordSet> =
    Lazy::new(|| KeywordSet::new(&["wants to share", "requested access", "sharing request"]));

pub static COLLABORATION_BRANDS: Lazy<KeywordSet> =
    Lazy::new(|| KeywordSet::new(&["sharepoint", "confluence"]));

pub static SUPPORT_PHRASES: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "dare asking",
        "need your support",
        "asking for your support",
        "need your help",
        "can you help",
        "asking for your help",
        "appreciate your support",
        "is there a way",
        "is there an easy way",
        "mentioned you",
    ])
});

pub static SPAM_INDICATORS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["newsletter", "promotional", "unsubscribe", "black friday", "sale"])
});

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

pub static PHISHING_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "verify",
        "verification",
        "password",
        "contraseña",
        "reset",
        "restablecer",
        "account locked",
        "suspended",
        "unusual activity",
        "click here",
        "invoice",
        "factura",
        "payment",
        "wire transfer",
        "gift card",
        "crypto",
        "confirm identity",
        "act now",
    ])
});

pub static PHISHING_SPAM_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "unsubscribe",
        "you have won",
        "congratulations",
        "buy now",
        "free money",
    ])
});

pub static URGENCY_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["urgent", "urgente", "asap", "immediately", "critical", "act now"])
});

pub static SPAM_SENDERS: Lazy<KeywordSet> =
    Lazy::new(|| KeywordSet::new(&["regaloresponsable", "noreply", "no-reply", "newsletter"]));

pub static GIFT_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["cesta navidad", "obsequio", "regalo", "gift card", "lotes navidad"])
});

pub static WORK_TOOLS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "quip",
        "jira",
        "confluence",
        "slack",
        "trello",
        "teams",
        "planner",
        "sharepoint",
    ])
});

pub static TRAVEL_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "flight", "vuelo", "boarding", "embarque", "gate", "puerta", "ticket", "billete", "renfe",
        "iberia",
    ])
});

pub static TRAINING_TERMS: Lazy<KeywordSet> = Lazy::new(|| KeywordSet::new(&["training", "curso"]));

pub static OFFER_TERMS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["sin coste", "gratis", "free", "descuento", "oferta", "opcional"])
});

pub static SPAM_MARKERS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&[
        "unsubscribe",
        "newsletter",
        "promotional",
        "marketing",
        "no-reply",
        "noreply",
        "you have won",
        "buy now",
    ])
});

// ---------------------------------------------------------------------------
// Extraction and roles
// ---------------------------------------------------------------------------

/// Tasks too vague to be worth listing.
pub static VAGUE_TASKS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["stay informed", "monitor", "be aware", "keep in mind", "take action"])
});

pub const ACTION_VERBS: &[&str] = &[
    "revisar",
    "confirmar",
    "actualizar",
    "encargarte",
    "review",
    "confirm",
    "update",
    "check",
];
