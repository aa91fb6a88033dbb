//! Batch triage: one pass per email, then thread and project rewrites
//!
//! Per-email work is independent and side-effect free; only the two batch
//! steps look across emails. The run date is an explicit input so the same
//! batch always yields the same report.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{Settings, TriageSettings};
use crate::models::{EmailRecord, PriorityTier, SignalBundle, TriagedEmail, Urgency, UserConfig};
use crate::models::signals::parse_deadline;
use crate::services::classifier::{PriorityClassifier, PriorityRequest};
use crate::services::extraction::{
    heuristic_signals, signals_from_reply, signals_from_value, ExtractionContext,
};
use crate::services::roles::{apply_cc_downgrade, identify_user_role};
use crate::services::scorer::score_at;
use crate::services::security::SecurityScreen;
use crate::utils::logging::{log_batch_processed, log_fallback_used, log_thread_downgraded};
use crate::utils::text::{extract_main, normalize_importance, normalize_text};

/// Aggregate counts of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriageStats {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub phishing: usize,
    pub spam: usize,
    pub requires_action: usize,
}

impl TriageStats {
    fn from_emails(emails: &[TriagedEmail]) -> Self {
        emails.iter().fold(
            Self {
                total: emails.len(),
                ..Self::default()
            },
            |mut stats, email| {
                match email.priority {
                    PriorityTier::High => stats.high += 1,
                    PriorityTier::Medium => stats.medium += 1,
                    PriorityTier::Low => stats.low += 1,
                }
                stats.phishing += usize::from(email.is_phishing);
                stats.spam += usize::from(email.is_spam);
                stats.requires_action += usize::from(email.requires_action);
                stats
            },
        )
    }
}

/// Result of one batch run, emails in input order.
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub generated_at: NaiveDateTime,
    pub stats: TriageStats,
    pub emails: Vec<TriagedEmail>,
    /// Raw project name → unified label.
    pub projects: BTreeMap<String, String>,
}

impl TriageReport {
    /// Up to `n` High emails, highest score first; input order breaks ties.
    pub fn high_priority(&self, n: usize) -> Vec<&TriagedEmail> {
        let mut high: Vec<&TriagedEmail> = self
            .emails
            .iter()
            .filter(|email| email.priority == PriorityTier::High)
            .collect();
        high.sort_by(|a, b| b.score.cmp(&a.score));
        high.truncate(n);
        high
    }
}

/// Received timestamps as exported by Outlook (plain) or Gmail (RFC 2822).
fn parse_received(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| parse_deadline(raw))
}

pub struct TriagePipeline {
    settings: TriageSettings,
    user: UserConfig,
    classifier: PriorityClassifier,
    screen: SecurityScreen,
}

impl TriagePipeline {
    pub fn new(settings: &Settings) -> Self {
        let triage = settings.triage.clone();
        Self {
            classifier: PriorityClassifier::new(triage.trusted_domains.clone()),
            screen: SecurityScreen::new(
                triage.trusted_domains.clone(),
                triage.whitelist_keywords.clone(),
            ),
            user: settings.user.clone(),
            settings: triage,
        }
    }

    /// Copy of `record` with subject, body and sender cleaned. Recipient
    /// lists keep their `<address>` parts.
    fn clean(&self, record: &EmailRecord) -> EmailRecord {
        let max = self.settings.max_body_chars;
        EmailRecord {
            subject: normalize_text(&record.subject, max),
            body: normalize_text(&record.body, max),
            from_name: normalize_text(&record.from_name, max),
            from_addr: normalize_text(&record.from_addr, max),
            ..record.clone()
        }
    }

    fn signals_for(&self, email: &EmailRecord, main_body: &str, sender: &str) -> SignalBundle {
        let ctx = ExtractionContext {
            subject: &email.subject,
            sender,
            body: main_body,
        };

        let reply = email
            .classifier_output
            .as_deref()
            .filter(|reply| !reply.trim().is_empty());
        let mut signals = match (&email.analysis, reply) {
            (Some(analysis), _) if analysis.is_object() => signals_from_value(analysis, &ctx),
            (_, Some(reply)) => signals_from_reply(reply, &ctx),
            _ => {
                log_fallback_used(&email.subject);
                heuristic_signals(&email.subject, &email.from_name, &email.from_addr, main_body)
            }
        };

        if signals.project.is_none() {
            signals.project = email.project.clone();
        }
        signals
    }

    /// Triage of a single email relative to `now`.
    pub fn triage_email_at(&self, record: &EmailRecord, now: NaiveDateTime) -> TriagedEmail {
        let email = self.clean(record);
        let flags = self.screen.assess(&email);
        let main_body = extract_main(&email.body, &email.subject);
        let sender = email.sender_line();

        let mut signals = self.signals_for(&email, &main_body, &sender);

        if let Some(deadline) = signals.deadline_at() {
            let days_left = (deadline.date() - now.date()).num_days();
            signals.urgency = Urgency::from_days_left(days_left);
        }

        let role = identify_user_role(&self.user, &email.from_name, &email.from_addr, &email.to, &email.cc);
        apply_cc_downgrade(&mut signals, &role, &main_body);

        let importance = normalize_importance(&email.importance);
        let score = score_at(&signals, &importance, &email.subject, now);

        let on_priority_project = signals
            .project
            .as_deref()
            .is_some_and(|project| self.user.is_priority_project(project));
        if on_priority_project {
            signals.forced_priority = Some(PriorityTier::High);
        }

        let priority = self.classifier.classify(&PriorityRequest {
            sender: &sender,
            subject: &email.subject,
            body: &main_body,
            signals: &signals,
            score,
            user: &self.user,
            forced_priority: signals.forced_priority,
            security: flags,
        });

        let subject = email.subject.clone();
        TriagedEmail::from_parts(
            &email,
            subject,
            signals,
            score,
            priority,
            flags.is_phishing,
            flags.is_spam,
        )
    }

    /// Batch run relative to the current local time.
    pub fn run(&self, records: &[EmailRecord]) -> TriageReport {
        self.run_at(records, Local::now().naive_local())
    }

    pub fn run_at(&self, records: &[EmailRecord], now: NaiveDateTime) -> TriageReport {
        let started = Instant::now();

        let records = if records.len() > self.settings.max_emails {
            warn!(
                "Batch of {} emails exceeds the limit, keeping the first {}",
                records.len(),
                self.settings.max_emails
            );
            &records[..self.settings.max_emails]
        } else {
            records
        };

        let mut emails: Vec<TriagedEmail> = records
            .iter()
            .map(|record| self.triage_email_at(record, now))
            .collect();

        downgrade_thread_history(&mut emails, records, &self.settings.history_label);
        let projects = unify_projects(&mut emails);

        let stats = TriageStats::from_emails(&emails);
        log_batch_processed(stats.total, stats.high, started.elapsed().as_millis());

        TriageReport {
            generated_at: now,
            stats,
            emails,
            projects,
        }
    }
}

/// Keeps the newest email of each thread and turns the rest into history.
///
/// Unparseable dates sort oldest; equal dates keep the later input.
pub fn downgrade_thread_history(emails: &mut [TriagedEmail], records: &[EmailRecord], label: &str) {
    let mut threads: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate().take(emails.len()) {
        if let Some(key) = record.thread_key() {
            threads.entry(key).or_default().push(idx);
        }
    }

    for (thread_id, members) in threads.into_iter().filter(|(_, m)| m.len() > 1) {
        let newest = members
            .iter()
            .copied()
            .max_by_key(|&idx| {
                let received = records[idx].received.as_deref().and_then(parse_received);
                (received, idx)
            })
            .unwrap_or_default();

        let mut downgraded = 0;
        for idx in members.into_iter().filter(|&idx| idx != newest) {
            let email = &mut emails[idx];
            email.priority = PriorityTier::Low;
            email.deadline = None;
            email.tasks.clear();
            if !email.summary.starts_with(label) {
                email.summary = format!("{label} {}", email.summary);
            }
            downgraded += 1;
        }
        log_thread_downgraded(thread_id, downgraded);
    }
}

/// Rewrites every project to its unified label and returns the mapping.
pub fn unify_projects(emails: &mut [TriagedEmail]) -> BTreeMap<String, String> {
    let mut projects: Vec<String> = emails.iter().map(|e| e.project.clone()).collect();
    let map = unify::unify_in_place(&mut projects);
    for (email, project) in emails.iter_mut().zip(projects) {
        email.project = project;
    }
    debug!("Project map has {} entries", map.len());
    map.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.triage.trusted_domains = vec!["corp.com".into()];
        settings.user = UserConfig {
            name: "Pérez, Ana".into(),
            vip_senders: vec!["ceo@corp.com".into(), "boss@partner.biz".into()],
            priority_projects: vec!["Atlas".into()],
            ..UserConfig::default()
        };
        settings
    }

    fn email(subject: &str, from: &str, analysis: serde_json::Value) -> EmailRecord {
        EmailRecord {
            subject: subject.into(),
            body: "Please see below.".into(),
            from_name: "Bob".into(),
            from_addr: from.into(),
            to: "Ana Perez <ana@corp.com>".into(),
            analysis: Some(analysis),
            ..EmailRecord::default()
        }
    }

    #[test]
    fn test_approval_request_is_high() {
        let pipeline = TriagePipeline::new(&settings());
        let record = email(
            "Approve PO 4411",
            "bob@corp.com",
            json!({
                "email_type": "Approval_Request",
                "action_level": "Mandatory",
                "decision_level": "Required",
                "urgency": "Immediate",
                "blocks_others": true,
                "summary": "Bob needs the purchase order approved before Friday",
                "actions": ["Approve PO 4411"]
            }),
        );
        let triaged = pipeline.triage_email_at(&record, now());
        assert_eq!(triaged.priority, PriorityTier::High);
        assert_eq!(triaged.score, 100);
        assert!(triaged.requires_action);
        assert_eq!(triaged.tasks, vec!["Approve PO 4411"]);
        assert_eq!(triaged.sender, "Bob");
    }

    #[test]
    fn test_spam_overrides_vip() {
        let pipeline = TriagePipeline::new(&settings());
        let vip = email("Quarterly note", "boss@partner.biz", json!({"urgency": "Low"}));
        assert_eq!(pipeline.triage_email_at(&vip, now()).priority, PriorityTier::High);

        let flagged = EmailRecord {
            is_spam: Some(true),
            ..vip
        };
        let triaged = pipeline.triage_email_at(&flagged, now());
        assert!(triaged.is_spam);
        assert_eq!(triaged.priority, PriorityTier::Low);
    }

    #[test]
    fn test_deadline_recalibrates_urgency() {
        let pipeline = TriagePipeline::new(&settings());
        let analysis = |deadline: &str| {
            json!({"urgency": "Low", "deadline": deadline, "summary": "A long enough summary for the report"})
        };
        let soon = pipeline.triage_email_at(&email("Report", "bob@corp.com", analysis("2025-03-12")), now());
        let week = pipeline.triage_email_at(&email("Report", "bob@corp.com", analysis("2025-03-17")), now());
        let later = pipeline.triage_email_at(&email("Report", "bob@corp.com", analysis("2025-04-30")), now());
        let past = pipeline.triage_email_at(&email("Report", "bob@corp.com", analysis("2025-03-01")), now());
        assert_eq!(soon.urgency, Urgency::Immediate);
        assert_eq!(week.urgency, Urgency::ShortTerm);
        assert_eq!(later.urgency, Urgency::Low);
        assert_eq!(past.urgency, Urgency::Immediate);
    }

    #[test]
    fn test_priority_project_forces_high() {
        let pipeline = TriagePipeline::new(&settings());
        let record = email(
            "Weekly notes",
            "bob@corp.com",
            json!({"project": "Proyecto Atlas", "summary": "Notes from the weekly Atlas sync meeting"}),
        );
        let triaged = pipeline.triage_email_at(&record, now());
        assert_eq!(triaged.forced_priority, Some(PriorityTier::High));
        assert_eq!(triaged.priority, PriorityTier::High);
    }

    #[test]
    fn test_cc_only_email_becomes_fyi() {
        let pipeline = TriagePipeline::new(&settings());
        let record = EmailRecord {
            to: "team@corp.com".into(),
            cc: "Ana Perez <ana.perez@corp.com>".into(),
            body: "Team, send the slides by Friday.".into(),
            ..email(
                "Slides",
                "bob@corp.com",
                json!({
                    "email_type": "Action_Request",
                    "action_level": "Mandatory",
                    "summary": "Bob asks the team for the slides by Friday",
                    "actions": ["Send slides"]
                }),
            )
        };
        let triaged = pipeline.triage_email_at(&record, now());
        assert!(triaged.tasks.is_empty());
        assert!(!triaged.requires_action);
        assert!(triaged.summary.starts_with("[CC - FYI]"));
        assert_eq!(triaged.recipients, 2);
    }

    #[test]
    fn test_fallback_without_classifier_output() {
        let pipeline = TriagePipeline::new(&settings());
        let record = EmailRecord {
            subject: "Action needed: training".into(),
            body: "You must complete the course.".into(),
            from_addr: "lms@mail.csod.com".into(),
            ..EmailRecord::default()
        };
        let triaged = pipeline.triage_email_at(&record, now());
        assert_eq!(triaged.email_type.as_str(), "Notification_System");
        assert_eq!(triaged.tasks, vec!["Complete required action"]);
        assert_eq!(triaged.project, "None");
    }

    #[test]
    fn test_raw_reply_is_parsed() {
        let pipeline = TriagePipeline::new(&settings());
        let record = EmailRecord {
            analysis: None,
            classifier_output: Some(
                "Result:\n```json\n{\"email_type\": \"Meeting\", \"urgency\": \"Short-term\"}\n```".into(),
            ),
            ..email("Sync", "bob@corp.com", json!(null))
        };
        let triaged = pipeline.triage_email_at(&record, now());
        assert_eq!(triaged.email_type.as_str(), "Meeting");
        assert_eq!(triaged.urgency, Urgency::ShortTerm);
    }

    #[test]
    fn test_thread_history_and_project_unification() {
        let pipeline = TriagePipeline::new(&settings());
        let mandatory = |project: &str| {
            json!({
                "email_type": "Action_Request",
                "action_level": "Mandatory",
                "urgency": "Immediate",
                "deadline": "2025-03-11",
                "project": project,
                "summary": "Please update the migration plan before the review",
                "actions": ["Update plan"]
            })
        };
        let threaded = |date: &str, project: &str| EmailRecord {
            thread_id: Some("t-1".into()),
            received: Some(date.into()),
            ..email("Migration plan", "bob@corp.com", mandatory(project))
        };
        let records = vec![
            threaded("2025-03-08 10:00:00", "CRM Migration"),
            threaded("2025-03-09 10:00:00", "crm migration"),
            threaded("garbage", "CRM"),
            email("Other", "bob@corp.com", json!({"project": "null"})),
        ];

        let report = pipeline.run_at(&records, now());
        assert_eq!(report.emails.len(), 4);

        let newest = &report.emails[1];
        assert_eq!(newest.priority, PriorityTier::High);
        assert_eq!(newest.tasks, vec!["Update plan"]);

        for old in [&report.emails[0], &report.emails[2]] {
            assert_eq!(old.priority, PriorityTier::Low);
            assert!(old.tasks.is_empty());
            assert!(old.deadline.is_none());
            assert!(old.summary.starts_with("[HISTORY - See last email] Please update"));
        }

        let label = &report.emails[0].project;
        assert_eq!(&report.emails[1].project, label);
        assert_eq!(&report.emails[2].project, label);
        assert_eq!(report.emails[3].project, "None");

        assert_eq!(report.stats.total, 4);
        assert_eq!(report.stats.high, 1);
        assert_eq!(report.high_priority(10).len(), 1);
        assert_eq!(report.high_priority(0).len(), 0);
    }

    #[test]
    fn test_history_label_applied_once() {
        let pipeline = TriagePipeline::new(&settings());
        let record = |summary: &str| EmailRecord {
            thread_id: Some("t".into()),
            received: Some("2025-03-01".into()),
            ..email("Re: x", "bob@corp.com", json!({"summary": summary}))
        };
        let records = vec![
            record("[HISTORY - See last email] already marked as history once"),
            record("The latest message of this conversation thread"),
        ];
        let report = pipeline.run_at(&records, now());
        assert_eq!(
            report.emails[0].summary,
            "[HISTORY - See last email] already marked as history once"
        );
        assert_eq!(
            report.emails[1].summary,
            "The latest message of this conversation thread"
        );
    }

    #[test]
    fn test_high_priority_orders_by_score() {
        let pipeline = TriagePipeline::new(&settings());
        let high = |subject: &str, extra: serde_json::Value| {
            let mut analysis = json!({
                "email_type": "Decision_Required",
                "decision_level": "Required",
                "summary": "A decision is needed on the vendor shortlist"
            });
            if let (Some(obj), Some(more)) = (analysis.as_object_mut(), extra.as_object()) {
                obj.extend(more.clone());
            }
            email(subject, "bob@corp.com", analysis)
        };
        let records = vec![
            high("first", json!({})),
            high("second", json!({"urgency": "Immediate", "blocks_others": true})),
            email("plain", "bob@corp.com", json!({"summary": "Nothing to do here at all, just news"})),
        ];
        let report = pipeline.run_at(&records, now());
        let top: Vec<&str> = report.high_priority(5).iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(top, vec!["second", "first"]);
        assert_eq!(report.high_priority(1)[0].subject, "second");
    }

    #[test]
    fn test_batch_limit() {
        let mut settings = settings();
        settings.triage.max_emails = 2;
        let pipeline = TriagePipeline::new(&settings);
        let records = vec![EmailRecord::default(); 3];
        assert_eq!(pipeline.run_at(&records, now()).emails.len(), 2);
    }

    #[test]
    fn test_parse_received() {
        assert!(parse_received("Mon, 10 Mar 2025 09:00:00 +0000").is_some());
        assert!(parse_received("2025-03-10 09:00:00").is_some());
        assert!(parse_received("yesterday").is_none());
    }
}
