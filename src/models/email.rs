use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::signals::{
    optional_bool, optional_text, value_text, ActionLevel, DecisionLevel, EmailType, PriorityTier, SignalBundle,
    Urgency,
};

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_text)
        .unwrap_or_default())
}

/// One email of the input batch, as exported by the mail connector.
///
/// Header aliases match the column names of the usual Outlook/Gmail exports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailRecord {
    #[serde(deserialize_with = "optional_text")]
    pub id: Option<String>,
    #[serde(alias = "Subject", deserialize_with = "null_as_empty")]
    pub subject: String,
    #[serde(alias = "Body", deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(alias = "From: (Name)", deserialize_with = "null_as_empty")]
    pub from_name: String,
    #[serde(alias = "From: (Address)", deserialize_with = "null_as_empty")]
    pub from_addr: String,
    #[serde(alias = "To: (Address)", alias = "to_addr", deserialize_with = "null_as_empty")]
    pub to: String,
    #[serde(alias = "CC: (Address)", alias = "cc_addr", deserialize_with = "null_as_empty")]
    pub cc: String,
    #[serde(alias = "BCC: (Address)", alias = "bcc_addr", deserialize_with = "null_as_empty")]
    pub bcc: String,
    #[serde(alias = "Importance", deserialize_with = "null_as_empty")]
    pub importance: String,
    #[serde(alias = "Received_date", alias = "date", deserialize_with = "optional_text")]
    pub received: Option<String>,
    #[serde(alias = "threadId", alias = "thread", deserialize_with = "optional_text")]
    pub thread_id: Option<String>,
    /// Project mention supplied by the connector, used when the classifier names none.
    #[serde(deserialize_with = "optional_text")]
    pub project: Option<String>,
    /// Security verdicts computed upstream; they replace the heuristics.
    #[serde(deserialize_with = "optional_bool")]
    pub is_phishing: Option<bool>,
    #[serde(deserialize_with = "optional_bool")]
    pub is_spam: Option<bool>,
    /// Structured classifier result.
    pub analysis: Option<Value>,
    /// Raw classifier reply, JSON possibly wrapped in prose or code fences.
    pub classifier_output: Option<String>,
}

impl EmailRecord {
    /// `Name <address>` as used for VIP and trusted-domain checks.
    pub fn sender_line(&self) -> String {
        match (self.from_name.trim(), self.from_addr.trim()) {
            ("", addr) => addr.to_string(),
            (name, "") => name.to_string(),
            (name, addr) => format!("{name} <{addr}>"),
        }
    }

    pub fn thread_key(&self) -> Option<&str> {
        self.thread_id
            .as_deref()
            .map(str::trim)
            .filter(|id| {
                !id.is_empty() && !matches!(id.to_lowercase().as_str(), "nan" | "none" | "null")
            })
    }
}

/// One email of the output batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriagedEmail {
    pub id: Option<String>,
    pub date: Option<String>,
    pub sender: String,
    pub sender_address: String,
    pub subject: String,
    pub priority: PriorityTier,
    pub score: u8,
    pub summary: String,
    pub tasks: Vec<String>,
    pub email_type: EmailType,
    pub action_level: ActionLevel,
    pub decision_level: DecisionLevel,
    pub urgency: Urgency,
    pub deadline: Option<String>,
    pub requires_action: bool,
    pub project: String,
    pub blocks_others: bool,
    pub decision_pending: bool,
    pub forced_priority: Option<PriorityTier>,
    pub is_phishing: bool,
    pub is_spam: bool,
    pub thread_id: Option<String>,
    /// Entries across To, Cc and Bcc.
    pub recipients: usize,
}

impl TriagedEmail {
    pub fn from_parts(
        record: &EmailRecord,
        subject: String,
        signals: SignalBundle,
        score: u8,
        priority: PriorityTier,
        is_phishing: bool,
        is_spam: bool,
    ) -> Self {
        Self {
            id: record.id.clone(),
            date: record.received.clone(),
            sender: crate::utils::text::clean_sender_display(&record.from_name, &record.from_addr),
            sender_address: record.from_addr.trim().to_string(),
            subject,
            priority,
            score,
            requires_action: signals.requires_action(),
            summary: signals.summary,
            tasks: signals.actions,
            email_type: signals.email_type,
            action_level: signals.action_level,
            decision_level: signals.decision_level,
            urgency: signals.urgency,
            deadline: signals.deadline,
            project: signals.project.unwrap_or_else(|| unify::NULL_LABEL.to_string()),
            blocks_others: signals.blocks_others,
            decision_pending: signals.decision_pending,
            forced_priority: signals.forced_priority,
            is_phishing,
            is_spam,
            thread_id: record.thread_key().map(str::to_string),
            recipients: crate::utils::text::count_recipients(&record.to, &record.cc, &record.bcc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_accepts_export_columns_and_nulls() {
        let record: EmailRecord = serde_json::from_value(json!({
            "Subject": "Budget",
            "Body": null,
            "From: (Name)": "Ana",
            "From: (Address)": "ana@corp.com",
            "threadId": "t-1",
            "Received_date": "2025-03-10 09:00:00"
        }))
        .unwrap();

        assert_eq!(record.subject, "Budget");
        assert_eq!(record.body, "");
        assert_eq!(record.sender_line(), "Ana <ana@corp.com>");
        assert_eq!(record.thread_key(), Some("t-1"));
        assert_eq!(record.received.as_deref(), Some("2025-03-10 09:00:00"));
    }

    #[test]
    fn test_record_security_flags_are_lenient() {
        let records: Vec<EmailRecord> = serde_json::from_value(json!([
            {"subject": "a", "is_spam": "false", "is_phishing": "yes"},
            {"subject": "b", "is_spam": 1, "is_phishing": null},
            {"subject": "c", "is_spam": "maybe", "is_phishing": ["x"]},
            {"subject": "d"}
        ]))
        .unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!((records[0].is_phishing, records[0].is_spam), (Some(true), Some(false)));
        assert_eq!((records[1].is_phishing, records[1].is_spam), (None, Some(true)));
        assert_eq!((records[2].is_phishing, records[2].is_spam), (None, None));
        assert_eq!((records[3].is_phishing, records[3].is_spam), (None, None));
    }

    #[test]
    fn test_thread_key_ignores_placeholders() {
        let mut record = EmailRecord::default();
        assert_eq!(record.thread_key(), None);
        record.thread_id = Some(" nan ".into());
        assert_eq!(record.thread_key(), None);
        record.thread_id = Some(String::new());
        assert_eq!(record.thread_key(), None);
    }

    #[test]
    fn test_sender_line_without_name() {
        let record = EmailRecord {
            from_addr: "bot@corp.com".into(),
            ..EmailRecord::default()
        };
        assert_eq!(record.sender_line(), "bot@corp.com");
    }
}
