use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::UserConfig;
use crate::models::signals::comma_list;
use crate::utils::TriageResult;

pub const DEFAULT_HISTORY_LABEL: &str = "[HISTORY - See last email]";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub triage: TriageSettings,
    pub user: UserConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TriageSettings {
    /// Senders from these domains (or their subdomains) are never spam or phishing.
    #[serde(deserialize_with = "comma_list")]
    pub trusted_domains: Vec<String>,
    /// Clear security flags when found in subject, sender or body start.
    #[serde(deserialize_with = "comma_list")]
    pub whitelist_keywords: Vec<String>,
    pub max_body_chars: usize,
    /// Emails beyond this count are dropped from a batch.
    pub max_emails: usize,
    /// Prefix for superseded emails of a thread.
    pub history_label: String,
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            trusted_domains: [
                "sandoz.com",
                "sandoz.net",
                "csod.com",
                "microsoft.com",
                "sharepointonline.com",
                "outlook.com",
                "regaloresponsable.es",
                "ilunion.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            whitelist_keywords: [
                "quip digest",
                "quip updates",
                "sandoz group ag",
                "weekly digest",
                "iberia",
                "vuelo",
                "flight",
                "jira",
                "confluence",
                "sharepoint",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            max_body_chars: 12_000,
            max_emails: 10_000,
            history_label: DEFAULT_HISTORY_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> TriageResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Base configuration
            .add_source(File::with_name("config/default").required(false))
            // Environment-specific overrides
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Short names used by the desktop exporter
        if let Ok(name) = std::env::var("TRIAGE_USER_NAME") {
            builder = builder.set_override("user.name", name)?;
        }
        if let Ok(email) = std::env::var("TRIAGE_USER_EMAIL") {
            builder = builder.set_override("user.email", email)?;
        }

        builder = builder.add_source(Environment::with_prefix("EMAIL_TRIAGE").separator("__"));

        Self::load(builder)
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> TriageResult<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }
}
