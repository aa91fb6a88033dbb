//! Signal model produced by the external classifier
//!
//! Every enumerated field is parsed leniently: case, `-`, `_` and spaces are
//! ignored, and anything unrecognised (including `null`) becomes the weakest
//! value of its set instead of an error.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Lower-cases and drops separators so "short-term", "Short_Term" and
/// "SHORT TERM" compare equal.
fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Text view of a scalar JSON value; arrays, objects and null have none.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

macro_rules! lenient_enum {
    (
        $(#[$meta:meta])*
        $name:ident (default $default:ident) {
            $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Canonical label, as written by the classifier.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Recognised values only.
            pub fn try_parse(raw: &str) -> Option<Self> {
                let wanted = squash(raw);
                if wanted.is_empty() {
                    return None;
                }
                $(
                    if squash($label) == wanted $(|| squash($alias) == wanted)* {
                        return Some($name::$variant);
                    }
                )+
                None
            }

            /// Unrecognised values fall back to the default.
            pub fn parse(raw: &str) -> Self {
                Self::try_parse(raw).unwrap_or_default()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        // Accepts null, numbers and unknown labels; they map to the default.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = Option::<Value>::deserialize(deserializer)?;
                Ok(value
                    .as_ref()
                    .and_then(value_text)
                    .map(|text| Self::parse(&text))
                    .unwrap_or_default())
            }
        }
    };
}

lenient_enum! {
    /// What the email asks of its reader.
    EmailType (default FyiInformational) {
        ApprovalRequest => "Approval_Request",
        DecisionRequired => "Decision_Required",
        ActionRequest => "Action_Request",
        Meeting => "Meeting",
        ReportUpdate => "Report_Update",
        FyiInformational => "FYI_Informational" | "FYI",
        NotificationSystem => "Notification_System" | "Notification",
        ExternalRequest => "External_Request",
    }
}

lenient_enum! {
    ActionLevel (default None) {
        Mandatory => "Mandatory",
        Optional => "Optional",
        None => "None",
    }
}

lenient_enum! {
    DecisionLevel (default None) {
        Required => "Required",
        Optional => "Optional",
        None => "None",
    }
}

lenient_enum! {
    Urgency (default Low) {
        Immediate => "Immediate",
        ShortTerm => "Short-term",
        MediumTerm => "Medium-term",
        Low => "Low",
    }
}

lenient_enum! {
    /// Final coarse priority of an email.
    PriorityTier (default Low) {
        High => "High" | "Alta",
        Medium => "Medium" | "Media",
        Low => "Low" | "Baja",
    }
}

impl ActionLevel {
    /// Mandatory or Optional.
    pub fn has_action(&self) -> bool {
        !matches!(self, ActionLevel::None)
    }
}

impl Urgency {
    /// Urgency implied by the number of days left before a deadline.
    pub fn from_days_left(days: i64) -> Self {
        match days {
            d if d <= 2 => Urgency::Immediate,
            d if d <= 7 => Urgency::ShortTerm,
            d if d <= 14 => Urgency::MediumTerm,
            _ => Urgency::Low,
        }
    }
}

const NULL_LIKE: &[&str] = &["none", "null", "nan"];

fn is_null_like(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || NULL_LIKE.contains(&trimmed.to_lowercase().as_str())
}

/// Booleans given as bools, numbers or yes/no words; anything else is `None`.
fn bool_from_value(value: Option<Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "si" | "sí" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(bool_from_value(value).unwrap_or(false))
}

pub(crate) fn optional_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(bool_from_value(value))
}

pub(crate) fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_text)
        .filter(|text| !is_null_like(text))
        .map(|text| text.trim().to_string()))
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_text)
        .map(|text| text.trim().to_string())
        .unwrap_or_default())
}

fn optional_tier<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<PriorityTier>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_text)
        .and_then(|text| PriorityTier::try_parse(&text)))
}

fn collect_strings(value: Option<Value>, split_commas: bool) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(Value::String(s)) if split_commas => s.split(',').map(str::to_string).collect(),
        Some(other) => value_text(&other).into_iter().collect(),
        None => Vec::new(),
    };
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// A list given as an array, a single string or null.
pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(collect_strings(value, false))
}

/// Like [`string_list`] but a plain string is split on commas.
pub fn comma_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(collect_strings(value, true))
}

/// Parses the deadline formats seen in classifier output.
///
/// Dates are taken at midnight. Anything unparseable yields `None`.
pub fn parse_deadline(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // "2025-03-14 (Friday)" and similar
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Structured description of one email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalBundle {
    pub email_type: EmailType,
    pub action_level: ActionLevel,
    pub decision_level: DecisionLevel,
    pub urgency: Urgency,
    #[serde(deserialize_with = "lenient_bool")]
    pub blocks_others: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub decision_pending: bool,
    #[serde(deserialize_with = "optional_text")]
    pub deadline: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    pub project: Option<String>,
    #[serde(deserialize_with = "text_or_empty")]
    pub summary: String,
    #[serde(deserialize_with = "string_list")]
    pub actions: Vec<String>,
    #[serde(deserialize_with = "optional_tier")]
    pub forced_priority: Option<PriorityTier>,
}

impl SignalBundle {
    /// Reads a classifier result; non-objects give the default bundle.
    ///
    /// `tasks` is accepted as a second name for `actions` and fills it only
    /// when `actions` is missing or empty.
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };
        let mut fields = fields.clone();
        let tasks = fields.remove("tasks");

        let mut bundle: Self =
            serde_json::from_value(Value::Object(fields)).unwrap_or_default();
        if bundle.actions.is_empty() {
            bundle.actions = collect_strings(tasks, false);
        }
        bundle
    }

    pub fn requires_action(&self) -> bool {
        self.action_level.has_action()
    }

    /// Parsed deadline, if any and if parseable.
    pub fn deadline_at(&self) -> Option<NaiveDateTime> {
        self.deadline.as_deref().and_then(parse_deadline)
    }
}

/// Per-user preferences that steer classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Display name, possibly "Last, First".
    pub name: String,
    pub email: String,
    /// Case-insensitive substrings of VIP sender names or addresses.
    #[serde(deserialize_with = "comma_list")]
    pub vip_senders: Vec<String>,
    #[serde(deserialize_with = "comma_list")]
    pub priority_projects: Vec<String>,
}

impl UserConfig {
    pub fn is_vip_sender(&self, sender: &str) -> bool {
        let sender = sender.trim().to_lowercase();
        self.vip_senders
            .iter()
            .map(|vip| vip.trim().to_lowercase())
            .any(|vip| !vip.is_empty() && sender.contains(&vip))
    }

    /// Case-insensitive containment in either direction.
    pub fn is_priority_project(&self, project: &str) -> bool {
        let detected = project.trim().to_lowercase();
        if is_null_like(&detected) {
            return false;
        }
        self.priority_projects
            .iter()
            .map(|p| p.trim().to_lowercase())
            .any(|p| !p.is_empty() && (detected.contains(&p) || p.contains(&detected)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFlags {
    pub is_phishing: bool,
    pub is_spam: bool,
}

impl SecurityFlags {
    pub fn is_flagged(&self) -> bool {
        self.is_phishing || self.is_spam
    }
}
