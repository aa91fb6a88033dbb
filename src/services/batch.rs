//! Reading email batches and writing triage reports
//!
//! Files ending in `.yaml`/`.yml` use YAML, everything else (and stdio) JSON.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::Value;

use crate::models::EmailRecord;
use crate::services::pipeline::TriageReport;
use crate::utils::logging::{log_batch_received, log_report_written, log_validation_error};
use crate::utils::{TriageError, TriageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Json,
    Yaml,
}

impl BatchFormat {
    pub fn from_path(path: Option<&Path>) -> Self {
        let extension = path
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("yaml" | "yml") => BatchFormat::Yaml,
            _ => BatchFormat::Json,
        }
    }
}

/// Parses a batch: a list of emails, or an object with an `emails` list.
pub fn parse_batch(text: &str, format: BatchFormat) -> TriageResult<Vec<EmailRecord>> {
    let document: Value = match format {
        BatchFormat::Json => serde_json::from_str(text)?,
        BatchFormat::Yaml => serde_yaml::from_str(text)?,
    };

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("emails") {
            Some(Value::Array(items)) => items,
            _ => {
                let message = "expected an `emails` list";
                log_validation_error("batch", message);
                return Err(TriageError::Validation(message.to_string()));
            }
        },
        Value::Null => Vec::new(),
        _ => {
            let message = "expected a list of emails";
            log_validation_error("batch", message);
            return Err(TriageError::Validation(message.to_string()));
        }
    };

    Ok(serde_json::from_value(Value::Array(items))?)
}

/// Reads a batch from `path`, or from stdin when `None`.
pub fn read_batch(path: Option<&Path>) -> TriageResult<Vec<EmailRecord>> {
    let (text, source) = match path {
        Some(path) => (fs::read_to_string(path)?, path.display().to_string()),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            (text, "stdin".to_string())
        }
    };

    let records = parse_batch(&text, BatchFormat::from_path(path))?;
    log_batch_received(&source, records.len());
    Ok(records)
}

pub fn render_report(report: &TriageReport, format: BatchFormat) -> TriageResult<String> {
    Ok(match format {
        BatchFormat::Json => serde_json::to_string_pretty(report)?,
        BatchFormat::Yaml => serde_yaml::to_string(report)?,
    })
}

/// Writes `report` to `path`, or to stdout when `None`.
pub fn write_report(report: &TriageReport, path: Option<&Path>) -> TriageResult<()> {
    let rendered = render_report(report, BatchFormat::from_path(path))?;
    match path {
        Some(path) => {
            fs::write(path, rendered)?;
            log_report_written(&path.display().to_string());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
            log_report_written("stdout");
        }
    }
    Ok(())
}
