//! Email triage batch runner
//!
//! Usage: `email-triage [INPUT] [OUTPUT]`
//!
//! - INPUT: JSON (or `.yaml`) file with the exported emails; stdin when absent or `-`
//! - OUTPUT: report destination, `.yaml`/`.yml` for YAML; stdout when absent or `-`
//!
//! Logs go to stderr so the report can be piped.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use email_triage::config::Settings;
use email_triage::services::batch::{read_batch, write_report};
use email_triage::services::TriagePipeline;
use email_triage::utils::logging::log_config_loaded;

const TOP_HIGH_PRIORITY: usize = 10;

fn path_arg(arg: Option<String>) -> Option<PathBuf> {
    arg.filter(|a| a != "-").map(PathBuf::from)
}

fn main() -> Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let settings = Settings::new().context("Failed to load settings")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if dotenv_loaded {
        info!("✅ .env file loaded");
    } else {
        tracing::debug!(".env file not found, using process environment");
    }
    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let mut args = std::env::args().skip(1);
    let input = path_arg(args.next());
    let output = path_arg(args.next());

    let records = read_batch(input.as_deref()).context("Failed to read email batch")?;

    let pipeline = TriagePipeline::new(&settings);
    let report = pipeline.run(&records);

    for email in report.high_priority(TOP_HIGH_PRIORITY) {
        info!("🔥 [{}] {} - {}", email.score, email.sender, email.subject);
    }

    write_report(&report, output.as_deref()).context("Failed to write triage report")?;

    Ok(())
}
