use tracing::{debug, info, warn};

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_batch_received(source: &str, count: usize) {
    info!("📥 Batch received from {}: {} emails", source, count);
}

pub fn log_batch_processed(total: usize, high: usize, duration_ms: u128) {
    info!(
        "✅ Batch processed: {} emails ({} High) in {}ms",
        total, high, duration_ms
    );
}

pub fn log_report_written(destination: &str) {
    info!("📤 Report written to {}", destination);
}

pub fn log_security_flagged(subject: &str, is_phishing: bool, is_spam: bool) {
    debug!(
        "🛡️ Security flags for '{}': phishing={} spam={}",
        subject, is_phishing, is_spam
    );
}

pub fn log_fallback_used(subject: &str) {
    debug!("Classifier output missing for '{}', using heuristic fallback", subject);
}

pub fn log_thread_downgraded(thread_id: &str, count: usize) {
    debug!("🧵 Thread {}: {} older emails downgraded to history", thread_id, count);
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}
