pub mod batch;
pub mod classifier;
pub mod extraction;
pub mod pipeline;
pub mod roles;
pub mod scorer;
pub mod security;

pub use classifier::{PriorityClassifier, PriorityRequest, PriorityRule};
pub use pipeline::{TriagePipeline, TriageReport, TriageStats};
pub use security::SecurityScreen;
