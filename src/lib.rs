// Email triage library
// Exposes the modules used by the binary and by tests

pub mod config;
pub mod models;
pub mod services;
pub mod utils;
