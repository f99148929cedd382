//! # remotedoc-common
//!
//! Shared ambient plumbing for the remotedoc workspace: configuration
//! loading and tracing setup. Kept deliberately thin so every service
//! binary (`remotedoc-http`, `remotedoc-stdio`, `remotedoc-cli`) can
//! depend on it without pulling in the engine itself.

pub mod config;
pub mod tracing_setup;

pub use config::AppConfig;
