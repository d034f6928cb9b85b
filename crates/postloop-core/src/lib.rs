//! Core library for the autonomous social-media publishing pipeline.
//!
//! Contains the candidate queue state machine, tweet normalizer, preference
//! and post scorers, safety gate, mix planner, generation orchestrator,
//! persona analyzer, control-plane sync, PDCA updater, Sheets mirror,
//! notifier, and the configuration/error types shared across all of them.
pub mod config;
pub mod control_plane;
pub mod error;
mod google_auth;
pub mod llm;
pub mod mix_planner;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod pdca;
pub mod persona;
pub mod posting;
pub mod preferences;
pub mod queue;
pub mod remote_store;
pub mod retry;
pub mod safety;
pub mod scoring;
pub mod search;
pub mod sheets;

pub use error::*;

/// Returns the version of the postloop-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
