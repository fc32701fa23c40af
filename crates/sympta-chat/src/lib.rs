//! Conversational diagnosis engine for Sympta.
//!
//! Owns the per-chat reasoning flow: for every user turn it consults the
//! free-text reasoning backend first, and when that answer is generic or
//! unavailable it runs the structured pipeline (symptom extraction →
//! evidence merge → diagnosis → formatting), falling back again to the
//! free-text backend and finally to a fixed apology so a turn always
//! produces an answer.

pub mod collaborators;
pub mod diagnosis;
pub mod error;
pub mod evidence;
pub mod extraction;
pub mod format;
pub mod orchestrator;

pub use collaborators::{CompletionEngine, DiagnosisEngine, SymptomParser};
pub use diagnosis::DiagnosisAdapter;
pub use error::AdapterError;
pub use extraction::SymptomExtractor;
pub use format::format_conditions;
pub use orchestrator::TurnOrchestrator;
