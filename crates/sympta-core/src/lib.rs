//! Shared domain types, configuration, and errors for Sympta.
//!
//! Sympta is a conversational medical triage backend. This crate holds the
//! vocabulary every other crate speaks: patient evidence, ranked conditions,
//! per-chat conversation state, chat/message records, the TOML configuration,
//! and the top-level error enum.

pub mod config;
pub mod error;
pub mod types;

pub use config::SymptaConfig;
pub use error::{Result, SymptaError};
