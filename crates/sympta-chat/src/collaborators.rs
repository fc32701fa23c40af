//! Collaborator interfaces for the external reasoning backends.
//!
//! Three services participate in a turn, all reached over the network in a
//! deployment and all treated as black boxes here:
//!
//! - the free-text completion engine consulted before the structured pipeline,
//! - the symptom parser that turns an utterance into mentions,
//! - the diagnosis engine that ranks conditions for an evidence set.
//!
//! Concrete transports (HTTP + JSON against the real vendors) live outside
//! this repository; any implementation satisfying these signatures plugs in.
//! `MockCompletion`, `MockParser`, and `MockDiagnosis` provide deterministic
//! in-process implementations for tests and for default wiring.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use sympta_core::types::{EvidenceItem, Mention, RankedCondition, Sex};

use crate::error::AdapterError;

// =============================================================================
// Traits
// =============================================================================

/// General-purpose conversational completion service.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Answer a prompt with free-form text.
    async fn complete(&self, prompt: &str) -> Result<String, AdapterError>;
}

/// Medical-text parsing service.
#[async_trait]
pub trait SymptomParser: Send + Sync {
    /// Detect mentions in one utterance, given the patient's demographics.
    async fn parse(&self, text: &str, sex: Sex, age: u32) -> Result<Vec<Mention>, AdapterError>;
}

/// Probabilistic symptom-to-condition reasoning service.
///
/// Implementations must return conditions sorted by descending probability;
/// callers truncate and render but never re-sort.
#[async_trait]
pub trait DiagnosisEngine: Send + Sync {
    /// Rank conditions for the given evidence set. Callers guarantee
    /// `evidence` is non-empty.
    async fn diagnose(
        &self,
        evidence: &[EvidenceItem],
        sex: Sex,
        age: u32,
    ) -> Result<Vec<RankedCondition>, AdapterError>;
}

// =============================================================================
// MockCompletion
// =============================================================================

/// Deterministic completion engine: always the same reply, or always down.
pub struct MockCompletion {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl MockCompletion {
    /// An engine that answers every prompt with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// An engine whose every call fails.
    pub fn unavailable() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completion calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionEngine for MockCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(AdapterError::EngineUnavailable(
                "mock engine is configured unavailable".to_string(),
            )),
        }
    }
}

// =============================================================================
// MockParser
// =============================================================================

/// Deterministic parser: a fixed mention list for every utterance, or always
/// down.
pub struct MockParser {
    mentions: Option<Vec<Mention>>,
    calls: AtomicUsize,
}

impl MockParser {
    /// A parser that detects the same mentions in every utterance.
    pub fn detecting(mentions: Vec<Mention>) -> Self {
        Self {
            mentions: Some(mentions),
            calls: AtomicUsize::new(0),
        }
    }

    /// A parser that detects nothing.
    pub fn detecting_nothing() -> Self {
        Self::detecting(Vec::new())
    }

    /// A parser whose every call fails.
    pub fn unavailable() -> Self {
        Self {
            mentions: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of parse calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SymptomParser for MockParser {
    async fn parse(
        &self,
        _text: &str,
        _sex: Sex,
        _age: u32,
    ) -> Result<Vec<Mention>, AdapterError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.mentions {
            Some(mentions) => Ok(mentions.clone()),
            None => Err(AdapterError::ParseFailed(
                "mock parser is configured unavailable".to_string(),
            )),
        }
    }
}

// =============================================================================
// MockDiagnosis
// =============================================================================

/// Deterministic diagnosis engine: a fixed ranking for every evidence set,
/// or always down. Records the evidence it was last called with so tests can
/// assert on what actually crossed the seam.
pub struct MockDiagnosis {
    conditions: Option<Vec<RankedCondition>>,
    calls: AtomicUsize,
    last_evidence: Mutex<Vec<EvidenceItem>>,
}

impl MockDiagnosis {
    /// An engine that returns the same ranking for every call.
    pub fn ranking(conditions: Vec<RankedCondition>) -> Self {
        Self {
            conditions: Some(conditions),
            calls: AtomicUsize::new(0),
            last_evidence: Mutex::new(Vec::new()),
        }
    }

    /// An engine that finds no conditions.
    pub fn finding_nothing() -> Self {
        Self::ranking(Vec::new())
    }

    /// An engine whose every call fails.
    pub fn unavailable() -> Self {
        Self {
            conditions: None,
            calls: AtomicUsize::new(0),
            last_evidence: Mutex::new(Vec::new()),
        }
    }

    /// Number of diagnosis calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// The evidence set passed to the most recent call.
    pub fn last_evidence(&self) -> Vec<EvidenceItem> {
        self.last_evidence.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl DiagnosisEngine for MockDiagnosis {
    async fn diagnose(
        &self,
        evidence: &[EvidenceItem],
        _sex: Sex,
        _age: u32,
    ) -> Result<Vec<RankedCondition>, AdapterError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last_evidence.lock().expect("mock lock poisoned") = evidence.to_vec();
        match &self.conditions {
            Some(conditions) => Ok(conditions.clone()),
            None => Err(AdapterError::DiagnosisUnavailable(
                "mock diagnosis is configured unavailable".to_string(),
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
