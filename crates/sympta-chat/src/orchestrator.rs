//! Turn orchestrator: the fallback chain between the two reasoning backends.
//!
//! Every turn runs the same deterministic state machine:
//!
//! ```text
//! Primary ──answer ok──────────────────────────▶ accept (free-text)
//!    │ failed / empty / hedged
//!    ▼
//! Diagnostic ──conditions found────────────────▶ accept (diagnosis)
//!    │ none
//!    ▼
//! PrimaryRetry ──non-empty answer──────────────▶ accept (free-text, unfiltered)
//!    │ failed / empty
//!    ▼
//! Apology ─────────────────────────────────────▶ accept (fixed text)
//! ```
//!
//! The machine restarts at `Primary` on every turn; the only thing carried
//! across turns is the evidence merged in the `Diagnostic` step, which the
//! caller persists. `run_turn` never fails: collaborator errors only move
//! the machine to its next state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use sympta_core::config::EngineConfig;
use sympta_core::types::{ConversationState, TurnResult};

use crate::collaborators::{CompletionEngine, DiagnosisEngine, SymptomParser};
use crate::diagnosis::DiagnosisAdapter;
use crate::error::AdapterError;
use crate::evidence;
use crate::extraction::SymptomExtractor;
use crate::format::format_conditions;

/// Generic hedges that disqualify a free-text answer on the first pass.
/// Matched case-insensitively as substrings.
const HEDGE_PHRASES: [&str; 5] = [
    "i don't know",
    "i'm sorry",
    "i am not sure",
    "as an ai",
    "i cannot",
];

/// The guaranteed last-resort answer. A success response, not an error.
pub const APOLOGY_TEXT: &str = "I apologize, but I couldn't provide a specific diagnosis. \
     Please consult with a healthcare professional for proper medical advice.";

/// Per-turn states of the fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TurnPhase {
    /// Free-text engine, hedge filter applied.
    Primary,
    /// Extraction → merge → diagnosis pipeline.
    Diagnostic,
    /// Free-text engine again, no filter.
    PrimaryRetry,
    /// Fixed apology; always accepts.
    Apology,
}

/// Coordinates one user turn across the free-text engine and the structured
/// diagnosis pipeline.
pub struct TurnOrchestrator {
    completion: Arc<dyn CompletionEngine>,
    extractor: SymptomExtractor,
    diagnosis: DiagnosisAdapter,
    call_timeout: Duration,
}

impl TurnOrchestrator {
    /// Wire the orchestrator to its three collaborators.
    pub fn new(
        completion: Arc<dyn CompletionEngine>,
        parser: Arc<dyn SymptomParser>,
        diagnosis_engine: Arc<dyn DiagnosisEngine>,
        config: &EngineConfig,
    ) -> Self {
        let call_timeout = Duration::from_secs(config.call_timeout_secs);
        Self {
            completion,
            extractor: SymptomExtractor::new(parser, call_timeout),
            diagnosis: DiagnosisAdapter::new(diagnosis_engine, call_timeout),
            call_timeout,
        }
    }

    /// Process one user turn.
    ///
    /// `state` is the chat's persisted reasoning state, or `None` on the
    /// first turn. The result always carries a non-empty answer;
    /// `updated_state` is `Some` only when new evidence was merged, and the
    /// caller is responsible for persisting it. Turns on the same chat must
    /// be serialized by the caller; the evidence merge is not safe under
    /// concurrent writers.
    pub async fn run_turn(&self, state: Option<ConversationState>, utterance: &str) -> TurnResult {
        let mut working = state.unwrap_or_else(evidence::initialize);
        let mut merged: Option<ConversationState> = None;
        let mut phase = TurnPhase::Primary;

        loop {
            match phase {
                TurnPhase::Primary => match self.complete(utterance).await {
                    Ok(answer) if answer.trim().is_empty() => {
                        debug!("Free-text engine returned an empty answer");
                        phase = TurnPhase::Diagnostic;
                    }
                    Ok(answer) if is_hedged(&answer) => {
                        debug!("Free-text answer filtered as unhelpful");
                        phase = TurnPhase::Diagnostic;
                    }
                    Ok(answer) => {
                        return TurnResult {
                            text: answer,
                            is_diagnostic_answer: false,
                            updated_state: None,
                        };
                    }
                    Err(e) => {
                        warn!(error = %e, "Free-text engine failed; trying diagnosis pipeline");
                        phase = TurnPhase::Diagnostic;
                    }
                },

                TurnPhase::Diagnostic => {
                    let new_items = self
                        .extractor
                        .extract(utterance, working.sex, working.age)
                        .await;
                    if !new_items.is_empty() {
                        working = evidence::merge(working, new_items);
                        merged = Some(working.clone());
                    }

                    match self
                        .diagnosis
                        .diagnose(&working.evidence, working.sex, working.age)
                        .await
                    {
                        Ok(conditions) if !conditions.is_empty() => {
                            info!(conditions = conditions.len(), "Diagnosis pipeline answered");
                            return TurnResult {
                                text: format_conditions(&conditions),
                                is_diagnostic_answer: true,
                                updated_state: merged,
                            };
                        }
                        Ok(_) => {
                            debug!("Diagnosis returned no conditions");
                            phase = TurnPhase::PrimaryRetry;
                        }
                        Err(e) => {
                            warn!(error = %e, "Diagnosis unavailable; retrying free-text engine");
                            phase = TurnPhase::PrimaryRetry;
                        }
                    }
                }

                TurnPhase::PrimaryRetry => match self.complete(utterance).await {
                    Ok(answer) if !answer.trim().is_empty() => {
                        return TurnResult {
                            text: answer,
                            is_diagnostic_answer: false,
                            updated_state: merged,
                        };
                    }
                    _ => {
                        phase = TurnPhase::Apology;
                    }
                },

                TurnPhase::Apology => {
                    info!("All engines exhausted; answering with the fixed apology");
                    return TurnResult {
                        text: APOLOGY_TEXT.to_string(),
                        is_diagnostic_answer: false,
                        updated_state: merged,
                    };
                }
            }
        }
    }

    async fn complete(&self, utterance: &str) -> Result<String, AdapterError> {
        tokio::time::timeout(self.call_timeout, self.completion.complete(utterance))
            .await
            .map_err(|_| {
                AdapterError::EngineUnavailable(format!(
                    "completion call timed out after {}s",
                    self.call_timeout.as_secs_f64()
                ))
            })?
    }
}

/// Case-insensitive check against the fixed hedge blacklist.
fn is_hedged(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    HEDGE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

// =============================================================================
// Tests
// =============================================================================
