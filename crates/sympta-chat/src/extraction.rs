//! Symptom extraction: one utterance in, zero or more evidence items out.
//!
//! Wraps the parsing collaborator with a per-call timeout and the mention
//! filter. A failed or timed-out parse degrades to "no new evidence this
//! turn"; extraction never aborts a turn.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use sympta_core::types::{EvidenceItem, Sex};

use crate::collaborators::SymptomParser;
use crate::error::AdapterError;

/// Adapter over the parsing collaborator.
pub struct SymptomExtractor {
    parser: Arc<dyn SymptomParser>,
    call_timeout: Duration,
}

impl SymptomExtractor {
    pub fn new(parser: Arc<dyn SymptomParser>, call_timeout: Duration) -> Self {
        Self {
            parser,
            call_timeout,
        }
    }

    /// Extract evidence from one utterance.
    ///
    /// Every returned mention with type "symptom" becomes an evidence item,
    /// defaulting to `present` when the parser gave no explicit choice;
    /// mentions of other types are dropped. Failures are absorbed into an
    /// empty result.
    pub async fn extract(&self, utterance: &str, sex: Sex, age: u32) -> Vec<EvidenceItem> {
        match self.try_extract(utterance, sex, age).await {
            Ok(items) => {
                debug!(count = items.len(), "Symptoms extracted");
                items
            }
            Err(e) => {
                warn!(error = %e, "Symptom extraction failed; continuing with no new evidence");
                Vec::new()
            }
        }
    }

    async fn try_extract(
        &self,
        utterance: &str,
        sex: Sex,
        age: u32,
    ) -> Result<Vec<EvidenceItem>, AdapterError> {
        let mentions = tokio::time::timeout(self.call_timeout, self.parser.parse(utterance, sex, age))
            .await
            .map_err(|_| {
                AdapterError::ParseFailed(format!(
                    "parse call timed out after {}s",
                    self.call_timeout.as_secs_f64()
                ))
            })??;

        Ok(mentions
            .into_iter()
            .filter(|m| m.is_symptom())
            .map(|m| EvidenceItem {
                id: m.id,
                choice_id: m.choice_id.unwrap_or_default(),
                initial: true,
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
