//! Diagnosis adapter: ranked conditions for the current evidence set.
//!
//! Wraps the diagnosis collaborator with a per-call timeout and the
//! empty-evidence short-circuit (the backend requires at least one evidence
//! item, so an empty set never leaves the process).

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use sympta_core::types::{EvidenceItem, RankedCondition, Sex};

use crate::collaborators::DiagnosisEngine;
use crate::error::AdapterError;

/// Adapter over the diagnosis collaborator.
pub struct DiagnosisAdapter {
    engine: Arc<dyn DiagnosisEngine>,
    call_timeout: Duration,
}

impl DiagnosisAdapter {
    pub fn new(engine: Arc<dyn DiagnosisEngine>, call_timeout: Duration) -> Self {
        Self {
            engine,
            call_timeout,
        }
    }

    /// Rank conditions for the accumulated evidence.
    ///
    /// Empty evidence returns an empty ranking without a collaborator call.
    /// Conditions come back pre-sorted by descending probability and are
    /// passed through untouched. Callers treat an error exactly like an
    /// empty ranking.
    pub async fn diagnose(
        &self,
        evidence: &[EvidenceItem],
        sex: Sex,
        age: u32,
    ) -> Result<Vec<RankedCondition>, AdapterError> {
        if evidence.is_empty() {
            debug!("No evidence accumulated; skipping diagnosis call");
            return Ok(Vec::new());
        }

        let conditions =
            tokio::time::timeout(self.call_timeout, self.engine.diagnose(evidence, sex, age))
                .await
                .map_err(|_| {
                    AdapterError::DiagnosisUnavailable(format!(
                        "diagnosis call timed out after {}s",
                        self.call_timeout.as_secs_f64()
                    ))
                })??;

        debug!(count = conditions.len(), "Diagnosis returned");
        Ok(conditions)
    }
}

// =============================================================================
// Tests
// =============================================================================
