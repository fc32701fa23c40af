//! Failure taxonomy for the external reasoning backends.

/// Errors raised by collaborator calls.
///
/// None of these ever reach the user: each one is absorbed by the turn
/// orchestrator and converted into the next transition of its fallback
/// chain. The only user-visible degradation is the fixed apology text,
/// which is a success response, not an error.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The parsing backend failed or returned a malformed payload.
    #[error("symptom parse failed: {0}")]
    ParseFailed(String),
    /// The diagnosis backend failed, returned a non-success status, or
    /// returned a malformed payload.
    #[error("diagnosis unavailable: {0}")]
    DiagnosisUnavailable(String),
    /// The free-text completion backend is unreachable or failed.
    #[error("completion engine unavailable: {0}")]
    EngineUnavailable(String),
}
