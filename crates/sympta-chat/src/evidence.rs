//! Evidence accumulation across the turns of a chat.
//!
//! Pure functions over `ConversationState`; persistence belongs to the
//! caller. The merge is append-only by contract: repeated identical
//! utterances produce repeated entries, and nothing here deduplicates or
//! validates ids against existing entries.

use sympta_core::types::{ConversationState, EvidenceItem};

/// Fresh state for a chat with no prior turns.
pub fn initialize() -> ConversationState {
    ConversationState::default()
}

/// Append newly extracted evidence, preserving discovery order.
pub fn merge(mut state: ConversationState, new_items: Vec<EvidenceItem>) -> ConversationState {
    state.evidence.extend(new_items);
    state
}

// =============================================================================
// Tests
// =============================================================================
