use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SymptaError};

/// Current version of the persisted conversation state schema.
pub const STATE_VERSION: u32 = 1;

/// Demographic default used when a chat has not stated the patient's age.
pub const DEFAULT_AGE: u32 = 30;

// =============================================================================
// Enums
// =============================================================================

/// Biological sex as understood by the diagnosis backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

/// Presence state attached to a piece of evidence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// The symptom was reported as present (default when the parser gives
    /// no explicit value).
    #[default]
    Present,
    /// The symptom was explicitly denied.
    Absent,
    /// The user could not say either way.
    Unknown,
}

/// Who authored a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl TryFrom<&str> for Sender {
    type Error = SymptaError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            other => Err(SymptaError::State(format!("unknown sender: {}", other))),
        }
    }
}

// =============================================================================
// Evidence
// =============================================================================

/// One detected symptom mention, accumulated per chat.
///
/// The `id` comes from the parsing backend's vocabulary and is treated as an
/// opaque string everywhere in this system; only the diagnosis backend can
/// interpret it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    #[serde(default)]
    pub choice_id: Choice,
    /// User-reported (as opposed to derived from a follow-up question).
    /// Always true for items produced by the extraction adapter.
    pub initial: bool,
}

impl EvidenceItem {
    /// Build a user-reported evidence item.
    pub fn reported(id: impl Into<String>, choice_id: Choice) -> Self {
        Self {
            id: id.into(),
            choice_id,
            initial: true,
        }
    }
}

/// A raw detection from the parsing backend, before filtering into evidence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    /// Detection category as reported by the parser (e.g. "symptom",
    /// "risk_factor"). Only symptom mentions become evidence.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<Choice>,
}

impl Mention {
    pub fn is_symptom(&self) -> bool {
        self.kind == "symptom"
    }
}

// =============================================================================
// Diagnosis output
// =============================================================================

/// One row of a ranked differential diagnosis.
///
/// The diagnosis backend returns conditions already sorted by descending
/// probability; consumers truncate and render but never re-sort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCondition {
    pub name: String,
    /// Probability in [0, 1].
    pub probability: f64,
}

// =============================================================================
// Conversation state
// =============================================================================

/// Per-chat reasoning state: accumulated evidence plus demographic defaults.
///
/// Persisted as versioned JSON in the chat store. `evidence` only grows
/// within a chat's lifetime; it is never cleared except by starting a new
/// chat. Duplicate entries are deliberate (repeated identical utterances
/// produce repeated evidence).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default = "default_age")]
    pub age: u32,
}

fn default_version() -> u32 {
    STATE_VERSION
}

fn default_age() -> u32 {
    DEFAULT_AGE
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            evidence: Vec::new(),
            sex: Sex::default(),
            age: DEFAULT_AGE,
        }
    }
}

impl ConversationState {
    /// Check schema invariants on a state loaded from storage.
    pub fn validate(&self) -> Result<()> {
        if self.version != STATE_VERSION {
            return Err(SymptaError::State(format!(
                "unsupported state version {} (expected {})",
                self.version, STATE_VERSION
            )));
        }
        if self.age == 0 {
            return Err(SymptaError::State("age must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse and validate a persisted state blob.
    pub fn from_json(json: &str) -> Result<Self> {
        let state: ConversationState = serde_json::from_str(json)?;
        state.validate()?;
        Ok(state)
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Turn output
// =============================================================================

/// The orchestrator's answer for one user turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnResult {
    /// The message to show the user. Never empty.
    pub text: String,
    /// True when `text` came from the diagnosis pipeline rather than the
    /// free-text engine or the apology fallback.
    pub is_diagnostic_answer: bool,
    /// The state to persist. `Some` only when evidence changed this turn.
    pub updated_state: Option<ConversationState>,
}

// =============================================================================
// Chat records
// =============================================================================

/// A stored chat, without its messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Enum serde ----

    #[test]
    fn test_sex_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Sex::Male).unwrap(), "\"male\"");
        assert_eq!(serde_json::to_string(&Sex::Female).unwrap(), "\"female\"");
        let sex: Sex = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(sex, Sex::Female);
    }

    #[test]
    fn test_sex_default_is_male() {
        assert_eq!(Sex::default(), Sex::Male);
    }

    #[test]
    fn test_choice_default_is_present() {
        assert_eq!(Choice::default(), Choice::Present);
    }

    #[test]
    fn test_choice_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Choice::Absent).unwrap(), "\"absent\"");
        let c: Choice = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(c, Choice::Unknown);
    }

    #[test]
    fn test_sender_round_trip() {
        assert_eq!(Sender::User.as_str(), "user");
        assert_eq!(Sender::try_from("assistant").unwrap(), Sender::Assistant);
        assert!(Sender::try_from("ai").is_err());
    }

    // ---- Evidence ----

    #[test]
    fn test_reported_evidence_is_initial() {
        let item = EvidenceItem::reported("s_98", Choice::Present);
        assert_eq!(item.id, "s_98");
        assert!(item.initial);
    }

    #[test]
    fn test_evidence_item_choice_defaults_on_deserialize() {
        let item: EvidenceItem =
            serde_json::from_str(r#"{"id":"s_1","initial":true}"#).unwrap();
        assert_eq!(item.choice_id, Choice::Present);
    }

    #[test]
    fn test_mention_type_field_rename() {
        let mention: Mention =
            serde_json::from_str(r#"{"id":"s_21","type":"symptom","choice_id":"present"}"#)
                .unwrap();
        assert!(mention.is_symptom());
        assert_eq!(mention.choice_id, Some(Choice::Present));
    }

    #[test]
    fn test_mention_without_choice() {
        let mention: Mention =
            serde_json::from_str(r#"{"id":"p_8","type":"risk_factor"}"#).unwrap();
        assert!(!mention.is_symptom());
        assert_eq!(mention.choice_id, None);
    }

    // ---- Conversation state ----

    #[test]
    fn test_state_default() {
        let state = ConversationState::default();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.evidence.is_empty());
        assert_eq!(state.sex, Sex::Male);
        assert_eq!(state.age, DEFAULT_AGE);
    }

    #[test]
    fn test_state_json_round_trip() {
        let mut state = ConversationState::default();
        state.evidence.push(EvidenceItem::reported("s_98", Choice::Present));
        state.sex = Sex::Female;
        state.age = 52;

        let json = state.to_json().unwrap();
        let back = ConversationState::from_json(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_state_from_legacy_blob_fills_defaults() {
        // A pre-versioning blob carrying only evidence still loads.
        let json = r#"{"evidence":[{"id":"s_1","choice_id":"absent","initial":true}]}"#;
        let state = ConversationState::from_json(json).unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.sex, Sex::Male);
        assert_eq!(state.age, DEFAULT_AGE);
        assert_eq!(state.evidence.len(), 1);
        assert_eq!(state.evidence[0].choice_id, Choice::Absent);
    }

    #[test]
    fn test_state_rejects_unknown_version() {
        let json = r#"{"version":99,"evidence":[]}"#;
        let err = ConversationState::from_json(json).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_state_rejects_zero_age() {
        let json = r#"{"evidence":[],"age":0}"#;
        assert!(ConversationState::from_json(json).is_err());
    }

    #[test]
    fn test_state_rejects_malformed_json() {
        assert!(ConversationState::from_json("not json").is_err());
    }

    #[test]
    fn test_state_preserves_evidence_order() {
        let json = r#"{"evidence":[
            {"id":"s_2","initial":true},
            {"id":"s_1","initial":true},
            {"id":"s_2","initial":true}
        ]}"#;
        let state = ConversationState::from_json(json).unwrap();
        let ids: Vec<&str> = state.evidence.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["s_2", "s_1", "s_2"]);
    }
}
