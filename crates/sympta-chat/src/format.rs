//! Deterministic rendering of a ranked differential into user-facing text.

use sympta_core::types::RankedCondition;

/// How many conditions the rendered answer lists at most.
pub const MAX_LISTED_CONDITIONS: usize = 3;

const HEADER: &str = "Based on your symptoms, here are the possible conditions:";
const RECOMMEND_CONSULT: &str =
    "1. Please consult with a healthcare professional for proper diagnosis and treatment.";
const RECOMMEND_URGENT: &str =
    "2. If symptoms worsen or you experience severe symptoms, seek immediate medical attention.";

/// Render ranked conditions as a bulleted answer with the safety footer.
///
/// Takes at most the first [`MAX_LISTED_CONDITIONS`] entries (the backend
/// already sorted by descending probability), one bullet per condition with
/// the probability as a percentage rounded half-up to one decimal. Pure and
/// deterministic: identical input yields byte-identical output.
///
/// Callers must not pass an empty slice; a turn with no conditions takes
/// the fallback path instead of rendering a diagnosis.
pub fn format_conditions(conditions: &[RankedCondition]) -> String {
    debug_assert!(
        !conditions.is_empty(),
        "an empty differential must not be rendered"
    );

    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n\n");

    for condition in conditions.iter().take(MAX_LISTED_CONDITIONS) {
        out.push_str(&format!(
            "- {} ({}% probability)\n",
            condition.name,
            percent(condition.probability)
        ));
    }

    out.push_str("\nRecommendations:\n");
    out.push_str(RECOMMEND_CONSULT);
    out.push('\n');
    out.push_str(RECOMMEND_URGENT);
    out.push('\n');
    out
}

/// Probability as a percentage string, rounded half-up to one decimal.
fn percent(probability: f64) -> String {
    format!("{:.1}", (probability * 1000.0).round() / 10.0)
}

// =============================================================================
// Tests
// =============================================================================
