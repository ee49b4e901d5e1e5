use std::collections::BTreeMap;

use parley_core::domain::intervention::EmotionalState;
use serde::{Deserialize, Serialize};

/// Messages arriving from the voice engine over the session socket. Only the
/// variants the adapter reacts to are modeled in full; anything else lands
/// on `Unsupported` so new engine message types never break the stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    ChatStarted {
        #[serde(default)]
        chat_id: Option<String>,
    },
    UserUtterance {
        text: String,
        #[serde(default)]
        emotions: EmotionalState,
    },
    AssistantUtterance {
        text: String,
    },
    ToolCallRequest {
        call_id: String,
        name: String,
        /// JSON-encoded argument object, as the engine sends it.
        arguments: String,
    },
    AudioFrame {
        #[serde(default)]
        byte_len: usize,
    },
    EngineError {
        message: String,
    },
    #[serde(other)]
    Unsupported,
}

/// Messages the adapter sends back to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceResponse {
    ToolCallResponse {
        tool_call_id: String,
        /// JSON-encoded payload the dialogue model folds into its reply.
        content: String,
    },
    ToolCallError {
        tool_call_id: String,
        message: String,
    },
    SessionVariables {
        variables: BTreeMap<String, String>,
    },
    AssistantInput {
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::VoiceEvent;

    #[test]
    fn engine_events_deserialize_from_tagged_json() {
        let event: VoiceEvent = serde_json::from_str(
            r#"{"type":"user_utterance","text":"I want to settle","emotions":{"anger":0.4}}"#,
        )
        .expect("valid event");

        match event {
            VoiceEvent::UserUtterance { text, emotions } => {
                assert_eq!(text, "I want to settle");
                assert_eq!(emotions.get("anger"), Some(&0.4));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_engine_events_fall_through_to_unsupported() {
        let event: VoiceEvent =
            serde_json::from_str(r#"{"type":"speculative_new_thing"}"#).expect("valid json");
        assert_eq!(event, VoiceEvent::Unsupported);
    }
}
