use parley_agent::tools::tool_specs;
use parley_core::config::VoiceConfig;
use serde_json::{json, Value};

const SYSTEM_PROMPT: &str = "\
You are a calm, empathetic insurance settlement specialist on a live phone \
call. Keep replies short and speakable. When the caller gives a claim \
reference, call lookup_claim before answering. When a settlement amount is \
discussed, call calculate_settlement_offer; never invent numbers yourself. \
Escalate to a specialist or request human intervention when the situation \
calls for it, and tell the caller what happens next.";

/// Builds the once-per-session configuration payload sent to the voice
/// engine: prompt, model and voice selection, registered tools, feature
/// flags, limits, and webhook event URLs.
#[derive(Clone, Debug)]
pub struct SessionConfigBuilder {
    name: String,
    model: String,
    voice_name: String,
    max_session_secs: u64,
    silence_timeout_secs: u64,
    webhook_base_url: Option<String>,
    extra_instructions: Vec<String>,
}

impl SessionConfigBuilder {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            name: "Parley Settlement Agent".to_owned(),
            model: config.model.clone(),
            voice_name: config.voice_name.clone(),
            max_session_secs: config.max_session_secs,
            silence_timeout_secs: config.silence_timeout_secs,
            webhook_base_url: None,
            extra_instructions: Vec::new(),
        }
    }

    pub fn webhook_base_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_base_url = Some(url.into());
        self
    }

    /// Appends situational guidance to the system prompt, e.g. a note about
    /// the caller's known claim history.
    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.extra_instructions.push(text.into());
        self
    }

    pub fn build(&self) -> Value {
        let mut prompt = SYSTEM_PROMPT.to_owned();
        for instruction in &self.extra_instructions {
            prompt.push_str("\n\n");
            prompt.push_str(instruction);
        }

        let tools: Vec<Value> = tool_specs().iter().map(|spec| spec.schema()).collect();

        let mut payload = json!({
            "name": self.name,
            "version": self.model,
            "system_prompt": prompt,
            "voice": { "name": self.voice_name },
            "tools": tools,
            "features": {
                "allow_interruptions": true,
                "enable_chat_history": true,
                "context_injection": true,
                "dynamic_variables": true,
            },
            "session_settings": {
                "max_duration": self.max_session_secs,
                "silence_timeout": self.silence_timeout_secs,
            },
        });

        if let Some(base) = &self.webhook_base_url {
            let base = base.trim_end_matches('/');
            payload["webhooks"] = json!({
                "chat_started": { "url": format!("{base}/chat_started") },
                "chat_ended": { "url": format!("{base}/chat_ended") },
                "tool_called": { "url": format!("{base}/tool_called") },
            });
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use parley_core::config::AppConfig;

    use super::SessionConfigBuilder;

    fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::from_config(&AppConfig::default().voice)
    }

    #[test]
    fn payload_registers_all_tools_with_limits() {
        let payload = builder().build();

        assert_eq!(payload["version"], "evi-3");
        assert_eq!(payload["voice"]["name"], "ito");
        assert_eq!(payload["tools"].as_array().map(Vec::len), Some(5));
        assert_eq!(payload["session_settings"]["max_duration"], 1800);
        assert_eq!(payload["session_settings"]["silence_timeout"], 10);
        assert!(payload.get("webhooks").is_none());
    }

    #[test]
    fn webhook_urls_derive_from_the_base() {
        let payload = builder().webhook_base_url("https://example.test/webhook/").build();
        assert_eq!(
            payload["webhooks"]["chat_ended"]["url"],
            "https://example.test/webhook/chat_ended"
        );
    }

    #[test]
    fn extra_instructions_extend_the_prompt() {
        let payload = builder().instruction("The caller prefers Spanish.").build();
        let prompt = payload["system_prompt"].as_str().unwrap_or_default();
        assert!(prompt.ends_with("The caller prefers Spanish."));
    }
}
