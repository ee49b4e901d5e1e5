use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::decimal_from_f64;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub voice: VoiceConfig,
    pub planner: PlannerConfig,
    pub claims: ClaimsConfig,
    pub approval: ApprovalConfig,
    pub webhook: WebhookConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct VoiceConfig {
    pub api_key: SecretString,
    pub config_id: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice_name: String,
    pub connect_retries: u32,
    pub retry_delay_secs: u64,
    pub max_session_secs: u64,
    pub silence_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ClaimsConfig {
    pub seed_demo_data: bool,
}

#[derive(Clone, Debug)]
pub struct ApprovalConfig {
    pub threshold: Decimal,
    pub demo_mode: bool,
    pub bypass_amounts: Vec<Decimal>,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub bind_address: String,
    pub port: u16,
    pub secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub voice_api_key: Option<String>,
    pub planner_enabled: Option<bool>,
    pub planner_api_key: Option<String>,
    pub approval_threshold: Option<Decimal>,
    pub approval_demo_mode: Option<bool>,
    pub webhook_secret: Option<String>,
    pub webhook_port: Option<u16>,
    pub seed_demo_data: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            voice: VoiceConfig {
                api_key: String::new().into(),
                config_id: None,
                base_url: "wss://api.hume.ai/v0/evi/chat".to_string(),
                model: "evi-3".to_string(),
                voice_name: "ito".to_string(),
                connect_retries: 3,
                retry_delay_secs: 3,
                max_session_secs: 1_800,
                silence_timeout_secs: 10,
            },
            planner: PlannerConfig {
                enabled: false,
                api_key: None,
                base_url: "https://api.portialabs.ai".to_string(),
                timeout_secs: 30,
            },
            claims: ClaimsConfig { seed_demo_data: true },
            approval: ApprovalConfig {
                threshold: Decimal::new(15_000, 0),
                demo_mode: false,
                bypass_amounts: vec![Decimal::new(25_000, 0)],
            },
            webhook: WebhookConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                secret: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("parley.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(voice) = patch.voice {
            if let Some(voice_api_key_value) = voice.api_key {
                self.voice.api_key = secret_value(voice_api_key_value);
            }
            if let Some(config_id) = voice.config_id {
                self.voice.config_id = Some(config_id);
            }
            if let Some(base_url) = voice.base_url {
                self.voice.base_url = base_url;
            }
            if let Some(model) = voice.model {
                self.voice.model = model;
            }
            if let Some(voice_name) = voice.voice_name {
                self.voice.voice_name = voice_name;
            }
            if let Some(connect_retries) = voice.connect_retries {
                self.voice.connect_retries = connect_retries;
            }
            if let Some(retry_delay_secs) = voice.retry_delay_secs {
                self.voice.retry_delay_secs = retry_delay_secs;
            }
            if let Some(max_session_secs) = voice.max_session_secs {
                self.voice.max_session_secs = max_session_secs;
            }
            if let Some(silence_timeout_secs) = voice.silence_timeout_secs {
                self.voice.silence_timeout_secs = silence_timeout_secs;
            }
        }

        if let Some(planner) = patch.planner {
            if let Some(enabled) = planner.enabled {
                self.planner.enabled = enabled;
            }
            if let Some(planner_api_key_value) = planner.api_key {
                self.planner.api_key = Some(secret_value(planner_api_key_value));
            }
            if let Some(base_url) = planner.base_url {
                self.planner.base_url = base_url;
            }
            if let Some(timeout_secs) = planner.timeout_secs {
                self.planner.timeout_secs = timeout_secs;
            }
        }

        if let Some(claims) = patch.claims {
            if let Some(seed_demo_data) = claims.seed_demo_data {
                self.claims.seed_demo_data = seed_demo_data;
            }
        }

        if let Some(approval) = patch.approval {
            if let Some(threshold) = approval.threshold {
                self.approval.threshold = decimal_from_f64(threshold);
            }
            if let Some(demo_mode) = approval.demo_mode {
                self.approval.demo_mode = demo_mode;
            }
            if let Some(bypass_amounts) = approval.bypass_amounts {
                self.approval.bypass_amounts =
                    bypass_amounts.into_iter().map(decimal_from_f64).collect();
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(bind_address) = webhook.bind_address {
                self.webhook.bind_address = bind_address;
            }
            if let Some(port) = webhook.port {
                self.webhook.port = port;
            }
            if let Some(webhook_secret_value) = webhook.secret {
                self.webhook.secret = Some(secret_value(webhook_secret_value));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PARLEY_VOICE_API_KEY") {
            self.voice.api_key = secret_value(value);
        }
        if let Some(value) = read_env("PARLEY_VOICE_CONFIG_ID") {
            self.voice.config_id = Some(value);
        }
        if let Some(value) = read_env("PARLEY_VOICE_BASE_URL") {
            self.voice.base_url = value;
        }
        if let Some(value) = read_env("PARLEY_VOICE_MODEL") {
            self.voice.model = value;
        }
        if let Some(value) = read_env("PARLEY_VOICE_VOICE_NAME") {
            self.voice.voice_name = value;
        }
        if let Some(value) = read_env("PARLEY_VOICE_CONNECT_RETRIES") {
            self.voice.connect_retries = parse_u32("PARLEY_VOICE_CONNECT_RETRIES", &value)?;
        }
        if let Some(value) = read_env("PARLEY_VOICE_RETRY_DELAY_SECS") {
            self.voice.retry_delay_secs = parse_u64("PARLEY_VOICE_RETRY_DELAY_SECS", &value)?;
        }
        if let Some(value) = read_env("PARLEY_VOICE_MAX_SESSION_SECS") {
            self.voice.max_session_secs = parse_u64("PARLEY_VOICE_MAX_SESSION_SECS", &value)?;
        }
        if let Some(value) = read_env("PARLEY_VOICE_SILENCE_TIMEOUT_SECS") {
            self.voice.silence_timeout_secs =
                parse_u64("PARLEY_VOICE_SILENCE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PARLEY_PLANNER_ENABLED") {
            self.planner.enabled = parse_bool("PARLEY_PLANNER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PARLEY_PLANNER_API_KEY") {
            self.planner.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PARLEY_PLANNER_BASE_URL") {
            self.planner.base_url = value;
        }
        if let Some(value) = read_env("PARLEY_PLANNER_TIMEOUT_SECS") {
            self.planner.timeout_secs = parse_u64("PARLEY_PLANNER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PARLEY_CLAIMS_SEED_DEMO_DATA") {
            self.claims.seed_demo_data = parse_bool("PARLEY_CLAIMS_SEED_DEMO_DATA", &value)?;
        }

        if let Some(value) = read_env("PARLEY_APPROVAL_THRESHOLD") {
            self.approval.threshold = parse_decimal("PARLEY_APPROVAL_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("PARLEY_APPROVAL_DEMO_MODE") {
            self.approval.demo_mode = parse_bool("PARLEY_APPROVAL_DEMO_MODE", &value)?;
        }

        if let Some(value) = read_env("PARLEY_WEBHOOK_BIND_ADDRESS") {
            self.webhook.bind_address = value;
        }
        if let Some(value) = read_env("PARLEY_WEBHOOK_PORT") {
            self.webhook.port = parse_u16("PARLEY_WEBHOOK_PORT", &value)?;
        }
        if let Some(value) = read_env("PARLEY_WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret_value(value));
        }

        let log_level = read_env("PARLEY_LOGGING_LEVEL").or_else(|| read_env("PARLEY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PARLEY_LOGGING_FORMAT").or_else(|| read_env("PARLEY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(voice_api_key) = overrides.voice_api_key {
            self.voice.api_key = secret_value(voice_api_key);
        }
        if let Some(planner_enabled) = overrides.planner_enabled {
            self.planner.enabled = planner_enabled;
        }
        if let Some(planner_api_key) = overrides.planner_api_key {
            self.planner.api_key = Some(secret_value(planner_api_key));
        }
        if let Some(approval_threshold) = overrides.approval_threshold {
            self.approval.threshold = approval_threshold;
        }
        if let Some(approval_demo_mode) = overrides.approval_demo_mode {
            self.approval.demo_mode = approval_demo_mode;
        }
        if let Some(webhook_secret) = overrides.webhook_secret {
            self.webhook.secret = Some(secret_value(webhook_secret));
        }
        if let Some(webhook_port) = overrides.webhook_port {
            self.webhook.port = webhook_port;
        }
        if let Some(seed_demo_data) = overrides.seed_demo_data {
            self.claims.seed_demo_data = seed_demo_data;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_voice(&self.voice)?;
        validate_planner(&self.planner)?;
        validate_approval(&self.approval)?;
        validate_webhook(&self.webhook)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("parley.toml"), PathBuf::from("config/parley.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_voice(voice: &VoiceConfig) -> Result<(), ConfigError> {
    if voice.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "voice.api_key is required to open engine sessions".to_string(),
        ));
    }

    let base_url = voice.base_url.trim();
    if !base_url.starts_with("wss://") && !base_url.starts_with("ws://") {
        return Err(ConfigError::Validation(
            "voice.base_url must be a websocket URL (ws:// or wss://)".to_string(),
        ));
    }

    if voice.connect_retries > 10 {
        return Err(ConfigError::Validation(
            "voice.connect_retries must be at most 10".to_string(),
        ));
    }
    if voice.retry_delay_secs == 0 || voice.retry_delay_secs > 60 {
        return Err(ConfigError::Validation(
            "voice.retry_delay_secs must be in range 1..=60".to_string(),
        ));
    }
    if voice.max_session_secs < 60 || voice.max_session_secs > 14_400 {
        return Err(ConfigError::Validation(
            "voice.max_session_secs must be in range 60..=14400".to_string(),
        ));
    }
    if voice.silence_timeout_secs == 0 || voice.silence_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "voice.silence_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_planner(planner: &PlannerConfig) -> Result<(), ConfigError> {
    if planner.timeout_secs == 0 || planner.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "planner.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if planner.enabled {
        let missing = planner
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "planner.api_key is required when planner.enabled is true".to_string(),
            ));
        }

        let base_url = planner.base_url.trim();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "planner.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_approval(approval: &ApprovalConfig) -> Result<(), ConfigError> {
    if approval.threshold <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "approval.threshold must be greater than zero".to_string(),
        ));
    }

    if approval.demo_mode {
        if approval.bypass_amounts.is_empty() {
            return Err(ConfigError::Validation(
                "approval.demo_mode is true but approval.bypass_amounts is empty".to_string(),
            ));
        }
        if approval.bypass_amounts.iter().any(|amount| *amount <= Decimal::ZERO) {
            return Err(ConfigError::Validation(
                "approval.bypass_amounts must all be greater than zero".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if webhook.port == 0 {
        return Err(ConfigError::Validation(
            "webhook.port must be greater than zero".to_string(),
        ));
    }
    if webhook.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "webhook.bind_address must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    voice: Option<VoicePatch>,
    planner: Option<PlannerPatch>,
    claims: Option<ClaimsPatch>,
    approval: Option<ApprovalPatch>,
    webhook: Option<WebhookPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct VoicePatch {
    api_key: Option<String>,
    config_id: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    voice_name: Option<String>,
    connect_retries: Option<u32>,
    retry_delay_secs: Option<u64>,
    max_session_secs: Option<u64>,
    silence_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlannerPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClaimsPatch {
    seed_demo_data: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalPatch {
    threshold: Option<f64>,
    demo_mode: Option<bool>,
    bypass_amounts: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
