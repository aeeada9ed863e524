//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ServerConfig, TlsConfig};

/// Every variable read by [`apply_env`].
pub(crate) const ENV_KEYS: &[&str] = &[
    "HOST",
    "PORT",
    "TLS_ENABLED",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "PUBLIC_URL",
    "MAX_CONCURRENT_CALLS",
    "REALTIME_PROVIDER",
    "REALTIME_MODEL",
    "REALTIME_VOICE",
    "SYSTEM_INSTRUCTIONS",
    "GREETING",
    "TEMPERATURE",
    "TOP_P",
    "SETUP_TIMEOUT_MS",
    "FORWARD_AUDIO_WHILE_SPEAKING",
    "VAD_DISABLED",
    "VAD_START_SENSITIVITY",
    "VAD_END_SENSITIVITY",
    "VAD_PREFIX_PADDING_MS",
    "VAD_SILENCE_DURATION_MS",
    "GEMINI_INPUT_SAMPLE_RATE",
    "OPENAI_AUDIO_FORMAT",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "VOBIZ_API_URL",
    "VOBIZ_AUTH_ID",
    "VOBIZ_AUTH_TOKEN",
    "TRANSCRIPT_TTL_SECONDS",
    "TRANSCRIPT_QUEUE_CAPACITY",
    "CUSTOMER_NAME",
    "CUSTOMER_AGE",
    "CUSTOMER_GENDER",
    "CUSTOMER_ADDRESS",
];

/// Read a variable, treating empty values as unset.
fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Env(format!("Invalid value for {key}: {e}"))),
        None => Ok(None),
    }
}

fn parse_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match var(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            other => Err(ConfigError::Env(format!(
                "Invalid value for {key}: expected a boolean, got '{other}'"
            ))),
        },
        None => Ok(None),
    }
}

/// Overlay environment variables on `config`.
pub(crate) fn apply_env(config: &mut ServerConfig) -> Result<(), ConfigError> {
    if let Some(host) = var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse("PORT")? {
        config.port = port;
    }

    let tls_enabled = parse_bool("TLS_ENABLED")?.unwrap_or(false);
    if tls_enabled {
        let cert_path = var("TLS_CERT_PATH").ok_or_else(|| {
            ConfigError::Env("TLS_CERT_PATH is required when TLS_ENABLED=true".to_string())
        })?;
        let key_path = var("TLS_KEY_PATH").ok_or_else(|| {
            ConfigError::Env("TLS_KEY_PATH is required when TLS_ENABLED=true".to_string())
        })?;
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        });
    }

    if let Some(url) = var("PUBLIC_URL") {
        config.public_url = Some(url);
    }
    if let Some(max) = parse("MAX_CONCURRENT_CALLS")? {
        config.max_concurrent_calls = Some(max);
    }

    if let Some(provider) = var("REALTIME_PROVIDER") {
        config.realtime_provider = provider.to_lowercase();
    }
    if let Some(model) = var("REALTIME_MODEL") {
        config.realtime_model = Some(model);
    }
    if let Some(voice) = var("REALTIME_VOICE") {
        config.realtime_voice = Some(voice);
    }
    if let Some(instructions) = var("SYSTEM_INSTRUCTIONS") {
        config.instructions = Some(instructions);
    }
    if let Ok(greeting) = env::var("GREETING") {
        config.greeting = Some(greeting).filter(|g| !g.trim().is_empty());
    }
    if let Some(temperature) = parse("TEMPERATURE")? {
        config.temperature = temperature;
    }
    if let Some(top_p) = parse("TOP_P")? {
        config.top_p = top_p;
    }
    if let Some(timeout) = parse("SETUP_TIMEOUT_MS")? {
        config.setup_timeout_ms = timeout;
    }
    if let Some(forward) = parse_bool("FORWARD_AUDIO_WHILE_SPEAKING")? {
        config.forward_audio_while_speaking = forward;
    }

    if let Some(disabled) = parse_bool("VAD_DISABLED")? {
        config.vad_disabled = disabled;
    }
    if let Some(sensitivity) = var("VAD_START_SENSITIVITY") {
        config.vad_start_sensitivity = sensitivity;
    }
    if let Some(sensitivity) = var("VAD_END_SENSITIVITY") {
        config.vad_end_sensitivity = sensitivity;
    }
    if let Some(ms) = parse("VAD_PREFIX_PADDING_MS")? {
        config.vad_prefix_padding_ms = ms;
    }
    if let Some(ms) = parse("VAD_SILENCE_DURATION_MS")? {
        config.vad_silence_duration_ms = ms;
    }

    if let Some(rate) = parse("GEMINI_INPUT_SAMPLE_RATE")? {
        config.gemini_input_sample_rate = rate;
    }
    if let Some(format) = var("OPENAI_AUDIO_FORMAT") {
        config.openai_audio_format = format.to_lowercase();
    }

    if let Some(key) = var("GEMINI_API_KEY") {
        config.gemini_api_key = Some(key);
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.openai_api_key = Some(key);
    }

    if let Some(url) = var("VOBIZ_API_URL") {
        config.vobiz_api_url = url;
    }
    if let Some(id) = var("VOBIZ_AUTH_ID") {
        config.vobiz_auth_id = Some(id);
    }
    if let Some(token) = var("VOBIZ_AUTH_TOKEN") {
        config.vobiz_auth_token = Some(token);
    }

    if let Some(ttl) = parse("TRANSCRIPT_TTL_SECONDS")? {
        config.transcript_ttl_seconds = ttl;
    }
    if let Some(capacity) = parse("TRANSCRIPT_QUEUE_CAPACITY")? {
        config.transcript_queue_capacity = capacity;
    }

    if let Some(name) = var("CUSTOMER_NAME") {
        config.customer.name = name;
    }
    if let Some(age) = parse("CUSTOMER_AGE")? {
        config.customer.age = age;
    }
    if let Some(gender) = var("CUSTOMER_GENDER") {
        config.customer.gender = gender;
    }
    if let Some(address) = var("CUSTOMER_ADDRESS") {
        config.customer.address = address;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in ENV_KEYS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides_defaults() {
        clear_env();
        unsafe {
            env::set_var("HOST", "127.0.0.1");
            env::set_var("REALTIME_PROVIDER", "OpenAI");
            env::set_var("OPENAI_AUDIO_FORMAT", "G711_ULAW");
            env::set_var("VAD_DISABLED", "yes");
            env::set_var("CUSTOMER_AGE", "52");
        }

        let mut config = ServerConfig::default();
        apply_env(&mut config).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.realtime_provider, "openai");
        assert_eq!(config.openai_audio_format, "g711_ulaw");
        assert!(config.vad_disabled);
        assert_eq!(config.customer.age, 52);
        assert_eq!(config.port, 3000);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_empty_greeting_disables_it() {
        clear_env();
        unsafe {
            env::set_var("GREETING", "");
        }

        let mut config = ServerConfig::default();
        apply_env(&mut config).unwrap();
        assert_eq!(config.greeting, None);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_rejected() {
        clear_env();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let mut config = ServerConfig::default();
        let err = apply_env(&mut config).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_tls_requires_paths() {
        clear_env();
        unsafe {
            env::set_var("TLS_ENABLED", "true");
            env::set_var("TLS_CERT_PATH", "/tmp/cert.pem");
        }

        let mut config = ServerConfig::default();
        let err = apply_env(&mut config).unwrap_err();
        assert!(err.to_string().contains("TLS_KEY_PATH"));

        clear_env();
    }
}
