//! Configuration validation logic.

use thiserror::Error;

use super::ServerConfig;
use crate::core::codec::AudioFormat;
use crate::core::realtime::{OpenAIRealtimeAudioFormat, RealtimeProvider};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A YAML file could not be read or parsed
    #[error("{0}")]
    File(String),

    /// An environment variable has an invalid value
    #[error("{0}")]
    Env(String),

    /// The merged configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Validate the merged configuration.
pub(crate) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_provider(config)?;
    validate_generation(config.temperature, config.top_p)?;
    validate_timeouts(config)?;
    validate_tls(config)?;
    Ok(())
}

fn validate_provider(config: &ServerConfig) -> Result<(), ConfigError> {
    let provider = RealtimeProvider::parse(&config.realtime_provider).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "Unsupported realtime provider '{}'",
            config.realtime_provider
        ))
    })?;

    config
        .get_api_key(&provider.to_string())
        .map_err(ConfigError::Invalid)?;

    match provider {
        RealtimeProvider::Gemini => {
            let rate = config.gemini_input_sample_rate;
            let telephony = AudioFormat::TELEPHONY.sample_rate;
            if rate == 0 || rate % telephony != 0 {
                return Err(ConfigError::Invalid(format!(
                    "gemini_input_sample_rate must be a multiple of {telephony} Hz, got {rate}"
                )));
            }
        }
        RealtimeProvider::OpenAI => {
            if OpenAIRealtimeAudioFormat::parse(&config.openai_audio_format).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "openai_audio_format must be 'pcm16' or 'g711_ulaw', got '{}'",
                    config.openai_audio_format
                )));
            }
        }
    }

    Ok(())
}

fn validate_generation(temperature: f32, top_p: f32) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::Invalid(format!(
            "temperature must be within [0, 2], got {temperature}"
        )));
    }
    if !(top_p > 0.0 && top_p <= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "top_p must be within (0, 1], got {top_p}"
        )));
    }
    Ok(())
}

fn validate_timeouts(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.setup_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "setup_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if config.transcript_queue_capacity == 0 {
        return Err(ConfigError::Invalid(
            "transcript_queue_capacity must be greater than zero".to_string(),
        ));
    }
    if config.max_concurrent_calls == Some(0) {
        return Err(ConfigError::Invalid(
            "max_concurrent_calls must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_tls(config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(tls) = &config.tls {
        if !tls.cert_path.exists() {
            return Err(ConfigError::Invalid(format!(
                "TLS certificate not found: {}",
                tls.cert_path.display()
            )));
        }
        if !tls.key_path.exists() {
            return Err(ConfigError::Invalid(format!(
                "TLS private key not found: {}",
                tls.key_path.display()
            )));
        }
    }
    Ok(())
}
