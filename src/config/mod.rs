//! Configuration module for the voice bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use validation::ConfigError;

use crate::core::bridge::{BridgeConfig, DEFAULT_GREETING};
use crate::core::call_control::VOBIZ_API_URL;
use crate::core::realtime::{SessionSetup, VadConfig};
use crate::core::tools::CustomerProfile;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the voice bridge, including:
/// - Server settings (host, port, TLS, public URL)
/// - AI session settings (provider, model, voice, VAD)
/// - Provider API keys (Gemini, OpenAI)
/// - Call control credentials (Vobiz)
/// - Transcript retention
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Host used in the stream URL handed back to the telephony provider.
    /// Falls back to the request's `Host` header when unset.
    pub public_url: Option<String>,

    // Realtime session settings
    /// `gemini` or `openai`
    pub realtime_provider: String,
    pub realtime_model: Option<String>,
    pub realtime_voice: Option<String>,
    /// System instructions for the model
    pub instructions: Option<String>,
    /// Text turn sent once the session is ready; `None` waits for the caller
    pub greeting: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub setup_timeout_ms: u64,
    pub forward_audio_while_speaking: bool,

    // Voice activity detection
    pub vad_disabled: bool,
    pub vad_start_sensitivity: String,
    pub vad_end_sensitivity: String,
    pub vad_prefix_padding_ms: u32,
    pub vad_silence_duration_ms: u32,

    // Provider audio settings
    /// Gemini input sample rate (must be an integer multiple of 8000)
    pub gemini_input_sample_rate: u32,
    /// `pcm16` or `g711_ulaw`
    pub openai_audio_format: String,

    // Provider API keys
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,

    // Call control (Vobiz REST API)
    pub vobiz_api_url: String,
    pub vobiz_auth_id: Option<String>,
    pub vobiz_auth_token: Option<String>,

    // Transcripts
    pub transcript_ttl_seconds: u64,
    pub transcript_queue_capacity: usize,

    /// Profile returned by the `get_customer_info` tool
    pub customer: CustomerProfile,

    /// Maximum concurrently bridged calls
    /// Default: None (unlimited)
    pub max_concurrent_calls: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let vad = VadConfig::default();
        let session = SessionSetup::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tls: None,
            public_url: None,
            realtime_provider: "gemini".to_string(),
            realtime_model: None,
            realtime_voice: None,
            instructions: None,
            greeting: Some(DEFAULT_GREETING.to_string()),
            temperature: session.temperature,
            top_p: session.top_p,
            setup_timeout_ms: 5000,
            forward_audio_while_speaking: true,
            vad_disabled: vad.disabled,
            vad_start_sensitivity: vad.start_sensitivity,
            vad_end_sensitivity: vad.end_sensitivity,
            vad_prefix_padding_ms: vad.prefix_padding_ms,
            vad_silence_duration_ms: vad.silence_duration_ms,
            gemini_input_sample_rate: 16000,
            openai_audio_format: "pcm16".to_string(),
            gemini_api_key: None,
            openai_api_key: None,
            vobiz_api_url: VOBIZ_API_URL.to_string(),
            vobiz_auth_id: None,
            vobiz_auth_token: None,
            transcript_ttl_seconds: 86400,
            transcript_queue_capacity: 1024,
            customer: CustomerProfile::default(),
            max_concurrent_calls: None,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.vobiz_auth_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    ///
    /// Missing variables fall back to defaults. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        // .env is loaded into the process environment by main before this runs
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Whether hangups can be issued through the Vobiz API.
    pub fn has_call_control(&self) -> bool {
        self.vobiz_auth_id.is_some() && self.vobiz_auth_token.is_some()
    }

    /// Get API key for a specific provider
    ///
    /// # Returns
    /// * `Result<String, String>` - The API key on success, or an error message on failure
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        match provider.to_lowercase().as_str() {
            "gemini" | "gemini-live" | "google" => {
                self.gemini_api_key.as_ref().cloned().ok_or_else(|| {
                    "Gemini API key not configured in server environment (GEMINI_API_KEY)"
                        .to_string()
                })
            }
            "openai" | "openai-realtime" => {
                self.openai_api_key.as_ref().cloned().ok_or_else(|| {
                    "OpenAI API key not configured in server environment (OPENAI_API_KEY)"
                        .to_string()
                })
            }
            _ => Err(format!("Unsupported provider: {provider}")),
        }
    }

    /// Session template handed to the realtime connector for every call.
    pub fn session_setup(&self) -> SessionSetup {
        SessionSetup {
            call_id: String::new(),
            model: self.realtime_model.clone().unwrap_or_default(),
            voice: self.realtime_voice.clone().unwrap_or_default(),
            instructions: self.instructions.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            tools: Vec::new(),
            vad: VadConfig {
                disabled: self.vad_disabled,
                start_sensitivity: self.vad_start_sensitivity.clone(),
                end_sensitivity: self.vad_end_sensitivity.clone(),
                prefix_padding_ms: self.vad_prefix_padding_ms,
                silence_duration_ms: self.vad_silence_duration_ms,
            },
        }
    }

    /// Per-call bridge settings.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            session: self.session_setup(),
            greeting: self.greeting.clone(),
            setup_timeout: Duration::from_millis(self.setup_timeout_ms),
            forward_audio_while_speaking: self.forward_audio_while_speaking,
        }
    }

    pub fn transcript_ttl(&self) -> Duration {
        Duration::from_secs(self.transcript_ttl_seconds)
    }
}
