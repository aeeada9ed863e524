use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_url: "bridge.example.com"
///   max_concurrent_calls: 50
///
/// realtime:
///   provider: "gemini"
///   model: "models/gemini-2.5-flash-native-audio-preview-12-2025"
///   voice: "Puck"
///   instructions: "You are a friendly support agent."
///   greeting: "[Call connected. Please greet the caller.]"
///   temperature: 0.8
///   top_p: 0.95
///   setup_timeout_ms: 5000
///   forward_audio_while_speaking: true
///   gemini_input_sample_rate: 16000
///   openai_audio_format: "pcm16"
///   vad:
///     disabled: false
///     start_sensitivity: "START_SENSITIVITY_HIGH"
///     end_sensitivity: "END_SENSITIVITY_HIGH"
///     prefix_padding_ms: 300
///     silence_duration_ms: 500
///
/// providers:
///   gemini_api_key: "your-gemini-key"
///   openai_api_key: "your-openai-key"
///
/// vobiz:
///   api_url: "https://api.vobiz.ai/api/v1"
///   auth_id: "MA_XXXX"
///   auth_token: "secret"
///
/// transcripts:
///   ttl_seconds: 86400
///   queue_capacity: 1024
///
/// customer:
///   name: "John Doe"
///   age: 35
///   gender: "Male"
///   address: "123 Main St, Mumbai, India"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub providers: Option<ProvidersYaml>,
    pub vobiz: Option<VobizYaml>,
    pub transcripts: Option<TranscriptsYaml>,
    pub customer: Option<CustomerYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
    pub public_url: Option<String>,
    pub max_concurrent_calls: Option<usize>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// AI session settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    /// Empty string disables the greeting turn
    pub greeting: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub setup_timeout_ms: Option<u64>,
    pub forward_audio_while_speaking: Option<bool>,
    pub gemini_input_sample_rate: Option<u32>,
    pub openai_audio_format: Option<String>,
    pub vad: Option<VadYaml>,
}

/// Provider-side VAD tuning from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VadYaml {
    pub disabled: Option<bool>,
    pub start_sensitivity: Option<String>,
    pub end_sensitivity: Option<String>,
    pub prefix_padding_ms: Option<u32>,
    pub silence_duration_ms: Option<u32>,
}

/// Provider API keys from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

/// Vobiz call-control credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VobizYaml {
    pub api_url: Option<String>,
    pub auth_id: Option<String>,
    pub auth_token: Option<String>,
}

/// Transcript retention from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranscriptsYaml {
    pub ttl_seconds: Option<u64>,
    pub queue_capacity: Option<usize>,
}

/// Customer profile overrides from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CustomerYaml {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::File(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::File(format!("Failed to parse YAML config: {e}")))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 3001
  public_url: "bridge.example.com"
  max_concurrent_calls: 10
  tls:
    enabled: true
    cert_path: "/etc/certs/cert.pem"
    key_path: "/etc/certs/key.pem"

realtime:
  provider: "openai"
  voice: "marin"
  temperature: 0.6
  openai_audio_format: "g711_ulaw"
  vad:
    disabled: true
    silence_duration_ms: 800

providers:
  openai_api_key: "sk-yaml"

vobiz:
  auth_id: "MA_TEST"
  auth_token: "token"

transcripts:
  ttl_seconds: 600

customer:
  name: "Asha Rao"
  age: 41
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(3001));
        assert_eq!(server.max_concurrent_calls, Some(10));
        assert_eq!(server.tls.unwrap().enabled, Some(true));

        let realtime = config.realtime.unwrap();
        assert_eq!(realtime.provider.as_deref(), Some("openai"));
        assert_eq!(realtime.temperature, Some(0.6));
        assert_eq!(realtime.openai_audio_format.as_deref(), Some("g711_ulaw"));
        let vad = realtime.vad.unwrap();
        assert_eq!(vad.disabled, Some(true));
        assert_eq!(vad.silence_duration_ms, Some(800));
        assert_eq!(vad.prefix_padding_ms, None);

        assert_eq!(
            config.providers.unwrap().openai_api_key.as_deref(),
            Some("sk-yaml")
        );
        assert_eq!(config.vobiz.unwrap().auth_id.as_deref(), Some("MA_TEST"));
        assert_eq!(config.transcripts.unwrap().ttl_seconds, Some(600));

        let customer = config.customer.unwrap();
        assert_eq!(customer.name.as_deref(), Some("Asha Rao"));
        assert_eq!(customer.age, Some(41));
        assert_eq!(customer.gender, None);
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.realtime.is_none());
        assert!(config.providers.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(
            &config_path,
            r#"
server:
  host: "localhost"
  port: 3000
"#,
        )
        .unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("localhost"));
        assert_eq!(server.port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let err = YamlConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML"));
    }
}
