//! Merging of defaults, environment variables and YAML overrides.

use std::path::PathBuf;

use super::env::apply_env;
use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig, TlsConfig};

/// Build the final configuration: defaults, then environment, then YAML.
pub(crate) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();
    apply_env(&mut config)?;
    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml)?;
    }
    Ok(config)
}

fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), ConfigError> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(url) = server.public_url {
            config.public_url = Some(url);
        }
        if let Some(max) = server.max_concurrent_calls {
            config.max_concurrent_calls = Some(max);
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                Some(true) => {
                    let (Some(cert_path), Some(key_path)) = (tls.cert_path, tls.key_path) else {
                        return Err(ConfigError::File(
                            "server.tls.cert_path and server.tls.key_path are required when TLS is enabled"
                                .to_string(),
                        ));
                    };
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert_path),
                        key_path: PathBuf::from(key_path),
                    });
                }
                None => {}
            }
        }
    }

    if let Some(realtime) = yaml.realtime {
        if let Some(provider) = realtime.provider {
            config.realtime_provider = provider.to_lowercase();
        }
        if let Some(model) = realtime.model {
            config.realtime_model = Some(model);
        }
        if let Some(voice) = realtime.voice {
            config.realtime_voice = Some(voice);
        }
        if let Some(instructions) = realtime.instructions {
            config.instructions = Some(instructions);
        }
        if let Some(greeting) = realtime.greeting {
            config.greeting = Some(greeting).filter(|g| !g.trim().is_empty());
        }
        if let Some(temperature) = realtime.temperature {
            config.temperature = temperature;
        }
        if let Some(top_p) = realtime.top_p {
            config.top_p = top_p;
        }
        if let Some(timeout) = realtime.setup_timeout_ms {
            config.setup_timeout_ms = timeout;
        }
        if let Some(forward) = realtime.forward_audio_while_speaking {
            config.forward_audio_while_speaking = forward;
        }
        if let Some(rate) = realtime.gemini_input_sample_rate {
            config.gemini_input_sample_rate = rate;
        }
        if let Some(format) = realtime.openai_audio_format {
            config.openai_audio_format = format.to_lowercase();
        }
        if let Some(vad) = realtime.vad {
            if let Some(disabled) = vad.disabled {
                config.vad_disabled = disabled;
            }
            if let Some(sensitivity) = vad.start_sensitivity {
                config.vad_start_sensitivity = sensitivity;
            }
            if let Some(sensitivity) = vad.end_sensitivity {
                config.vad_end_sensitivity = sensitivity;
            }
            if let Some(ms) = vad.prefix_padding_ms {
                config.vad_prefix_padding_ms = ms;
            }
            if let Some(ms) = vad.silence_duration_ms {
                config.vad_silence_duration_ms = ms;
            }
        }
    }

    if let Some(providers) = yaml.providers {
        if let Some(key) = providers.gemini_api_key {
            config.gemini_api_key = Some(key);
        }
        if let Some(key) = providers.openai_api_key {
            config.openai_api_key = Some(key);
        }
    }

    if let Some(vobiz) = yaml.vobiz {
        if let Some(url) = vobiz.api_url {
            config.vobiz_api_url = url;
        }
        if let Some(id) = vobiz.auth_id {
            config.vobiz_auth_id = Some(id);
        }
        if let Some(token) = vobiz.auth_token {
            config.vobiz_auth_token = Some(token);
        }
    }

    if let Some(transcripts) = yaml.transcripts {
        if let Some(ttl) = transcripts.ttl_seconds {
            config.transcript_ttl_seconds = ttl;
        }
        if let Some(capacity) = transcripts.queue_capacity {
            config.transcript_queue_capacity = capacity;
        }
    }

    if let Some(customer) = yaml.customer {
        if let Some(name) = customer.name {
            config.customer.name = name;
        }
        if let Some(age) = customer.age {
            config.customer.age = age;
        }
        if let Some(gender) = customer.gender {
            config.customer.gender = gender;
        }
        if let Some(address) = customer.address {
            config.customer.address = address;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::ENV_KEYS;
    use serial_test::serial;

    fn clear_env() {
        for key in ENV_KEYS {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_merge_without_yaml_uses_env() {
        clear_env();
        unsafe {
            std::env::set_var("REALTIME_VOICE", "Aoede");
        }

        let config = merge_config(None).unwrap();
        assert_eq!(config.realtime_voice.as_deref(), Some("Aoede"));
        assert_eq!(config.port, 3000);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_yaml_wins_over_env() {
        clear_env();
        unsafe {
            std::env::set_var("HOST", "10.0.0.1");
            std::env::set_var("GEMINI_API_KEY", "env-key");
            std::env::set_var("CUSTOMER_NAME", "Env Name");
        }

        let yaml: YamlConfig = serde_yaml::from_str(
            r#"
server:
  host: "192.168.0.5"
providers:
  gemini_api_key: "yaml-key"
customer:
  address: "42 Park Road"
"#,
        )
        .unwrap();

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.host, "192.168.0.5");
        assert_eq!(config.gemini_api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.customer.name, "Env Name");
        assert_eq!(config.customer.address, "42 Park Road");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_yaml_tls_requires_both_paths() {
        clear_env();
        let yaml: YamlConfig = serde_yaml::from_str(
            r#"
server:
  tls:
    enabled: true
    cert_path: "/tmp/cert.pem"
"#,
        )
        .unwrap();

        assert!(matches!(merge_config(Some(yaml)), Err(ConfigError::File(_))));
    }
}
