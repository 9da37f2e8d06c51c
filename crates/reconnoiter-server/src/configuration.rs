use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use reconnoiter::docker::DEFAULT_DOCKER_BINARY;
use reconnoiter::providers::configs::{GeminiProviderConfig, ProviderConfig, GEMINI_HOST};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    Gemini {
        #[serde(default = "default_gemini_host")]
        host: String,
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    fn api_key(&self) -> &str {
        match self {
            ProviderSettings::Gemini { api_key, .. } => api_key,
        }
    }

    /// The model is left at its default; each run rebinds it to the requested one.
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::Gemini {
                host,
                api_key,
                temperature,
                max_tokens,
            } => ProviderConfig::Gemini(GeminiProviderConfig {
                host,
                api_key,
                temperature,
                max_tokens,
                ..GeminiProviderConfig::new("")
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_debug_mode")]
    pub debug_mode: bool,
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            debug_mode: default_debug_mode(),
            docker_binary: default_docker_binary(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("provider.type", "gemini")?
            .set_default("provider.host", default_gemini_host())?
            .set_default("agent.debug_mode", default_debug_mode())?
            .set_default("agent.docker_binary", default_docker_binary())?
            .add_source(
                Environment::with_prefix("RECONNOITER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = match config.try_deserialize() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                return if error_str.starts_with("missing field") {
                    // "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .split('`')
                        .next()
                        .unwrap_or_default();
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                };
            }
        };

        if settings.provider.api_key().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            });
        }

        Ok(settings)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_gemini_host() -> String {
    GEMINI_HOST.to_string()
}

fn default_debug_mode() -> bool {
    true
}

fn default_docker_binary() -> String {
    DEFAULT_DOCKER_BINARY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconnoiter::model_id::ModelId;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("RECONNOITER_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("RECONNOITER_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8000);
        assert!(settings.agent.debug_mode);
        assert_eq!(settings.agent.docker_binary, "docker");

        let ProviderSettings::Gemini {
            host,
            api_key,
            temperature,
            max_tokens,
        } = settings.provider;
        assert_eq!(host, "https://generativelanguage.googleapis.com");
        assert_eq!(api_key, "test-key");
        assert_eq!(temperature, None);
        assert_eq!(max_tokens, None);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("RECONNOITER_SERVER__PORT", "8080");
        env::set_var("RECONNOITER_PROVIDER__TYPE", "gemini");
        env::set_var("RECONNOITER_PROVIDER__API_KEY", "test-key");
        env::set_var("RECONNOITER_PROVIDER__HOST", "http://localhost:9999");
        env::set_var("RECONNOITER_PROVIDER__TEMPERATURE", "0.8");
        env::set_var("RECONNOITER_PROVIDER__MAX_TOKENS", "2000");
        env::set_var("RECONNOITER_AGENT__DEBUG_MODE", "false");
        env::set_var("RECONNOITER_AGENT__DOCKER_BINARY", "/usr/local/bin/docker");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert!(!settings.agent.debug_mode);
        assert_eq!(settings.agent.docker_binary, "/usr/local/bin/docker");

        let ProviderConfig::Gemini(config) = settings.provider.into_config();
        assert_eq!(config.host, "http://localhost:9999");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.temperature, Some(0.8));
        assert_eq!(config.max_tokens, Some(2000));
        assert_eq!(config.model, ModelId::default());

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();

        let err = Settings::new().unwrap_err();
        match err {
            ConfigError::MissingEnvVar { env_var } => {
                assert_eq!(env_var, "RECONNOITER_PROVIDER__API_KEY")
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_unknown_provider_type() {
        clean_env();
        env::set_var("RECONNOITER_PROVIDER__TYPE", "openai");
        env::set_var("RECONNOITER_PROVIDER__API_KEY", "test-key");

        assert!(matches!(Settings::new(), Err(ConfigError::Other(_))));

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };
        assert_eq!(server_settings.socket_addr().unwrap().to_string(), "127.0.0.1:8000");

        let invalid = ServerSettings {
            host: "not a host".to_string(),
            port: 8000,
        };
        assert!(matches!(invalid.socket_addr(), Err(ConfigError::InvalidAddress(_))));
    }
}
