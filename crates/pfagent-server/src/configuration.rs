use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use pfagent::agent::DEFAULT_MAX_TURNS;
use pfagent::backend::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use pfagent::backend::BackendConfig;
use pfagent::portfolio::{
    PortfolioConfig, DEFAULT_RESOURCE_CODE, DEFAULT_ROOT_PARENT_CODE, DEFAULT_STRUCTURE_MAX_TOKENS,
};
use pfagent::providers::configs::{
    AnthropicProviderConfig, ProviderConfig, ANTHROPIC_HOST, ANTHROPIC_MAX_TOKENS, ANTHROPIC_MODEL,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Keys that have no default and must come from the environment
const REQUIRED_KEYS: &[&str] = &["provider.api_key"];

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> ProviderConfig {
        ProviderConfig::Anthropic(AnthropicProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default)]
    pub login_cert: Option<String>,
    pub timeout_secs: u64,
}

impl BackendSettings {
    pub fn into_config(self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url,
            login_cert: self.login_cert.filter(|cert| !cert.is_empty()),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    pub max_turns: usize,
    pub tools_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub backend: BackendSettings,
    pub portfolio: PortfolioConfig,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8050)?
            .set_default("provider.host", ANTHROPIC_HOST)?
            .set_default("provider.model", ANTHROPIC_MODEL)?
            .set_default("provider.max_tokens", ANTHROPIC_MAX_TOKENS as i64)?
            .set_default("backend.base_url", DEFAULT_BASE_URL)?
            .set_default("backend.timeout_secs", DEFAULT_TIMEOUT.as_secs() as i64)?
            .set_default("portfolio.root_parent_code", DEFAULT_ROOT_PARENT_CODE)?
            .set_default("portfolio.resource_code", DEFAULT_RESOURCE_CODE)?
            .set_default(
                "portfolio.structure_max_tokens",
                DEFAULT_STRUCTURE_MAX_TOKENS as i64,
            )?
            .set_default("agent.max_turns", DEFAULT_MAX_TURNS as i64)?
            .set_default("agent.tools_enabled", true)?
            .add_source(
                Environment::with_prefix("PFAGENT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        for key in REQUIRED_KEYS {
            if config.get_string(key).is_err() {
                return Err(ConfigError::MissingEnvVar {
                    env_var: to_env_var(key),
                });
            }
        }

        match config.try_deserialize() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("PFAGENT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("PFAGENT_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8050);
        assert_eq!(settings.provider.host, "https://api.anthropic.com");
        assert_eq!(settings.provider.model, "claude-3-5-sonnet-20241022");
        assert_eq!(settings.provider.max_tokens, Some(1000));
        assert_eq!(settings.provider.temperature, None);
        assert_eq!(settings.backend.base_url, "http://localhost/planview");
        assert_eq!(settings.backend.timeout_secs, 40);
        assert_eq!(settings.backend.login_cert, None);
        assert_eq!(settings.portfolio, PortfolioConfig::default());
        assert_eq!(settings.agent.max_turns, 10);
        assert!(settings.agent.tools_enabled);

        env::remove_var("PFAGENT_PROVIDER__API_KEY");
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("PFAGENT_PROVIDER__API_KEY", "test-key");
        env::set_var("PFAGENT_SERVER__PORT", "9000");
        env::set_var("PFAGENT_PROVIDER__TEMPERATURE", "0.2");
        env::set_var("PFAGENT_BACKEND__BASE_URL", "https://pf.example.com/planview");
        env::set_var("PFAGENT_BACKEND__LOGIN_CERT", "cert-abc");
        env::set_var("PFAGENT_PORTFOLIO__ROOT_PARENT_CODE", "42");
        env::set_var("PFAGENT_PORTFOLIO__STRUCTURE_MAX_TOKENS", "8000");
        env::set_var("PFAGENT_AGENT__MAX_TURNS", "3");
        env::set_var("PFAGENT_AGENT__TOOLS_ENABLED", "false");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.provider.temperature, Some(0.2));
        assert_eq!(settings.portfolio.root_parent_code, "42");
        assert_eq!(settings.portfolio.structure_max_tokens, 8000);
        assert_eq!(settings.agent.max_turns, 3);
        assert!(!settings.agent.tools_enabled);

        let backend = settings.backend.into_config();
        assert_eq!(backend.base_url, "https://pf.example.com/planview");
        assert_eq!(backend.login_cert.as_deref(), Some("cert-abc"));
        assert_eq!(backend.timeout, Duration::from_secs(40));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();

        let err = Settings::new().unwrap_err();
        match err {
            ConfigError::MissingEnvVar { env_var } => {
                assert_eq!(env_var, "PFAGENT_PROVIDER__API_KEY")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8050,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8050");
    }
}
