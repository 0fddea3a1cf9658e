use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub translator: TranslatorConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// External translation endpoint settings.
///
/// The API credential is never hard-coded; it must arrive through the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// OAuth client identifier the credential's audience must match.
    /// When unset, the audience claim is not checked.
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default(
                "translator.endpoint",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("translator.model", "gemini-pro")?
            .set_default("translator.max_output_tokens", 256)?
            .set_default("auth.client_id", None::<String>)?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?;

        // Load from environment variables
        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(endpoint) = env::var("TRANSLATOR_ENDPOINT") {
            builder = builder.set_override("translator.endpoint", endpoint)?;
        }

        if let Ok(model) = env::var("TRANSLATOR_MODEL") {
            builder = builder.set_override("translator.model", model)?;
        }

        if let Ok(api_key) = env::var("TRANSLATOR_API_KEY") {
            builder = builder.set_override("translator.api_key", Some(api_key))?;
        }

        if let Ok(tokens) = env::var("TRANSLATOR_MAX_OUTPUT_TOKENS") {
            builder =
                builder.set_override("translator.max_output_tokens", tokens.parse::<u32>().unwrap_or(256))?;
        }

        if let Ok(client_id) = env::var("OAUTH_CLIENT_ID") {
            builder = builder.set_override("auth.client_id", Some(client_id))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        // Try to load from .env file
        let _ = dotenv::dotenv();

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        // Clear environment variables for this test
        env::remove_var("HOST");
        env::remove_var("PORT");
        env::remove_var("TRANSLATOR_ENDPOINT");
        env::remove_var("TRANSLATOR_API_KEY");
        env::remove_var("OAUTH_CLIENT_ID");

        let config = Config::from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.translator.model, "gemini-pro");
        assert_eq!(config.translator.max_output_tokens, 256);
        assert!(config.translator.api_key.is_none());
        assert!(config.auth.client_id.is_none());
    }

    #[test]
    fn test_server_address_formatting() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            translator: TranslatorConfig {
                endpoint: "http://localhost:9999".to_string(),
                model: "test".to_string(),
                api_key: None,
                max_output_tokens: 64,
            },
            auth: AuthConfig { client_id: None },
            logging: LoggingConfig {
                level: "info".to_string(),
                style: "auto".to_string(),
            },
        };
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }
}
