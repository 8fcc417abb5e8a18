use std::env;

use toolrelay_ollama_model::{OllamaConfig, OllamaConfigBuilder};

/// Where the tool server listens unless `TOOLRELAY_SERVER_URL` says otherwise.
pub const DEFAULT_TOOL_SERVER_URL: &str = "http://localhost:9875";
/// The Ollama model used unless `TOOLRELAY_MODEL` says otherwise.
pub const DEFAULT_MODEL: &str = "llama3";
/// Where Ollama listens unless `OLLAMA_HOST` says otherwise. Like Ollama's
/// own tools, a bare `host:port` is accepted.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Settings of the CLI, read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the tool server.
    pub tool_server_url: String,
    /// Name of the Ollama model.
    pub model: String,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
}

impl Config {
    /// Reads the configuration from the process environment, falling back
    /// to the defaults for unset or empty variables.
    #[inline]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Returns the configuration of the Ollama provider.
    #[inline]
    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfigBuilder::with_model(&self.model)
            .with_base_url(&self.ollama_url)
            .build()
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        Self {
            tool_server_url: get("TOOLRELAY_SERVER_URL", DEFAULT_TOOL_SERVER_URL),
            model: get("TOOLRELAY_MODEL", DEFAULT_MODEL),
            ollama_url: get("OLLAMA_HOST", DEFAULT_OLLAMA_URL),
        }
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
