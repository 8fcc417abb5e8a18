/// Builder for [`OllamaConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OllamaConfigBuilder {
    model: String,
    base_url: Option<String>,
    keep_alive: Option<String>,
}

impl OllamaConfigBuilder {
    /// Creates a builder for the given model, e.g. `llama3`.
    #[inline]
    pub fn with_model<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            base_url: None,
            keep_alive: None,
        }
    }

    /// Sets a custom base URL of the Ollama server.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets how long the model stays loaded after a request, using Ollama's
    /// duration syntax (`"5m"`, `"1h"`, `"-1"`).
    #[inline]
    pub fn with_keep_alive<S: Into<String>>(mut self, keep_alive: S) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OllamaConfig {
        let base_url = match self.base_url.as_deref().map(str::trim) {
            Some(base_url) if !base_url.is_empty() => {
                normalize_base_url(base_url)
            }
            _ => DEFAULT_BASE_URL.to_owned(),
        };
        OllamaConfig {
            model: self.model,
            base_url,
            keep_alive: self.keep_alive,
        }
    }
}

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_PORT: u16 = 11434;

/// Accepts the same forms as `OLLAMA_HOST`: a full URL, or a bare `host`,
/// `host:port` or `:port`, which get the `http` scheme and the default
/// host and port filled in.
fn normalize_base_url(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    if base_url.contains("://") {
        return base_url.to_owned();
    }

    let (authority, path) = match base_url.find('/') {
        Some(idx) => base_url.split_at(idx),
        None => (base_url, ""),
    };
    // The port is whatever follows the last colon, unless that colon is
    // inside a bracketed IPv6 address.
    let has_port = authority
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.contains(']'));
    let authority = match (authority.starts_with(':'), has_port) {
        (true, _) => format!("127.0.0.1{authority}"),
        (false, true) => authority.to_owned(),
        (false, false) => format!("{authority}:{DEFAULT_PORT}"),
    };
    format!("http://{authority}{path}")
}

/// Configuration for the Ollama provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OllamaConfig {
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) keep_alive: Option<String>,
}

impl OllamaConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
