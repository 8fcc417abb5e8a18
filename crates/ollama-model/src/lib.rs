//! A model provider for a local [Ollama](https://ollama.com) server.
//!
//! Requests go to `/api/chat` with streaming enabled, and the
//! newline-delimited JSON chunks are turned into [`ModelResponseEvent`]s.
//!
//! [`ModelResponseEvent`]: toolrelay_model::ModelResponseEvent

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use toolrelay_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{OllamaConfig, OllamaConfigBuilder};
use io::{Chunks, JsonLines};
pub use response::OllamaResponse;

/// Error type for [`OllamaProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() {
            ErrorKind::Unreachable
        } else {
            ErrorKind::Other
        };
        Self::new(format!("{err}"), kind)
    }
}

/// Turns an unsuccessful response into an error, preferring the message
/// Ollama puts in its `{"error": ...}` body.
async fn error_from_response(resp: Response) -> Error {
    let status = resp.status();
    let kind = if status == StatusCode::NOT_FOUND {
        ErrorKind::ModelNotFound
    } else {
        ErrorKind::Other
    };
    let body = resp.bytes().await.unwrap_or_default();
    let message = match serde_json::from_slice::<proto::ErrorResponse>(&body) {
        Ok(proto::ErrorResponse { error }) => error,
        Err(_) => format!("Ollama responded with {status}"),
    };
    Error::new(message, kind)
}

/// Ollama model provider.
#[derive(Clone, Debug)]
pub struct OllamaProvider {
    client: Client,
    config: Arc<OllamaConfig>,
}

impl OllamaProvider {
    /// Creates a new `OllamaProvider` with the given configuration.
    #[inline]
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OllamaProvider {
    type Error = Error;
    type Response = OllamaResponse;

    #[inline]
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let ollama_req = proto::create_request(req, &self.config);
        debug!(
            "sending chat request: {} messages, {} tools",
            req.messages.len(),
            req.tools.len()
        );
        let resp_fut = self
            .client
            .post(format!("{}/api/chat", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&ollama_req)
            .send();

        async move {
            let resp = resp_fut.await?;
            if !resp.status().is_success() {
                return Err(error_from_response(resp).await);
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            if let Some(content_type) = content_type {
                let is_valid_content_type = content_type
                    .parse()
                    .map(|m: Mime| {
                        matches!(m.subtype().as_str(), "x-ndjson" | "json")
                    })
                    .unwrap_or(false);
                if !is_valid_content_type {
                    return Err(Error::new(
                        format!("Unexpected content type: {content_type}"),
                        ErrorKind::InvalidResponse,
                    ));
                }
            }

            // Here we got a successful response.
            let lines = JsonLines::new(Chunks::from_response(resp));
            Ok(OllamaResponse::from_lines(lines))
        }
    }
}
