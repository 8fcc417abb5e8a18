use toolrelay_model::{ErrorKind, ModelProviderError};

use crate::{conversation, tool};

/// Errors surfaced by [`Agent`](crate::Agent).
///
/// Tool call failures are not listed here: they are handed to the model as
/// tool results instead of failing the turn.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tool schemas could not be fetched, the agent cannot start.
    #[error("failed to fetch tool schemas: {0}")]
    SchemaFetch(#[source] tool::Error),
    /// The model request failed.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// The conversation history would become inconsistent.
    #[error(transparent)]
    Conversation(#[from] conversation::Error),
}

impl Error {
    /// Returns the model error kind if this is a model failure.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model(err) => Some(err.kind()),
            _ => None,
        }
    }
}
