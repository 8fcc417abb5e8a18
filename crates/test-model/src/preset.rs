use serde::{Deserialize, Serialize};
use toolrelay_model::{ErrorKind, ToolCallRequest};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for one model request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
        }
    }

    /// Creates a plain text response delivered in a single delta.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }
}

/// What the provider does when it receives the next request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptStep {
    /// Stream the preset response.
    Respond(PresetResponse),
    /// Fail the request with an error of the given kind.
    Fail(ErrorKind),
}
