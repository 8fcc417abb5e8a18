use serde_json::{Value, json};
use toolrelay_model::{ModelTool, ToolCallRequest, ToolCallResult};
use tracing::Instrument;

use super::{Error, ToolServer};

/// Runs model-requested tool calls against a [`ToolServer`].
///
/// A failed call never fails the dispatch: it turns into an error payload
/// that the model gets to see instead of the result.
#[derive(Clone, Debug)]
pub struct Dispatcher<S> {
    server: S,
}

impl<S: ToolServer> Dispatcher<S> {
    /// Creates a dispatcher for `server`.
    #[inline]
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Fetches the tool definitions to offer to the model.
    pub async fn fetch_tools(&self) -> Result<Vec<ModelTool>, Error> {
        let tools = self.server.fetch_schema().await?;
        info!("fetched {} tool definitions", tools.len());
        for tool in &tools {
            debug!("tool available: {}", tool.name().unwrap_or("<unnamed>"));
        }
        Ok(tools)
    }

    /// Runs one tool call and returns its result for the conversation.
    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolCallResult {
        let span =
            debug_span!("tool dispatch", id = %call.id, tool = %call.name);
        let result = self
            .server
            .call_tool(&call.name, &call.arguments)
            .instrument(span)
            .await;
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                warn!("tool call `{}` failed: {err}", call.name);
                error_payload(&err)
            }
        };
        ToolCallResult {
            id: call.id.clone(),
            name: call.name.clone(),
            content: value.to_string(),
        }
    }
}

/// The tool result the model sees when a call fails.
#[inline]
pub fn error_payload(err: &Error) -> Value {
    json!({ "error": format!("Failed to call tool server: {err}") })
}
