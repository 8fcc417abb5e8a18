use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRequest {
    /// The complete conversation history, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are offered to the model. An empty list means the model
    /// is expected to answer in plain text.
    pub tools: Vec<ModelTool>,
}

/// A complete message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ModelMessage {
    /// The system instructions.
    System {
        /// Instruction text.
        content: String,
    },
    /// A user input text.
    User {
        /// What the user typed.
        content: String,
    },
    /// A reply from the model, possibly requesting tool calls.
    Assistant(AssistantMessage),
    /// A tool call result.
    Tool(ToolCallResult),
}

impl ModelMessage {
    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::User {
            content: content.into(),
        }
    }
}

/// A message produced by the model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Text of the reply. May be empty when tool calls are present.
    pub content: String,
    /// Tool calls requested by the model, in the order it emitted them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The identifier of the tool call request this result answers.
    pub id: String,
    /// Name of the tool that was called.
    pub name: String,
    /// The result of the tool call, as JSON text.
    pub content: String,
}

/// Describes a tool that can be used by the model.
///
/// The definition is kept exactly as the tool server published it and is
/// handed to the provider verbatim. Nothing in the agent interprets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelTool(Value);

impl ModelTool {
    /// Wraps a raw tool definition.
    #[inline]
    pub fn from_value(definition: Value) -> Self {
        Self(definition)
    }

    /// Returns the raw tool definition.
    #[inline]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns the tool name if the definition carries one.
    ///
    /// Both the function-calling layout (`{"function": {"name": ..}}`) and
    /// a flat `{"name": ..}` are recognized.
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("function")
            .and_then(|f| f.get("name"))
            .or_else(|| self.0.get("name"))
            .and_then(Value::as_str)
    }
}
