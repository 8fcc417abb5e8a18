use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolrelay_model::{
    AssistantMessage, ModelMessage, ModelRequest, ModelTool, ToolCallRequest,
};

use crate::OllamaConfig;

// ---------------------------------
// Types shared in both directions
// ---------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: FunctionToolCall,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatResponseChunk {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    pub done_reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// Body of an unsuccessful response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_name: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &ModelRequest, config: &OllamaConfig) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        stream: true,
        keep_alive: config.keep_alive.clone(),
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System { content } => Message::System {
            content: content.clone(),
        },
        ModelMessage::User { content } => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(AssistantMessage {
            content,
            tool_calls,
        }) => Message::Assistant {
            content: content.clone(),
            tool_calls: tool_calls.iter().map(create_tool_call).collect(),
        },
        ModelMessage::Tool(result) => Message::Tool {
            content: result.content.clone(),
            tool_name: result.name.clone(),
        },
    }
}

#[inline]
fn create_tool_call(req: &ToolCallRequest) -> ToolCall {
    ToolCall {
        id: Some(req.id.clone()),
        function: FunctionToolCall {
            name: req.name.clone(),
            arguments: req.arguments.clone(),
        },
    }
}

/// Tool definitions are forwarded exactly as the tool server wrote them.
#[inline]
fn create_tool(tool: &ModelTool) -> Value {
    tool.as_value().clone()
}
