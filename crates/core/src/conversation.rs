//! Conversation history.

use toolrelay_model::{
    AssistantMessage, ModelMessage, ToolCallRequest, ToolCallResult,
};

/// Violations of the history invariant: every tool call is answered by
/// exactly one tool result before anything else is appended.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A tool result doesn't answer any outstanding tool call.
    #[error("tool result `{0}` does not answer an outstanding tool call")]
    UnknownToolCall(String),
    /// Tool calls from the last reply are still waiting for results.
    #[error("{0} tool call(s) are still waiting for results")]
    PendingToolCalls(usize),
}

/// An ordered, append-only message history.
///
/// The whole history is sent to the model on every request.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    /// Creates a conversation seeded with a system message.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            messages: vec![ModelMessage::system(prompt)],
        }
    }

    /// Returns all messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a user message.
    pub fn push_user<S: Into<String>>(&mut self, content: S) -> Result<(), Error> {
        self.ensure_settled()?;
        self.messages.push(ModelMessage::user(content));
        Ok(())
    }

    /// Appends a model reply.
    pub fn push_assistant(&mut self, msg: AssistantMessage) -> Result<(), Error> {
        self.ensure_settled()?;
        self.messages.push(ModelMessage::Assistant(msg));
        Ok(())
    }

    /// Appends the result of a tool call from the latest model reply.
    ///
    /// Results are matched to calls by id, so they may arrive in any order.
    pub fn push_tool_result(
        &mut self,
        result: ToolCallResult,
    ) -> Result<(), Error> {
        let is_pending = self
            .pending_tool_calls()
            .iter()
            .any(|call| call.id == result.id);
        if !is_pending {
            return Err(Error::UnknownToolCall(result.id));
        }
        self.messages.push(ModelMessage::Tool(result));
        Ok(())
    }

    /// Returns the tool calls of the latest model reply that have no result
    /// yet, in the order the model requested them.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCallRequest> {
        let Some(reply_idx) = self
            .messages
            .iter()
            .rposition(|msg| matches!(msg, ModelMessage::Assistant(_)))
        else {
            return vec![];
        };
        let ModelMessage::Assistant(reply) = &self.messages[reply_idx] else {
            return vec![];
        };

        let mut answered: Vec<&str> = self.messages[reply_idx + 1..]
            .iter()
            .filter_map(|msg| match msg {
                ModelMessage::Tool(result) => Some(result.id.as_str()),
                _ => None,
            })
            .collect();

        // Ids are not guaranteed to be unique, so each result answers at
        // most one call.
        reply
            .tool_calls
            .iter()
            .filter(|call| {
                match answered.iter().position(|id| *id == call.id) {
                    Some(idx) => {
                        answered.swap_remove(idx);
                        false
                    }
                    None => true,
                }
            })
            .collect()
    }

    /// Drops every message after the first `len` ones.
    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    fn ensure_settled(&self) -> Result<(), Error> {
        match self.pending_tool_calls().len() {
            0 => Ok(()),
            n => Err(Error::PendingToolCalls(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: "create_box".to_owned(),
            arguments: Map::new(),
        }
    }

    fn result(id: &str) -> ToolCallResult {
        ToolCallResult {
            id: id.to_owned(),
            name: "create_box".to_owned(),
            content: "{}".to_owned(),
        }
    }

    fn reply_with_calls(ids: &[&str]) -> AssistantMessage {
        AssistantMessage {
            content: String::new(),
            tool_calls: ids.iter().map(|id| call(id)).collect(),
        }
    }

    #[test]
    fn test_plain_exchange() {
        let mut conversation = Conversation::with_system_prompt("Be nice.");
        conversation.push_user("Hi").unwrap();
        conversation
            .push_assistant(AssistantMessage {
                content: "Hello!".to_owned(),
                tool_calls: vec![],
            })
            .unwrap();
        conversation.push_user("Bye").unwrap();
        assert_eq!(conversation.len(), 4);
        assert!(matches!(
            conversation.messages()[0],
            ModelMessage::System { .. }
        ));
    }

    #[test]
    fn test_results_settle_calls() {
        let mut conversation = Conversation::default();
        conversation.push_user("build two boxes").unwrap();
        conversation
            .push_assistant(reply_with_calls(&["call_0", "call_1"]))
            .unwrap();
        assert_eq!(conversation.pending_tool_calls().len(), 2);
        assert_eq!(
            conversation.push_user("hello?"),
            Err(Error::PendingToolCalls(2))
        );

        // Out of order is fine as long as ids match.
        conversation.push_tool_result(result("call_1")).unwrap();
        let pending = conversation.pending_tool_calls();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "call_0");

        conversation.push_tool_result(result("call_0")).unwrap();
        assert!(conversation.pending_tool_calls().is_empty());
        conversation.push_user("thanks").unwrap();
    }

    #[test]
    fn test_unknown_result() {
        let mut conversation = Conversation::default();
        conversation.push_user("build a box").unwrap();
        conversation.push_assistant(reply_with_calls(&["call_0"])).unwrap();
        assert_eq!(
            conversation.push_tool_result(result("call_9")),
            Err(Error::UnknownToolCall("call_9".to_owned()))
        );

        conversation.push_tool_result(result("call_0")).unwrap();
        // Each call takes exactly one result.
        assert_eq!(
            conversation.push_tool_result(result("call_0")),
            Err(Error::UnknownToolCall("call_0".to_owned()))
        );
    }

    #[test]
    fn test_duplicate_ids() {
        let mut conversation = Conversation::default();
        conversation
            .push_assistant(reply_with_calls(&["dup", "dup"]))
            .unwrap();
        conversation.push_tool_result(result("dup")).unwrap();
        assert_eq!(conversation.pending_tool_calls().len(), 1);
        conversation.push_tool_result(result("dup")).unwrap();
        assert!(conversation.pending_tool_calls().is_empty());
    }
}
