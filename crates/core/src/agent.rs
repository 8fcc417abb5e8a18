mod builder;
#[cfg(test)]
mod tests;

use toolrelay_model::{
    ModelFinishReason, ModelRequest, ModelTool, ToolCallRequest,
    ToolCallResult,
};

use crate::conversation::Conversation;
use crate::error::Error;
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::{Dispatcher, ToolServer};
pub use builder::AgentBuilder;

/// Something that happened during a turn, reported while the turn is still
/// running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    /// The model asked for a tool call, which is about to be dispatched.
    ToolCall(ToolCallRequest),
    /// A tool call finished, successfully or not.
    ToolResult(ToolCallResult),
}

/// What a completed turn produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The reply text meant for the user.
    pub reply: String,
    /// Results of the tool calls made during the turn, in dispatch order.
    pub tool_results: Vec<ToolCallResult>,
}

/// An agent that holds the conversation, the model, and the tool server.
///
/// Each call to [`Agent::run_turn`] handles one user input to completion:
/// the model is asked with the tools offered, every tool call it makes is
/// dispatched in order, and if there were any, the model is asked once more
/// without tools for the final answer.
pub struct Agent<S> {
    model_client: ModelClient,
    dispatcher: Dispatcher<S>,
    tools: Vec<ModelTool>,
    conversation: Conversation,
    on_event: Option<Box<dyn Fn(AgentEvent) + Send + Sync>>,
}

impl<S: ToolServer> Agent<S> {
    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the tools offered to the model.
    #[inline]
    pub fn tools(&self) -> &[ModelTool] {
        &self.tools
    }

    /// Returns the name of the model.
    #[inline]
    pub fn model_name(&self) -> &str {
        self.model_client.model_name()
    }

    /// Runs one conversation turn for the user input.
    ///
    /// If the first model request fails, the input is taken back out of the
    /// history so the turn leaves no trace. Tool failures never fail the
    /// turn, the model sees them as error results.
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome, Error> {
        let checkpoint = self.conversation.len();
        self.conversation.push_user(input)?;

        debug!("asking the model with {} tools offered", self.tools.len());
        let resp = match self.model_client.send_request(self.request(true)).await
        {
            Ok(resp) => resp,
            Err(err) => {
                self.conversation.truncate(checkpoint);
                return Err(Error::Model(err));
            }
        };

        warn_if_truncated(&resp);
        let reply = resp.into_message();
        let tool_calls = reply.tool_calls.clone();
        self.conversation.push_assistant(reply.clone())?;
        if tool_calls.is_empty() {
            return Ok(TurnOutcome {
                reply: reply.content,
                tool_results: vec![],
            });
        }

        let mut tool_results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            info!("model wants to call `{}`", call.name);
            self.emit(AgentEvent::ToolCall(call.clone()));
            let result = self.dispatcher.dispatch(&call).await;
            self.emit(AgentEvent::ToolResult(result.clone()));
            self.conversation.push_tool_result(result.clone())?;
            tool_results.push(result);
        }

        debug!("asking the model for the final answer");
        let resp = self
            .model_client
            .send_request(self.request(false))
            .await
            .map_err(Error::Model)?;
        warn_if_truncated(&resp);
        let mut final_reply = resp.into_message();
        if !final_reply.tool_calls.is_empty() {
            // Nobody would answer these, keep the history consistent.
            warn!(
                "dropping {} tool calls from the final answer",
                final_reply.tool_calls.len()
            );
            final_reply.tool_calls.clear();
        }
        let reply = final_reply.content.clone();
        self.conversation.push_assistant(final_reply)?;

        Ok(TurnOutcome {
            reply,
            tool_results,
        })
    }

    fn request(&self, offer_tools: bool) -> ModelRequest {
        ModelRequest {
            messages: self.conversation.messages().to_vec(),
            tools: if offer_tools {
                self.tools.clone()
            } else {
                vec![]
            },
        }
    }

    #[inline]
    fn emit(&self, event: AgentEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}

#[inline]
fn warn_if_truncated(resp: &ModelClientResponse) {
    if resp.finish_reason == Some(ModelFinishReason::Length) {
        warn!("the reply was cut off by the token limit");
    }
}

impl<S: ToolServer> Agent<S> {
    async fn from_builder(builder: AgentBuilder<S>) -> Result<Self, Error> {
        let AgentBuilder {
            model_client,
            tool_server,
            system_prompt,
            on_event,
        } = builder;

        let dispatcher = Dispatcher::new(tool_server);
        let tools = dispatcher
            .fetch_tools()
            .await
            .map_err(Error::SchemaFetch)?;
        let conversation = match system_prompt {
            Some(prompt) => Conversation::with_system_prompt(prompt),
            None => Conversation::default(),
        };

        Ok(Self {
            model_client,
            dispatcher,
            tools,
            conversation,
            on_event,
        })
    }
}
