use toolrelay_model::ModelProvider;

use super::{Agent, AgentEvent};
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::tool::ToolServer;

/// [`Agent`] builder.
pub struct AgentBuilder<S> {
    pub(crate) model_client: ModelClient,
    pub(crate) tool_server: S,
    pub(crate) system_prompt: Option<String>,
    pub(crate) on_event: Option<Box<dyn Fn(AgentEvent) + Send + Sync>>,
}

impl<S: ToolServer> AgentBuilder<S> {
    /// Creates a new builder with the specified model provider and the
    /// server that runs the tools.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
        tool_server: S,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tool_server,
            system_prompt: None,
            on_event: None,
        }
    }

    /// Sets the system prompt that opens the conversation.
    #[inline]
    pub fn with_system_prompt<T: Into<String>>(mut self, prompt: T) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Attaches a callback to be invoked for tool activity during a turn.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Fetches the tool schemas and builds the agent.
    ///
    /// Fails if the schemas can't be fetched, since the model could not be
    /// offered any tools.
    #[inline]
    pub async fn build(self) -> Result<Agent<S>, Error> {
        Agent::from_builder(self).await
    }
}
