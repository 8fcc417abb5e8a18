use toolrelay_core::tool::{RemoteToolServer, ToolServer};
use toolrelay_core::{Agent, AgentBuilder, AgentEvent, Error, TurnOutcome};
use toolrelay_model::{ModelProvider, ModelTool};

use crate::config::DEFAULT_TOOL_SERVER_URL;

const SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Returns `true` if the input asks to leave the chat.
#[inline]
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder<P> {
    provider: P,
    tool_server_url: String,
    system_prompt: String,
    on_event: Option<Box<dyn Fn(AgentEvent) + Send + Sync>>,
}

impl<P: ModelProvider + 'static> SessionBuilder<P> {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider(provider: P) -> Self {
        Self {
            provider,
            tool_server_url: DEFAULT_TOOL_SERVER_URL.to_owned(),
            system_prompt: SYSTEM_PROMPT.trim().to_owned(),
            on_event: None,
        }
    }

    /// Sets the base URL of the tool server.
    #[inline]
    pub fn with_tool_server_url<S: Into<String>>(mut self, url: S) -> Self {
        self.tool_server_url = url.into();
        self
    }

    /// Replaces the built-in system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
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

    /// Connects to the tool server and builds a new session.
    ///
    /// Fails if the tool schemas can't be fetched.
    pub async fn build(self) -> Result<Session, Error> {
        let tool_server = RemoteToolServer::new(&self.tool_server_url)
            .map_err(Error::SchemaFetch)?;
        let mut agent_builder =
            AgentBuilder::with_model_provider(self.provider, tool_server)
                .with_system_prompt(self.system_prompt);
        if let Some(on_event) = self.on_event {
            agent_builder = agent_builder.on_event(on_event);
        }
        let agent = agent_builder.build().await?;
        info!(
            "session ready: model `{}`, {} tools",
            agent.model_name(),
            agent.tools().len()
        );
        Ok(Session { agent })
    }
}

/// What became of one line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The user asked to leave.
    Exit,
    /// Nothing to do, the line was blank.
    Skip,
    /// A turn ran to completion.
    Reply(TurnOutcome),
}

/// A chat session with a fully configured agent.
///
/// It is basically a wrapper around [`Agent`] that understands the
/// terminal's line-based input.
pub struct Session<S = RemoteToolServer> {
    agent: Agent<S>,
}

impl<S: ToolServer> Session<S> {
    /// Handles one line of user input.
    ///
    /// Exit commands and blank lines never reach the model or the tool
    /// server.
    pub async fn handle_input(&mut self, input: &str) -> Result<Step, Error> {
        if is_exit_command(input) {
            return Ok(Step::Exit);
        }
        let input = input.trim();
        if input.is_empty() {
            return Ok(Step::Skip);
        }
        self.agent.run_turn(input).await.map(Step::Reply)
    }

    /// Returns the tools the model is offered.
    #[inline]
    pub fn tools(&self) -> &[ModelTool] {
        self.agent.tools()
    }

    /// Returns the name of the model.
    #[inline]
    pub fn model_name(&self) -> &str {
        self.agent.model_name()
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent<S> {
        &self.agent
    }
}
