//! Core logic: conversation history, the model client, the remote tool
//! server, and the agent turn that ties them together.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod error;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentEvent, TurnOutcome};
pub use error::Error;
