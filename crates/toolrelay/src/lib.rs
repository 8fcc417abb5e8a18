//! A terminal chat client that lets a local Ollama model use the tools of a
//! remote tool server.
//!
//! The crate includes a CLI for using in the terminal. The [`Session`] type
//! can also be used as a library to drive the same conversation from other
//! front ends.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod session;

pub use config::{
    Config, DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TOOL_SERVER_URL,
};
pub use session::{Session, SessionBuilder, Step, is_exit_command};

/// Re-exports of [`toolrelay_core`] crate.
pub mod core {
    pub use toolrelay_core::*;
}
