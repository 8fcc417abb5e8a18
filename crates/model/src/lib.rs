//! An abstraction layer between the conversation loop and the LLM.
//!
//! This crate establishes a small protocol for the agent to talk to a
//! chat model that supports function calling, so that the conversation
//! logic doesn't depend on any particular provider's wire format.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
