//! Access to the remote tool server.
//!
//! The server publishes its tool definitions at `GET /tools/schema` and runs
//! a tool at `POST /tools/<name>` with the arguments as the JSON body.

mod dispatcher;
mod error;
mod remote;

use serde_json::{Map, Value};
use toolrelay_model::ModelTool;

pub use dispatcher::{Dispatcher, error_payload};
pub use error::{Error, ErrorKind};
pub use remote::RemoteToolServer;

/// The result of a tool call: the decoded response body.
pub type ToolResult = Result<Value, Error>;

/// A server that knows a set of tools and can run them.
///
/// Futures returned by the methods must be independent of `self`.
pub trait ToolServer: Send + Sync + 'static {
    /// Fetches the definitions of every tool the server offers.
    fn fetch_schema(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelTool>, Error>> + Send + 'static;

    /// Runs the tool `name` with the given arguments.
    fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
