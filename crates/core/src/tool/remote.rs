use std::sync::Arc;

use reqwest::{Client, Response, Url};
use serde_json::{Map, Value};
use toolrelay_model::ModelTool;

use super::{Error, ToolResult, ToolServer};

/// A tool server reached over HTTP.
#[derive(Clone, Debug)]
pub struct RemoteToolServer {
    client: Client,
    base_url: Arc<Url>,
}

impl RemoteToolServer {
    /// Creates a client for the tool server at `base_url`, e.g.
    /// `http://localhost:9875`.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = Url::parse(base_url).map_err(|err| {
            Error::invalid_url().with_reason(format!("{base_url}: {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid_url()
                .with_reason(format!("{base_url} cannot be a base URL")));
        }
        Ok(Self {
            client: Client::new(),
            base_url: Arc::new(base_url),
        })
    }

    /// Returns the base URL of the server.
    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/tools/<segment>`. The segment is percent-encoded, and
    /// names that would resolve to another path (`""`, `.`, `..`) are
    /// rejected, so a tool name can never address another endpoint.
    fn tools_endpoint(&self, segment: &str) -> Result<Url, Error> {
        if matches!(segment, "" | "." | "..") {
            return Err(Error::invalid_url()
                .with_reason(format!("`{segment}` is not a valid tool name")));
        }
        let mut url = Url::clone(&self.base_url);
        url.path_segments_mut()
            .map_err(|_| {
                Error::invalid_url().with_reason(format!(
                    "{} cannot be a base URL",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("tools")
            .push(segment);
        Ok(url)
    }
}

impl ToolServer for RemoteToolServer {
    fn fetch_schema(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelTool>, Error>> + Send + 'static
    {
        let resp_fut = self.tools_endpoint("schema").map(|url| {
            debug!("fetching tool schemas from {url}");
            self.client.get(url).send()
        });

        async move {
            let resp = resp_fut?.await.and_then(Response::error_for_status)?;
            let body: Value = resp.json().await?;
            let Value::Array(definitions) = body else {
                return Err(Error::invalid_response()
                    .with_reason("tool schema is not a JSON array"));
            };
            Ok(definitions.into_iter().map(ModelTool::from_value).collect())
        }
    }

    fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let resp_fut = self.tools_endpoint(name).map(|url| {
            trace!("posting tool call to {url} with args: {arguments:?}");
            self.client.post(url).json(arguments).send()
        });

        async move {
            let resp = resp_fut?.await.and_then(Response::error_for_status)?;
            Ok(resp.json::<Value>().await?)
        }
    }
}
