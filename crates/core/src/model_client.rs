use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use toolrelay_model::{
    AssistantMessage, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that drains streamed responses and
/// provides a type-erased interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    model_name: Arc<str>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let model_name: Arc<str> = Arc::from(provider.model_name());
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            model_name,
        }
    }

    /// Returns the name of the model behind this client.
    #[inline]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Sends a request and waits for the complete response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The concatenated text of the reply.
    pub content: String,
    /// Tool calls requested by the model, in the order they were received.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

impl ModelClientResponse {
    /// Converts the response into a history message.
    #[inline]
    pub fn into_message(self) -> AssistantMessage {
        AssistantMessage {
            content: self.content,
            tool_calls: self.tool_calls,
        }
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                content.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Map;
    use toolrelay_model::{ErrorKind, ModelMessage};
    use toolrelay_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn hello_request() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::user("Hi")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider);
        assert_eq!(model_client.model_name(), "test-model");

        for _ in 0..3 {
            let resp = model_client.send_request(hello_request()).await.unwrap();
            assert_eq!(resp.content, "How are you?");
            assert!(resp.tool_calls.is_empty());
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
        }
    }

    #[tokio::test]
    async fn test_tool_calls_keep_order() {
        let calls: Vec<_> = ["get_parts_list", "create_box", "verify"]
            .into_iter()
            .enumerate()
            .map(|(idx, name)| ToolCallRequest {
                id: format!("call_{idx}"),
                name: name.to_owned(),
                arguments: Map::new(),
            })
            .collect();
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::with_events(
            calls.iter().cloned().map(PresetEvent::ToolCall).collect::<Vec<_>>(),
        ));

        let model_client = ModelClient::new(model_provider);
        let resp = model_client.send_request(hello_request()).await.unwrap();
        assert_eq!(resp.finish_reason, Some(ModelFinishReason::ToolCalls));
        let msg = resp.into_message();
        assert!(msg.content.is_empty());
        assert_eq!(msg.tool_calls, calls);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_failure(ErrorKind::ModelNotFound);
        let model_client = ModelClient::new(model_provider);
        let Err(err) = model_client.send_request(hello_request()).await else {
            panic!("the scripted failure should be returned");
        };
        assert_eq!(err.kind(), ErrorKind::ModelNotFound);
    }
}
