use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use toolrelay_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};

use crate::Error;
use crate::io::JsonLines;
use crate::proto::ChatResponseChunk;

struct PartialState {
    lines: JsonLines,
    // Events decoded from the last chunk that are not yet handed out. A single
    // chunk may carry text and several tool calls at once.
    pending_events: VecDeque<ModelResponseEvent>,
    tool_call_count: usize,
    done: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OllamaResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OllamaResponse {
    #[inline]
    pub fn from_lines(lines: JsonLines) -> Self {
        let partial_state = PartialState {
            lines,
            pending_events: Default::default(),
            tool_call_count: 0,
            done: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OllamaResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.done {
            return Ok((None, partial_state));
        }

        let line = match partial_state.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                return Err(Error::new(
                    "stream ended before the final chunk",
                    ErrorKind::InvalidResponse,
                ));
            }
            Err(err) => {
                return Err(Error::new(
                    format!("{err}"),
                    ErrorKind::InvalidResponse,
                ));
            }
        };
        trace!("got chunk: {line}");

        let chunk = serde_json::from_str::<ChatResponseChunk>(&line).map_err(
            |err| Error::new(format!("{err}"), ErrorKind::InvalidResponse),
        )?;
        partial_state.apply_chunk(chunk)?;
    }
}

impl PartialState {
    fn apply_chunk(&mut self, chunk: ChatResponseChunk) -> Result<(), Error> {
        if let Some(error) = chunk.error {
            return Err(Error::new(error, ErrorKind::Other));
        }

        // The order of events is important. Text first, then tool calls in
        // the order the model wrote them, and the completion last.
        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                self.pending_events
                    .push_back(ModelResponseEvent::MessageDelta(message.content));
            }
            for tool_call in message.tool_calls {
                let id = tool_call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", self.tool_call_count));
                self.tool_call_count += 1;
                self.pending_events.push_back(ModelResponseEvent::ToolCall(
                    ToolCallRequest {
                        id,
                        name: tool_call.function.name,
                        arguments: tool_call.function.arguments,
                    },
                ));
            }
        }

        if chunk.done {
            let finish_reason = if self.tool_call_count > 0 {
                ModelFinishReason::ToolCalls
            } else if chunk.done_reason.as_deref() == Some("length") {
                ModelFinishReason::Length
            } else {
                ModelFinishReason::Stop
            };
            self.pending_events
                .push_back(ModelResponseEvent::Completed(finish_reason));
            self.done = true;
        }
        Ok(())
    }
}
