//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Sleep, sleep};
use toolrelay_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};

pub use preset::*;

/// Pause before each event, so responses arrive the way a stream would.
const EVENT_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(EVENT_DELAY)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let event = if this.event_idx < this.events.len() {
            match &this.events[this.event_idx] {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            }
        } else if this.event_idx == this.events.len() {
            let has_tool_call = this
                .events
                .iter()
                .any(|event| matches!(event, PresetEvent::ToolCall(_)));
            ModelResponseEvent::Completed(if has_tool_call {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            })
        } else {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        };
        this.event_idx += 1;
        Poll::Ready(Ok(Some(event)))
    }
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<ModelRequest>>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, set up the script, which is how the model
/// should answer each request in turn. Every request consumes one step, and
/// a request arriving after the script is used up fails. All received
/// requests are recorded so tests can inspect what the model was shown.
///
/// Clones share the same script and request log.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    shared: Arc<Shared>,
}

impl TestModelProvider {
    /// Appends a step that answers with `preset`.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        lock(&self.shared.script).push_back(ScriptStep::Respond(preset));
    }

    /// Appends a step that fails with the given error kind.
    #[inline]
    pub fn add_failure(&mut self, kind: ErrorKind) {
        lock(&self.shared.script).push_back(ScriptStep::Fail(kind));
    }

    /// Returns every request received so far, oldest first.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.shared.requests).clone()
    }

    /// Returns the number of script steps that have not been used yet.
    #[inline]
    pub fn remaining_steps(&self) -> usize {
        lock(&self.shared.script).len()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn model_name(&self) -> &str {
        "test-model"
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        lock(&self.shared.requests).push(req.clone());
        let step = lock(&self.shared.script).pop_front();
        let result = match step {
            Some(ScriptStep::Respond(preset)) => Ok(TestModelResponse {
                events: preset.events,
                event_idx: 0,
                sleep: None,
            }),
            Some(ScriptStep::Fail(kind)) => Err(Error {
                message: "scripted failure",
                kind,
            }),
            None => Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            }),
        };
        ready(result)
    }
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
