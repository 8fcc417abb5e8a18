use std::collections::HashMap;
use std::future::ready;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use toolrelay_model::{ErrorKind, ModelMessage, ModelTool, ToolCallRequest};
use toolrelay_test_model::{PresetEvent, PresetResponse, TestModelProvider};

use crate::tool::{Error as ToolError, ToolResult, ToolServer};
use crate::{AgentBuilder, AgentEvent, Error};

type CallLog = Arc<Mutex<Vec<(String, Map<String, Value>)>>>;

/// An in-memory tool server with canned results.
#[derive(Clone, Default)]
struct FakeToolServer {
    results: HashMap<String, Value>,
    schema_unavailable: bool,
    calls: CallLog,
}

impl FakeToolServer {
    fn with_result(mut self, name: &str, result: Value) -> Self {
        self.results.insert(name.to_owned(), result);
        self
    }

    fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolServer for FakeToolServer {
    fn fetch_schema(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelTool>, ToolError>> + Send + 'static
    {
        if self.schema_unavailable {
            return ready(Err(ToolError::unreachable()));
        }
        let mut names: Vec<_> = self.results.keys().cloned().collect();
        names.sort();
        ready(Ok(names
            .into_iter()
            .map(|name| {
                ModelTool::from_value(json!({
                    "type": "function",
                    "function": { "name": name }
                }))
            })
            .collect()))
    }

    fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_owned(), arguments.clone()));
        ready(match self.results.get(name) {
            Some(result) => Ok(result.clone()),
            None => {
                Err(ToolError::http_status().with_reason("404 Not Found"))
            }
        })
    }
}

fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
    let Value::Object(arguments) = arguments else {
        panic!("arguments must be an object");
    };
    ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments,
    }
}

#[tokio::test]
async fn test_plain_reply() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I do for you?".to_owned()),
    ]));
    let tool_server = FakeToolServer::default().with_result("noop", json!({}));

    let mut agent =
        AgentBuilder::with_model_provider(model_provider.clone(), tool_server)
            .with_system_prompt("You are a CAD assistant.")
            .build()
            .await
            .unwrap();
    let outcome = agent.run_turn("Hello").await.unwrap();

    assert_eq!(outcome.reply, "Hi, what can I do for you?");
    assert!(outcome.tool_results.is_empty());
    // One request only, with the tools offered.
    let requests = model_provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(
        requests[0].messages,
        vec![
            ModelMessage::system("You are a CAD assistant."),
            ModelMessage::user("Hello"),
        ]
    );
    assert_eq!(agent.conversation().len(), 3);
}

#[tokio::test]
async fn test_create_box_scenario() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::ToolCall(tool_call(
            "call_0",
            "create_box",
            json!({ "size": 10 }),
        )),
    ]));
    model_provider.add_response(PresetResponse::with_text("Created box1."));
    let tool_server =
        FakeToolServer::default().with_result("create_box", json!({ "id": "box1" }));

    let events = Arc::new(Mutex::new(vec![]));
    let mut agent = AgentBuilder::with_model_provider(
        model_provider.clone(),
        tool_server.clone(),
    )
    .with_system_prompt("You are a CAD assistant.")
    .on_event({
        let events = Arc::clone(&events);
        move |event| events.lock().unwrap().push(event)
    })
    .build()
    .await
    .unwrap();

    let outcome = agent.run_turn("create a box").await.unwrap();
    assert_eq!(outcome.reply, "Created box1.");

    let calls = tool_server.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "create_box");
    assert_eq!(Value::Object(calls[0].1.clone()), json!({ "size": 10 }));

    assert_eq!(outcome.tool_results.len(), 1);
    let content: Value =
        serde_json::from_str(&outcome.tool_results[0].content).unwrap();
    assert_eq!(content, json!({ "id": "box1" }));

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    // The follow-up request sees the tool result and is offered no tools.
    assert!(requests[1].tools.is_empty());
    assert_eq!(
        requests[1].messages.last(),
        Some(&ModelMessage::Tool(outcome.tool_results[0].clone()))
    );

    let events = events.lock().unwrap();
    assert!(matches!(&events[..], [
        AgentEvent::ToolCall(call),
        AgentEvent::ToolResult(result),
    ] if call.name == "create_box" && result.id == "call_0"));
}

#[tokio::test]
async fn test_every_call_gets_one_result_in_order() {
    let calls = [
        tool_call("a", "get_parts_list", json!({})),
        tool_call("b", "create_box", json!({ "size": 1 })),
        tool_call("c", "missing_tool", json!({ "x": null })),
        tool_call("d", "create_box", json!({ "size": 2 })),
    ];
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events(
        calls
            .iter()
            .cloned()
            .map(PresetEvent::ToolCall)
            .collect::<Vec<_>>(),
    ));
    model_provider.add_response(PresetResponse::with_text("Done."));
    let tool_server = FakeToolServer::default()
        .with_result("get_parts_list", json!(["box"]))
        .with_result("create_box", json!({ "ok": true }));

    let mut agent =
        AgentBuilder::with_model_provider(model_provider, tool_server.clone())
            .build()
            .await
            .unwrap();
    let outcome = agent.run_turn("go").await.unwrap();

    let result_ids: Vec<_> =
        outcome.tool_results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(result_ids, ["a", "b", "c", "d"]);
    let called: Vec<_> = tool_server.calls().into_iter().map(|c| c.0).collect();
    assert_eq!(
        called,
        ["get_parts_list", "create_box", "missing_tool", "create_box"]
    );

    let tool_messages = agent
        .conversation()
        .messages()
        .iter()
        .filter(|msg| matches!(msg, ModelMessage::Tool(_)))
        .count();
    assert_eq!(tool_messages, calls.len());
    assert!(agent.conversation().pending_tool_calls().is_empty());
}

#[tokio::test]
async fn test_failed_tool_call_is_reported_to_model() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::ToolCall(tool_call("call_0", "explode", json!({}))),
    ]));
    model_provider
        .add_response(PresetResponse::with_text("Sorry, that failed."));
    model_provider.add_response(PresetResponse::with_text("Still here."));
    let tool_server = FakeToolServer::default();

    let mut agent =
        AgentBuilder::with_model_provider(model_provider, tool_server)
            .build()
            .await
            .unwrap();
    let outcome = agent.run_turn("blow it up").await.unwrap();
    assert_eq!(outcome.reply, "Sorry, that failed.");
    let content: Value =
        serde_json::from_str(&outcome.tool_results[0].content).unwrap();
    assert_eq!(
        content,
        json!({ "error": "Failed to call tool server: 404 Not Found" })
    );

    // The loop carries on.
    let outcome = agent.run_turn("ok").await.unwrap();
    assert_eq!(outcome.reply, "Still here.");
}

#[tokio::test]
async fn test_schema_failure_is_fatal() {
    let model_provider = TestModelProvider::default();
    let tool_server = FakeToolServer {
        schema_unavailable: true,
        ..Default::default()
    };
    let result =
        AgentBuilder::with_model_provider(model_provider.clone(), tool_server)
            .build()
            .await;
    assert!(matches!(result, Err(Error::SchemaFetch(_))));
    assert!(model_provider.requests().is_empty());
}

#[tokio::test]
async fn test_model_failure_rolls_back_turn() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_failure(ErrorKind::Unreachable);
    model_provider.add_response(PresetResponse::with_text("Back online."));

    let mut agent = AgentBuilder::with_model_provider(
        model_provider.clone(),
        FakeToolServer::default(),
    )
    .with_system_prompt("sys")
    .build()
    .await
    .unwrap();

    let err = agent.run_turn("first").await.unwrap_err();
    assert_eq!(err.model_error_kind(), Some(ErrorKind::Unreachable));
    assert_eq!(agent.conversation().len(), 1);

    agent.run_turn("second").await.unwrap();
    let requests = model_provider.requests();
    assert_eq!(
        requests[1].messages,
        vec![ModelMessage::system("sys"), ModelMessage::user("second")]
    );
}

#[tokio::test]
async fn test_follow_up_tool_calls_are_dropped() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::ToolCall(tool_call("call_0", "noop", json!({}))),
    ]));
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("All set.".to_owned()),
        PresetEvent::ToolCall(tool_call("call_1", "noop", json!({}))),
    ]));
    model_provider.add_response(PresetResponse::with_text("Anything else?"));
    let tool_server = FakeToolServer::default().with_result("noop", json!({}));

    let mut agent =
        AgentBuilder::with_model_provider(model_provider, tool_server.clone())
            .build()
            .await
            .unwrap();
    let outcome = agent.run_turn("do it").await.unwrap();
    assert_eq!(outcome.reply, "All set.");
    assert_eq!(tool_server.calls().len(), 1);
    assert!(agent.conversation().pending_tool_calls().is_empty());

    // The next user turn is accepted.
    agent.run_turn("thanks").await.unwrap();
}

#[tokio::test]
async fn test_follow_up_failure_keeps_tool_results() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::ToolCall(tool_call(
            "call_0",
            "create_box",
            json!({ "size": 10 }),
        )),
    ]));
    model_provider.add_failure(ErrorKind::Unreachable);
    model_provider.add_response(PresetResponse::with_text("Box is ready."));
    let tool_server =
        FakeToolServer::default().with_result("create_box", json!({ "id": "box1" }));

    let mut agent = AgentBuilder::with_model_provider(
        model_provider.clone(),
        tool_server.clone(),
    )
    .build()
    .await
    .unwrap();

    let err = agent.run_turn("create a box").await.unwrap_err();
    assert!(matches!(err, Error::Model(_)));
    assert_eq!(err.model_error_kind(), Some(ErrorKind::Unreachable));
    assert_eq!(tool_server.calls().len(), 1);

    // The call and its result stay as a complete pair.
    let messages = agent.conversation().messages();
    let Some(ModelMessage::Tool(result)) = messages.last() else {
        panic!("history should end with the tool result");
    };
    assert_eq!(result.id, "call_0");
    assert!(agent.conversation().pending_tool_calls().is_empty());
    let history_len = agent.conversation().len();

    let outcome = agent.run_turn("did it work?").await.unwrap();
    assert_eq!(outcome.reply, "Box is ready.");
    assert!(outcome.tool_results.is_empty());

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 3);
    let last_request = &requests[2].messages;
    assert_eq!(last_request.len(), history_len + 1);
    assert!(matches!(
        &last_request[history_len - 2],
        ModelMessage::Assistant(reply) if reply.tool_calls.len() == 1
    ));
    assert!(matches!(
        &last_request[history_len - 1],
        ModelMessage::Tool(result) if result.id == "call_0"
    ));
    assert_eq!(last_request[history_len], ModelMessage::user("did it work?"));
}
