//! A2A JSON-RPC server: task bookkeeping around an [`AgentExecutor`]

use crate::error::Result;
use async_trait::async_trait;
use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tracing::{debug, info, warn};

use super::types::{
    codes, AgentCard, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams,
    Role, SendMessageResult, Task, TaskIdParams, TaskKind, TaskState, TaskStatus,
    TaskStatusUpdateEvent, AGENT_CARD_PATH, AGENT_CARD_PATH_ALT,
};

const CANCEL_WAIT: Duration = Duration::from_secs(10);

/// Agent logic behind an A2A endpoint
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Handle the incoming message, replying through `queue`
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> Result<()>;

    /// Called after a running execution has been aborted
    async fn cancel(&self, ctx: &RequestContext, queue: &EventQueue) -> Result<()>;
}

/// What an executor knows about the request it is handling
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Message,
}

impl RequestContext {
    /// Text of the incoming message
    pub fn user_text(&self) -> String {
        self.message.text()
    }
}

/// Outgoing side of a task: every message enqueued here lands in the task history
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Message>,
    task_id: String,
    context_id: String,
}

impl EventQueue {
    fn new(tx: mpsc::UnboundedSender<Message>, ctx: &RequestContext) -> Self {
        Self {
            tx,
            task_id: ctx.task_id.clone(),
            context_id: ctx.context_id.clone(),
        }
    }

    /// Enqueue an agent message, tagging it with the task and context ids
    pub fn enqueue(&self, mut message: Message) {
        message.task_id = Some(self.task_id.clone());
        message.context_id = Some(self.context_id.clone());
        if self.tx.send(message).is_err() {
            debug!("Task {} is no longer collecting events", self.task_id);
        }
    }

    pub fn enqueue_text(&self, text: impl Into<String>) {
        self.enqueue(Message::agent_text(text));
    }
}

/// In-memory task map
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskStore {
    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    async fn insert(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    async fn append(&self, id: &str, message: Message) {
        if let Some(task) = self.tasks.write().await.get_mut(id) {
            task.history.push(message);
        }
    }

    async fn transition(&self, id: &str, state: TaskState) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(id)?;
        let last = state
            .is_terminal()
            .then(|| task.last_agent_message().cloned())
            .flatten();
        task.status = TaskStatus::now(state, last);
        Some(task.clone())
    }
}

enum TaskEvent {
    Message(Message),
    Finished(Task),
}

enum Outcome {
    Finished(Result<()>),
    Canceled(oneshot::Sender<Task>),
}

type CancelSignal = oneshot::Sender<oneshot::Sender<Task>>;

#[derive(Clone)]
struct A2aState {
    card: Arc<AgentCard>,
    executor: Arc<dyn AgentExecutor>,
    tasks: Arc<TaskStore>,
    running: Arc<Mutex<HashMap<String, CancelSignal>>>,
}

/// Router serving the agent card, the JSON-RPC endpoint and `/health`
pub fn a2a_router(card: AgentCard, executor: Arc<dyn AgentExecutor>) -> Router {
    let state = A2aState {
        card: Arc::new(card),
        executor,
        tasks: Arc::new(TaskStore::default()),
        running: Arc::new(Mutex::new(HashMap::new())),
    };

    Router::new()
        .route("/", post(rpc_handler))
        .route(AGENT_CARD_PATH, get(card_handler))
        .route(AGENT_CARD_PATH_ALT, get(card_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn card_handler(State(state): State<A2aState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

async fn health_handler(State(state): State<A2aState>) -> Json<Value> {
    Json(json!({ "status": "healthy", "agent": state.card.name }))
}

async fn rpc_handler(State(state): State<A2aState>, body: String) -> Response {
    let raw: Value = match serde_json::from_str(&body) {
        Ok(raw) => raw,
        Err(e) => return rpc_error(Value::Null, codes::PARSE_ERROR, format!("Parse error: {}", e)),
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => return rpc_error(id, codes::INVALID_REQUEST, format!("Invalid request: {}", e)),
    };
    if request.jsonrpc != "2.0" {
        return rpc_error(id, codes::INVALID_REQUEST, "jsonrpc must be \"2.0\"");
    }

    debug!("A2A request {} on {}", request.method, state.card.name);
    match request.method.as_str() {
        "message/send" => match params::<MessageSendParams>(&request) {
            Ok(params) => send_message(state, id, params.message).await,
            Err(response) => response,
        },
        "message/stream" => match params::<MessageSendParams>(&request) {
            Ok(params) => stream_message(state, id, params.message),
            Err(response) => response,
        },
        "tasks/get" => match params::<TaskIdParams>(&request) {
            Ok(params) => match state.tasks.get(&params.id).await {
                Some(task) => rpc_result(id, &task),
                None => task_not_found(id, &params.id),
            },
            Err(response) => response,
        },
        "tasks/cancel" => match params::<TaskIdParams>(&request) {
            Ok(params) => cancel_task(state, id, params.id).await,
            Err(response) => response,
        },
        other => rpc_error(
            id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    }
}

async fn send_message(state: A2aState, id: Value, message: Message) -> Response {
    let handle = tokio::spawn(run_task(state, message, None));
    match handle.await {
        Ok(task) => {
            let result = match task.last_agent_message().cloned() {
                Some(reply) => SendMessageResult::Message(reply),
                None => SendMessageResult::Task(task),
            };
            rpc_result(id, &result)
        }
        Err(e) => rpc_error(id, codes::INTERNAL_ERROR, format!("Task panicked: {}", e)),
    }
}

fn stream_message(state: A2aState, id: Value, message: Message) -> Response {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_task(state, message, Some(events_tx)));

    let stream = UnboundedReceiverStream::new(events_rx).map(move |event| {
        let result = match event {
            TaskEvent::Message(message) => serde_json::to_value(message),
            TaskEvent::Finished(task) => serde_json::to_value(TaskStatusUpdateEvent {
                kind: Default::default(),
                task_id: task.id,
                context_id: task.context_id,
                status: task.status,
                is_final: true,
            }),
        };
        let response = match result {
            Ok(result) => JsonRpcResponse::success(id.clone(), result),
            Err(e) => JsonRpcResponse::failure(
                id.clone(),
                JsonRpcError::new(codes::INTERNAL_ERROR, e.to_string()),
            ),
        };
        let data = serde_json::to_string(&response).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn cancel_task(state: A2aState, id: Value, task_id: String) -> Response {
    let signal = state.running.lock().await.remove(&task_id);
    if let Some(signal) = signal {
        let (done_tx, done_rx) = oneshot::channel();
        if signal.send(done_tx).is_ok() {
            info!("Canceling task {}", task_id);
            return match tokio::time::timeout(CANCEL_WAIT, done_rx).await {
                Ok(Ok(task)) => rpc_result(id, &task),
                _ => rpc_error(id, codes::INTERNAL_ERROR, "Task did not acknowledge cancel"),
            };
        }
    }

    match state.tasks.get(&task_id).await {
        None => task_not_found(id, &task_id),
        Some(task) => rpc_error(
            id,
            codes::TASK_NOT_CANCELABLE,
            format!("Task {} cannot be canceled in state {:?}", task.id, task.status.state),
        ),
    }
}

/// Drive one task from submission to a terminal state
async fn run_task(
    state: A2aState,
    mut message: Message,
    events: Option<mpsc::UnboundedSender<TaskEvent>>,
) -> Task {
    let task_id = uuid::Uuid::new_v4().to_string();
    let context_id = message
        .context_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    message.role = Role::User;
    message.task_id = Some(task_id.clone());
    message.context_id = Some(context_id.clone());

    state
        .tasks
        .insert(Task {
            kind: TaskKind::Task,
            id: task_id.clone(),
            context_id: context_id.clone(),
            status: TaskStatus::now(TaskState::Submitted, None),
            history: vec![message.clone()],
        })
        .await;

    let ctx = RequestContext {
        task_id: task_id.clone(),
        context_id,
        message,
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let queue = EventQueue::new(tx, &ctx);
    let (cancel_tx, cancel_rx) = oneshot::channel();
    state.running.lock().await.insert(task_id.clone(), cancel_tx);
    state.tasks.transition(&task_id, TaskState::Working).await;

    let executor = state.executor.clone();
    let worker = tokio::spawn(async move {
        tokio::select! {
            result = executor.execute(&ctx, &queue) => Outcome::Finished(result),
            Ok(done) = cancel_rx => {
                if let Err(e) = executor.cancel(&ctx, &queue).await {
                    warn!("Cancel handler for task {} failed: {}", ctx.task_id, e);
                }
                Outcome::Canceled(done)
            }
        }
    });

    // The queue lives inside the worker, so this ends when the worker does
    while let Some(message) = rx.recv().await {
        state.tasks.append(&task_id, message.clone()).await;
        if let Some(events) = &events {
            let _ = events.send(TaskEvent::Message(message));
        }
    }
    state.running.lock().await.remove(&task_id);

    let mut done = None;
    let final_state = match worker.await {
        Ok(Outcome::Finished(Ok(()))) => TaskState::Completed,
        Ok(Outcome::Finished(Err(e))) => {
            warn!("Task {} failed: {}", task_id, e);
            record_failure(&state, &task_id, e.to_string(), events.as_ref()).await;
            TaskState::Failed
        }
        Ok(Outcome::Canceled(sender)) => {
            done = Some(sender);
            TaskState::Canceled
        }
        Err(e) => {
            record_failure(&state, &task_id, format!("Task aborted: {}", e), events.as_ref()).await;
            TaskState::Failed
        }
    };

    let task = match state.tasks.transition(&task_id, final_state).await {
        Some(task) => task,
        None => Task {
            kind: TaskKind::Task,
            id: task_id.clone(),
            context_id: String::new(),
            status: TaskStatus::now(final_state, None),
            history: Vec::new(),
        },
    };
    debug!("Task {} finished as {:?}", task_id, final_state);

    if let Some(done) = done {
        let _ = done.send(task.clone());
    }
    if let Some(events) = events {
        let _ = events.send(TaskEvent::Finished(task.clone()));
    }
    task
}

async fn record_failure(
    state: &A2aState,
    task_id: &str,
    text: String,
    events: Option<&mpsc::UnboundedSender<TaskEvent>>,
) {
    let context_id = state.tasks.get(task_id).await.map(|t| t.context_id);
    let mut message = Message::agent_text(text);
    message.task_id = Some(task_id.to_string());
    message.context_id = context_id;
    state.tasks.append(task_id, message.clone()).await;
    if let Some(events) = events {
        let _ = events.send(TaskEvent::Message(message));
    }
}

fn params<T: serde::de::DeserializeOwned>(request: &JsonRpcRequest) -> std::result::Result<T, Response> {
    serde_json::from_value(request.params.clone()).map_err(|e| {
        rpc_error(
            request.id.clone().unwrap_or(Value::Null),
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", e),
        )
    })
}

fn rpc_result<T: serde::Serialize>(id: Value, result: &T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Json(JsonRpcResponse::success(id, value)).into_response(),
        Err(e) => rpc_error(id, codes::INTERNAL_ERROR, e.to_string()),
    }
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> Response {
    Json(JsonRpcResponse::failure(id, JsonRpcError::new(code, message))).into_response()
}

fn task_not_found(id: Value, task_id: &str) -> Response {
    rpc_error(id, codes::TASK_NOT_FOUND, format!("Task not found: {}", task_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::{AgentCapabilities, AgentSkill};
    use crate::error::Error;

    /// Echoes the request, optionally after a progress notice
    struct EchoExecutor;

    #[async_trait]
    impl AgentExecutor for EchoExecutor {
        async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> Result<()> {
            let text = ctx.user_text();
            if text == "fail" {
                return Err(Error::Generic("echo refused".to_string()));
            }
            if text == "wait" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            queue.enqueue_text("📝 working on it...");
            queue.enqueue_text(format!("echo: {}", text));
            Ok(())
        }

        async fn cancel(&self, _ctx: &RequestContext, queue: &EventQueue) -> Result<()> {
            queue.enqueue_text("🛑 Echo cancelled.");
            Ok(())
        }
    }

    fn card(url: &str) -> AgentCard {
        AgentCard {
            name: "Echo Agent".to_string(),
            description: "Echoes text".to_string(),
            url: url.to_string(),
            version: "1.0.0".to_string(),
            protocol_version: crate::a2a::types::PROTOCOL_VERSION.to_string(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            capabilities: AgentCapabilities { streaming: true },
            skills: vec![AgentSkill::new("echo", "Echo", "Echo text", &["test"], &[])],
        }
    }

    async fn spawn_echo() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = a2a_router(card(&format!("{}/", base)), Arc::new(EchoExecutor));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    async fn rpc(base: &str, body: Value) -> Value {
        reqwest::Client::new()
            .post(format!("{}/", base))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    fn send_body(text: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "message/send",
            "params": {"message": Message::user_text(text)}
        })
    }

    #[tokio::test]
    async fn serves_card_and_health() {
        let base = spawn_echo().await;
        let card: AgentCard = reqwest::get(format!("{}{}", base, AGENT_CARD_PATH))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(card.name, "Echo Agent");

        let health: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({"status": "healthy", "agent": "Echo Agent"}));
    }

    #[tokio::test]
    async fn send_returns_last_message_and_keeps_history() {
        let base = spawn_echo().await;
        let response = rpc(&base, send_body("hello")).await;
        assert_eq!(response["id"], 1);
        let reply: Message = serde_json::from_value(response["result"].clone()).unwrap();
        assert_eq!(reply.text(), "echo: hello");
        let task_id = reply.task_id.clone().unwrap();

        let response = rpc(
            &base,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tasks/get", "params": {"id": task_id}}),
        )
        .await;
        let task: Task = serde_json::from_value(response["result"].clone()).unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        let texts: Vec<String> = task.history.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["hello", "📝 working on it...", "echo: hello"]);
    }

    #[tokio::test]
    async fn executor_error_fails_the_task() {
        let base = spawn_echo().await;
        let response = rpc(&base, send_body("fail")).await;
        let reply: Message = serde_json::from_value(response["result"].clone()).unwrap();
        assert_eq!(reply.text(), "echo refused");

        let task_id = reply.task_id.unwrap();
        let response = rpc(
            &base,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tasks/get", "params": {"id": task_id}}),
        )
        .await;
        assert_eq!(response["result"]["status"]["state"], "failed");
    }

    #[tokio::test]
    async fn protocol_errors_use_json_rpc_codes() {
        let base = spawn_echo().await;
        let client = reqwest::Client::new();

        let parse: Value = client
            .post(format!("{}/", base))
            .body("{oops")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(parse["error"]["code"], codes::PARSE_ERROR);

        let unknown = rpc(&base, json!({"jsonrpc": "2.0", "id": 4, "method": "tasks/resubscribe"})).await;
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);

        let bad_params = rpc(
            &base,
            json!({"jsonrpc": "2.0", "id": 5, "method": "message/send", "params": {}}),
        )
        .await;
        assert_eq!(bad_params["error"]["code"], codes::INVALID_PARAMS);

        let missing = rpc(
            &base,
            json!({"jsonrpc": "2.0", "id": 6, "method": "tasks/get", "params": {"id": "nope"}}),
        )
        .await;
        assert_eq!(missing["error"]["code"], codes::TASK_NOT_FOUND);

        let wrong_version = rpc(&base, json!({"jsonrpc": "1.0", "id": 7, "method": "tasks/get"})).await;
        assert_eq!(wrong_version["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn cancel_records_message_and_terminal_task_is_not_cancelable() {
        let state = A2aState {
            card: Arc::new(card("http://localhost/")),
            executor: Arc::new(EchoExecutor),
            tasks: Arc::new(TaskStore::default()),
            running: Arc::new(Mutex::new(HashMap::new())),
        };

        let runner = tokio::spawn(run_task(state.clone(), Message::user_text("wait"), None));
        let task_id = loop {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Some(id) = state.running.lock().await.keys().next().cloned() {
                break id;
            }
        };

        let response = cancel_task(state.clone(), json!(1), task_id.clone()).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let response: Value = serde_json::from_slice(&body).unwrap();
        let task: Task = serde_json::from_value(response["result"].clone()).unwrap();
        assert_eq!(task.status.state, TaskState::Canceled);
        assert_eq!(task.last_agent_message().unwrap().text(), "🛑 Echo cancelled.");
        assert_eq!(runner.await.unwrap().status.state, TaskState::Canceled);

        let again = cancel_task(state, json!(2), task_id).await;
        let body = axum::body::to_bytes(again.into_body(), usize::MAX).await.unwrap();
        let again: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(again["error"]["code"], codes::TASK_NOT_CANCELABLE);
    }

    #[tokio::test]
    async fn stream_emits_messages_then_final_status() {
        let base = spawn_echo().await;
        let body = reqwest::Client::new()
            .post(format!("{}/", base))
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "s1",
                "method": "message/stream",
                "params": {"message": Message::user_text("streamed")}
            }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        let events: Vec<Value> = body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["result"]["parts"][0]["text"], "echo: streamed");
        assert_eq!(events[2]["result"]["kind"], "status-update");
        assert_eq!(events[2]["result"]["final"], true);
        assert_eq!(events[2]["result"]["status"]["state"], "completed");
    }
}
