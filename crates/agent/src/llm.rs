use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use horizon_core::config::{LlmConfig, LlmProvider};
use horizon_core::errors::{ApplicationError, ErrorCode};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm endpoint unreachable: {0}")]
    Network(String),
    #[error("llm request timed out after {0}s")]
    Timeout(u64),
    #[error("llm endpoint returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("could not interpret llm response: {0}")]
    Decode(String),
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorCode::NetworkError,
            Self::Api { .. } | Self::Decode(_) => ErrorCode::ApiFailure,
            Self::Configuration(_) => ErrorCode::InternalError,
        }
    }
}

impl From<LlmError> for ApplicationError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Network(_) | LlmError::Timeout(_) => Self::Network(error.to_string()),
            LlmError::Api { .. } | LlmError::Decode(_) => Self::Integration(error.to_string()),
            LlmError::Configuration(message) => Self::Configuration(message),
        }
    }
}

/// One system + user exchange. `json_mode` asks the endpoint to constrain the
/// reply to a JSON object; endpoints that ignore the hint still get a prompt
/// that asks for JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: system.into(), user: user.into(), json_mode: false }
    }

    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: system.into(), user: user.into(), json_mode: true }
    }
}

/// A function the model may call, described by a JSON schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A call the model asked for. `arguments` is the raw JSON text it produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationMessage {
    System(String),
    User(String),
    Assistant { content: Option<String>, tool_calls: Vec<ToolCall> },
    Tool { call_id: String, content: String },
}

impl ConversationMessage {
    fn role(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::User(_) => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }
}

/// A multi-turn exchange with optional function calling.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationRequest {
    pub messages: Vec<ConversationMessage>,
    pub tools: Vec<ToolSpec>,
}

impl ConversationRequest {
    /// First system and first user message, for logging and test inspection.
    pub fn summary(&self) -> CompletionRequest {
        let first = |role: &str| {
            self.messages
                .iter()
                .find_map(|message| match message {
                    ConversationMessage::System(text) if role == "system" => Some(text.clone()),
                    ConversationMessage::User(text) if role == "user" => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default()
        };
        CompletionRequest::text(first("system"), first("user"))
    }
}

/// What the model answered: text, tool calls, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), tool_calls: Vec::new() }
    }

    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self { content: None, tool_calls }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// One model turn over a running conversation. The model may answer with
    /// text or ask for one or more of `request.tools`.
    async fn converse(&self, request: &ConversationRequest) -> Result<AssistantTurn, LlmError>;

    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ConversationMessage> for WireMessage<'a> {
    fn from(message: &'a ConversationMessage) -> Self {
        let role = message.role();
        match message {
            ConversationMessage::System(text) | ConversationMessage::User(text) => {
                Self { role, content: Some(text.as_str()), tool_calls: Vec::new(), tool_call_id: None }
            }
            ConversationMessage::Assistant { content, tool_calls } => Self {
                role,
                content: content.as_deref(),
                tool_calls: tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: &call.id,
                        kind: "function",
                        function: WireFunctionCall { name: &call.name, arguments: &call.arguments },
                    })
                    .collect(),
                tool_call_id: None,
            },
            ConversationMessage::Tool { call_id, content } => Self {
                role,
                content: Some(content.as_str()),
                tool_calls: Vec::new(),
                tool_call_id: Some(call_id.as_str()),
            },
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolSpec> for WireTool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &spec.name,
                description: &spec.description,
                parameters: &spec.parameters,
            },
        }
    }
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ReplyToolCall>,
}

#[derive(Deserialize)]
struct ReplyToolCall {
    #[serde(default)]
    id: String,
    function: ReplyFunction,
}

#[derive(Deserialize)]
struct ReplyFunction {
    name: String,
    /// A JSON string from OpenAI; some Ollama builds send an object instead.
    #[serde(default)]
    arguments: Value,
}

impl ReplyMessage {
    fn into_turn(self) -> AssistantTurn {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() { format!("call_{index}") } else { call.id },
                name: call.function.name,
                arguments: match call.function.arguments {
                    Value::String(text) => text,
                    Value::Null => "{}".to_string(),
                    other => other.to_string(),
                },
            })
            .collect();
        AssistantTurn { content: self.content.filter(|text| !text.is_empty()), tool_calls }
    }
}

/// Client for any endpoint speaking the OpenAI chat completions protocol
/// (OpenAI itself, or a local Ollama server under `/v1`).
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
            return Err(LlmError::Configuration(
                "the openai provider needs an api key".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn map_transport_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else if error.is_decode() {
            LlmError::Decode(error.to_string())
        } else {
            LlmError::Network(error.to_string())
        }
    }
}

impl OpenAiCompatibleClient {
    async fn send(&self, body: &ChatCompletionBody<'_>) -> Result<ReplyMessage, LlmError> {
        let mut builder = self
            .client
            .post(format!("{}{}", self.base_url, "/chat/completions"))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(api_key) = &self.api_key {
            builder =
                builder.header(header::AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()));
        }

        let response = builder.send().await.map_err(|error| self.map_transport_error(error))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), message: summarize(status, message) });
        }

        let decoded: ChatCompletionResponse =
            response.json().await.map_err(|error| self.map_transport_error(error))?;
        decoded
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::Decode("response carried no choices".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: Some(request.system.as_str()),
                    tool_calls: Vec::new(),
                    tool_call_id: None,
                },
                WireMessage {
                    role: "user",
                    content: Some(request.user.as_str()),
                    tool_calls: Vec::new(),
                    tool_call_id: None,
                },
            ],
            tools: Vec::new(),
            response_format: request.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let content = self
            .send(&body)
            .await?
            .content
            .ok_or_else(|| LlmError::Decode("response carried no content".to_string()))?;

        tracing::debug!(
            event_name = "agent.llm.completed",
            model = %self.model,
            json_mode = request.json_mode,
            chars = content.len(),
            "llm completion received"
        );
        Ok(content)
    }

    async fn converse(&self, request: &ConversationRequest) -> Result<AssistantTurn, LlmError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools.iter().map(WireTool::from).collect(),
            response_format: None,
        };

        let turn = self.send(&body).await?.into_turn();
        tracing::debug!(
            event_name = "agent.llm.turn",
            model = %self.model,
            messages = request.messages.len(),
            tool_calls = turn.tool_calls.len(),
            "llm turn received"
        );
        Ok(turn)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn summarize(status: StatusCode, body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.canonical_reason().unwrap_or("no body").to_string();
    }
    trimmed.chars().take(300).collect()
}

/// Replays queued turns in order and records every request it was given.
/// Backs the tool and route tests; also handy for offline demos.
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<AssistantTurn, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    conversations: Mutex<Vec<ConversationRequest>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Ok(AssistantTurn::text(reply))])),
            ..Self::default()
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(AssistantTurn::text(reply)));
    }

    /// Queues a turn in which the model calls `name` with `arguments`.
    pub async fn push_tool_call(&self, name: &str, arguments: Value) {
        let mut replies = self.replies.lock().await;
        let call = ToolCall {
            id: format!("call_{}", replies.len() + 1),
            name: name.to_string(),
            arguments: arguments.to_string(),
        };
        replies.push_back(Ok(AssistantTurn::calls(vec![call])));
    }

    pub async fn push_error(&self, error: LlmError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Every request seen, flattened to its system and first user message.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn conversations(&self) -> Vec<ConversationRequest> {
        self.conversations.lock().await.clone()
    }

    async fn next_turn(&self) -> Result<AssistantTurn, LlmError> {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Network("no scripted reply left".to_string())))
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().await.push(request.clone());
        self.next_turn()
            .await?
            .content
            .ok_or_else(|| LlmError::Decode("scripted turn held tool calls, not text".to_string()))
    }

    async fn converse(&self, request: &ConversationRequest) -> Result<AssistantTurn, LlmError> {
        self.requests.lock().await.push(request.summary());
        self.conversations.lock().await.push(request.clone());
        self.next_turn().await
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
