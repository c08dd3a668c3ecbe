//! Chat completion client abstraction.
//!
//! `OpenAiClient` talks to an OpenAI-compatible `/v1/chat/completions`
//! endpoint with function-calling support. `ScriptedClient` replays
//! canned replies for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use devdesk_core::error::DevDeskError;

/// One message in a chat conversation, in OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    /// Assistant message that requested tool calls.
    pub fn assistant_with_tools(content: impl Into<String>, calls: Vec<ToolCallPayload>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// Tool result message replying to a specific tool call id.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A tool call as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionPayload {
    pub name: String,
    /// Raw JSON string of arguments, as OpenAI sends it.
    pub arguments: String,
}

/// A tool call requested by the assistant, decoded from the wire payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// The assistant's reply to one completion request.
#[derive(Debug, Clone, Default)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(calls: Vec<ToolInvocation>) -> Self {
        Self {
            content: None,
            tool_calls: calls,
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// JSON tool schemas; when present, tool_choice is "auto".
    pub tools: Option<Vec<serde_json::Value>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// A chat completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantReply, DevDeskError>;
}

// ---------------------------------------------------------------------------
// OpenAiClient
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [serde_json::Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallPayload>,
}

/// Chat client for an OpenAI-compatible completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, DevDeskError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DevDeskError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantReply, DevDeskError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = WireRequest {
            model: &self.model,
            messages: &request.messages,
            tools: request.tools.as_deref(),
            tool_choice: request.tools.is_some().then_some("auto"),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, messages = request.messages.len(), "Chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DevDeskError::Llm(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DevDeskError::Llm(format!(
                "Chat API returned {}: {}",
                status, text
            )));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| DevDeskError::Llm(format!("Invalid chat response: {}", e)))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| DevDeskError::Llm("Chat response had no choices".to_string()))?;

        Ok(AssistantReply {
            content: message.content,
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(|tc| ToolInvocation {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                })
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedClient - canned replies for tests
// ---------------------------------------------------------------------------

/// Chat client that replays a fixed sequence of replies.
///
/// Each call to `complete` pops the next reply; running out of script
/// is an error. Sent requests are recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<AssistantReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<AssistantReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantReply, DevDeskError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let mut replies = self
            .replies
            .lock()
            .map_err(|e| DevDeskError::Llm(format!("Script lock poisoned: {}", e)))?;
        replies
            .pop_front()
            .ok_or_else(|| DevDeskError::Llm("Scripted client ran out of replies".to_string()))
    }
}
