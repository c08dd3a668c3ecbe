//! LLM orchestration for DevDesk.
//!
//! Holds the chat client abstraction, the closed set of data-lookup
//! tools, the function-calling orchestrator, and the query processor
//! that ties knowledge search, conversation memory, and logging
//! together.

pub mod client;
pub mod orchestrator;
pub mod processor;
pub mod tools;

pub use client::{AssistantReply, ChatClient, ChatMessage, ChatRequest, OpenAiClient, ScriptedClient, ToolInvocation};
pub use orchestrator::Agent;
pub use processor::{ChatOutcome, QueryProcessor};
pub use tools::{ToolCall, ToolRegistry};
