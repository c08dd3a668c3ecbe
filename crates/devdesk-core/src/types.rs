//! Domain types shared across DevDesk crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a query/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Answered from live dataset lookups (one or more tools invoked).
    DynamicData,
    /// Answered from documentation or general knowledge (no tools).
    StaticKnowledge,
    /// Outside the assistant's data sources; answered with a deflection.
    OutOfScope,
    /// The LLM or a downstream service failed.
    Error,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::DynamicData => "dynamic_data",
            QueryType::StaticKnowledge => "static_knowledge",
            QueryType::OutOfScope => "out_of_scope",
            QueryType::Error => "error",
        }
    }

    /// Parse from the stored string form. Unknown values map to Error.
    pub fn parse(s: &str) -> Self {
        match s {
            "dynamic_data" => QueryType::DynamicData,
            "static_knowledge" => QueryType::StaticKnowledge,
            "out_of_scope" => QueryType::OutOfScope,
            _ => QueryType::Error,
        }
    }
}

/// An employee record from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub team: String,
    pub jira_username: String,
}

/// A Jira ticket record from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraTicket {
    pub id: String,
    pub summary: String,
    pub assignee: String,
    pub status: String,
    pub priority: String,
}

/// A deployment record from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub id: i64,
    pub service: String,
    pub version: String,
    pub date: DateTime<Utc>,
    pub status: String,
}

/// User feedback attached to a log entry after the fact.
///
/// Fixed shape: a boolean verdict plus optional free text. At most one
/// payload per log entry; a later submission overwrites an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub helpful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One persisted record of a query/response cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub sources: Vec<String>,
    pub query_type: QueryType,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
    pub user_id: Option<String>,
    pub feedback: Option<Feedback>,
}

/// Result of running a query through the orchestrator (not yet logged).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<String>,
    pub query_type: QueryType,
}

/// A chunk of knowledge-base documentation, ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocChunk {
    /// Stable chunk id: `<file stem>_<index>`.
    pub id: String,
    /// Source markdown filename, e.g. `escalation_policy.md`.
    pub filename: String,
    /// Document title (first `#` heading, or the file stem).
    pub title: String,
    pub content: String,
}
