//! Query processor tying knowledge search, conversation memory, the
//! orchestrator, and logging into one request pipeline.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use devdesk_core::error::DevDeskError;
use devdesk_core::types::{LogEntry, QueryOutcome, QueryType};
use devdesk_knowledge::KnowledgeSearch;
use devdesk_storage::LogRepository;

use crate::orchestrator::Agent;

/// Maximum characters of conversation history fed back into the LLM.
const MAX_CONTEXT_CHARS: usize = 2000;

/// How many previous interactions count as conversation memory.
const CONTEXT_TURNS: u64 = 5;

/// The final result of processing one chat query.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatOutcome {
    pub log_id: i64,
    pub answer: String,
    pub sources: Vec<String>,
    pub query_type: QueryType,
    /// Seconds spent processing the query.
    pub processing_time: f64,
}

/// Orchestrates the full query pipeline.
///
/// Without an agent (no API key configured) the processor degrades to
/// returning the most relevant documentation directly.
pub struct QueryProcessor {
    knowledge: Arc<KnowledgeSearch>,
    agent: Option<Agent>,
    logs: Arc<LogRepository>,
}

impl QueryProcessor {
    pub fn new(
        knowledge: Arc<KnowledgeSearch>,
        agent: Option<Agent>,
        logs: Arc<LogRepository>,
    ) -> Self {
        Self {
            knowledge,
            agent,
            logs,
        }
    }

    /// Process a query end to end: context building, LLM orchestration,
    /// and logging. The log row is written for every outcome, errors
    /// included.
    pub async fn process(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<ChatOutcome, DevDeskError> {
        let start = Instant::now();
        info!(user = user_id.unwrap_or("anonymous"), "Processing query");

        let kb_context = match self.knowledge.context(query).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Knowledge search failed: {}", e);
                Default::default()
            }
        };

        let history = match user_id {
            Some(user) => self.conversation_context(user)?,
            None => String::new(),
        };

        let outcome = match &self.agent {
            Some(agent) => agent.answer(query, &kb_context.text, &history).await,
            None => degraded_outcome(&kb_context.text, &kb_context.sources),
        };

        let processing_time = start.elapsed().as_secs_f64();
        let log_id = self.logs.insert(
            query,
            &outcome.answer,
            &outcome.sources,
            outcome.query_type,
            processing_time,
            user_id,
        )?;

        info!(
            log_id,
            query_type = outcome.query_type.as_str(),
            elapsed = processing_time,
            "Query completed"
        );

        Ok(ChatOutcome {
            log_id,
            answer: outcome.answer,
            sources: outcome.sources,
            query_type: outcome.query_type,
            processing_time,
        })
    }

    /// Build conversation memory from the user's recent log entries.
    ///
    /// Turns are rendered oldest first and capped at
    /// [`MAX_CONTEXT_CHARS`]; older turns are dropped once the budget
    /// is spent.
    fn conversation_context(&self, user_id: &str) -> Result<String, DevDeskError> {
        let recent = self.logs.history(user_id, CONTEXT_TURNS)?;
        Ok(render_context(&recent))
    }
}

/// Render log entries (given newest first) as chronological chat turns.
fn render_context(entries_newest_first: &[LogEntry]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut total = 0usize;

    for entry in entries_newest_first {
        let mut turn = format!("User: {}\nAssistant: {}", entry.query, entry.response);
        if !entry.sources.is_empty() {
            turn.push_str(&format!("\nSources used: {}", entry.sources.join(", ")));
        }
        if total + turn.len() > MAX_CONTEXT_CHARS {
            break;
        }
        total += turn.len();
        parts.push(turn);
    }

    // Collected newest first so the cap drops the oldest turns.
    parts.reverse();
    parts.join("\n\n")
}

/// Answer straight from documentation when no LLM is configured.
fn degraded_outcome(kb_text: &str, kb_sources: &[String]) -> QueryOutcome {
    if kb_text.is_empty() {
        return QueryOutcome {
            answer: "No language model is configured and no relevant documentation was found. \
                     Please set an API key to enable full answers."
                .to_string(),
            sources: Vec::new(),
            query_type: QueryType::StaticKnowledge,
        };
    }

    QueryOutcome {
        answer: format!(
            "No language model is configured, so here is the most relevant documentation:\n\n{}",
            kb_text
        ),
        sources: kb_sources.to_vec(),
        query_type: QueryType::StaticKnowledge,
    }
}
