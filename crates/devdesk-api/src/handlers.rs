//! Route handlers for all API endpoints.

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use devdesk_agent::ChatOutcome;
use devdesk_core::types::{Deployment, Employee, Feedback, JiraTicket, LogEntry};
use devdesk_storage::ConversationStats;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: u64 = 20;
const DEFAULT_LOGS_LIMIT: u64 = 50;
const MAX_LOGS_LIMIT: u64 = 200;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub knowledge_chunks: usize,
}

/// GET /health - liveness probe, no auth required.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        knowledge_chunks: state.knowledge.len(),
    })
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub query: String,
}

/// POST /chat - run a query through the full pipeline.
///
/// The authenticated username is the conversation owner.
pub async fn chat(
    State(state): State<AppState>,
    Extension(AuthUser(username)): Extension<AuthUser>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatOutcome>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    let outcome = state.processor.process(&body.query, Some(&username)).await?;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub log_id: i64,
    pub helpful: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub status: &'static str,
    pub log_id: i64,
}

/// POST /feedback - attach feedback to a logged interaction.
///
/// Unknown log ids return 404; submitting twice overwrites.
pub async fn feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let feedback = Feedback {
        helpful: body.helpful,
        comment: body.comment,
        timestamp: Utc::now(),
    };
    state.logs.attach_feedback(body.log_id, &feedback)?;

    Ok(Json(FeedbackResponse {
        status: "recorded",
        log_id: body.log_id,
    }))
}

// ---------------------------------------------------------------------------
// Conversation history and stats
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub count: usize,
    pub history: Vec<LogEntry>,
}

/// GET /conversation/history/{user} - recent interactions, newest first.
pub async fn conversation_history(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = state.logs.history(&user, limit)?;

    Ok(Json(HistoryResponse {
        user_id: user,
        count: history.len(),
        history,
    }))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub stats: ConversationStats,
}

/// GET /conversation/stats/{user} - aggregate statistics for a user.
pub async fn conversation_stats(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.logs.stats(&user)?;
    Ok(Json(StatsResponse {
        user_id: user,
        stats,
    }))
}

// ---------------------------------------------------------------------------
// Observability
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub count: usize,
    pub logs: Vec<LogEntry>,
}

/// GET /observability/logs - recent interactions across all users.
///
/// Limit defaults to 50 and is capped at 200.
pub async fn observability_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOGS_LIMIT).min(MAX_LOGS_LIMIT);
    let logs = state.logs.recent(limit)?;

    Ok(Json(LogsResponse {
        count: logs.len(),
        logs,
    }))
}

// ---------------------------------------------------------------------------
// Reference datasets
// ---------------------------------------------------------------------------

/// GET /employees - full employee dataset.
pub async fn employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(state.employees.all()?))
}

/// GET /tickets - full Jira ticket dataset.
pub async fn tickets(State(state): State<AppState>) -> Result<Json<Vec<JiraTicket>>, ApiError> {
    Ok(Json(state.tickets.all()?))
}

/// GET /deployments - deployments, most recent first.
pub async fn deployments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Deployment>>, ApiError> {
    Ok(Json(state.deployments.all()?))
}
