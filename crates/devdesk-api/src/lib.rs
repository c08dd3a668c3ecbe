//! HTTP API for DevDesk.
//!
//! Exposes registration/login, the chat endpoint, feedback,
//! conversation history and stats, observability logs, and read-only
//! dataset endpoints over axum.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
