//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use devdesk_agent::QueryProcessor;
use devdesk_core::config::DevDeskConfig;
use devdesk_knowledge::KnowledgeSearch;
use devdesk_storage::{
    Database, DeploymentRepository, EmployeeRepository, LogRepository, TicketRepository,
    UserRepository,
};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
/// Session tokens live in memory and are dropped on restart.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<DevDeskConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    /// Indexed knowledge base.
    pub knowledge: Arc<KnowledgeSearch>,
    /// Query pipeline: context, LLM orchestration, logging.
    pub processor: Arc<QueryProcessor>,
    pub users: Arc<UserRepository>,
    pub logs: Arc<LogRepository>,
    pub employees: Arc<EmployeeRepository>,
    pub tickets: Arc<TicketRepository>,
    pub deployments: Arc<DeploymentRepository>,
    /// Active bearer tokens mapped to usernames.
    pub sessions: Arc<Mutex<HashMap<String, String>>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(
        config: DevDeskConfig,
        database: Arc<Database>,
        knowledge: Arc<KnowledgeSearch>,
        processor: Arc<QueryProcessor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(UserRepository::new(Arc::clone(&database))),
            logs: Arc::new(LogRepository::new(Arc::clone(&database))),
            employees: Arc::new(EmployeeRepository::new(Arc::clone(&database))),
            tickets: Arc::new(TicketRepository::new(Arc::clone(&database))),
            deployments: Arc::new(DeploymentRepository::new(Arc::clone(&database))),
            database,
            knowledge,
            processor,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// Resolve a bearer token to a username, if the session exists.
    pub fn session_user(&self, token: &str) -> Option<String> {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(token).cloned())
    }

    /// Record a new session token for a user.
    pub fn insert_session(&self, token: String, username: String) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(token, username);
        }
    }
}
