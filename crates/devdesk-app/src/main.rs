//! DevDesk application binary - composition root.
//!
//! Ties together all DevDesk crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open SQLite storage and seed the reference datasets
//! 3. Load and index the markdown knowledge base
//! 4. Wire the LLM orchestrator (or degrade gracefully without a key)
//! 5. Start the axum REST API server

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devdesk_agent::{Agent, OpenAiClient, QueryProcessor, ToolRegistry};
use devdesk_core::config::DevDeskConfig;
use devdesk_knowledge::{
    load_documents, DynEmbeddingService, HttpEmbeddingService, KnowledgeSearch, MockEmbedding,
};
use devdesk_storage::{
    seed_datasets, Database, DeploymentRepository, EmployeeRepository, LogRepository,
    TicketRepository,
};

use devdesk_api::{routes, AppState};

/// Dimensionality of text-embedding-ada-002 vectors.
const ADA_DIMENSIONS: usize = 1536;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting DevDesk v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = config_path();
    let config = DevDeskConfig::load_or_default(&config_file);
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("devdesk.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let datasets_dir = resolve_relative(&data_dir, &config.datasets.dir);
    seed_datasets(Arc::clone(&db), &datasets_dir)?;

    // LLM backend. Without a key the service still runs, answering
    // straight from documentation.
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
    if api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; running without LLM orchestration");
    }

    // Knowledge base.
    let kb_dir = resolve_relative(&data_dir, &config.knowledge.kb_dir);
    let chunks = load_documents(&kb_dir)?;
    let embedder: Box<dyn DynEmbeddingService> = match &api_key {
        Some(key) => Box::new(HttpEmbeddingService::new(
            &config.llm.base_url,
            key,
            &config.llm.embedding_model,
            config.llm.timeout_secs,
            ADA_DIMENSIONS,
        )?),
        None => Box::new(MockEmbedding::new()),
    };
    let knowledge = Arc::new(
        KnowledgeSearch::from_chunks(
            chunks,
            embedder,
            config.knowledge.top_k,
            config.knowledge.snippet_max_chars,
        )
        .await?,
    );
    tracing::info!(chunks = knowledge.len(), "Knowledge base indexed");

    // Orchestrator.
    let agent = match &api_key {
        Some(key) => {
            let client = OpenAiClient::new(
                &config.llm.base_url,
                key,
                &config.llm.model,
                config.llm.timeout_secs,
            )?;
            let registry = ToolRegistry::new(
                Arc::new(EmployeeRepository::new(Arc::clone(&db))),
                Arc::new(TicketRepository::new(Arc::clone(&db))),
                Arc::new(DeploymentRepository::new(Arc::clone(&db))),
            );
            Some(Agent::new(
                Box::new(client),
                registry,
                config.llm.max_tokens,
            ))
        }
        None => None,
    };

    let processor = Arc::new(QueryProcessor::new(
        Arc::clone(&knowledge),
        agent,
        Arc::new(LogRepository::new(Arc::clone(&db))),
    ));

    let state = AppState::new(config.clone(), db, knowledge, processor);

    routes::start_server(&config, state).await?;

    Ok(())
}

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Resolve a config path against the data directory unless absolute.
fn resolve_relative(data_dir: &Path, path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        data_dir.join(p)
    }
}

/// Resolve the config file path (DEVDESK_CONFIG env, or ~/.devdesk/config.toml).
fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("DEVDESK_CONFIG") {
        return PathBuf::from(p);
    }
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".devdesk").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".devdesk").join("config.toml");
    }
    PathBuf::from("config.toml")
}
