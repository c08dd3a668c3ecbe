//! Shared types, configuration, and errors for DevDesk.
//!
//! DevDesk is an internal AI assistant for a development team: it answers
//! questions by combining a markdown knowledge base, three reference
//! datasets (employees, Jira tickets, deployments), and an LLM that picks
//! and invokes lookup tools before composing a cited answer.

pub mod config;
pub mod error;
pub mod types;

pub use config::DevDeskConfig;
pub use error::{DevDeskError, Result};
pub use types::{
    Deployment, DocChunk, Employee, Feedback, JiraTicket, LogEntry, QueryOutcome, QueryType,
};
