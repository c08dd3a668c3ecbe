//! SQLite-backed persistence for DevDesk.
//!
//! Holds the five tables (users, employees, jira_tickets, deployments,
//! logs), schema migrations, repositories, and the one-shot JSON dataset
//! seeding used at startup.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod seed;

pub use db::Database;
pub use repository::{
    ConversationStats, DeploymentRepository, EmployeeRepository, LogRepository, TicketRepository,
    UserRepository,
};
pub use seed::seed_datasets;
