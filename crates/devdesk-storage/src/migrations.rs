//! Database schema migrations.
//!
//! Applies the initial schema: users, employees, jira_tickets, deployments,
//! logs, and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use devdesk_core::error::DevDeskError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), DevDeskError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| DevDeskError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| DevDeskError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), DevDeskError> {
    conn.execute_batch(
        "
        -- Registered users.
        CREATE TABLE IF NOT EXISTS users (
            username        TEXT PRIMARY KEY NOT NULL,
            password_hash   TEXT NOT NULL,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Reference datasets, seeded once from JSON and read-only at runtime.
        CREATE TABLE IF NOT EXISTS employees (
            id              INTEGER PRIMARY KEY,
            name            TEXT NOT NULL,
            email           TEXT NOT NULL,
            role            TEXT NOT NULL DEFAULT '',
            team            TEXT NOT NULL DEFAULT '',
            jira_username   TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS jira_tickets (
            id              TEXT PRIMARY KEY NOT NULL,
            summary         TEXT NOT NULL,
            assignee        TEXT NOT NULL DEFAULT '',
            status          TEXT NOT NULL DEFAULT '',
            priority        TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_status
            ON jira_tickets (status);

        CREATE INDEX IF NOT EXISTS idx_tickets_assignee
            ON jira_tickets (assignee);

        CREATE TABLE IF NOT EXISTS deployments (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            service         TEXT NOT NULL,
            version         TEXT NOT NULL,
            date            TEXT NOT NULL,
            status          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_deployments_service
            ON deployments (service, date DESC);

        -- One row per query/response cycle. sources is a JSON array of
        -- strings; feedback is a JSON object or NULL until attached.
        CREATE TABLE IF NOT EXISTS logs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp       INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            query           TEXT NOT NULL,
            response        TEXT NOT NULL,
            sources         TEXT NOT NULL DEFAULT '[]',
            query_type      TEXT NOT NULL,
            processing_time REAL NOT NULL DEFAULT 0.0,
            user_id         TEXT,
            feedback        TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_logs_user
            ON logs (user_id, timestamp DESC);

        CREATE INDEX IF NOT EXISTS idx_logs_timestamp
            ON logs (timestamp DESC);

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| DevDeskError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        // Running again should be idempotent.
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_users_table_exists() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, password_hash) VALUES ('alice', 'hash')",
            [],
        )
        .unwrap();

        let hash: String = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = 'alice'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hash, "hash");
    }

    #[test]
    fn test_duplicate_username_rejected_by_schema() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, password_hash) VALUES ('alice', 'h1')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash) VALUES ('alice', 'h2')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_logs_table_defaults() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO logs (query, response, query_type) VALUES ('q', 'r', 'static_knowledge')",
            [],
        )
        .unwrap();

        let (sources, feedback): (String, Option<String>) = conn
            .query_row("SELECT sources, feedback FROM logs WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(sources, "[]");
        assert!(feedback.is_none());
    }

    #[test]
    fn test_dataset_tables_exist() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO employees (id, name, email) VALUES (1, 'Sara', 'sara@x.com')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO jira_tickets (id, summary) VALUES ('DEV-1', 'Fix login')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO deployments (service, version, date, status)
             VALUES ('payments', '1.0.0', '2025-08-01T10:00:00Z', 'success')",
            [],
        )
        .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM deployments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
