//! Repository implementations for SQLite-backed persistence.
//!
//! Provides UserRepository, EmployeeRepository, TicketRepository,
//! DeploymentRepository, and LogRepository that operate on the Database
//! struct using raw SQL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;

use devdesk_core::error::DevDeskError;
use devdesk_core::types::{Deployment, Employee, Feedback, JiraTicket, LogEntry, QueryType};

use crate::db::Database;

/// A stored user row.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for registered users.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new user. Fails with an Auth error if the username exists.
    pub fn create(&self, username: &str, password_hash: &str) -> Result<(), DevDeskError> {
        self.db.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO users (username, password_hash, created_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![username, password_hash, Utc::now().timestamp()],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(DevDeskError::Auth(format!(
                        "User '{}' already exists",
                        username
                    )))
                }
                Err(e) => Err(DevDeskError::Storage(format!(
                    "Failed to create user: {}",
                    e
                ))),
            }
        })
    }

    /// Find a user by username.
    pub fn find(&self, username: &str) -> Result<Option<StoredUser>, DevDeskError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT username, password_hash, created_at FROM users WHERE username = ?1",
                rusqlite::params![username],
                |row| {
                    Ok(StoredUser {
                        username: row.get(0)?,
                        password_hash: row.get(1)?,
                        created_at: epoch_to_datetime(row.get(2)?),
                    })
                },
            )
            .optional()
            .map_err(|e| DevDeskError::Storage(e.to_string()))
        })
    }
}

/// Repository for the employees reference dataset.
pub struct EmployeeRepository {
    db: Arc<Database>,
}

impl EmployeeRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn insert(&self, emp: &Employee) -> Result<(), DevDeskError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO employees (id, name, email, role, team, jira_username)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    emp.id,
                    emp.name,
                    emp.email,
                    emp.role,
                    emp.team,
                    emp.jira_username
                ],
            )
            .map_err(|e| DevDeskError::Storage(format!("Failed to insert employee: {}", e)))?;
            Ok(())
        })
    }

    /// All employees, ordered by id.
    pub fn all(&self) -> Result<Vec<Employee>, DevDeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, email, role, team, jira_username
                     FROM employees ORDER BY id",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(Employee {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        role: row.get(3)?,
                        team: row.get(4)?,
                        jira_username: row.get(5)?,
                    })
                })
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DevDeskError::Storage(e.to_string()))
        })
    }

    pub fn count(&self) -> Result<u64, DevDeskError> {
        count_table(&self.db, "employees")
    }
}

/// Repository for the jira_tickets reference dataset.
pub struct TicketRepository {
    db: Arc<Database>,
}

impl TicketRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn insert(&self, ticket: &JiraTicket) -> Result<(), DevDeskError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO jira_tickets (id, summary, assignee, status, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    ticket.id,
                    ticket.summary,
                    ticket.assignee,
                    ticket.status,
                    ticket.priority
                ],
            )
            .map_err(|e| DevDeskError::Storage(format!("Failed to insert ticket: {}", e)))?;
            Ok(())
        })
    }

    /// All tickets, ordered by id.
    pub fn all(&self) -> Result<Vec<JiraTicket>, DevDeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, summary, assignee, status, priority
                     FROM jira_tickets ORDER BY id",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(JiraTicket {
                        id: row.get(0)?,
                        summary: row.get(1)?,
                        assignee: row.get(2)?,
                        status: row.get(3)?,
                        priority: row.get(4)?,
                    })
                })
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DevDeskError::Storage(e.to_string()))
        })
    }

    pub fn count(&self) -> Result<u64, DevDeskError> {
        count_table(&self.db, "jira_tickets")
    }
}

/// Repository for the deployments reference dataset.
pub struct DeploymentRepository {
    db: Arc<Database>,
}

impl DeploymentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn insert(&self, dep: &Deployment) -> Result<(), DevDeskError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO deployments (service, version, date, status)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![dep.service, dep.version, dep.date.to_rfc3339(), dep.status],
            )
            .map_err(|e| DevDeskError::Storage(format!("Failed to insert deployment: {}", e)))?;
            Ok(())
        })
    }

    /// All deployments, most recent first.
    pub fn all(&self) -> Result<Vec<Deployment>, DevDeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, service, version, date, status
                     FROM deployments ORDER BY date DESC",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let date_str: String = row.get(3)?;
                    Ok(Deployment {
                        id: row.get(0)?,
                        service: row.get(1)?,
                        version: row.get(2)?,
                        date: DateTime::parse_from_rfc3339(&date_str)
                            .map(|d| d.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).single().unwrap_or_default()),
                        status: row.get(4)?,
                    })
                })
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DevDeskError::Storage(e.to_string()))
        })
    }

    pub fn count(&self) -> Result<u64, DevDeskError> {
        count_table(&self.db, "deployments")
    }
}

/// Per-user conversation statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationStats {
    pub total_conversations: u64,
    pub recent_conversations_24h: u64,
    pub query_type_distribution: HashMap<String, u64>,
    /// Percentage of log entries carrying feedback (0.0 when empty).
    pub feedback_rate: f64,
}

/// Repository for query/response log entries.
pub struct LogRepository {
    db: Arc<Database>,
}

impl LogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a log entry and return its assigned id.
    pub fn insert(
        &self,
        query: &str,
        response: &str,
        sources: &[String],
        query_type: QueryType,
        processing_time: f64,
        user_id: Option<&str>,
    ) -> Result<i64, DevDeskError> {
        let sources_json = serde_json::to_string(sources)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO logs (timestamp, query, response, sources, query_type, processing_time, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    Utc::now().timestamp(),
                    query,
                    response,
                    sources_json,
                    query_type.as_str(),
                    processing_time,
                    user_id,
                ],
            )
            .map_err(|e| DevDeskError::Storage(format!("Failed to insert log: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Find a log entry by id.
    pub fn find(&self, id: i64) -> Result<Option<LogEntry>, DevDeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, query, response, sources, query_type,
                            processing_time, user_id, feedback
                     FROM logs WHERE id = ?1",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id], |row| Ok(row_to_log_entry(row)))
                .optional()
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            match result {
                Some(entry) => Ok(Some(entry?)),
                None => Ok(None),
            }
        })
    }

    /// Attach feedback to an existing log entry.
    ///
    /// Unknown ids are an error; a second submission overwrites the first.
    pub fn attach_feedback(&self, id: i64, feedback: &Feedback) -> Result<(), DevDeskError> {
        let payload = serde_json::to_string(feedback)?;
        self.db.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE logs SET feedback = ?1 WHERE id = ?2",
                    rusqlite::params![payload, id],
                )
                .map_err(|e| DevDeskError::Storage(format!("Failed to attach feedback: {}", e)))?;
            if updated == 0 {
                return Err(DevDeskError::LogNotFound(id));
            }
            Ok(())
        })
    }

    /// Recent entries for a user, newest first.
    pub fn history(&self, user_id: &str, limit: u64) -> Result<Vec<LogEntry>, DevDeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, query, response, sources, query_type,
                            processing_time, user_id, feedback
                     FROM logs WHERE user_id = ?1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?2",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(row_to_log_entry(row))
                })
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            collect_entries(rows)
        })
    }

    /// Recent entries across all users, newest first.
    pub fn recent(&self, limit: u64) -> Result<Vec<LogEntry>, DevDeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, query, response, sources, query_type,
                            processing_time, user_id, feedback
                     FROM logs
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![limit], |row| Ok(row_to_log_entry(row)))
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            collect_entries(rows)
        })
    }

    /// Aggregate conversation statistics for a user.
    pub fn stats(&self, user_id: &str) -> Result<ConversationStats, DevDeskError> {
        self.db.with_conn(|conn| {
            let total: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM logs WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))? as u64;

            let cutoff = Utc::now().timestamp() - 24 * 60 * 60;
            let recent: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM logs WHERE user_id = ?1 AND timestamp >= ?2",
                    rusqlite::params![user_id, cutoff],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))? as u64;

            let mut stmt = conn
                .prepare(
                    "SELECT query_type, COUNT(*) FROM logs
                     WHERE user_id = ?1 GROUP BY query_type",
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;
            let dist_rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })
                .map_err(|e| DevDeskError::Storage(e.to_string()))?;

            let mut query_type_distribution = HashMap::new();
            for row in dist_rows {
                let (qt, count) = row.map_err(|e| DevDeskError::Storage(e.to_string()))?;
                query_type_distribution.insert(qt, count);
            }

            let with_feedback: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM logs WHERE user_id = ?1 AND feedback IS NOT NULL",
                    rusqlite::params![user_id],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| DevDeskError::Storage(e.to_string()))? as u64;

            let feedback_rate = if total > 0 {
                with_feedback as f64 / total as f64 * 100.0
            } else {
                0.0
            };

            Ok(ConversationStats {
                total_conversations: total,
                recent_conversations_24h: recent,
                query_type_distribution,
                feedback_rate,
            })
        })
    }
}

fn count_table(db: &Database, table: &str) -> Result<u64, DevDeskError> {
    db.with_conn(|conn| {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .map_err(|e| DevDeskError::Storage(e.to_string()))?;
        Ok(count as u64)
    })
}

fn epoch_to_datetime(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
}

fn row_to_log_entry(row: &rusqlite::Row<'_>) -> Result<LogEntry, DevDeskError> {
    let sources_json: String = row
        .get(4)
        .map_err(|e| DevDeskError::Storage(e.to_string()))?;
    let query_type_str: String = row
        .get(5)
        .map_err(|e| DevDeskError::Storage(e.to_string()))?;
    let feedback_json: Option<String> = row
        .get(8)
        .map_err(|e| DevDeskError::Storage(e.to_string()))?;

    Ok(LogEntry {
        id: row.get(0).map_err(|e| DevDeskError::Storage(e.to_string()))?,
        timestamp: epoch_to_datetime(
            row.get(1).map_err(|e| DevDeskError::Storage(e.to_string()))?,
        ),
        query: row.get(2).map_err(|e| DevDeskError::Storage(e.to_string()))?,
        response: row.get(3).map_err(|e| DevDeskError::Storage(e.to_string()))?,
        sources: serde_json::from_str(&sources_json).unwrap_or_default(),
        query_type: QueryType::parse(&query_type_str),
        processing_time: row.get(6).map_err(|e| DevDeskError::Storage(e.to_string()))?,
        user_id: row.get(7).map_err(|e| DevDeskError::Storage(e.to_string()))?,
        feedback: feedback_json.and_then(|f| serde_json::from_str(&f).ok()),
    })
}

fn collect_entries(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<Result<LogEntry, DevDeskError>>>,
) -> Result<Vec<LogEntry>, DevDeskError> {
    let mut entries = Vec::new();
    for row in rows {
        let entry = row.map_err(|e| DevDeskError::Storage(e.to_string()))??;
        entries.push(entry);
    }
    Ok(entries)
}
