//! One-shot dataset seeding from JSON files.
//!
//! Loads employees.json, jira_tickets.json, and deployments.json from the
//! datasets directory into their tables. Seeding is idempotent: a table
//! that already has rows is left untouched.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use devdesk_core::error::DevDeskError;
use devdesk_core::types::{Deployment, Employee, JiraTicket};

use crate::db::Database;
use crate::repository::{DeploymentRepository, EmployeeRepository, TicketRepository};

#[derive(Deserialize)]
struct SeedDeployment {
    service: String,
    version: String,
    date: String,
    status: String,
}

/// Seed all three reference datasets from `dir`.
///
/// Missing files are logged and skipped so the service can still start
/// with partial data.
pub fn seed_datasets(db: Arc<Database>, dir: &Path) -> Result<(), DevDeskError> {
    seed_employees(Arc::clone(&db), &dir.join("employees.json"))?;
    seed_tickets(Arc::clone(&db), &dir.join("jira_tickets.json"))?;
    seed_deployments(db, &dir.join("deployments.json"))?;
    Ok(())
}

fn seed_employees(db: Arc<Database>, path: &Path) -> Result<(), DevDeskError> {
    let repo = EmployeeRepository::new(db);
    if repo.count()? > 0 {
        return Ok(());
    }
    let Some(raw) = read_seed_file(path)? else {
        return Ok(());
    };
    let employees: Vec<Employee> = serde_json::from_str(&raw)?;
    for emp in &employees {
        repo.insert(emp)?;
    }
    info!("Seeded {} employees from {}", employees.len(), path.display());
    Ok(())
}

fn seed_tickets(db: Arc<Database>, path: &Path) -> Result<(), DevDeskError> {
    let repo = TicketRepository::new(db);
    if repo.count()? > 0 {
        return Ok(());
    }
    let Some(raw) = read_seed_file(path)? else {
        return Ok(());
    };
    let tickets: Vec<JiraTicket> = serde_json::from_str(&raw)?;
    for ticket in &tickets {
        repo.insert(ticket)?;
    }
    info!("Seeded {} tickets from {}", tickets.len(), path.display());
    Ok(())
}

fn seed_deployments(db: Arc<Database>, path: &Path) -> Result<(), DevDeskError> {
    let repo = DeploymentRepository::new(db);
    if repo.count()? > 0 {
        return Ok(());
    }
    let Some(raw) = read_seed_file(path)? else {
        return Ok(());
    };
    let seeds: Vec<SeedDeployment> = serde_json::from_str(&raw)?;
    for seed in &seeds {
        repo.insert(&Deployment {
            id: 0,
            service: seed.service.clone(),
            version: seed.version.clone(),
            date: parse_seed_date(&seed.date)?,
            status: seed.status.clone(),
        })?;
    }
    info!("Seeded {} deployments from {}", seeds.len(), path.display());
    Ok(())
}

fn read_seed_file(path: &Path) -> Result<Option<String>, DevDeskError> {
    if !path.exists() {
        warn!("Dataset file {} not found, skipping", path.display());
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn parse_seed_date(raw: &str) -> Result<DateTime<Utc>, DevDeskError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(DevDeskError::Storage(format!(
        "Invalid deployment date: {}",
        raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_datasets(dir: &Path) {
        std::fs::write(
            dir.join("employees.json"),
            r#"[
                {"id": 1, "name": "Sara Chen", "email": "sara@example.com",
                 "role": "Backend Engineer", "team": "Payments", "jira_username": "schen"},
                {"id": 2, "name": "Omar Diaz", "email": "omar@example.com",
                 "role": "SRE", "team": "Platform", "jira_username": "odiaz"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("jira_tickets.json"),
            r#"[
                {"id": "DEV-101", "summary": "Fix login timeout",
                 "assignee": "schen", "status": "In Progress", "priority": "High"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("deployments.json"),
            r#"[
                {"service": "payments-api", "version": "2.3.1",
                 "date": "2025-08-10T14:30:00Z", "status": "success"},
                {"service": "auth-service", "version": "1.9.0",
                 "date": "2025-08-12", "status": "rolled_back"}
            ]"#,
        )
        .unwrap();
    }

    #[test]
    fn test_seed_all_datasets() {
        let dir = tempfile::tempdir().unwrap();
        write_datasets(dir.path());
        let db = Arc::new(Database::in_memory().unwrap());

        seed_datasets(Arc::clone(&db), dir.path()).unwrap();

        assert_eq!(EmployeeRepository::new(Arc::clone(&db)).count().unwrap(), 2);
        assert_eq!(TicketRepository::new(Arc::clone(&db)).count().unwrap(), 1);
        assert_eq!(DeploymentRepository::new(db).count().unwrap(), 2);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_datasets(dir.path());
        let db = Arc::new(Database::in_memory().unwrap());

        seed_datasets(Arc::clone(&db), dir.path()).unwrap();
        seed_datasets(Arc::clone(&db), dir.path()).unwrap();

        assert_eq!(EmployeeRepository::new(db).count().unwrap(), 2);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::in_memory().unwrap());

        seed_datasets(Arc::clone(&db), dir.path()).unwrap();

        assert_eq!(EmployeeRepository::new(db).count().unwrap(), 0);
    }

    #[test]
    fn test_date_only_deployment_parsed() {
        let dir = tempfile::tempdir().unwrap();
        write_datasets(dir.path());
        let db = Arc::new(Database::in_memory().unwrap());

        seed_datasets(Arc::clone(&db), dir.path()).unwrap();

        let all = DeploymentRepository::new(db).all().unwrap();
        let rolled_back = all.iter().find(|d| d.service == "auth-service").unwrap();
        assert_eq!(rolled_back.date.format("%Y-%m-%d").to_string(), "2025-08-12");
    }

    #[test]
    fn test_bad_date_rejected() {
        assert!(parse_seed_date("not-a-date").is_err());
        assert!(parse_seed_date("2025-08-12").is_ok());
        assert!(parse_seed_date("2025-08-12T00:00:00Z").is_ok());
    }
}
