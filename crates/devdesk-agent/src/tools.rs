//! The closed set of data-lookup tools exposed to the LLM.
//!
//! Tool calls are decoded by name into the `ToolCall` enum; names
//! outside the set are rejected rather than silently ignored. String
//! filters use case-insensitive substring matching.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use devdesk_core::error::DevDeskError;
use devdesk_storage::{DeploymentRepository, EmployeeRepository, TicketRepository};

use crate::client::ToolInvocation;

/// Filters accepted by the `get_employees` tool.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmployeeFilter {
    pub name: Option<String>,
    pub id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub team: Option<String>,
    pub jira_username: Option<String>,
}

/// Filters accepted by the `get_jira_tickets` tool.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TicketFilter {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// Filters accepted by the `get_deployments` tool.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeploymentFilter {
    pub service: Option<String>,
    pub version: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetEmployees(EmployeeFilter),
    GetJiraTickets(TicketFilter),
    GetDeployments(DeploymentFilter),
}

impl ToolCall {
    /// Decode a wire invocation; unknown tool names are rejected.
    pub fn decode(invocation: &ToolInvocation) -> Result<Self, DevDeskError> {
        match invocation.name.as_str() {
            "get_employees" => Ok(Self::GetEmployees(parse_args(&invocation.arguments)?)),
            "get_jira_tickets" => Ok(Self::GetJiraTickets(parse_args(&invocation.arguments)?)),
            "get_deployments" => Ok(Self::GetDeployments(parse_args(&invocation.arguments)?)),
            other => Err(DevDeskError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetEmployees(_) => "get_employees",
            Self::GetJiraTickets(_) => "get_jira_tickets",
            Self::GetDeployments(_) => "get_deployments",
        }
    }
}

fn parse_args<T: Default + for<'de> Deserialize<'de>>(raw: &str) -> Result<T, DevDeskError> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw)
        .map_err(|e| DevDeskError::Llm(format!("Invalid tool arguments: {}", e)))
}

/// JSON schemas for all tools, in OpenAI function-calling format.
pub fn tool_schemas() -> Vec<serde_json::Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": "get_employees",
                "description": "Get employee information including names, roles, contact info, and team membership",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Employee name to filter by"},
                        "id": {"type": "string", "description": "Employee ID to filter by"},
                        "email": {"type": "string", "description": "Employee email to filter by"},
                        "role": {"type": "string", "description": "Employee role to filter by"},
                        "team": {"type": "string", "description": "Team name to filter by"},
                        "jira_username": {"type": "string", "description": "Jira username to filter by"}
                    },
                    "required": []
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "get_deployments",
                "description": "Get deployment information including service names, versions, dates, and status",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "service": {"type": "string", "description": "Service name to filter by"},
                        "version": {"type": "string", "description": "Version to filter by"},
                        "status": {"type": "string", "description": "Deployment status to filter by"},
                        "date": {"type": "string", "description": "Deployment date to filter by"}
                    },
                    "required": []
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "get_jira_tickets",
                "description": "Get Jira ticket information including summaries, assignees, status, and priority",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string", "description": "Jira ticket ID"},
                        "summary": {"type": "string", "description": "Ticket summary to filter by"},
                        "assignee": {"type": "string", "description": "Assignee name to filter by"},
                        "status": {"type": "string", "description": "Ticket status to filter by"},
                        "priority": {"type": "string", "description": "Ticket priority to filter by"}
                    },
                    "required": []
                }
            }
        }),
    ]
}

/// Output of executing one tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Text block handed back to the LLM.
    pub text: String,
    /// The API endpoint this data corresponds to, used as a source name.
    pub source: &'static str,
}

/// Executes decoded tool calls against the reference datasets.
pub struct ToolRegistry {
    employees: Arc<EmployeeRepository>,
    tickets: Arc<TicketRepository>,
    deployments: Arc<DeploymentRepository>,
}

impl ToolRegistry {
    pub fn new(
        employees: Arc<EmployeeRepository>,
        tickets: Arc<TicketRepository>,
        deployments: Arc<DeploymentRepository>,
    ) -> Self {
        Self {
            employees,
            tickets,
            deployments,
        }
    }

    pub fn execute(&self, call: &ToolCall) -> Result<ToolOutput, DevDeskError> {
        info!(tool = call.name(), "Executing tool call");
        match call {
            ToolCall::GetEmployees(filter) => self.get_employees(filter),
            ToolCall::GetJiraTickets(filter) => self.get_jira_tickets(filter),
            ToolCall::GetDeployments(filter) => self.get_deployments(filter),
        }
    }

    fn get_employees(&self, filter: &EmployeeFilter) -> Result<ToolOutput, DevDeskError> {
        let matched: Vec<_> = self
            .employees
            .all()?
            .into_iter()
            .filter(|emp| {
                contains_ci(&emp.name, &filter.name)
                    && exact_id(emp.id, &filter.id)
                    && contains_ci(&emp.email, &filter.email)
                    && contains_ci(&emp.role, &filter.role)
                    && contains_ci(&emp.team, &filter.team)
                    && contains_ci(&emp.jira_username, &filter.jira_username)
            })
            .collect();

        Ok(ToolOutput {
            text: format!(
                "Employee data (from /api/employees endpoint):\n{}",
                serde_json::to_string_pretty(&matched)?
            ),
            source: "/api/employees",
        })
    }

    fn get_jira_tickets(&self, filter: &TicketFilter) -> Result<ToolOutput, DevDeskError> {
        let matched: Vec<_> = self
            .tickets
            .all()?
            .into_iter()
            .filter(|t| {
                contains_ci(&t.id, &filter.id)
                    && contains_ci(&t.summary, &filter.summary)
                    && contains_ci(&t.assignee, &filter.assignee)
                    && contains_ci(&t.status, &filter.status)
                    && contains_ci(&t.priority, &filter.priority)
            })
            .collect();

        Ok(ToolOutput {
            text: format!(
                "Jira ticket data (from /api/jira-tickets endpoint):\n{}",
                serde_json::to_string_pretty(&matched)?
            ),
            source: "/api/jira-tickets",
        })
    }

    fn get_deployments(&self, filter: &DeploymentFilter) -> Result<ToolOutput, DevDeskError> {
        let matched: Vec<_> = self
            .deployments
            .all()?
            .into_iter()
            .filter(|d| {
                contains_ci(&d.service, &filter.service)
                    && contains_ci(&d.version, &filter.version)
                    && contains_ci(&d.status, &filter.status)
                    && contains_ci(&d.date.to_rfc3339(), &filter.date)
            })
            .collect();

        Ok(ToolOutput {
            text: format!(
                "Deployment data (from /api/deployments endpoint):\n{}",
                serde_json::to_string_pretty(&matched)?
            ),
            source: "/api/deployments",
        })
    }
}

/// Case-insensitive substring match; a missing or empty filter matches everything.
fn contains_ci(value: &str, filter: &Option<String>) -> bool {
    match filter {
        Some(f) if !f.is_empty() => value.to_lowercase().contains(&f.to_lowercase()),
        _ => true,
    }
}

/// Numeric ids are matched exactly against their decimal form.
fn exact_id(id: i64, filter: &Option<String>) -> bool {
    match filter {
        Some(f) if !f.is_empty() => id.to_string() == *f,
        _ => true,
    }
}
