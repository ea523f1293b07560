//! Employee Roster
//!
//! Registration against the email allowlist, employee lookups and the
//! cascading delete that unwinds every record a user owns.

use std::sync::Arc;

use serde::Serialize;

use super::email_service::{is_valid_email, AuthorizedEmails};
use super::inventory_service::InventoryService;
use super::project_service::ProjectService;
use super::salary_service::SalaryService;
use crate::domain::{DomainError, DomainResult, Role, UserRecord};
use crate::repository::{Repository, SearchableRepository, UserRepository};

/// One project as seen from an employee's detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: u64,
    pub name: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDetails {
    pub user: UserRecord,
    pub projects: Vec<ProjectSummary>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

/// What a cascading delete removed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub username: String,
    pub restocked_units: u64,
    pub projects_left: usize,
    pub tasks_unassigned: usize,
    pub salary_removed: bool,
}

pub struct RosterService {
    users: Arc<UserRepository>,
    emails: Arc<AuthorizedEmails>,
    inventory: Arc<InventoryService>,
    projects: Arc<ProjectService>,
    salaries: Arc<SalaryService>,
}

impl RosterService {
    pub fn new(
        users: Arc<UserRepository>,
        emails: Arc<AuthorizedEmails>,
        inventory: Arc<InventoryService>,
        projects: Arc<ProjectService>,
        salaries: Arc<SalaryService>,
    ) -> Self {
        Self {
            users,
            emails,
            inventory,
            projects,
            salaries,
        }
    }

    /// Create a user record. Employees need an allowlisted email unless the
    /// allowlist is empty.
    pub async fn register(&self, username: &str, email: &str, role: Role) -> DomainResult<UserRecord> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(DomainError::InvalidInput("Username is required".into()));
        }
        if !is_valid_email(email) {
            return Err(DomainError::InvalidInput("Please enter a valid email address".into()));
        }
        if role != Role::Admin && !self.emails.is_authorized(email).await? {
            return Err(DomainError::Unauthorized(format!("{} is not an authorized email", email)));
        }

        let user = self
            .users
            .create(&UserRecord::new(username.to_string(), email.to_string(), role))
            .await?;
        log::info!("Registered {} ({})", user.username, user.role.as_str());
        Ok(user)
    }

    pub async fn list_employees(&self) -> DomainResult<Vec<UserRecord>> {
        self.users.list_by_role(Role::Employee).await
    }

    pub async fn search(&self, query: &str) -> DomainResult<Vec<UserRecord>> {
        self.users.search(query).await
    }

    pub async fn employee_details(&self, username: &str) -> DomainResult<EmployeeDetails> {
        let user = self
            .users
            .find_by_id(username.to_string())
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {}", username)))?;

        let projects: Vec<ProjectSummary> = self
            .projects
            .projects_for(&user)
            .await?
            .iter()
            .filter(|p| p.has_member(username))
            .map(|p| {
                let tasks: Vec<_> = p.tasks_for(username).collect();
                ProjectSummary {
                    id: p.id,
                    name: p.name.clone(),
                    total_tasks: tasks.len(),
                    completed_tasks: tasks.iter().filter(|t| t.is_completed()).count(),
                }
            })
            .collect();

        Ok(EmployeeDetails {
            total_tasks: projects.iter().map(|p| p.total_tasks).sum(),
            completed_tasks: projects.iter().map(|p| p.completed_tasks).sum(),
            user,
            projects,
        })
    }

    /// Remove a user and everything hanging off them. Outstanding personal
    /// holdings go back to stock.
    ///
    /// The steps commit separately and the user row goes last, so a failed
    /// run leaves the user in place. Every step is idempotent; calling again
    /// finishes the job.
    pub async fn delete_employee(&self, username: &str) -> DomainResult<RemovalReport> {
        if !self.users.exists(username.to_string()).await? {
            return Err(DomainError::NotFound(format!("User {}", username)));
        }

        let restocked_units = self.inventory.remove_user(username).await?;
        let (projects_left, tasks_unassigned) = self.projects.remove_member(username).await?;
        let salary_removed = self.salaries.remove_user(username).await?;
        self.users.delete(username.to_string()).await?;

        log::info!(
            "Deleted {}: {} units restocked, left {} projects, {} tasks unassigned",
            username, restocked_units, projects_left, tasks_unassigned
        );
        Ok(RemovalReport {
            username: username.to_string(),
            restocked_units,
            projects_left,
            tasks_unassigned,
            salary_removed,
        })
    }
}
