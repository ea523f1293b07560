//! Employee and Allowlist Commands

use crate::domain::{Role, UserRecord};
use crate::services::{EmployeeDetails, RemovalReport};
use crate::AppState;

/// Self-service sign-up; always creates an employee
pub async fn register(state: &AppState, username: String, email: String) -> Result<UserRecord, String> {
    state
        .roster
        .register(&username, &email, Role::Employee)
        .await
        .map_err(|e| e.to_string())
}

/// Admin-created account with an explicit role
pub async fn create_user(state: &AppState, username: String, email: String, role: String) -> Result<UserRecord, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .roster
        .register(&username, &email, Role::from_str(&role))
        .await
        .map_err(|e| e.to_string())
}

pub async fn list_employees(state: &AppState) -> Result<Vec<UserRecord>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.roster.list_employees().await.map_err(|e| e.to_string())
}

pub async fn search_users(state: &AppState, query: String) -> Result<Vec<UserRecord>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.roster.search(&query).await.map_err(|e| e.to_string())
}

pub async fn employee_details(state: &AppState, username: String) -> Result<EmployeeDetails, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.roster.employee_details(&username).await.map_err(|e| e.to_string())
}

pub async fn delete_employee(state: &AppState, username: String) -> Result<RemovalReport, String> {
    let admin = state.session.require_admin().await.map_err(|e| e.to_string())?;
    if admin.username == username {
        return Err("You cannot delete your own account".to_string());
    }
    state.roster.delete_employee(&username).await.map_err(|e| e.to_string())
}

// ========================
// Authorized emails
// ========================

pub async fn list_authorized_emails(state: &AppState) -> Result<Vec<String>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.emails.list().await.map_err(|e| e.to_string())
}

pub async fn add_authorized_email(state: &AppState, email: String) -> Result<Vec<String>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.emails.add(&email).await.map_err(|e| e.to_string())
}

pub async fn remove_authorized_email(state: &AppState, email: String) -> Result<Vec<String>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.emails.remove(&email).await.map_err(|e| e.to_string())
}
