//! Session Commands

use crate::domain::UserRecord;
use crate::AppState;

/// Sign in as an existing user
pub async fn sign_in(state: &AppState, username: String) -> Result<UserRecord, String> {
    state.session.sign_in(&username).await.map_err(|e| e.to_string())
}

pub async fn current_user(state: &AppState) -> Result<Option<UserRecord>, String> {
    state.session.current_user().await.map_err(|e| e.to_string())
}

pub async fn sign_out(state: &AppState) -> Result<(), String> {
    state.session.sign_out().await.map_err(|e| e.to_string())
}

/// Recent log lines for the diagnostics view
pub async fn recent_logs(state: &AppState) -> Result<Vec<String>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    Ok(rolling_logger::recent_logs())
}

/// Path of the active log file, if logging was initialized
pub async fn log_file_path(state: &AppState) -> Result<Option<String>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    Ok(rolling_logger::log_file_path().map(|p| p.display().to_string()))
}
