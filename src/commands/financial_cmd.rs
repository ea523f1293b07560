//! Salary Commands

use crate::domain::SalaryBreakdown;
use crate::AppState;

/// Salary breakdown for every employee
pub async fn salary_overview(state: &AppState) -> Result<Vec<SalaryBreakdown>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    let employees = state.roster.list_employees().await.map_err(|e| e.to_string())?;
    state.salaries.overview(&employees).await.map_err(|e| e.to_string())
}

/// The signed-in user's own breakdown
pub async fn my_salary(state: &AppState) -> Result<SalaryBreakdown, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state.salaries.breakdown(&user.username).await.map_err(|e| e.to_string())
}

pub async fn set_base_salary(state: &AppState, username: String, amount: f64) -> Result<SalaryBreakdown, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.salaries.set_base_salary(&username, amount).await.map_err(|e| e.to_string())
}

pub async fn set_max_salary(state: &AppState, username: String, amount: f64) -> Result<SalaryBreakdown, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.salaries.set_max_salary(&username, amount).await.map_err(|e| e.to_string())
}

pub async fn refresh_performance(state: &AppState, username: String) -> Result<f64, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.salaries.refresh_performance(&username).await.map_err(|e| e.to_string())
}
