//! Project Commands

use crate::domain::{Attachment, Project, Task};
use crate::services::TaskDraft;
use crate::AppState;

/// Projects visible to the signed-in user
pub async fn list_projects(state: &AppState) -> Result<Vec<Project>, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state.projects.projects_for(&user).await.map_err(|e| e.to_string())
}

pub async fn get_project(state: &AppState, id: u64) -> Result<Project, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    let project = state.projects.get_project(id).await.map_err(|e| e.to_string())?;
    if !user.is_admin() && !project.has_member(&user.username) {
        return Err(format!("Project {} not found", id));
    }
    Ok(project)
}

pub async fn create_project(
    state: &AppState,
    name: String,
    description: String,
    employees: Vec<String>,
) -> Result<Project, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .projects
        .create_project(name, description, employees)
        .await
        .map_err(|e| e.to_string())
}

pub async fn update_project(
    state: &AppState,
    id: u64,
    name: String,
    description: String,
    employees: Vec<String>,
) -> Result<Project, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .projects
        .update_project(id, name, description, employees)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_project(state: &AppState, id: u64) -> Result<(), String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.projects.delete_project(id).await.map_err(|e| e.to_string())
}

pub async fn add_project_file(
    state: &AppState,
    project_id: u64,
    file_name: String,
    bytes: Vec<u8>,
) -> Result<Attachment, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .projects
        .add_project_file(project_id, &file_name, &bytes)
        .await
        .map_err(|e| e.to_string())
}

/// Download a project file; members and admins only
pub async fn download_project_file(state: &AppState, project_id: u64, file_name: String) -> Result<Vec<u8>, String> {
    get_project(state, project_id).await?;
    state
        .projects
        .project_file_bytes(project_id, &file_name)
        .await
        .map_err(|e| e.to_string())
}

// ========================
// Tasks
// ========================

pub async fn add_task(state: &AppState, project_id: u64, draft: TaskDraft) -> Result<Task, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.projects.add_task(project_id, draft).await.map_err(|e| e.to_string())
}

pub async fn update_task(
    state: &AppState,
    project_id: u64,
    task_id: u64,
    draft: TaskDraft,
) -> Result<Task, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .projects
        .update_task(project_id, task_id, draft)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_task(state: &AppState, project_id: u64, task_id: u64) -> Result<(), String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.projects.delete_task(project_id, task_id).await.map_err(|e| e.to_string())
}

pub async fn my_tasks(state: &AppState) -> Result<Vec<Task>, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state.projects.tasks_assigned_to(&user.username).await.map_err(|e| e.to_string())
}

/// Submit a file for a task assigned to the signed-in user
pub async fn submit_task(
    state: &AppState,
    project_id: u64,
    task_id: u64,
    file_name: String,
    bytes: Vec<u8>,
) -> Result<Task, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state
        .projects
        .submit_work(project_id, task_id, &user.username, &file_name, &bytes)
        .await
        .map_err(|e| e.to_string())
}

/// Approve or reject a submission, then refresh the assignee's performance tier
pub async fn review_submission(
    state: &AppState,
    project_id: u64,
    task_id: u64,
    index: usize,
    approve: bool,
) -> Result<Task, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    let task = state
        .projects
        .review_submission(project_id, task_id, index, approve)
        .await
        .map_err(|e| e.to_string())?;

    if !task.assigned_to.is_empty() {
        state
            .salaries
            .refresh_performance(&task.assigned_to)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(task)
}
