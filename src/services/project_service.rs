//! Projects, Tasks and Submissions

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::attachments::{decode_data_url, encode_attachment};
use crate::domain::{
    Attachment, DomainError, DomainResult, Priority, Project, Submission, Task, UserRecord,
};
use crate::repository::{CollectionRepository, KvStore, Repository, StorageKey};

const TASK_SEQUENCE: &str = "tasks";

/// Editable task fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<String>,
}

pub struct ProjectService {
    store: Arc<dyn KvStore>,
    projects: CollectionRepository<Project>,
    lock: Mutex<()>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            projects: CollectionRepository::new(store.clone(), StorageKey::Projects),
            store,
            lock: Mutex::new(()),
        }
    }

    pub async fn list_projects(&self) -> DomainResult<Vec<Project>> {
        self.projects.list().await
    }

    /// Admins see every project, employees only those they belong to
    pub async fn projects_for(&self, user: &UserRecord) -> DomainResult<Vec<Project>> {
        let mut projects = self.projects.list().await?;
        if !user.is_admin() {
            projects.retain(|p| p.has_member(&user.username));
        }
        Ok(projects)
    }

    pub async fn get_project(&self, id: u64) -> DomainResult<Project> {
        self.projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Project {}", id)))
    }

    pub async fn create_project(
        &self,
        name: String,
        description: String,
        employees: Vec<String>,
    ) -> DomainResult<Project> {
        require_text(&name, "Project name")?;
        let _guard = self.lock.lock().await;

        let project = Project::new(name, description, dedup(employees));
        let created = self.projects.create(&project).await?;
        log::info!("Project {} created: {}", created.id, created.name);
        Ok(created)
    }

    /// Replace name, description and members; tasks and files are kept
    pub async fn update_project(
        &self,
        id: u64,
        name: String,
        description: String,
        employees: Vec<String>,
    ) -> DomainResult<Project> {
        require_text(&name, "Project name")?;
        self.modify(id, move |project| {
            project.name = name;
            project.description = description;
            project.employees = dedup(employees);
            Ok(project.clone())
        })
        .await
    }

    pub async fn delete_project(&self, id: u64) -> DomainResult<()> {
        let _guard = self.lock.lock().await;
        self.projects.delete(id).await
    }

    pub async fn add_project_file(&self, project_id: u64, file_name: &str, bytes: &[u8]) -> DomainResult<Attachment> {
        let file = encode_attachment(file_name, bytes)?;
        self.modify(project_id, move |project| {
            project.files.push(file.clone());
            Ok(file)
        })
        .await
    }

    /// Raw bytes of a project file, for download
    pub async fn project_file_bytes(&self, project_id: u64, file_name: &str) -> DomainResult<Vec<u8>> {
        let project = self.get_project(project_id).await?;
        let file = project
            .files
            .iter()
            .find(|f| f.name == file_name)
            .ok_or_else(|| DomainError::NotFound(format!("File {} in project {}", file_name, project_id)))?;
        decode_data_url(&file.data)
    }

    // ========================
    // Tasks
    // ========================

    pub async fn add_task(&self, project_id: u64, draft: TaskDraft) -> DomainResult<Task> {
        require_text(&draft.title, "Task title")?;
        let task_id = self.store.next_id(TASK_SEQUENCE).await?;

        self.modify(project_id, move |project| {
            require_member(project, &draft.assigned_to)?;
            let mut task = Task::new(task_id, draft.title, draft.assigned_to);
            task.description = draft.description;
            task.priority = draft.priority;
            task.due_date = draft.due_date;
            project.tasks.push(task.clone());
            Ok(task)
        })
        .await
    }

    /// Edit task fields; status and submissions are kept
    pub async fn update_task(&self, project_id: u64, task_id: u64, draft: TaskDraft) -> DomainResult<Task> {
        require_text(&draft.title, "Task title")?;
        self.modify(project_id, move |project| {
            require_member(project, &draft.assigned_to)?;
            let task = project.task_mut(task_id)?;
            task.title = draft.title;
            task.description = draft.description;
            task.assigned_to = draft.assigned_to;
            task.priority = draft.priority;
            task.due_date = draft.due_date;
            Ok(task.clone())
        })
        .await
    }

    pub async fn delete_task(&self, project_id: u64, task_id: u64) -> DomainResult<()> {
        self.modify(project_id, move |project| {
            let before = project.tasks.len();
            project.tasks.retain(|t| t.id != task_id);
            if project.tasks.len() == before {
                return Err(DomainError::NotFound(format!("Task {} in project {}", task_id, project.id)));
            }
            Ok(())
        })
        .await
    }

    /// Hand in a file for a task; only the assignee may submit
    pub async fn submit_work(
        &self,
        project_id: u64,
        task_id: u64,
        username: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> DomainResult<Task> {
        let submission = Submission::from_attachment(encode_attachment(file_name, bytes)?, Utc::now());
        let username = username.to_string();

        self.modify(project_id, move |project| {
            let task = project.task_mut(task_id)?;
            if task.assigned_to != username {
                return Err(DomainError::Unauthorized(format!(
                    "Task {} is not assigned to {}",
                    task_id, username
                )));
            }
            task.submit(submission)?;
            Ok(task.clone())
        })
        .await
    }

    /// Approve or reject submission `index` of a task
    pub async fn review_submission(
        &self,
        project_id: u64,
        task_id: u64,
        index: usize,
        approve: bool,
    ) -> DomainResult<Task> {
        let task = self
            .modify(project_id, move |project| {
                let task = project.task_mut(task_id)?;
                task.review_submission(index, approve, Utc::now())?;
                Ok(task.clone())
            })
            .await?;

        log::info!(
            "Submission {} of task {} {}; task is {:?}",
            index,
            task_id,
            if approve { "approved" } else { "rejected" },
            task.status
        );
        Ok(task)
    }

    pub async fn tasks_assigned_to(&self, username: &str) -> DomainResult<Vec<Task>> {
        let projects = self.projects.list().await?;
        Ok(projects
            .iter()
            .flat_map(|p| p.tasks_for(username).cloned())
            .collect())
    }

    /// Take a user off every member list and unassign their tasks, in one
    /// write. Returns `(projects left, tasks unassigned)`.
    pub async fn remove_member(&self, username: &str) -> DomainResult<(usize, usize)> {
        let _guard = self.lock.lock().await;

        let mut projects = self.projects.load_all().await?;
        let mut projects_left = 0;
        let mut tasks_unassigned = 0;
        for project in projects.iter_mut() {
            if project.has_member(username) {
                project.employees.retain(|e| e != username);
                projects_left += 1;
            }
            for task in project.tasks.iter_mut().filter(|t| t.assigned_to == username) {
                task.assigned_to.clear();
                tasks_unassigned += 1;
            }
        }
        if projects_left + tasks_unassigned > 0 {
            self.projects.save_all(&projects).await?;
        }
        Ok((projects_left, tasks_unassigned))
    }

    /// Load, edit one project in place and persist the whole list
    async fn modify<F, R>(&self, project_id: u64, edit: F) -> DomainResult<R>
    where
        F: FnOnce(&mut Project) -> DomainResult<R> + Send,
        R: Send,
    {
        let _guard = self.lock.lock().await;

        let mut projects = self.projects.load_all().await?;
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| DomainError::NotFound(format!("Project {}", project_id)))?;
        let result = edit(project)?;

        self.projects.save_all(&projects).await?;
        Ok(result)
    }
}

fn require_text(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

/// Unassigned tasks are allowed; assigned ones must go to a member
fn require_member(project: &Project, username: &str) -> DomainResult<()> {
    if !username.is_empty() && !project.has_member(username) {
        return Err(DomainError::InvalidInput(format!(
            "{} is not a member of project {}",
            username, project.name
        )));
    }
    Ok(())
}

fn dedup(mut employees: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    employees.retain(|e| !e.trim().is_empty() && seen.insert(e.clone()));
    employees
}
