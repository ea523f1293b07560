//! Project, Task and Submission Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::entity::{DomainError, DomainResult, Entity, NumberedEntity, ReviewStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A file embedded as a data URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
}

/// Work handed in for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    pub data: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn from_attachment(file: Attachment, submitted_at: DateTime<Utc>) -> Self {
        Self {
            name: file.name,
            mime_type: file.mime_type,
            size: file.size,
            data: file.data,
            submitted_at,
            status: ReviewStatus::Pending,
            reviewed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Username of the assignee; empty when unassigned (stored as `null` too)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assigned_to: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub approval_status: ReviewStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Task {
    pub fn new(id: u64, title: String, assigned_to: String) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            assigned_to,
            status: TaskStatus::Pending,
            approval_status: ReviewStatus::Pending,
            priority: Priority::Medium,
            due_date: None,
            completed_at: None,
            submissions: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Completed with every submission approved
    pub fn is_fully_approved(&self) -> bool {
        self.is_completed() && self.submissions.iter().all(|s| s.status == ReviewStatus::Approved)
    }

    /// Append a pending submission; completed tasks take no more work
    pub fn submit(&mut self, submission: Submission) -> DomainResult<()> {
        if self.is_completed() {
            return Err(DomainError::Conflict(format!("Task {} is already completed", self.id)));
        }
        self.submissions.push(submission);
        Ok(())
    }

    /// Approve or reject one pending submission and recompute the task state
    pub fn review_submission(&mut self, index: usize, approve: bool, now: DateTime<Utc>) -> DomainResult<()> {
        let submission = self
            .submissions
            .get_mut(index)
            .ok_or_else(|| DomainError::NotFound(format!("Submission {} of task {}", index, self.id)))?;
        if submission.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Submission {} is already {}",
                index,
                submission.status.as_str()
            )));
        }

        submission.reviewed_at = Some(now);
        if approve {
            submission.status = ReviewStatus::Approved;
            self.recompute_completion(now);
        } else {
            submission.status = ReviewStatus::Rejected;
            self.approval_status = ReviewStatus::Rejected;
        }
        Ok(())
    }

    fn recompute_completion(&mut self, now: DateTime<Utc>) {
        let all_approved = !self.submissions.is_empty()
            && self.submissions.iter().all(|s| s.status == ReviewStatus::Approved);
        if all_approved {
            self.status = TaskStatus::Completed;
            self.approval_status = ReviewStatus::Approved;
            self.completed_at = Some(now);
        } else {
            self.status = TaskStatus::Pending;
            self.approval_status = ReviewStatus::Pending;
            self.completed_at = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Usernames of members
    #[serde(default)]
    pub employees: Vec<String>,
    #[serde(default)]
    pub files: Vec<Attachment>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn new(name: String, description: String, employees: Vec<String>) -> Self {
        Self {
            id: 0,
            name,
            description,
            employees,
            files: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.employees.iter().any(|e| e == username)
    }

    pub fn task_mut(&mut self, task_id: u64) -> DomainResult<&mut Task> {
        let project_id = self.id;
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| DomainError::NotFound(format!("Task {} in project {}", task_id, project_id)))
    }

    pub fn tasks_for<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.assigned_to == username)
    }
}

impl Entity for Project {
    type Id = u64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl NumberedEntity for Project {
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        Submission {
            name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 3,
            data: "data:application/pdf;base64,AAAA".to_string(),
            submitted_at: Utc::now(),
            status: ReviewStatus::Pending,
            reviewed_at: None,
        }
    }

    #[test]
    fn test_task_completes_when_every_submission_approved() {
        let now = Utc::now();
        let mut task = Task::new(1, "Write report".to_string(), "alice".to_string());
        task.submit(submission()).unwrap();
        task.submit(submission()).unwrap();

        task.review_submission(0, true, now).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.approval_status, ReviewStatus::Pending);

        task.review_submission(1, true, now).unwrap();
        assert!(task.is_completed());
        assert!(task.is_fully_approved());
        assert_eq!(task.approval_status, ReviewStatus::Approved);
        assert!(task.completed_at.is_some());

        assert!(matches!(task.submit(submission()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn test_rejection_marks_approval_but_not_status() {
        let now = Utc::now();
        let mut task = Task::new(1, "Write report".to_string(), "alice".to_string());
        task.submit(submission()).unwrap();
        task.submit(submission()).unwrap();

        task.review_submission(0, false, now).unwrap();
        assert_eq!(task.approval_status, ReviewStatus::Rejected);
        assert_eq!(task.status, TaskStatus::Pending);

        // A rejected submission keeps the task from completing
        task.review_submission(1, true, now).unwrap();
        assert!(!task.is_completed());

        assert!(matches!(task.review_submission(0, true, now), Err(DomainError::Conflict(_))));
        assert!(matches!(task.review_submission(5, true, now), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn test_project_reads_minimal_json() {
        let json = r#"{"id":1,"name":"Launch","employees":["alice"],"tasks":[{"id":2,"title":"Plan","assignedTo":"alice","status":"completed"}]}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.has_member("alice"));
        assert_eq!(project.tasks_for("alice").count(), 1);
        assert!(project.tasks[0].is_fully_approved());
    }

    #[test]
    fn test_unassigned_task_reads_null_assignee() {
        let json = r#"[{"id":1,"name":"Launch","description":"Q3","employees":["bob"],"files":[],
            "tasks":[{"id":2,"title":"Plan","description":"","assignedTo":null,"status":"pending",
            "approvalStatus":"pending","priority":"high","dueDate":null,"submissions":[]}]}]"#;
        let projects: Vec<Project> = serde_json::from_str(json).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].tasks[0].assigned_to, "");
        assert_eq!(projects[0].tasks[0].priority, Priority::High);

        let written = serde_json::to_string(&projects).unwrap();
        let reread: Vec<Project> = serde_json::from_str(&written).unwrap();
        assert_eq!(reread, projects);
    }
}
