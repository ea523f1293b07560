//! Salary Service
//!
//! Base and max salaries are configured per employee; progress, the total and
//! the performance tier are derived from task state in `projects`.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    performance_increase, progress, DomainError, DomainResult, Project, SalaryBreakdown,
    SalaryTable, UserRecord,
};
use crate::repository::{load_json, KvStore, KvWrite, StorageKey};

pub struct SalaryService {
    store: Arc<dyn KvStore>,
    lock: Mutex<()>,
}

impl SalaryService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub async fn salary_table(&self) -> DomainResult<SalaryTable> {
        load_json(self.store.as_ref(), &StorageKey::SalaryData).await
    }

    pub async fn set_base_salary(&self, username: &str, amount: f64) -> DomainResult<SalaryBreakdown> {
        validate_amount(amount)?;
        self.edit(username, |table| table.entry_mut(username).base_salary = amount)
            .await?;
        self.breakdown(username).await
    }

    pub async fn set_max_salary(&self, username: &str, amount: f64) -> DomainResult<SalaryBreakdown> {
        validate_amount(amount)?;
        self.edit(username, |table| table.entry_mut(username).max_salary = amount)
            .await?;
        self.breakdown(username).await
    }

    /// Completed over assigned tasks across every project
    pub async fn progress_for(&self, username: &str) -> DomainResult<f64> {
        let projects = self.load_projects().await?;
        let (completed, total) = task_counts(&projects, username, |t| t.is_completed());
        Ok(progress(completed, total))
    }

    pub async fn breakdown(&self, username: &str) -> DomainResult<SalaryBreakdown> {
        let table = self.salary_table().await?;
        let progress = self.progress_for(username).await?;
        Ok(SalaryBreakdown::derive(username, table.get(username), progress))
    }

    /// Breakdown for each of `users`, in the given order
    pub async fn overview(&self, users: &[UserRecord]) -> DomainResult<Vec<SalaryBreakdown>> {
        let table = self.salary_table().await?;
        let projects = self.load_projects().await?;

        Ok(users
            .iter()
            .map(|user| {
                let (completed, total) = task_counts(&projects, &user.username, |t| t.is_completed());
                SalaryBreakdown::derive(&user.username, table.get(&user.username), progress(completed, total))
            })
            .collect())
    }

    /// Recompute the performance tier from fully approved tasks and persist it
    pub async fn refresh_performance(&self, username: &str) -> DomainResult<f64> {
        let projects = self.load_projects().await?;
        let (approved, total) = task_counts(&projects, username, |t| t.is_fully_approved());
        let increase = performance_increase(progress(approved, total) * 100.0);

        self.edit(username, |table| table.entry_mut(username).performance_increase = increase)
            .await?;
        log::info!("Performance increase for {} set to {}", username, increase);
        Ok(increase)
    }

    /// Drop a user's salary entry. Returns whether one existed.
    pub async fn remove_user(&self, username: &str) -> DomainResult<bool> {
        let _guard = self.lock.lock().await;

        let mut table = self.salary_table().await?;
        if table.remove(username).is_none() {
            return Ok(false);
        }
        self.save(&table).await?;
        Ok(true)
    }

    async fn edit<F>(&self, username: &str, apply: F) -> DomainResult<()>
    where
        F: FnOnce(&mut SalaryTable) + Send,
    {
        if username.trim().is_empty() {
            return Err(DomainError::InvalidInput("Username is required".into()));
        }
        let _guard = self.lock.lock().await;

        let mut table = self.salary_table().await?;
        apply(&mut table);
        self.save(&table).await
    }

    async fn save(&self, table: &SalaryTable) -> DomainResult<()> {
        self.store
            .write_batch(vec![KvWrite::put_json(&StorageKey::SalaryData, table)?])
            .await
    }

    async fn load_projects(&self) -> DomainResult<Vec<Project>> {
        load_json(self.store.as_ref(), &StorageKey::Projects).await
    }
}

fn validate_amount(amount: f64) -> DomainResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(DomainError::InvalidInput("Please enter a valid salary amount".into()));
    }
    Ok(())
}

/// `(matching, total)` tasks assigned to `username`
fn task_counts<P>(projects: &[Project], username: &str, counts: P) -> (usize, usize)
where
    P: Fn(&crate::domain::Task) -> bool,
{
    projects
        .iter()
        .flat_map(|p| p.tasks_for(username))
        .fold((0, 0), |(matched, total), task| {
            (matched + usize::from(counts(task)), total + 1)
        })
}
