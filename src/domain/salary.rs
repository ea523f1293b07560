//! Salary Configuration and Derivation
//!
//! The configured base/max pair is persisted; the total is always derived.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryConfig {
    #[serde(default)]
    pub base_salary: f64,
    #[serde(default)]
    pub max_salary: f64,
    /// Tiered bonus fraction from `performance_increase`
    #[serde(default)]
    pub performance_increase: f64,
}

/// `username -> SalaryConfig`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalaryTable(pub BTreeMap<String, SalaryConfig>);

impl SalaryTable {
    pub fn get(&self, username: &str) -> SalaryConfig {
        self.0.get(username).copied().unwrap_or_default()
    }

    pub fn entry_mut(&mut self, username: &str) -> &mut SalaryConfig {
        self.0.entry(username.to_string()).or_default()
    }

    pub fn remove(&mut self, username: &str) -> Option<SalaryConfig> {
        self.0.remove(username)
    }
}

/// Completion ratio in `[0, 1]`; 0 when there are no tasks
pub fn progress(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

/// `base + progress * (max - base)`
pub fn total_salary(base: f64, max: f64, progress: f64) -> f64 {
    base + progress * (max - base)
}

/// Bonus fraction for a completion percentage (0..=100)
pub fn performance_increase(progress_percent: f64) -> f64 {
    if progress_percent >= 100.0 {
        0.2
    } else if progress_percent >= 75.0 {
        0.15
    } else if progress_percent >= 50.0 {
        0.1
    } else if progress_percent >= 25.0 {
        0.05
    } else {
        0.0
    }
}

/// Derived salary view for one employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    pub username: String,
    pub base_salary: f64,
    pub max_salary: f64,
    pub performance_increase: f64,
    pub progress: f64,
    pub total_salary: f64,
}

impl SalaryBreakdown {
    pub fn derive(username: &str, config: SalaryConfig, progress: f64) -> Self {
        Self {
            username: username.to_string(),
            base_salary: config.base_salary,
            max_salary: config.max_salary,
            performance_increase: config.performance_increase,
            progress,
            total_salary: total_salary(config.base_salary, config.max_salary, progress),
        }
    }
}
