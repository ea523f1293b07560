//! Domain Layer
//!
//! Contains all domain entities and core business rules.
//! This layer has no storage dependencies (serde and chrono only).

mod entity;
mod inventory;
mod project;
mod salary;
mod user;

pub use entity::{DomainError, DomainResult, Entity, NumberedEntity, ReviewStatus};
pub use inventory::{
    crosses_threshold, InventoryItem, PersonalInventoryEntry, PersonalLedger, WithdrawalHistory,
    WithdrawalOutcome, WithdrawalRequest,
};
pub use project::{Attachment, Priority, Project, Submission, Task, TaskStatus};
pub use salary::{
    performance_increase, progress, total_salary, SalaryBreakdown, SalaryConfig, SalaryTable,
};
pub use user::{Role, UserRecord};
