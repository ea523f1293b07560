//! Service Layer
//!
//! Workflows over the repositories. Each service serializes its own
//! read-modify-write cycles.

mod attachments;
mod email_service;
mod inventory_service;
mod project_service;
mod reservation;
mod roster;
mod salary_service;
mod session;


pub use email_service::{is_valid_email, AuthorizedEmails};
pub use inventory_service::InventoryService;
pub use project_service::{ProjectService, TaskDraft};
pub use reservation::{ReservationBook, StockLevel};
pub use roster::{EmployeeDetails, ProjectSummary, RemovalReport, RosterService};
pub use salary_service::SalaryService;
pub use session::SessionService;
