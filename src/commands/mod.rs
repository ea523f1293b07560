//! Commands Layer
//!
//! Handlers that check the signed-in user's role, call a service and map
//! `DomainError` to `String` for the caller.

mod employee_cmd;
mod financial_cmd;
mod inventory_cmd;
mod project_cmd;
mod session_cmd;

pub use employee_cmd::*;
pub use financial_cmd::*;
pub use inventory_cmd::*;
pub use project_cmd::*;
pub use session_cmd::*;
