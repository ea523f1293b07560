//! Storage Keys
//!
//! The fixed key space of the JSON namespace. User records are not part of it;
//! they live in their own table (see `UserRepository`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    CurrentUser,
    Projects,
    SalaryData,
    Inventory,
    InventoryRequests,
    AuthorizedEmails,
    /// `personalInventory_<username>`
    PersonalInventory(String),
    /// `withdrawalHistory_<username>`
    WithdrawalHistory(String),
}

const PERSONAL_INVENTORY_PREFIX: &str = "personalInventory_";
const WITHDRAWAL_HISTORY_PREFIX: &str = "withdrawalHistory_";

impl StorageKey {
    pub fn as_key(&self) -> String {
        match self {
            StorageKey::CurrentUser => "currentUser".to_string(),
            StorageKey::Projects => "projects".to_string(),
            StorageKey::SalaryData => "salaryData".to_string(),
            StorageKey::Inventory => "inventory".to_string(),
            StorageKey::InventoryRequests => "inventoryRequests".to_string(),
            StorageKey::AuthorizedEmails => "authorizedEmails".to_string(),
            StorageKey::PersonalInventory(user) => format!("{}{}", PERSONAL_INVENTORY_PREFIX, user),
            StorageKey::WithdrawalHistory(user) => format!("{}{}", WITHDRAWAL_HISTORY_PREFIX, user),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}
