//! Inventory Commands
//!
//! Stock management is admin-only; withdrawals and returns act on the
//! signed-in user's own ledger.

use crate::domain::{
    InventoryItem, PersonalLedger, WithdrawalHistory, WithdrawalOutcome, WithdrawalRequest,
};
use crate::services::StockLevel;
use crate::AppState;

/// List items with reserved and available quantities
pub async fn list_inventory(state: &AppState) -> Result<Vec<StockLevel>, String> {
    state.session.require_user().await.map_err(|e| e.to_string())?;
    state.inventory.stock_levels().await.map_err(|e| e.to_string())
}

pub async fn add_inventory_item(
    state: &AppState,
    name: String,
    quantity: u32,
    threshold: u32,
    unit: String,
    returnable: bool,
) -> Result<InventoryItem, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    let item = InventoryItem::new(name, quantity, threshold, unit, returnable);
    state.inventory.add_item(item).await.map_err(|e| e.to_string())
}

pub async fn update_inventory_item(state: &AppState, item: InventoryItem) -> Result<InventoryItem, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.inventory.update_item(item).await.map_err(|e| e.to_string())
}

pub async fn delete_inventory_item(state: &AppState, id: u64) -> Result<(), String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.inventory.delete_item(id).await.map_err(|e| e.to_string())
}

// ========================
// Withdrawals and returns
// ========================

pub async fn withdraw_item(state: &AppState, item_id: u64, amount: u32) -> Result<WithdrawalOutcome, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state
        .inventory
        .withdraw(&user.username, item_id, amount)
        .await
        .map_err(|e| e.to_string())
}

pub async fn return_item(state: &AppState, item_id: u64, amount: u32) -> Result<InventoryItem, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state
        .inventory
        .return_item(&user.username, item_id, amount)
        .await
        .map_err(|e| e.to_string())
}

pub async fn my_inventory(state: &AppState) -> Result<PersonalLedger, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    state.inventory.personal_inventory(&user.username).await.map_err(|e| e.to_string())
}

/// Withdrawal history of `username`; employees may only read their own
pub async fn withdrawal_history(state: &AppState, username: String) -> Result<WithdrawalHistory, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    if !user.is_admin() && user.username != username {
        return Err("Admin role required".to_string());
    }
    state.inventory.withdrawal_history(&username).await.map_err(|e| e.to_string())
}

// ========================
// Request queue
// ========================

/// Admins see every request, employees their own
pub async fn list_requests(state: &AppState) -> Result<Vec<WithdrawalRequest>, String> {
    let user = state.session.require_user().await.map_err(|e| e.to_string())?;
    let requests = if user.is_admin() {
        state.inventory.list_requests().await
    } else {
        state.inventory.requests_for(&user.username).await
    };
    requests.map_err(|e| e.to_string())
}

pub async fn pending_requests(state: &AppState) -> Result<Vec<WithdrawalRequest>, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.inventory.pending_requests().await.map_err(|e| e.to_string())
}

pub async fn approve_request(state: &AppState, request_id: u64) -> Result<WithdrawalRequest, String> {
    let admin = state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .inventory
        .approve_request(request_id, &admin.username)
        .await
        .map_err(|e| e.to_string())
}

pub async fn reject_request(state: &AppState, request_id: u64) -> Result<WithdrawalRequest, String> {
    let admin = state.session.require_admin().await.map_err(|e| e.to_string())?;
    state
        .inventory
        .reject_request(request_id, &admin.username)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_all_requests(state: &AppState, confirmed: bool) -> Result<usize, String> {
    state.session.require_admin().await.map_err(|e| e.to_string())?;
    state.inventory.delete_all_requests(confirmed).await.map_err(|e| e.to_string())
}
