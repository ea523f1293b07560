//! Inventory Workflow
//!
//! Withdrawals, returns and the approval queue over the shared stock.
//!
//! A withdrawal either applies immediately (auto-approved) or, when it pushes
//! the user's cumulative holding past a multiple of the item threshold, becomes
//! a pending request holding a claim on the stock. Every operation writes its
//! keys in a single batch, so `stock + sum(personal ledgers)` is conserved.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use super::reservation::{ReservationBook, StockLevel};
use crate::domain::{
    crosses_threshold, DomainError, DomainResult, InventoryItem, PersonalLedger, ReviewStatus,
    WithdrawalHistory, WithdrawalOutcome, WithdrawalRequest,
};
use crate::repository::{load_json, CollectionRepository, KvStore, KvWrite, Repository, StorageKey};

const LEDGER_SEQUENCE: &str = "personalInventory";

pub struct InventoryService {
    store: Arc<dyn KvStore>,
    items: CollectionRepository<InventoryItem>,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
    /// Days of withdrawal history kept; 0 keeps everything
    history_retention_days: u32,
}

impl InventoryService {
    pub fn new(store: Arc<dyn KvStore>, history_retention_days: u32) -> Self {
        Self {
            items: CollectionRepository::new(store.clone(), StorageKey::Inventory),
            store,
            lock: Mutex::new(()),
            history_retention_days,
        }
    }

    // ========================
    // Stock management
    // ========================

    pub async fn list_items(&self) -> DomainResult<Vec<InventoryItem>> {
        self.items.list().await
    }

    /// Items with their reserved and available quantities
    pub async fn stock_levels(&self) -> DomainResult<Vec<StockLevel>> {
        let items = self.items.list().await?;
        let book = ReservationBook::from_requests(&self.load_requests().await?);
        Ok(items.into_iter().map(|item| StockLevel::new(item, &book)).collect())
    }

    pub async fn add_item(&self, item: InventoryItem) -> DomainResult<InventoryItem> {
        item.validate_new()?;
        let _guard = self.lock.lock().await;

        let mut item = item;
        item.id = 0;
        let created = self.items.create(&item).await?;
        log::info!("Inventory item {} added ({} {})", created.id, created.quantity, created.unit);
        Ok(created)
    }

    /// Edit an item. Stock may not drop below what pending requests claim.
    pub async fn update_item(&self, item: InventoryItem) -> DomainResult<InventoryItem> {
        item.validate_edit()?;
        let _guard = self.lock.lock().await;

        let book = ReservationBook::from_requests(&self.load_requests().await?);
        let reserved = book.reserved(item.id);
        if item.quantity < reserved {
            return Err(DomainError::Conflict(format!(
                "Quantity {} is below the {} {} claimed by pending requests",
                item.quantity, reserved, item.unit
            )));
        }
        self.items.update(&item).await
    }

    pub async fn delete_item(&self, item_id: u64) -> DomainResult<()> {
        let _guard = self.lock.lock().await;
        self.items.delete(item_id).await?;
        log::info!("Inventory item {} deleted", item_id);
        Ok(())
    }

    // ========================
    // Withdrawal state machine
    // ========================

    /// Withdraw `amount` units of an item for `username`
    pub async fn withdraw(&self, username: &str, item_id: u64, amount: u32) -> DomainResult<WithdrawalOutcome> {
        require_username(username)?;
        if amount == 0 {
            return Err(DomainError::InvalidInput("Please enter a valid quantity".into()));
        }
        let _guard = self.lock.lock().await;

        let mut items = self.items.load_all().await?;
        let index = position_of(&items, item_id)?;
        let mut requests = self.load_requests().await?;

        let available = ReservationBook::from_requests(&requests).available(&items[index]);
        if amount > available {
            return Err(DomainError::InvalidInput("Requested quantity exceeds available stock".into()));
        }

        let ledger_key = StorageKey::PersonalInventory(username.to_string());
        let mut ledger: PersonalLedger = load_json(self.store.as_ref(), &ledger_key).await?;
        let current = ledger.quantity_of(item_id);
        let now = Utc::now();

        if crosses_threshold(current, amount, items[index].threshold) {
            let id = self.store.next_id(&StorageKey::InventoryRequests.as_key()).await?;
            let request = WithdrawalRequest::new(id, &items[index], username, amount, now);
            requests.push(request.clone());
            self.store
                .write_batch(vec![KvWrite::put_json(&StorageKey::InventoryRequests, &requests)?])
                .await?;

            log::info!(
                "Withdrawal of {} x item {} by {} needs approval (request {})",
                amount, item_id, username, request.id
            );
            return Ok(WithdrawalOutcome::PendingApproval { request });
        }

        items[index].quantity -= amount;
        let entry_id = match ledger.entry(item_id) {
            Some(existing) => existing.id,
            None => self.store.next_id(LEDGER_SEQUENCE).await?,
        };
        let entry = ledger.credit(&items[index], amount, entry_id)?.clone();

        let history_key = StorageKey::WithdrawalHistory(username.to_string());
        let mut history: WithdrawalHistory = load_json(self.store.as_ref(), &history_key).await?;
        let today = now.date_naive();
        history.record(today, item_id, amount);
        if self.history_retention_days > 0 {
            history.prune_before(today - Duration::days(i64::from(self.history_retention_days)));
        }

        self.store
            .write_batch(vec![
                self.items.replace_write(&items)?,
                KvWrite::put_json(&ledger_key, &ledger)?,
                KvWrite::put_json(&history_key, &history)?,
            ])
            .await?;

        log::info!("Withdrawal of {} x item {} by {} auto-approved", amount, item_id, username);
        Ok(WithdrawalOutcome::AutoApproved {
            item: items[index].clone(),
            entry,
        })
    }

    /// Commit a pending request's claim: stock moves to the requester's ledger
    pub async fn approve_request(&self, request_id: u64, approver: &str) -> DomainResult<WithdrawalRequest> {
        let _guard = self.lock.lock().await;

        let mut requests = self.load_requests().await?;
        let request_index = requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| DomainError::NotFound(format!("Request {}", request_id)))?;

        let mut request = requests[request_index].clone();
        request.resolve(ReviewStatus::Approved, approver, Utc::now())?;

        let mut items = self.items.load_all().await?;
        let item_index = position_of(&items, request.item_id)?;
        if items[item_index].quantity < request.requested_quantity {
            return Err(DomainError::Conflict(format!(
                "Only {} {} of {} left in stock",
                items[item_index].quantity, items[item_index].unit, items[item_index].name
            )));
        }
        items[item_index].quantity -= request.requested_quantity;

        let ledger_key = StorageKey::PersonalInventory(request.requested_by.clone());
        let mut ledger: PersonalLedger = load_json(self.store.as_ref(), &ledger_key).await?;
        let entry_id = match ledger.entry(request.item_id) {
            Some(existing) => existing.id,
            None => self.store.next_id(LEDGER_SEQUENCE).await?,
        };
        ledger.credit(&items[item_index], request.requested_quantity, entry_id)?;

        requests[request_index] = request.clone();
        self.store
            .write_batch(vec![
                self.items.replace_write(&items)?,
                KvWrite::put_json(&StorageKey::InventoryRequests, &requests)?,
                KvWrite::put_json(&ledger_key, &ledger)?,
            ])
            .await?;

        log::info!("Request {} approved by {}", request_id, approver);
        Ok(request)
    }

    /// Release a pending request's claim; stock and ledgers are untouched
    pub async fn reject_request(&self, request_id: u64, approver: &str) -> DomainResult<WithdrawalRequest> {
        let _guard = self.lock.lock().await;

        let mut requests = self.load_requests().await?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| DomainError::NotFound(format!("Request {}", request_id)))?;
        request.resolve(ReviewStatus::Rejected, approver, Utc::now())?;
        let rejected = request.clone();

        self.store
            .write_batch(vec![KvWrite::put_json(&StorageKey::InventoryRequests, &requests)?])
            .await?;

        log::info!("Request {} rejected by {}", request_id, approver);
        Ok(rejected)
    }

    /// Return units from the personal ledger to the shared stock
    pub async fn return_item(&self, username: &str, item_id: u64, amount: u32) -> DomainResult<InventoryItem> {
        require_username(username)?;
        if amount == 0 {
            return Err(DomainError::InvalidInput("Please enter a valid quantity".into()));
        }
        let _guard = self.lock.lock().await;

        let mut items = self.items.load_all().await?;
        let index = position_of(&items, item_id)?;
        if !items[index].returnable {
            return Err(DomainError::InvalidInput(format!("{} is not returnable", items[index].name)));
        }

        let ledger_key = StorageKey::PersonalInventory(username.to_string());
        let mut ledger: PersonalLedger = load_json(self.store.as_ref(), &ledger_key).await?;
        ledger.debit(item_id, amount)?;
        items[index].quantity = items[index]
            .quantity
            .checked_add(amount)
            .ok_or_else(|| DomainError::InvalidInput("Stock quantity overflow".into()))?;

        self.store
            .write_batch(vec![
                self.items.replace_write(&items)?,
                KvWrite::put_json(&ledger_key, &ledger)?,
            ])
            .await?;

        log::info!("{} returned {} x item {}", username, amount, item_id);
        Ok(items[index].clone())
    }

    // ========================
    // Request queue
    // ========================

    pub async fn list_requests(&self) -> DomainResult<Vec<WithdrawalRequest>> {
        self.load_requests().await
    }

    pub async fn pending_requests(&self) -> DomainResult<Vec<WithdrawalRequest>> {
        let mut requests = self.load_requests().await?;
        requests.retain(|r| r.holds_claim());
        Ok(requests)
    }

    pub async fn requests_for(&self, username: &str) -> DomainResult<Vec<WithdrawalRequest>> {
        let mut requests = self.load_requests().await?;
        requests.retain(|r| r.requested_by == username);
        Ok(requests)
    }

    /// Drop every request, releasing all claims. Irreversible, so the caller
    /// must pass `confirmed`.
    pub async fn delete_all_requests(&self, confirmed: bool) -> DomainResult<usize> {
        if !confirmed {
            return Err(DomainError::InvalidInput(
                "Deleting all inventory requests must be confirmed".into(),
            ));
        }
        let _guard = self.lock.lock().await;

        let count = self.load_requests().await?.len();
        let empty: Vec<WithdrawalRequest> = Vec::new();
        self.store
            .write_batch(vec![KvWrite::put_json(&StorageKey::InventoryRequests, &empty)?])
            .await?;

        log::warn!("Deleted all {} inventory requests", count);
        Ok(count)
    }

    // ========================
    // Per-user views
    // ========================

    pub async fn personal_inventory(&self, username: &str) -> DomainResult<PersonalLedger> {
        load_json(self.store.as_ref(), &StorageKey::PersonalInventory(username.to_string())).await
    }

    pub async fn withdrawal_history(&self, username: &str) -> DomainResult<WithdrawalHistory> {
        load_json(self.store.as_ref(), &StorageKey::WithdrawalHistory(username.to_string())).await
    }

    /// Forget a user: drop their requests, put their holdings back in stock and
    /// remove their ledger and history. Returns the units restocked.
    pub async fn remove_user(&self, username: &str) -> DomainResult<u64> {
        let _guard = self.lock.lock().await;

        let mut items = self.items.load_all().await?;
        let mut requests = self.load_requests().await?;
        let ledger_key = StorageKey::PersonalInventory(username.to_string());
        let ledger: PersonalLedger = load_json(self.store.as_ref(), &ledger_key).await?;

        requests.retain(|r| r.requested_by != username);

        let mut restocked = 0u64;
        for entry in ledger.entries() {
            match items.iter_mut().find(|i| i.id == entry.main_inventory_id) {
                Some(item) => {
                    item.quantity = item.quantity.checked_add(entry.quantity).ok_or_else(|| {
                        DomainError::Conflict(format!(
                            "Returning {} x {} held by {} would overflow stock",
                            entry.quantity, entry.name, username
                        ))
                    })?;
                    restocked += u64::from(entry.quantity);
                }
                None => log::warn!(
                    "Dropping {} x {} held by {}: item no longer exists",
                    entry.quantity, entry.name, username
                ),
            }
        }

        self.store
            .write_batch(vec![
                self.items.replace_write(&items)?,
                KvWrite::put_json(&StorageKey::InventoryRequests, &requests)?,
                KvWrite::remove(&ledger_key),
                KvWrite::remove(&StorageKey::WithdrawalHistory(username.to_string())),
            ])
            .await?;

        Ok(restocked)
    }

    async fn load_requests(&self) -> DomainResult<Vec<WithdrawalRequest>> {
        load_json(self.store.as_ref(), &StorageKey::InventoryRequests).await
    }
}

fn position_of(items: &[InventoryItem], item_id: u64) -> DomainResult<usize> {
    items
        .iter()
        .position(|i| i.id == item_id)
        .ok_or_else(|| DomainError::NotFound(format!("Inventory item {}", item_id)))
}

fn require_username(username: &str) -> DomainResult<()> {
    if username.trim().is_empty() {
        return Err(DomainError::InvalidInput("Username is required".into()));
    }
    Ok(())
}
