//! Inventory Entities
//!
//! Shared stock items, the per-user personal ledger, withdrawal requests and
//! the dated withdrawal history.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{DomainError, DomainResult, Entity, NumberedEntity, ReviewStatus};

/// An item in the shared stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: u64,
    pub name: String,
    /// Units on hand in the shared stock
    pub quantity: u32,
    /// Cumulative personal quantity step that triggers approval
    pub threshold: u32,
    pub unit: String,
    #[serde(default)]
    pub returnable: bool,
}

impl InventoryItem {
    pub fn new(name: String, quantity: u32, threshold: u32, unit: String, returnable: bool) -> Self {
        Self {
            id: 0,
            name,
            quantity,
            threshold,
            unit,
            returnable,
        }
    }

    /// Rules for adding a new item: stock must start positive
    pub fn validate_new(&self) -> DomainResult<()> {
        self.validate_common()?;
        if self.quantity == 0 {
            return Err(DomainError::InvalidInput("Quantity must be greater than 0".into()));
        }
        Ok(())
    }

    /// Rules for editing an existing item: stock may be drained to 0
    pub fn validate_edit(&self) -> DomainResult<()> {
        self.validate_common()
    }

    fn validate_common(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Item name is required".into()));
        }
        if self.unit.trim().is_empty() {
            return Err(DomainError::InvalidInput("Unit is required".into()));
        }
        if self.threshold == 0 {
            return Err(DomainError::InvalidInput("Threshold must be greater than 0".into()));
        }
        Ok(())
    }
}

impl Entity for InventoryItem {
    type Id = u64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl NumberedEntity for InventoryItem {
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Whether withdrawing `amount` on top of `current` personal units advances the
/// floor-divided threshold multiple.
///
/// Landing exactly on a multiple counts only if the multiple strictly grows:
/// 8 + 2 with threshold 10 crosses (0 -> 1), 10 + 0 never does. A zero
/// threshold always requires approval.
pub fn crosses_threshold(current: u32, amount: u32, threshold: u32) -> bool {
    if threshold == 0 {
        return true;
    }
    let threshold = u64::from(threshold);
    let current = u64::from(current);
    let next_multiple = (current + u64::from(amount)) / threshold;
    let previous_multiple = current / threshold;
    next_multiple > previous_multiple
}

/// One row of a user's personal ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInventoryEntry {
    pub id: u64,
    pub main_inventory_id: u64,
    pub name: String,
    pub quantity: u32,
    pub unit: String,
    #[serde(default)]
    pub returnable: bool,
}

/// Quantities a user has withdrawn and not yet returned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonalLedger(pub Vec<PersonalInventoryEntry>);

impl PersonalLedger {
    pub fn entries(&self) -> &[PersonalInventoryEntry] {
        &self.0
    }

    pub fn entry(&self, item_id: u64) -> Option<&PersonalInventoryEntry> {
        self.0.iter().find(|e| e.main_inventory_id == item_id)
    }

    /// Units held for an item, 0 if there is no entry
    pub fn quantity_of(&self, item_id: u64) -> u32 {
        self.entry(item_id).map(|e| e.quantity).unwrap_or(0)
    }

    /// Add units for an item, creating the entry with `new_entry_id` if needed.
    /// Fails without changing the ledger if the holding would overflow.
    pub fn credit(
        &mut self,
        item: &InventoryItem,
        amount: u32,
        new_entry_id: u64,
    ) -> DomainResult<&PersonalInventoryEntry> {
        match self.0.iter().position(|e| e.main_inventory_id == item.id) {
            Some(index) => {
                let entry = &mut self.0[index];
                entry.quantity = entry.quantity.checked_add(amount).ok_or_else(|| {
                    DomainError::Conflict(format!(
                        "Personal holding of {} would exceed {} {}",
                        item.name,
                        u32::MAX,
                        item.unit
                    ))
                })?;
                Ok(&self.0[index])
            }
            None => {
                self.0.push(PersonalInventoryEntry {
                    id: new_entry_id,
                    main_inventory_id: item.id,
                    name: item.name.clone(),
                    quantity: amount,
                    unit: item.unit.clone(),
                    returnable: item.returnable,
                });
                Ok(&self.0[self.0.len() - 1])
            }
        }
    }

    /// Remove units for an item; the entry disappears when it reaches 0.
    /// Returns the units left.
    pub fn debit(&mut self, item_id: u64, amount: u32) -> DomainResult<u32> {
        let index = self
            .0
            .iter()
            .position(|e| e.main_inventory_id == item_id)
            .filter(|&i| self.0[i].quantity >= amount)
            .ok_or_else(|| {
                DomainError::InvalidInput("Insufficient quantity in personal inventory".into())
            })?;

        let remaining = self.0[index].quantity - amount;
        if remaining == 0 {
            self.0.remove(index);
        } else {
            self.0[index].quantity = remaining;
        }
        Ok(remaining)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A withdrawal that crossed a threshold and waits for an admin.
///
/// While pending it holds a claim on `requested_quantity` units of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: u64,
    pub item_id: u64,
    pub item_name: String,
    pub requested_by: String,
    pub requested_quantity: u32,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl WithdrawalRequest {
    pub fn new(id: u64, item: &InventoryItem, requested_by: &str, quantity: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            item_id: item.id,
            item_name: item.name.clone(),
            requested_by: requested_by.to_string(),
            requested_quantity: quantity,
            status: ReviewStatus::Pending,
            requested_at: Some(now),
            resolved_at: None,
            resolved_by: None,
        }
    }

    pub fn holds_claim(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Move to a terminal status; a resolved request cannot change again
    pub fn resolve(&mut self, status: ReviewStatus, by: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Request {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }
        if !status.is_terminal() {
            return Err(DomainError::InvalidInput("A request can only be approved or rejected".into()));
        }
        self.status = status;
        self.resolved_at = Some(now);
        self.resolved_by = Some(by.to_string());
        Ok(())
    }
}

impl Entity for WithdrawalRequest {
    type Id = u64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Auto-approved withdrawals per day: `YYYY-MM-DD -> item id -> cumulative units`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WithdrawalHistory(pub BTreeMap<String, BTreeMap<u64, u32>>);

impl WithdrawalHistory {
    pub fn record(&mut self, date: NaiveDate, item_id: u64, amount: u32) {
        let total = self
            .0
            .entry(date_key(date))
            .or_default()
            .entry(item_id)
            .or_insert(0);
        *total = total.saturating_add(amount);
    }

    pub fn amount_on(&self, date: NaiveDate, item_id: u64) -> u32 {
        self.0
            .get(&date_key(date))
            .and_then(|items| items.get(&item_id))
            .copied()
            .unwrap_or(0)
    }

    /// Drop days before `cutoff`. Keys that are not dates are dropped too.
    pub fn prune_before(&mut self, cutoff: NaiveDate) -> usize {
        let before = self.0.len();
        self.0.retain(|day, _| {
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(|d| d >= cutoff)
                .unwrap_or(false)
        });
        before - self.0.len()
    }

    pub fn days(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Result of a withdrawal attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum WithdrawalOutcome {
    /// Applied immediately
    AutoApproved {
        item: InventoryItem,
        entry: PersonalInventoryEntry,
    },
    /// Crossed a threshold; waits for an admin
    PendingApproval { request: WithdrawalRequest },
}

impl WithdrawalOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, WithdrawalOutcome::PendingApproval { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(threshold: u32) -> InventoryItem {
        let mut item = InventoryItem::new("Gloves".to_string(), 20, threshold, "pcs".to_string(), true);
        item.id = 7;
        item
    }

    #[test]
    fn test_threshold_crossing_uses_floor_multiples() {
        assert!(crosses_threshold(8, 3, 10));
        assert!(!crosses_threshold(8, 1, 10));
        assert!(crosses_threshold(8, 2, 10));
        assert!(crosses_threshold(0, 5, 5));
        assert!(!crosses_threshold(0, 4, 5));
        assert!(!crosses_threshold(10, 9, 10));
        assert!(crosses_threshold(10, 10, 10));
        assert!(crosses_threshold(3, 1, 0));
    }

    #[test]
    fn test_threshold_crossing_matches_floor_definition() {
        for threshold in 1..=7u32 {
            for current in 0..=20u32 {
                for amount in 1..=20u32 {
                    let expected = (current + amount) / threshold > current / threshold;
                    assert_eq!(crosses_threshold(current, amount, threshold), expected);
                }
            }
        }
    }

    #[test]
    fn test_item_validation() {
        assert!(item(5).validate_new().is_ok());

        let mut empty = item(5);
        empty.quantity = 0;
        assert!(empty.validate_new().is_err());
        assert!(empty.validate_edit().is_ok());

        assert!(item(0).validate_edit().is_err());

        let mut unnamed = item(5);
        unnamed.name = "  ".to_string();
        assert!(matches!(unnamed.validate_new(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_ledger_credit_and_debit() {
        let gloves = item(5);
        let mut ledger = PersonalLedger::default();

        ledger.credit(&gloves, 3, 100).unwrap();
        ledger.credit(&gloves, 2, 101).unwrap();
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.quantity_of(7), 5);
        assert_eq!(ledger.entry(7).unwrap().id, 100);

        assert_eq!(ledger.debit(7, 4).unwrap(), 1);
        assert!(ledger.debit(7, 2).is_err());
        assert_eq!(ledger.debit(7, 1).unwrap(), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ledger_credit_refuses_overflow() {
        let gloves = item(5);
        let mut ledger = PersonalLedger::default();
        ledger.credit(&gloves, u32::MAX - 1, 100).unwrap();

        assert!(matches!(ledger.credit(&gloves, 2, 101), Err(DomainError::Conflict(_))));
        assert_eq!(ledger.quantity_of(7), u32::MAX - 1);
        ledger.credit(&gloves, 1, 101).unwrap();
        assert_eq!(ledger.quantity_of(7), u32::MAX);
    }

    #[test]
    fn test_request_resolution_is_terminal() {
        let now = Utc::now();
        let mut request = WithdrawalRequest::new(1, &item(5), "alice", 5, now);
        assert!(request.holds_claim());

        request.resolve(ReviewStatus::Rejected, "admin", now).unwrap();
        assert!(!request.holds_claim());
        assert_eq!(request.resolved_by.as_deref(), Some("admin"));

        let again = request.resolve(ReviewStatus::Approved, "admin", now);
        assert!(matches!(again, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn test_history_accumulates_per_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut history = WithdrawalHistory::default();
        history.record(day, 7, 2);
        history.record(day, 7, 3);
        history.record(day, 8, 1);
        assert_eq!(history.amount_on(day, 7), 5);

        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"{"2024-03-01":{"7":5,"8":1}}"#);

        history.record(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), 7, 1);
        let pruned = history.prune_before(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(pruned, 1);
        assert_eq!(history.days().count(), 1);
    }

    #[test]
    fn test_request_reads_camel_case_layout() {
        let json = r#"{"id":1700000000000,"itemId":7,"itemName":"Gloves","requestedBy":"alice","requestedQuantity":5,"status":"pending"}"#;
        let request: WithdrawalRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.item_id, 7);
        assert!(request.holds_claim());
        assert!(request.requested_at.is_none());
    }
}
