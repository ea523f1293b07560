//! Stock Reservations
//!
//! A pending withdrawal request holds a claim on stock: the units stay on hand
//! but are no longer available to other withdrawals. Approval commits the
//! claim, rejection (or deletion of the request) releases it.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{InventoryItem, WithdrawalRequest};

/// Claimed units per item, derived from the request queue
#[derive(Debug, Default)]
pub struct ReservationBook {
    claims: HashMap<u64, u64>,
}

impl ReservationBook {
    pub fn from_requests(requests: &[WithdrawalRequest]) -> Self {
        let mut claims: HashMap<u64, u64> = HashMap::new();
        for request in requests.iter().filter(|r| r.holds_claim()) {
            *claims.entry(request.item_id).or_insert(0) += u64::from(request.requested_quantity);
        }
        Self { claims }
    }

    pub fn reserved(&self, item_id: u64) -> u32 {
        let claimed = self.claims.get(&item_id).copied().unwrap_or(0);
        u32::try_from(claimed).unwrap_or(u32::MAX)
    }

    /// On-hand units not claimed by pending requests
    pub fn available(&self, item: &InventoryItem) -> u32 {
        item.quantity.saturating_sub(self.reserved(item.id))
    }
}

/// Stock view of one item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub reserved: u32,
    pub available: u32,
}

impl StockLevel {
    pub fn new(item: InventoryItem, book: &ReservationBook) -> Self {
        let reserved = book.reserved(item.id);
        let available = book.available(&item);
        Self {
            item,
            reserved,
            available,
        }
    }
}
