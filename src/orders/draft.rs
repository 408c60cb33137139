//! Batched edits to an existing order
//!
//! A caller accumulates changes in an [`OrderDraft`] and submits them in one
//! go; the service applies the whole draft to the aggregate in memory and
//! persists the result with a single atomic write.

use crate::core::error::OrderError;
use crate::orders::input::{ClientInfoInput, DraftItem};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityChange {
    pub item_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyChange {
    pub item_id: Uuid,
    pub ready: bool,
}

/// Pending changes, applied in field order: client info, removals,
/// additions, quantity changes, readiness changes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDraft {
    pub client: Option<ClientInfoInput>,
    pub removed_items: Vec<Uuid>,
    pub added_items: Vec<DraftItem>,
    pub quantity_changes: Vec<QuantityChange>,
    pub ready_changes: Vec<ReadyChange>,
}

impl OrderDraft {
    pub fn is_empty(&self) -> bool {
        self.client.is_none()
            && self.removed_items.is_empty()
            && self.added_items.is_empty()
            && self.quantity_changes.is_empty()
            && self.ready_changes.is_empty()
    }
}

/// Collapse pending additions of the same (school, garment, size) into one
/// line, keeping the position of the first occurrence.
///
/// Quantities must be positive; merged quantities must fit in `i64`.
pub fn merge_draft_items(items: &[DraftItem]) -> Result<Vec<DraftItem>, OrderError> {
    let mut merged: Vec<DraftItem> = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(item.quantity));
        }

        let existing = merged.iter_mut().find(|m| {
            m.school_id == item.school_id
                && m.garment_id == item.garment_id
                && m.size_id == item.size_id
        });

        match existing {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| OrderError::AmountOverflow("merged quantity".to_string()))?;
            }
            None => merged.push(item.clone()),
        }
    }

    Ok(merged)
}
