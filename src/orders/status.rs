//! Order status machine
//!
//! ```text
//! INGRESADO ──(any item ready)──> EN_PROCESO ──(all items ready)──> ENTREGADO
//! ```
//!
//! Moves only go forward. ENTREGADO is terminal and closes the order for
//! every further mutation.

use crate::core::error::OrderError;
use crate::orders::model::{Order, OrderAggregate, OrderStatus};

/// Outcome of a requested status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the requested status
    Unchanged,
    /// Move forward to the given status
    Advance(OrderStatus),
}

/// Status the order should move to after its items changed, if any.
///
/// Only `INGRESADO -> EN_PROCESO` happens automatically, as soon as one
/// item is ready.
pub fn evaluate_auto_transition(aggregate: &OrderAggregate) -> Option<OrderStatus> {
    (aggregate.order.status == OrderStatus::Ingresado && aggregate.any_ready())
        .then_some(OrderStatus::EnProceso)
}

/// Reject mutations on a delivered order
pub fn ensure_open(order: &Order) -> Result<(), OrderError> {
    if order.status.is_terminal() {
        return Err(OrderError::OrderClosed {
            code: order.code.clone(),
        });
    }
    Ok(())
}

/// Every item must be ready before delivery
pub fn ensure_deliverable(aggregate: &OrderAggregate) -> Result<(), OrderError> {
    match aggregate.pending_items() {
        0 => Ok(()),
        pending => Err(OrderError::IncompleteOrder {
            code: aggregate.order.code.clone(),
            pending,
        }),
    }
}

/// Validate an explicit status change against the lifecycle.
///
/// EN_PROCESO needs at least one ready item and ENTREGADO needs all of
/// them, so an explicit change never skips the readiness rules.
pub fn plan_transition(
    aggregate: &OrderAggregate,
    target: OrderStatus,
) -> Result<Transition, OrderError> {
    let current = aggregate.order.status;
    if current == target {
        return Ok(Transition::Unchanged);
    }
    if target < current {
        return Err(OrderError::InvalidTransition {
            from: current,
            to: target,
        });
    }
    match target {
        OrderStatus::EnProceso if !aggregate.any_ready() => {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: target,
            });
        }
        OrderStatus::Entregado => ensure_deliverable(aggregate)?,
        _ => {}
    }
    Ok(Transition::Advance(target))
}
