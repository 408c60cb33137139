//! Money arithmetic for orders
//!
//! All amounts are whole currency units held in `i64`. Every operation is
//! checked; nothing here ever touches floating point.

use crate::core::error::OrderError;
use crate::orders::model::{Order, OrderAggregate};

/// `unit_price * quantity`
pub fn line_subtotal(unit_price: i64, quantity: i64) -> Result<i64, OrderError> {
    if quantity <= 0 {
        return Err(OrderError::InvalidQuantity(quantity));
    }
    unit_price
        .checked_mul(quantity)
        .ok_or_else(|| OrderError::AmountOverflow("line subtotal".to_string()))
}

/// Sum of every item subtotal
pub fn items_total(aggregate: &OrderAggregate) -> Result<i64, OrderError> {
    aggregate.items.iter().try_fold(0i64, |acc, item| {
        acc.checked_add(item.subtotal)
            .ok_or_else(|| OrderError::AmountOverflow("order total".to_string()))
    })
}

/// `0 <= amount <= total`
pub fn check_payment(amount: i64, total: i64) -> Result<(), OrderError> {
    if amount < 0 || amount > total {
        return Err(OrderError::InvalidAmount { amount, total });
    }
    Ok(())
}

/// Re-derive `total` and `saldo` from the items.
///
/// Fails when the new total would drop below the payment already received;
/// the aggregate is left untouched in that case. A discounted total larger
/// than the new total is cleared.
pub fn recompute_totals(aggregate: &mut OrderAggregate) -> Result<(), OrderError> {
    let total = items_total(aggregate)?;
    let order = &mut aggregate.order;
    check_payment(order.abono, total)?;

    order.total = total;
    order.saldo = total - order.abono;
    if order.discounted_total.is_some_and(|discounted| discounted > total) {
        order.discounted_total = None;
    }
    Ok(())
}

/// Record a new payment and re-derive `saldo`
pub fn apply_payment(order: &mut Order, amount: i64) -> Result<(), OrderError> {
    check_payment(amount, order.total)?;
    order.abono = amount;
    order.saldo = order.total - amount;
    Ok(())
}

/// Set or clear the informational discounted total
pub fn apply_discount(order: &mut Order, discounted_total: Option<i64>) -> Result<(), OrderError> {
    if let Some(amount) = discounted_total {
        check_payment(amount, order.total)?;
    }
    order.discounted_total = discounted_total;
    Ok(())
}
