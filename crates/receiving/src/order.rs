//! Purchase orders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use restock_core::{DomainError, DomainResult, OrderId, SkuCode};

/// Fulfillment status. Transitions only move forward:
/// `Pending -> PartiallyFulfilled -> Fulfilled`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PartiallyFulfilled,
    Fulfilled,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyFulfilled => "partially_fulfilled",
            OrderStatus::Fulfilled => "fulfilled",
        };
        f.write_str(name)
    }
}

/// A purchase order.
///
/// Never deleted; once placed it only accumulates receipts until
/// fulfilled. `qty_received` is monotonically non-decreasing, which
/// the mutator enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    sku: SkuCode,
    order_date: NaiveDate,
    qty_ordered: i64,
    qty_received: i64,
    status: OrderStatus,
    expected_receipt_date: NaiveDate,
}

impl Order {
    pub fn place(
        sku: SkuCode,
        qty_ordered: i64,
        order_date: NaiveDate,
        expected_receipt_date: NaiveDate,
    ) -> DomainResult<Self> {
        if qty_ordered <= 0 {
            return Err(DomainError::validation("ordered quantity must be positive"));
        }
        if expected_receipt_date < order_date {
            return Err(DomainError::validation(
                "expected receipt date cannot precede the order date",
            ));
        }
        Ok(Self {
            order_id: OrderId::new(),
            sku,
            order_date,
            qty_ordered,
            qty_received: 0,
            status: OrderStatus::Pending,
            expected_receipt_date,
        })
    }

    /// Record an incoming allocation against this order.
    ///
    /// The caller (the allocation plan) never allocates beyond the
    /// remaining quantity; exceeding it here is a plan bug, reported as
    /// an invariant violation.
    pub fn register_receipt(&mut self, qty: i64) -> DomainResult<OrderStatus> {
        if qty <= 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }
        if qty > self.remaining() {
            return Err(DomainError::invariant(
                "receipt exceeds remaining ordered quantity",
            ));
        }
        self.qty_received += qty;
        self.status = if self.qty_received >= self.qty_ordered {
            OrderStatus::Fulfilled
        } else {
            OrderStatus::PartiallyFulfilled
        };
        Ok(self.status)
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn sku(&self) -> &SkuCode {
        &self.sku
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn qty_ordered(&self) -> i64 {
        self.qty_ordered
    }

    pub fn qty_received(&self) -> i64 {
        self.qty_received
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn expected_receipt_date(&self) -> NaiveDate {
        self.expected_receipt_date
    }

    pub fn remaining(&self) -> i64 {
        self.qty_ordered - self.qty_received
    }

    pub fn is_open(&self) -> bool {
        self.status != OrderStatus::Fulfilled
    }
}
