//! Allocation of received goods against open orders.
//!
//! A document is folded into an [`AllocationPlan`] first; the plan is
//! pure data and applying it is the only mutation. Any validation
//! failure aborts before a single order has been touched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use chrono::NaiveDate;
use restock_core::{DomainError, DomainResult, OrderId, SkuCode};

use crate::document::{LineItem, ReceivingDocument};
use crate::order::{Order, OrderStatus};

/// Quantity destined for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub order_id: OrderId,
    pub sku: SkuCode,
    pub qty: i64,
    pub lot_expiry: Option<NaiveDate>,
}

/// Received quantity no open order was waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeStockReceipt {
    pub sku: SkuCode,
    pub qty: i64,
    pub lot_expiry: Option<NaiveDate>,
}

/// The complete allocation decision for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    pub free_stock: Vec<FreeStockReceipt>,
}

impl AllocationPlan {
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty() && self.free_stock.is_empty()
    }
}

/// Per-order summary after a plan has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub sku: SkuCode,
    pub qty_received_total: i64,
    pub new_status: OrderStatus,
}

/// Fold a document against the current orders into a plan.
///
/// Explicit `order_ids` on a line are served in the given priority
/// order, each capped at its remaining quantity; delivering less than
/// the referenced orders want is fine. FIFO lines consume the SKU's
/// open orders oldest-first (order ids break date ties in creation
/// order). Whatever quantity no order absorbs becomes free stock.
///
/// Fails, without planning anything, when the document is malformed,
/// references an unknown order, or references an order for a different
/// SKU.
pub fn plan_allocation(
    document: &ReceivingDocument,
    orders: &[Order],
) -> DomainResult<AllocationPlan> {
    document.validate()?;

    let by_id: HashMap<OrderId, &Order> =
        orders.iter().map(|order| (order.order_id(), order)).collect();
    let mut remaining: HashMap<OrderId, i64> = orders
        .iter()
        .map(|order| (order.order_id(), order.remaining()))
        .collect();

    let mut plan = AllocationPlan::default();

    for line in &document.lines {
        let mut to_place = line.qty;

        if line.order_ids.is_empty() {
            let mut open: Vec<&Order> = orders
                .iter()
                .filter(|order| order.sku() == &line.sku && order.is_open())
                .collect();
            open.sort_by_key(|order| (order.order_date(), *order.order_id().as_uuid()));

            for order in open {
                if to_place == 0 {
                    break;
                }
                take_from(
                    &mut plan,
                    &mut remaining,
                    &mut to_place,
                    order.order_id(),
                    line,
                );
            }
        } else {
            for &order_id in &line.order_ids {
                // Validate every reference even once the line quantity
                // is exhausted: a bad reference fails the document.
                let order = by_id
                    .get(&order_id)
                    .ok_or(DomainError::UnknownOrder(order_id))?;
                if order.sku() != &line.sku {
                    return Err(DomainError::validation(format!(
                        "order {order_id} is for {}, not {}",
                        order.sku(),
                        line.sku
                    )));
                }
                take_from(&mut plan, &mut remaining, &mut to_place, order_id, line);
            }
        }

        if to_place > 0 {
            plan.free_stock.push(FreeStockReceipt {
                sku: line.sku.clone(),
                qty: to_place,
                lot_expiry: line.lot_expiry,
            });
        }
    }

    Ok(plan)
}

fn take_from(
    plan: &mut AllocationPlan,
    remaining: &mut HashMap<OrderId, i64>,
    to_place: &mut i64,
    order_id: OrderId,
    line: &LineItem,
) {
    let Some(rem) = remaining.get_mut(&order_id) else {
        return;
    };
    let take = (*rem).min(*to_place);
    if take > 0 {
        plan.allocations.push(Allocation {
            order_id,
            sku: line.sku.clone(),
            qty: take,
            lot_expiry: line.lot_expiry,
        });
        *rem -= take;
        *to_place -= take;
    }
}

/// Apply a plan to the orders it touches.
///
/// Returns one summary per touched order, in first-touched order.
pub fn apply_plan(orders: &mut [Order], plan: &AllocationPlan) -> DomainResult<Vec<OrderUpdate>> {
    for allocation in &plan.allocations {
        let order = orders
            .iter_mut()
            .find(|order| order.order_id() == allocation.order_id)
            .ok_or(DomainError::UnknownOrder(allocation.order_id))?;
        order.register_receipt(allocation.qty)?;
    }

    let mut updates: Vec<OrderUpdate> = Vec::new();
    for allocation in &plan.allocations {
        if updates
            .iter()
            .any(|update| update.order_id == allocation.order_id)
        {
            continue;
        }
        let order = orders
            .iter()
            .find(|order| order.order_id() == allocation.order_id)
            .ok_or(DomainError::UnknownOrder(allocation.order_id))?;
        updates.push(OrderUpdate {
            order_id: order.order_id(),
            sku: order.sku().clone(),
            qty_received_total: order.qty_received(),
            new_status: order.status(),
        });
    }
    Ok(updates)
}
