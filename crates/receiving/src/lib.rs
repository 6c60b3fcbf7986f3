//! `restock-receiving` — purchase orders and delivery reconciliation.
//!
//! Orders move forward through a small state machine as goods arrive.
//! A delivery document is first folded into a pure [`AllocationPlan`];
//! only a valid plan is ever applied, so a failing document leaves
//! every order untouched.

pub mod allocation;
pub mod document;
pub mod order;

pub use allocation::{
    apply_plan, plan_allocation, Allocation, AllocationPlan, FreeStockReceipt, OrderUpdate,
};
pub use document::{LineItem, ReceivingDocument};
pub use order::{Order, OrderStatus};
