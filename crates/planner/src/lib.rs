//! `restock-planner` — demand averaging and purchase proposals.
//!
//! Pure calculation over replayed ledger state: calendar-based daily
//! sales averages with out-of-stock censoring, inventory projection to
//! a target receipt date, and the staged rounding that turns a forecast
//! into an orderable quantity.

pub mod average;
pub mod position;
pub mod proposal;

pub use average::{daily_sales_average, SalesAverage};
pub use position::{projected_inventory_position, ExpectedReceipt};
pub use proposal::{generate_proposal, ProposalBreakdown, ProposalInputs};
