//! The engine façade: validated operations over one durable store.
//!
//! Every mutation follows the same discipline: acquire the writer
//! lock, clone the in-memory state, apply the change to the clone,
//! persist the clone atomically, then swap it in. A failure at any
//! point leaves both the durable file and the shared state exactly as
//! they were before the call.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use restock_calendar::{Calendar, CalendarConfig, Direction, Eligibility, RuleScope};
use restock_core::{
    Catalog, DocumentId, DomainError, EngineSettings, OrderId, SkuCode, check_lookback,
};
use restock_ledger::{DraftTransaction, PostedTransaction, StockSnapshot, TxKind};
use restock_planner::{ProposalInputs, SalesAverage};
use restock_receiving::{Order, OrderUpdate, ReceivingDocument};

use crate::durable::FileStore;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::lock::{LeaseTracker, RetryPolicy, WriterLock};
use crate::state::{ProcessedDocument, StoreState};

/// Store-layer tuning, separate from the domain-level
/// [`EngineSettings`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub backup_retention: usize,
    pub writer_lock_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            backup_retention: 5,
            writer_lock_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// A replenishment proposal anchored to calendar-eligible dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProposal {
    /// First order-eligible day at or after the requested as-of date.
    pub order_date: NaiveDate,
    /// Order date plus lead time, rolled forward to a delivery-eligible
    /// day.
    pub target_receipt_date: NaiveDate,
    pub breakdown: restock_planner::ProposalBreakdown,
}

/// What processing a delivery document did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptOutcome {
    /// First sighting of this document id; stock and orders moved.
    Processed {
        document_id: DocumentId,
        order_updates: Vec<OrderUpdate>,
        transactions: Vec<PostedTransaction>,
    },
    /// The document id was recorded earlier. Nothing changed; the
    /// resubmission is a defined no-op, not an error.
    AlreadyProcessed {
        document_id: DocumentId,
        processed_at: DateTime<Utc>,
    },
}

impl ReceiptOutcome {
    pub fn is_replay(&self) -> bool {
        matches!(self, ReceiptOutcome::AlreadyProcessed { .. })
    }
}

/// Single-writer, multi-reader inventory engine over one durable
/// store.
#[derive(Debug)]
pub struct Engine<C: Catalog> {
    catalog: C,
    settings: EngineSettings,
    calendar: Calendar,
    options: StoreOptions,
    file: FileStore,
    state: RwLock<StoreState>,
    writer: WriterLock,
    leases: LeaseTracker,
}

impl<C: Catalog> Engine<C> {
    /// Open (or create) the store under `dir`.
    pub fn open(
        dir: impl Into<PathBuf>,
        catalog: C,
        settings: EngineSettings,
        calendar: CalendarConfig,
        options: StoreOptions,
    ) -> EngineResult<Self> {
        settings.validate()?;
        let calendar = Calendar::new(calendar)?;
        let file = FileStore::new(dir, options.backup_retention);
        let state = file.load()?;
        tracing::info!(
            "opened store at {} ({} transactions, {} orders, {} documents)",
            file.path().display(),
            state.transactions.len(),
            state.orders.len(),
            state.documents.len()
        );
        Ok(Self {
            catalog,
            settings,
            calendar,
            options,
            file,
            state: RwLock::new(state),
            writer: WriterLock::new(),
            leases: LeaseTracker::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Validate and durably append one ledger transaction.
    ///
    /// Fails fast on writer contention; appending is not idempotent,
    /// so the caller decides whether to resubmit.
    pub fn append_transaction(
        &self,
        draft: DraftTransaction,
    ) -> EngineResult<PostedTransaction> {
        self.catalog.require_sku(&draft.sku)?;
        let posted = self.mutate(|state| {
            if let Some(order_id) = draft.order_id {
                check_order_link(state, order_id, &draft.sku)?;
            }
            let seq = state.allocate_seq();
            let posted = PostedTransaction::post(draft, seq, Utc::now())?;
            state.transactions.push(posted.clone());
            Ok(posted)
        })?;
        tracing::info!(
            "posted {} x{} for {} on {} (seq {})",
            posted.kind(),
            posted.qty(),
            posted.sku(),
            posted.event_date(),
            posted.seq()
        );
        Ok(posted)
    }

    /// Lost-demand tracking: an `Unfulfilled` entry feeds the
    /// out-of-stock boost on later proposals.
    pub fn record_unfulfilled(
        &self,
        sku: &SkuCode,
        qty: i64,
        event_date: NaiveDate,
    ) -> EngineResult<PostedTransaction> {
        self.append_transaction(DraftTransaction::new(
            sku.clone(),
            TxKind::Unfulfilled,
            qty,
            event_date,
        ))
    }

    /// Replayed stock position as of `asof` (inclusive).
    pub fn snapshot(&self, sku: &SkuCode, asof: NaiveDate) -> EngineResult<StockSnapshot> {
        self.catalog.require_sku(sku)?;
        let snapshot =
            self.with_state(|state| restock_ledger::replay(&state.transactions, sku, asof));
        self.log_anomalies(&snapshot);
        Ok(snapshot)
    }

    pub fn days_out_of_stock(
        &self,
        sku: &SkuCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<BTreeSet<NaiveDate>> {
        self.catalog.require_sku(sku)?;
        Ok(self.with_state(|state| {
            restock_ledger::days_out_of_stock(&state.transactions, sku, from, to)
        }))
    }

    /// Daily sales average over the trailing window ending at `asof`.
    /// `lookback_days` defaults from the engine settings.
    pub fn daily_sales_average(
        &self,
        sku: &SkuCode,
        asof: NaiveDate,
        lookback_days: Option<u32>,
    ) -> EngineResult<SalesAverage> {
        self.catalog.require_sku(sku)?;
        let lookback = lookback_days.unwrap_or(self.settings.default_lookback_days);
        check_lookback(lookback)?;
        Ok(self.with_state(|state| {
            restock_planner::daily_sales_average(&state.transactions, sku, asof, lookback)
        }))
    }

    /// Derive a replenishment proposal for `sku` as seen from `asof`.
    ///
    /// The order date is `asof` rolled forward to an order-eligible
    /// day; the target receipt date adds the SKU's lead time and rolls
    /// forward again to a delivery-eligible day.
    pub fn propose_order(&self, sku: &SkuCode, asof: NaiveDate) -> EngineResult<OrderProposal> {
        let record = self.catalog.require_sku(sku)?;

        let order_date = self.calendar.next_eligible_date(
            asof,
            Direction::Forward,
            Eligibility::Order,
            RuleScope::Supplier,
        )?;
        let landing = order_date
            .checked_add_days(Days::new(u64::from(record.lead_time_days)))
            .ok_or_else(|| DomainError::invariant("lead time walks off the calendar"))?;
        let target_receipt_date = self.calendar.next_eligible_date(
            landing,
            Direction::Forward,
            Eligibility::Delivery,
            RuleScope::Warehouse,
        )?;

        let (snapshot, average) = self.with_state(|state| {
            let snapshot = restock_ledger::replay(&state.transactions, sku, asof);
            let average = restock_planner::daily_sales_average(
                &state.transactions,
                sku,
                asof,
                self.settings.default_lookback_days,
            );
            (snapshot, average)
        });
        self.log_anomalies(&snapshot);
        if average.insufficient_data {
            tracing::warn!(
                "average for {} is uninformative: out of stock for the whole {}-day window",
                sku,
                average.window_days
            );
        }

        let breakdown = restock_planner::generate_proposal(ProposalInputs {
            sku: &record,
            on_hand: snapshot.on_hand,
            on_order: snapshot.on_order,
            average,
            global_boost_percent: self.settings.global_oos_boost_percent,
        });
        tracing::info!(
            "proposal for {}: {} units (order {}, target receipt {})",
            sku,
            breakdown.proposed_qty,
            order_date,
            target_receipt_date
        );

        Ok(OrderProposal {
            order_date,
            target_receipt_date,
            breakdown,
        })
    }

    /// Place a purchase order and post its `OrderPlaced` transaction
    /// in one durable step.
    ///
    /// The expected receipt date is the order date plus the SKU's lead
    /// time, rolled forward to a delivery-eligible day.
    pub fn place_order(
        &self,
        sku: &SkuCode,
        qty: i64,
        order_date: NaiveDate,
    ) -> EngineResult<Order> {
        let record = self.catalog.require_sku(sku)?;
        if !self.calendar.is_order_day(order_date, RuleScope::Supplier) {
            return Err(
                DomainError::validation(format!("{order_date} is not an eligible order day"))
                    .into(),
            );
        }
        let landing = order_date
            .checked_add_days(Days::new(u64::from(record.lead_time_days)))
            .ok_or_else(|| DomainError::invariant("lead time walks off the calendar"))?;
        let expected = self.calendar.next_eligible_date(
            landing,
            Direction::Forward,
            Eligibility::Delivery,
            RuleScope::Warehouse,
        )?;

        let order = Order::place(sku.clone(), qty, order_date, expected)?;
        let placed = self.mutate(|state| {
            let draft = DraftTransaction::new(sku.clone(), TxKind::OrderPlaced, qty, order_date)
                .with_order(order.order_id());
            let seq = state.allocate_seq();
            let posted = PostedTransaction::post(draft, seq, Utc::now())?;
            state.transactions.push(posted);
            state.orders.push(order.clone());
            Ok(order)
        })?;
        tracing::info!(
            "placed order {} for {} x{}, expected receipt {}",
            placed.order_id(),
            placed.sku(),
            placed.qty_ordered(),
            placed.expected_receipt_date()
        );
        Ok(placed)
    }

    pub fn order(&self, order_id: OrderId) -> EngineResult<Order> {
        self.with_state(|state| {
            state
                .orders
                .iter()
                .find(|order| order.order_id() == order_id)
                .cloned()
        })
        .ok_or_else(|| DomainError::UnknownOrder(order_id).into())
    }

    /// Open (not yet fulfilled) orders, optionally narrowed to one SKU.
    pub fn open_orders(&self, sku: Option<&SkuCode>) -> Vec<Order> {
        self.with_state(|state| {
            state
                .orders
                .iter()
                .filter(|order| order.is_open())
                .filter(|order| sku.is_none_or(|code| order.sku() == code))
                .cloned()
                .collect()
        })
    }

    /// Process a delivery document: allocate its lines against open
    /// orders, post the receipt transactions, and record the document
    /// id so a resubmission becomes a no-op.
    ///
    /// The whole document lands in one durable write; a document that
    /// fails validation changes nothing and its id is NOT recorded, so
    /// a corrected version can be submitted under the same id.
    ///
    /// Contention is retried with backoff: the operation is keyed on
    /// the document id, so a retry is safe whether or not an earlier
    /// attempt got through.
    pub fn close_receipt_by_document(
        &self,
        document: &ReceivingDocument,
    ) -> EngineResult<ReceiptOutcome> {
        document.validate()?;
        for line in &document.lines {
            self.catalog.require_sku(&line.sku)?;
        }
        if !self
            .calendar
            .is_delivery_day(document.receipt_date, RuleScope::Warehouse)
        {
            // Goods on the dock are a fact; record them, but flag the
            // calendar mismatch.
            tracing::warn!(
                "document {} received on {}, a configured no-receipt day",
                document.document_id,
                document.receipt_date
            );
        }

        let mut attempt = 1;
        loop {
            match self.try_close_receipt(document) {
                Err(EngineError::Store(StoreError::LockTimeout { waited, held }))
                    if attempt < self.options.retry.max_attempts =>
                {
                    attempt += 1;
                    let delay = self.options.retry.delay_before(attempt);
                    tracing::warn!(
                        "document {}: writer busy (waited {:?}, holder in for {:?}); attempt {} in {:?}",
                        document.document_id,
                        waited,
                        held,
                        attempt,
                        delay
                    );
                    thread::sleep(delay);
                }
                outcome => return outcome,
            }
        }
    }

    fn try_close_receipt(&self, document: &ReceivingDocument) -> EngineResult<ReceiptOutcome> {
        let _guard = self.writer.acquire(self.options.writer_lock_timeout)?;

        if let Some(prior) = self.with_state(|state| state.document(&document.document_id).cloned())
        {
            tracing::info!(
                "document {} already processed at {}; nothing to do",
                prior.document_id,
                prior.processed_at
            );
            return Ok(ReceiptOutcome::AlreadyProcessed {
                document_id: prior.document_id,
                processed_at: prior.processed_at,
            });
        }

        let mut next = self.with_state(StoreState::clone);
        let plan = restock_receiving::plan_allocation(document, &next.orders)?;
        let order_updates = restock_receiving::apply_plan(&mut next.orders, &plan)?;

        let mut transactions = Vec::with_capacity(plan.allocations.len() + plan.free_stock.len());
        for allocation in &plan.allocations {
            let mut draft = DraftTransaction::new(
                allocation.sku.clone(),
                TxKind::Receipt,
                allocation.qty,
                document.receipt_date,
            )
            .with_order(allocation.order_id);
            if let Some(expiry) = allocation.lot_expiry {
                draft = draft.with_lot_expiry(expiry);
            }
            let seq = next.allocate_seq();
            let posted = PostedTransaction::post(draft, seq, Utc::now())?;
            next.transactions.push(posted.clone());
            transactions.push(posted);
        }
        for free in &plan.free_stock {
            let mut draft = DraftTransaction::new(
                free.sku.clone(),
                TxKind::Receipt,
                free.qty,
                document.receipt_date,
            );
            if let Some(expiry) = free.lot_expiry {
                draft = draft.with_lot_expiry(expiry);
            }
            let seq = next.allocate_seq();
            let posted = PostedTransaction::post(draft, seq, Utc::now())?;
            next.transactions.push(posted.clone());
            transactions.push(posted);
        }

        next.documents.push(ProcessedDocument {
            document_id: document.document_id.clone(),
            receipt_date: document.receipt_date,
            lines: document.lines.clone(),
            order_updates: order_updates.clone(),
            notes: document.notes.clone(),
            processed_at: Utc::now(),
        });

        self.file.save(&next)?;
        *self.write_state() = next;

        tracing::info!(
            "document {}: {} order allocations, {} free-stock receipts, {} orders updated",
            document.document_id,
            plan.allocations.len(),
            plan.free_stock.len(),
            order_updates.len()
        );
        Ok(ReceiptOutcome::Processed {
            document_id: document.document_id.clone(),
            order_updates,
            transactions,
        })
    }

    /// Final leak check. The engine owns no background work; anything
    /// still counted here is a reader on another thread.
    pub fn shutdown(&self) {
        let outstanding = self.leases.active();
        if outstanding > 0 {
            tracing::warn!("shutting down with {} read leases still active", outstanding);
        } else {
            tracing::info!("store shut down cleanly");
        }
    }

    /// Clone-and-commit mutation: the closure edits a private copy;
    /// only a successfully persisted copy replaces the shared state.
    fn mutate<T>(&self, op: impl FnOnce(&mut StoreState) -> EngineResult<T>) -> EngineResult<T> {
        let _guard = self.writer.acquire(self.options.writer_lock_timeout)?;
        let mut next = self.with_state(StoreState::clone);
        let out = op(&mut next)?;
        self.file.save(&next)?;
        *self.write_state() = next;
        Ok(out)
    }

    fn with_state<T>(&self, op: impl FnOnce(&StoreState) -> T) -> T {
        let _lease = self.leases.begin();
        op(&self.read_state())
    }

    fn log_anomalies(&self, snapshot: &StockSnapshot) {
        for anomaly in &snapshot.anomalies {
            tracing::warn!("ledger anomaly for {}: {}", snapshot.sku, anomaly);
        }
    }

    // Poisoning is benign here: mutators edit a clone and swap it in
    // whole, so a panicked writer cannot leave the shared state
    // half-edited.
    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_order_link(state: &StoreState, order_id: OrderId, sku: &SkuCode) -> EngineResult<()> {
    let order = state
        .orders
        .iter()
        .find(|order| order.order_id() == order_id)
        .ok_or(DomainError::UnknownOrder(order_id))?;
    if order.sku() != sku {
        return Err(DomainError::validation(format!(
            "order {} is for {}, not {}",
            order_id,
            order.sku(),
            sku
        ))
        .into());
    }
    Ok(())
}
