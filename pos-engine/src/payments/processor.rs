//! PaymentProcessor - single and batch payments
//!
//! ```text
//! pay / pay_batch
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Validate every order (exists, unpaid, payable, amount)
//!     ├─ 3. Insert payment(s), claim payment_by_order
//!     ├─ 4. Orders → PAID, release tables with nothing left active
//!     ├─ 5. Append notifications to the outbox
//!     ├─ 6. Commit
//!     └─ 7. Enqueue receipt(s) (best effort)
//! ```
//!
//! A batch is all-or-nothing: any validation failure rejects the whole
//! batch before anything is written.

use crate::orders::manager::transition_txn;
use crate::orders::{BatchFailure, ManagerError, ManagerResult};
use crate::pricing::{money_eq, round_money};
use crate::printing::{PrintService, ReceiptData};
use crate::store::Store;
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::NotificationEvent;
use shared::models::{DiningTable, Order, OrderStatus, Payment, PaymentMethod};
use shared::util::now_millis;
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const PAYMENT_COUNTER: &str = "payment";

/// Single payment request
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: i64,
    /// Must match the order total within 0.01
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

/// How receipts are printed for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceiptMode {
    /// One receipt per order
    #[default]
    PerOrder,
    /// One receipt listing every item with combined totals
    Merged,
}

/// Batch payment request
#[derive(Debug, Clone)]
pub struct BatchPayment {
    pub order_ids: Vec<i64>,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub receipt_mode: ReceiptMode,
}

/// Committed batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub payments: Vec<Payment>,
    /// Sum of the paid order totals
    pub total_amount: Decimal,
    pub paid_count: usize,
    /// Tables freed by this batch
    pub released_tables: Vec<i64>,
}

/// Payment processor
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    store: Store,
    printer: PrintService,
}

impl PaymentProcessor {
    pub fn new(store: Store, printer: PrintService) -> Self {
        Self { store, printer }
    }

    /// Pay one order in full
    #[instrument(skip(self, req), fields(order_id = req.order_id, method = req.method.as_str()))]
    pub fn pay(&self, req: PaymentRequest) -> ManagerResult<Payment> {
        if req.amount.is_sign_negative() && !req.amount.is_zero() {
            return Err(ManagerError::InvalidInput(format!(
                "Payment amount must be non-negative, got {}",
                req.amount
            )));
        }

        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, req.order_id)?
            .ok_or(ManagerError::OrderNotFound(req.order_id))?;

        if let Some(reason) = self.payable(&txn, &order)? {
            return Err(reason);
        }
        if !money_eq(round_money(req.amount), order.total) {
            return Err(ManagerError::AmountMismatch {
                order_id: order.id,
                expected: order.total,
                submitted: req.amount,
            });
        }

        let now = now_millis();
        let (payment, _) = self.record_payment(&txn, &mut order, req.method, req.reference, now)?;
        self.store.commit(txn)?;

        info!(payment_id = payment.id, amount = %payment.amount, "Payment completed");

        let table_name = self.table_name(order.table_id);
        self.printer.dispatch_receipt(ReceiptData::from_orders(
            std::slice::from_ref(&order),
            vec![payment.id],
            table_name,
            payment.method,
            now,
        ));

        Ok(payment)
    }

    /// Pay several orders at once, all or nothing
    #[instrument(skip(self, req), fields(orders = req.order_ids.len(), method = req.method.as_str()))]
    pub fn pay_batch(&self, req: BatchPayment) -> ManagerResult<BatchOutcome> {
        if req.order_ids.is_empty() {
            return Err(ManagerError::EmptyBatch);
        }
        let mut seen = HashSet::new();
        for id in &req.order_ids {
            if !seen.insert(*id) {
                return Err(ManagerError::DuplicateOrderInBatch(*id));
            }
        }

        let txn = self.store.begin_write()?;

        // Validate everything first, collecting every failure
        let mut orders = Vec::with_capacity(req.order_ids.len());
        let mut failures = Vec::new();
        for &order_id in &req.order_ids {
            let Some(order) = self.store.get_order_txn(&txn, order_id)? else {
                failures.push(BatchFailure {
                    order_id,
                    reason: ManagerError::OrderNotFound(order_id).to_string(),
                });
                continue;
            };
            match self.payable(&txn, &order)? {
                Some(reason) => failures.push(BatchFailure {
                    order_id,
                    reason: reason.to_string(),
                }),
                None => orders.push(order),
            }
        }
        if !failures.is_empty() {
            warn!(failed = failures.len(), "Batch payment rejected");
            return Err(ManagerError::BatchRejected(failures));
        }

        let now = now_millis();
        let mut payments = Vec::with_capacity(orders.len());
        let mut released_tables = Vec::new();
        for order in &mut orders {
            let (payment, released) =
                self.record_payment(&txn, order, req.method, req.reference.clone(), now)?;
            if let Some(table) = released {
                released_tables.push(table.id);
            }
            payments.push(payment);
        }
        self.store.commit(txn)?;

        let total_amount: Decimal = payments.iter().map(|p| p.amount).sum();
        info!(
            paid = payments.len(),
            total = %total_amount,
            released = ?released_tables,
            "Batch payment completed"
        );

        self.dispatch_batch_receipts(&orders, &payments, req.method, req.receipt_mode, now);

        Ok(BatchOutcome {
            paid_count: payments.len(),
            payments,
            total_amount,
            released_tables,
        })
    }

    /// Pay every active order on a table as one batch
    pub fn pay_table(
        &self,
        table_id: i64,
        method: PaymentMethod,
        reference: Option<String>,
        receipt_mode: ReceiptMode,
    ) -> ManagerResult<BatchOutcome> {
        if self.store.get_table(table_id)?.is_none() {
            return Err(ManagerError::TableNotFound(table_id));
        }
        let order_ids: Vec<i64> = self
            .store
            .active_orders_for_table(table_id)?
            .iter()
            .map(|o| o.id)
            .collect();

        self.pay_batch(BatchPayment {
            order_ids,
            method,
            reference,
            receipt_mode,
        })
    }

    /// Print a paid order's receipt again
    pub fn reprint_receipt(&self, order_id: i64) -> ManagerResult<Uuid> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))?;
        let payment = self.store.payment_for_order(order_id)?.ok_or_else(|| {
            ManagerError::InvalidInput(format!("Order {} has no payment", order_id))
        })?;

        let mut receipt = ReceiptData::from_orders(
            std::slice::from_ref(&order),
            vec![payment.id],
            self.table_name(order.table_id),
            payment.method,
            payment.created_at,
        );
        receipt.reprint = true;
        Ok(self.printer.dispatch_receipt(receipt))
    }

    pub fn payment_for_order(&self, order_id: i64) -> ManagerResult<Option<Payment>> {
        Ok(self.store.payment_for_order(order_id)?)
    }

    /// Why the order cannot be paid, `None` when it can
    fn payable(&self, txn: &WriteTransaction, order: &Order) -> ManagerResult<Option<ManagerError>> {
        if self.store.payment_for_order_txn(txn, order.id)?.is_some() {
            return Ok(Some(ManagerError::OrderAlreadyPaid(order.id)));
        }
        let reason = match order.status {
            OrderStatus::Paid => Some(ManagerError::OrderAlreadyPaid(order.id)),
            OrderStatus::Cancelled => Some(ManagerError::OrderCancelled(order.id)),
            from if !from.can_transition_to(OrderStatus::Paid) => {
                Some(ManagerError::InvalidTransition {
                    order_id: order.id,
                    from,
                    to: OrderStatus::Paid,
                })
            }
            _ => None,
        };
        Ok(reason)
    }

    /// Insert the payment and move the order to PAID inside `txn`
    ///
    /// Returns the table freed by this payment, if any.
    fn record_payment(
        &self,
        txn: &WriteTransaction,
        order: &mut Order,
        method: PaymentMethod,
        reference: Option<String>,
        now: i64,
    ) -> ManagerResult<(Payment, Option<DiningTable>)> {
        let payment = Payment {
            id: self.store.next_id(txn, PAYMENT_COUNTER)?,
            order_id: order.id,
            amount: order.total,
            method,
            reference,
            created_at: now,
        };
        self.store.insert_payment_txn(txn, &payment)?;
        let released = transition_txn(&self.store, txn, order, OrderStatus::Paid)?;
        self.store
            .append_event(txn, &NotificationEvent::PaymentCompleted(payment.clone()))?;
        Ok((payment, released))
    }

    fn dispatch_batch_receipts(
        &self,
        orders: &[Order],
        payments: &[Payment],
        method: PaymentMethod,
        mode: ReceiptMode,
        paid_at: i64,
    ) {
        match mode {
            ReceiptMode::PerOrder => {
                for (order, payment) in orders.iter().zip(payments) {
                    self.printer.dispatch_receipt(ReceiptData::from_orders(
                        std::slice::from_ref(order),
                        vec![payment.id],
                        self.table_name(order.table_id),
                        method,
                        paid_at,
                    ));
                }
            }
            ReceiptMode::Merged => {
                // first-seen order, each table once
                let mut seen = HashSet::new();
                let mut table_ids: Vec<i64> = orders.iter().map(|o| o.table_id).collect();
                table_ids.retain(|id| seen.insert(*id));
                let table_name = table_ids
                    .iter()
                    .map(|id| self.table_name(*id))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.printer.dispatch_receipt(ReceiptData::from_orders(
                    orders,
                    payments.iter().map(|p| p.id).collect(),
                    table_name,
                    method,
                    paid_at,
                ));
            }
        }
    }

    fn table_name(&self, table_id: i64) -> String {
        match self.store.get_table(table_id) {
            Ok(Some(table)) => table.name,
            Ok(None) => table_id.to_string(),
            Err(e) => {
                warn!(table_id, error = %e, "Failed to load table name for receipt");
                table_id.to_string()
            }
        }
    }
}
