//! OrderManager - order creation and status lifecycle
//!
//! # Create flow
//!
//! ```text
//! create_order(req)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Load table, active orders, buffet category, menu items
//!     ├─ 3. Price (pure)
//!     ├─ 4. Insert order + items, index by table
//!     ├─ 5. Occupy table
//!     ├─ 6. Append OrderCreated / TableUpdated to the outbox
//!     ├─ 7. Commit
//!     └─ 8. Enqueue kitchen tickets (best effort)
//! ```
//!
//! Every read that decides occupancy or buffet pricing happens inside the
//! same write transaction as the writes depending on it.

use super::error::{ManagerError, ManagerResult};
use crate::pricing::{Adjustments, LineInput, PricingMode, price_order};
use crate::printing::PrintService;
use crate::store::Store;
use redb::WriteTransaction;
use shared::NotificationEvent;
use shared::models::{DiningTable, Order, OrderStatus, TableStatus};
use shared::util::now_millis;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_COUNTER: &str = "order";

/// Requested pricing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    ALaCarte,
    Buffet { category_id: i64, party_size: u32 },
}

/// Create-order request
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub table_id: i64,
    pub mode: OrderMode,
    pub items: Vec<LineInput>,
    pub adjustments: Adjustments,
}

impl CreateOrder {
    pub fn a_la_carte(table_id: i64, items: Vec<LineInput>) -> Self {
        Self {
            table_id,
            mode: OrderMode::ALaCarte,
            items,
            adjustments: Adjustments::default(),
        }
    }

    pub fn buffet(table_id: i64, category_id: i64, party_size: u32, items: Vec<LineInput>) -> Self {
        Self {
            table_id,
            mode: OrderMode::Buffet {
                category_id,
                party_size,
            },
            items,
            adjustments: Adjustments::default(),
        }
    }

    pub fn with_adjustments(mut self, adjustments: Adjustments) -> Self {
        self.adjustments = adjustments;
        self
    }
}

/// Order lifecycle manager
#[derive(Debug, Clone)]
pub struct OrderManager {
    store: Store,
    printer: PrintService,
}

impl OrderManager {
    pub fn new(store: Store, printer: PrintService) -> Self {
        Self { store, printer }
    }

    /// Price and persist a new order, occupying its table
    #[instrument(skip(self, req), fields(table_id = req.table_id))]
    pub fn create_order(&self, req: CreateOrder) -> ManagerResult<Order> {
        let txn = self.store.begin_write()?;

        let mut table = self
            .store
            .get_table_txn(&txn, req.table_id)?
            .ok_or(ManagerError::TableNotFound(req.table_id))?;

        let active = self.store.active_orders_for_table_txn(&txn, table.id)?;
        let active_buffet = active.iter().find(|o| o.is_active_buffet());

        let buffet = match req.mode {
            OrderMode::ALaCarte => None,
            OrderMode::Buffet {
                category_id,
                party_size,
            } => {
                let category = self
                    .store
                    .get_category_txn(&txn, category_id)?
                    .ok_or(ManagerError::CategoryNotFound(category_id))?;
                Some((category, party_size))
            }
        };
        let mode = match &buffet {
            Some((category, party_size)) => PricingMode::Buffet {
                category,
                party_size: *party_size,
            },
            None => PricingMode::ALaCarte,
        };

        let menu = self
            .store
            .menu_items_txn(&txn, req.items.iter().map(|l| l.menu_item_id))?;
        let priced = price_order(
            mode,
            &req.items,
            &menu,
            req.adjustments,
            active_buffet.is_some(),
        )?;

        // 同一桌只允许一种自助餐
        if let (Some((category, _)), Some(running)) = (&buffet, active_buffet)
            && let Some(active_category) = running.buffet_category_id
            && active_category != category.id
        {
            return Err(ManagerError::BuffetAlreadyActive {
                table_id: table.id,
                active_category,
            });
        }

        let order_id = self.store.next_id(&txn, ORDER_COUNTER)?;
        let now = now_millis();
        let order = Order {
            id: order_id,
            table_id: table.id,
            status: OrderStatus::Pending,
            is_buffet: buffet.is_some(),
            buffet_category_id: buffet.as_ref().map(|(c, _)| c.id),
            party_size: buffet.as_ref().map(|(_, p)| *p),
            subtotal: priced.subtotal,
            tax: priced.tax,
            discount: priced.discount,
            service_charge: priced.service_charge,
            tip: priced.tip,
            total: priced.total,
            items: priced
                .lines
                .into_iter()
                .map(|line| line.into_order_item(order_id))
                .collect(),
            created_at: now,
            updated_at: now,
        };

        self.store.put_order_txn(&txn, &order)?;
        self.store
            .append_event(&txn, &NotificationEvent::OrderCreated(order.clone()))?;

        if table.status != TableStatus::Occupied {
            table.status = TableStatus::Occupied;
            self.store.put_table_txn(&txn, &table)?;
            self.store
                .append_event(&txn, &NotificationEvent::TableUpdated(table.clone()))?;
        }

        self.store.commit(txn)?;

        info!(
            order_id,
            total = %order.total,
            items = order.items.len(),
            is_buffet = order.is_buffet,
            "Order created"
        );

        if !order.items.is_empty() {
            self.printer
                .dispatch_kitchen_tickets(&order, &table.name, false);
        }

        Ok(order)
    }

    /// Move an order to `next`, releasing the table when nothing stays active
    #[instrument(skip(self))]
    pub fn update_status(&self, order_id: i64, next: OrderStatus) -> ManagerResult<Order> {
        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))?;

        transition_txn(&self.store, &txn, &mut order, next)?;
        self.store.commit(txn)?;

        info!(order_id, status = %order.status, "Order status updated");
        Ok(order)
    }

    pub fn cancel_order(&self, order_id: i64) -> ManagerResult<Order> {
        self.update_status(order_id, OrderStatus::Cancelled)
    }

    pub fn get_order(&self, order_id: i64) -> ManagerResult<Order> {
        self.store
            .get_order(order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))
    }

    pub fn active_orders_for_table(&self, table_id: i64) -> ManagerResult<Vec<Order>> {
        if self.store.get_table(table_id)?.is_none() {
            return Err(ManagerError::TableNotFound(table_id));
        }
        Ok(self.store.active_orders_for_table(table_id)?)
    }

    /// Print the order's kitchen tickets again, marked as reprint
    pub fn reprint_kitchen_ticket(&self, order_id: i64) -> ManagerResult<Vec<Uuid>> {
        let order = self.get_order(order_id)?;
        if order.status == OrderStatus::Cancelled {
            return Err(ManagerError::OrderCancelled(order_id));
        }
        let table_name = self
            .store
            .get_table(order.table_id)?
            .map(|t| t.name)
            .unwrap_or_default();

        let jobs = self
            .printer
            .dispatch_kitchen_tickets(&order, &table_name, true);
        if jobs.is_empty() {
            warn!(order_id, "Reprint produced no kitchen tickets");
        }
        Ok(jobs)
    }
}

/// Apply a status transition inside an open transaction
///
/// Writes the order, emits its notification and, when `next` is terminal,
/// frees the table if no other order on it is still active. Returns the
/// released table.
pub(crate) fn transition_txn(
    store: &Store,
    txn: &WriteTransaction,
    order: &mut Order,
    next: OrderStatus,
) -> ManagerResult<Option<DiningTable>> {
    if !order.status.can_transition_to(next) {
        return Err(match order.status {
            OrderStatus::Paid => ManagerError::OrderAlreadyPaid(order.id),
            OrderStatus::Cancelled => ManagerError::OrderCancelled(order.id),
            from => ManagerError::InvalidTransition {
                order_id: order.id,
                from,
                to: next,
            },
        });
    }

    order.status = next;
    order.updated_at = now_millis();
    store.put_order_txn(txn, order)?;

    let event = match next {
        OrderStatus::Cancelled => NotificationEvent::OrderCancelled {
            order_id: order.id,
            table_id: order.table_id,
        },
        _ => NotificationEvent::OrderUpdated(order.clone()),
    };
    store.append_event(txn, &event)?;

    if !next.is_terminal() {
        return Ok(None);
    }
    release_table_if_idle(store, txn, order.table_id)
}

/// Free the table when it has no active orders left
pub(crate) fn release_table_if_idle(
    store: &Store,
    txn: &WriteTransaction,
    table_id: i64,
) -> ManagerResult<Option<DiningTable>> {
    if !store.active_orders_for_table_txn(txn, table_id)?.is_empty() {
        return Ok(None);
    }
    let Some(mut table) = store.get_table_txn(txn, table_id)? else {
        warn!(table_id, "Order references missing table");
        return Ok(None);
    };
    if table.status != TableStatus::Occupied {
        return Ok(None);
    }

    table.status = TableStatus::Free;
    store.put_table_txn(txn, &table)?;
    store.append_event(txn, &NotificationEvent::TableUpdated(table.clone()))?;
    info!(table_id, "Table released");
    Ok(Some(table))
}
