//! Orders, the table index and payments

use super::{
    ORDERS_BY_TABLE_TABLE, ORDERS_TABLE, PAYMENT_BY_ORDER_TABLE, PAYMENTS_TABLE, Store,
    StorageResult,
};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use shared::models::{Order, Payment};

impl Store {
    // ========== Orders ==========

    /// Insert or overwrite an order and index it under its table
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        Self::put_json(txn, ORDERS_TABLE, order.id, order)?;
        let mut index = txn.open_table(ORDERS_BY_TABLE_TABLE)?;
        index.insert((order.table_id, order.id), ())?;
        Ok(())
    }

    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        self.get_json(ORDERS_TABLE, order_id)
    }

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<Order>> {
        Self::get_json_txn(txn, ORDERS_TABLE, order_id)
    }

    /// All orders on a table, oldest first
    pub fn orders_for_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Vec<Order>> {
        let ids: Vec<i64> = {
            let index = txn.open_table(ORDERS_BY_TABLE_TABLE)?;
            let mut ids = Vec::new();
            for entry in index.range((table_id, i64::MIN)..=(table_id, i64::MAX))? {
                let (key, _) = entry?;
                ids.push(key.value().1);
            }
            ids
        };

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.get_order_txn(txn, id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Non-terminal orders on a table, read inside the transaction
    pub fn active_orders_for_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Vec<Order>> {
        let mut orders = self.orders_for_table_txn(txn, table_id)?;
        orders.retain(Order::is_active);
        Ok(orders)
    }

    pub fn active_orders_for_table(&self, table_id: i64) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDERS_BY_TABLE_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for entry in index.range((table_id, i64::MIN)..=(table_id, i64::MAX))? {
            let (key, _) = entry?;
            let order_id = key.value().1;
            if let Some(guard) = orders_table.get(order_id)? {
                let order: Order = serde_json::from_slice(guard.value())?;
                if order.is_active() {
                    orders.push(order);
                }
            }
        }
        Ok(orders)
    }

    // ========== Payments ==========

    /// Payment id already recorded for the order, if any
    pub fn payment_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(PAYMENT_BY_ORDER_TABLE)?;
        Ok(table.get(order_id)?.map(|g| g.value()))
    }

    /// Insert a payment and claim its order in the unique index
    ///
    /// Callers check [`Store::payment_for_order_txn`] first; this never
    /// overwrites an existing claim.
    pub fn insert_payment_txn(&self, txn: &WriteTransaction, payment: &Payment) -> StorageResult<()> {
        Self::put_json(txn, PAYMENTS_TABLE, payment.id, payment)?;
        let mut index = txn.open_table(PAYMENT_BY_ORDER_TABLE)?;
        index.insert(payment.order_id, payment.id)?;
        Ok(())
    }

    pub fn get_payment(&self, payment_id: i64) -> StorageResult<Option<Payment>> {
        self.get_json(PAYMENTS_TABLE, payment_id)
    }

    pub fn payment_for_order(&self, order_id: i64) -> StorageResult<Option<Payment>> {
        let payment_id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(PAYMENT_BY_ORDER_TABLE)?;
            index.get(order_id)?.map(|g| g.value())
        };
        match payment_id {
            Some(id) => self.get_payment(id),
            None => Ok(None),
        }
    }

    pub fn list_payments(&self) -> StorageResult<Vec<Payment>> {
        self.list_json(PAYMENTS_TABLE)
    }
}
