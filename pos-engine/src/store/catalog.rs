//! Tables, categories, menu items and printers

use super::{
    CATEGORIES_TABLE, DINING_TABLES_TABLE, MENU_ITEMS_TABLE, PRINTERS_TABLE, Store,
    StorageResult,
};
use redb::WriteTransaction;
use shared::models::{Category, DiningTable, MenuItem, PrinterConfig};
use std::collections::HashMap;

impl Store {
    // ========== Dining tables ==========

    pub fn upsert_table(&self, table: &DiningTable) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_table_txn(&txn, table)?;
        txn.commit()?;
        Ok(())
    }

    pub fn put_table_txn(&self, txn: &WriteTransaction, table: &DiningTable) -> StorageResult<()> {
        Self::put_json(txn, DINING_TABLES_TABLE, table.id, table)
    }

    pub fn get_table(&self, table_id: i64) -> StorageResult<Option<DiningTable>> {
        self.get_json(DINING_TABLES_TABLE, table_id)
    }

    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Option<DiningTable>> {
        Self::get_json_txn(txn, DINING_TABLES_TABLE, table_id)
    }

    pub fn list_tables(&self) -> StorageResult<Vec<DiningTable>> {
        self.list_json(DINING_TABLES_TABLE)
    }

    // ========== Categories ==========

    pub fn upsert_category(&self, category: &Category) -> StorageResult<()> {
        let txn = self.begin_write()?;
        Self::put_json(&txn, CATEGORIES_TABLE, category.id, category)?;
        txn.commit()?;
        Ok(())
    }

    pub fn get_category(&self, category_id: i64) -> StorageResult<Option<Category>> {
        self.get_json(CATEGORIES_TABLE, category_id)
    }

    pub fn get_category_txn(
        &self,
        txn: &WriteTransaction,
        category_id: i64,
    ) -> StorageResult<Option<Category>> {
        Self::get_json_txn(txn, CATEGORIES_TABLE, category_id)
    }

    // ========== Menu items ==========

    pub fn upsert_menu_item(&self, item: &MenuItem) -> StorageResult<()> {
        let txn = self.begin_write()?;
        Self::put_json(&txn, MENU_ITEMS_TABLE, item.id, item)?;
        txn.commit()?;
        Ok(())
    }

    pub fn get_menu_item(&self, item_id: i64) -> StorageResult<Option<MenuItem>> {
        self.get_json(MENU_ITEMS_TABLE, item_id)
    }

    /// Load the referenced menu items; unknown ids are simply absent from the map
    pub fn menu_items_txn(
        &self,
        txn: &WriteTransaction,
        item_ids: impl IntoIterator<Item = i64>,
    ) -> StorageResult<HashMap<i64, MenuItem>> {
        let mut items = HashMap::new();
        for id in item_ids {
            if items.contains_key(&id) {
                continue;
            }
            if let Some(item) = Self::get_json_txn::<MenuItem>(txn, MENU_ITEMS_TABLE, id)? {
                items.insert(id, item);
            }
        }
        Ok(items)
    }

    // ========== Printers (schema v2) ==========

    pub fn upsert_printer(&self, printer: &PrinterConfig) -> StorageResult<()> {
        self.require_printer_routing()?;
        let txn = self.begin_write()?;
        Self::put_json(&txn, PRINTERS_TABLE, printer.id, printer)?;
        txn.commit()?;
        Ok(())
    }

    /// Printers ordered by `(sort_order, id)`, which is the routing priority
    pub fn list_printers(&self) -> StorageResult<Vec<PrinterConfig>> {
        self.require_printer_routing()?;
        let mut printers: Vec<PrinterConfig> = self.list_json(PRINTERS_TABLE)?;
        printers.sort_by_key(|p| (p.sort_order, p.id));
        Ok(printers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::PrinterTransport;

    fn printer(id: i64, sort_order: i32) -> PrinterConfig {
        PrinterConfig {
            id,
            name: format!("P{id}"),
            transport: PrinterTransport::Network {
                host: "127.0.0.1".to_string(),
                port: 9100,
            },
            category_ids: vec![],
            is_receipt_printer: false,
            is_active: true,
            sort_order,
        }
    }

    #[test]
    fn test_catalog_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_table(&DiningTable::new(1, "A1")).unwrap();
        store
            .upsert_category(&Category::buffet(10, "Buffet", Decimal::new(2500, 2)))
            .unwrap();
        store
            .upsert_menu_item(&MenuItem::new(100, 10, "Sushi", Decimal::new(800, 2)))
            .unwrap();

        assert_eq!(store.get_table(1).unwrap().unwrap().name, "A1");
        assert!(store.get_category(10).unwrap().unwrap().is_buffet);
        assert!(store.get_menu_item(999).unwrap().is_none());

        let txn = store.begin_write().unwrap();
        let items = store.menu_items_txn(&txn, [100, 100, 999]).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[&100].name, "Sushi");
    }

    #[test]
    fn test_printers_sorted_by_priority() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_printer(&printer(3, 0)).unwrap();
        store.upsert_printer(&printer(1, 5)).unwrap();
        store.upsert_printer(&printer(2, 0)).unwrap();

        let ids: Vec<i64> = store.list_printers().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
