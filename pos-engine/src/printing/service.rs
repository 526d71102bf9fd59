//! Print service
//!
//! Turns orders and payments into print jobs: category routing for kitchen
//! tickets, receipts for paid orders, and test pages.

use super::queue::PrintQueue;
use super::registry::{PrinterRegistry, RoutingAvailability};
use super::types::{KitchenTicket, PrintPayload, ReceiptData, TicketItem};
use shared::models::Order;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PrintQueueError {
    #[error("Printer not found: {0}")]
    UnknownPrinter(i64),

    #[error("Printer routing unavailable in schema v{0}")]
    FeatureUnavailable(u64),
}

/// Group an order's items into one ticket per responsible printer
///
/// Tickets come out in printer id order, items keep their order position.
/// Items whose category has no printer are skipped with a warning.
pub fn route_kitchen_ticket(
    order: &Order,
    table_name: &str,
    registry: &PrinterRegistry,
) -> Vec<KitchenTicket> {
    let mut by_printer: BTreeMap<i64, Vec<TicketItem>> = BTreeMap::new();

    for item in &order.items {
        match registry.responsible_printer(item.category_id) {
            Some(printer_id) => by_printer.entry(printer_id).or_default().push(TicketItem {
                menu_item_id: item.menu_item_id,
                category_id: item.category_id,
                name: item.name.clone(),
                quantity: item.quantity,
                note: item.note.clone(),
            }),
            None => tracing::warn!(
                order_id = order.id,
                menu_item_id = item.menu_item_id,
                category_id = item.category_id,
                "No printer responsible for category, item skipped"
            ),
        }
    }

    by_printer
        .into_iter()
        .map(|(printer_id, items)| KitchenTicket {
            order_id: order.id,
            table_name: table_name.to_string(),
            printer_id,
            items,
            created_at: order.created_at,
            reprint: false,
        })
        .collect()
}

/// Entry point for everything that wants something printed
#[derive(Debug, Clone)]
pub struct PrintService {
    queue: PrintQueue,
    registry: Arc<PrinterRegistry>,
}

impl PrintService {
    pub fn new(queue: PrintQueue, registry: Arc<PrinterRegistry>) -> Self {
        Self { queue, registry }
    }

    pub fn queue(&self) -> &PrintQueue {
        &self.queue
    }

    pub fn registry(&self) -> &Arc<PrinterRegistry> {
        &self.registry
    }

    /// Enqueue one kitchen ticket per responsible printer
    pub fn dispatch_kitchen_tickets(
        &self,
        order: &Order,
        table_name: &str,
        reprint: bool,
    ) -> Vec<Uuid> {
        if let RoutingAvailability::FeatureUnavailable { schema_version } =
            self.registry.availability()
        {
            tracing::warn!(
                order_id = order.id,
                schema_version,
                "Kitchen tickets skipped, printer routing unavailable"
            );
            return Vec::new();
        }

        route_kitchen_ticket(order, table_name, &self.registry)
            .into_iter()
            .map(|mut ticket| {
                ticket.reprint = reprint;
                self.queue.submit(PrintPayload::KitchenTicket(ticket))
            })
            .collect()
    }

    pub fn dispatch_receipt(&self, receipt: ReceiptData) -> Uuid {
        self.queue.submit(PrintPayload::CustomerReceipt(receipt))
    }

    /// Test page for one printer
    pub fn dispatch_test(&self, printer_id: i64) -> Result<Uuid, PrintQueueError> {
        if let RoutingAvailability::FeatureUnavailable { schema_version } =
            self.registry.availability()
        {
            return Err(PrintQueueError::FeatureUnavailable(schema_version));
        }
        if self.registry.get(printer_id).is_none() {
            return Err(PrintQueueError::UnknownPrinter(printer_id));
        }
        Ok(self.queue.submit(PrintPayload::Test { printer_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{OrderItem, OrderStatus, PrinterConfig, PrinterTransport};

    fn printer(id: i64, categories: Vec<i64>) -> PrinterConfig {
        PrinterConfig {
            id,
            name: format!("Station {id}"),
            transport: PrinterTransport::Network {
                host: "127.0.0.1".to_string(),
                port: 9100,
            },
            category_ids: categories,
            is_receipt_printer: false,
            is_active: true,
            sort_order: 0,
        }
    }

    fn item(menu_item_id: i64, category_id: i64) -> OrderItem {
        OrderItem {
            order_id: 1,
            menu_item_id,
            category_id,
            name: format!("Item {menu_item_id}"),
            quantity: 1,
            unit_price: Decimal::ONE,
            included_in_buffet: false,
            note: None,
        }
    }

    fn order(items: Vec<OrderItem>) -> Order {
        Order {
            id: 1,
            table_id: 1,
            status: OrderStatus::Pending,
            is_buffet: false,
            buffet_category_id: None,
            party_size: None,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            service_charge: Decimal::ZERO,
            tip: Decimal::ZERO,
            total: Decimal::ZERO,
            items,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_three_items_two_stations() {
        let registry =
            PrinterRegistry::from_configs(vec![printer(1, vec![10]), printer(2, vec![20])]);
        let order = order(vec![item(100, 10), item(200, 20), item(101, 10)]);

        let tickets = route_kitchen_ticket(&order, "A1", &registry);
        assert_eq!(tickets.len(), 2);

        assert_eq!(tickets[0].printer_id, 1);
        let ids: Vec<i64> = tickets[0].items.iter().map(|i| i.menu_item_id).collect();
        assert_eq!(ids, vec![100, 101]);

        assert_eq!(tickets[1].printer_id, 2);
        let ids: Vec<i64> = tickets[1].items.iter().map(|i| i.menu_item_id).collect();
        assert_eq!(ids, vec![200]);
    }

    #[test]
    fn test_unmapped_category_is_skipped() {
        let registry = PrinterRegistry::from_configs(vec![printer(1, vec![10])]);
        let order = order(vec![item(100, 10), item(300, 30)]);

        let tickets = route_kitchen_ticket(&order, "A1", &registry);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].items.len(), 1);
        assert_eq!(tickets[0].items[0].menu_item_id, 100);
    }

    #[test]
    fn test_no_items_no_tickets() {
        let registry = PrinterRegistry::from_configs(vec![printer(1, vec![10])]);
        assert!(route_kitchen_ticket(&order(vec![]), "A1", &registry).is_empty());
    }
}
