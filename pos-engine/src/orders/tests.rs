use super::*;
use crate::pricing::{LineInput, PricingError};
use crate::test_support::{Fixture, dec, fixture};
use rust_decimal::Decimal;
use shared::NotificationEvent;
use shared::models::{OrderStatus, TableStatus};

fn manager(f: &Fixture) -> OrderManager {
    OrderManager::new(f.store.clone(), f.printer.clone())
}

fn table_status(f: &Fixture, table_id: i64) -> TableStatus {
    f.store.get_table(table_id).unwrap().unwrap().status
}

/// OCCUPIED iff at least one active order
fn assert_occupancy(f: &Fixture, table_id: i64) {
    let active = f.store.active_orders_for_table(table_id).unwrap();
    assert_eq!(
        table_status(f, table_id) == TableStatus::Occupied,
        !active.is_empty(),
        "table {table_id} occupancy out of sync"
    );
}

fn event_names(f: &Fixture) -> Vec<&'static str> {
    f.store
        .pending_events(100)
        .unwrap()
        .iter()
        .map(|r| r.event.name())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_create_a_la_carte_order() {
    let f = fixture();
    let m = manager(&f);

    let order = m
        .create_order(CreateOrder::a_la_carte(
            1,
            vec![
                LineInput::new(2, 2),
                LineInput::new(1, 1).with_note("warm"),
                LineInput::new(4, 1),
            ],
        ))
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.is_buffet);
    assert_eq!(order.subtotal, dec("22.00"));
    assert_eq!(order.total, order.computed_total());
    assert_eq!(order.items.len(), 3);
    assert!(order.items.iter().all(|i| i.order_id == order.id));
    assert_eq!(table_status(&f, 1), TableStatus::Occupied);
    assert_occupancy(&f, 1);

    assert_eq!(event_names(&f), vec!["order_created", "table_updated"]);

    f.printer.queue().wait_idle().await;
    let tickets = f.transport.kitchen_tickets();
    assert_eq!(tickets.len(), 2);
    let bar = tickets.iter().find(|t| t.printer_id == 1).unwrap();
    assert_eq!(bar.items.len(), 1);
    assert_eq!(bar.items[0].note.as_deref(), Some("warm"));
    let sushi = tickets.iter().find(|t| t.printer_id == 2).unwrap();
    assert_eq!(sushi.items.len(), 2);
    assert_eq!(sushi.table_name, "A1");
}

#[tokio::test(start_paused = true)]
async fn test_first_buffet_order() {
    let f = fixture();
    let m = manager(&f);

    let order = m
        .create_order(CreateOrder::buffet(
            1,
            100,
            4,
            vec![LineInput::new(1, 2), LineInput::new(2, 3)],
        ))
        .unwrap();

    assert!(order.is_buffet);
    assert_eq!(order.buffet_category_id, Some(100));
    assert_eq!(order.party_size, Some(4));
    assert_eq!(order.subtotal, dec("110.00"));
    assert_eq!(order.items[1].unit_price, Decimal::ZERO);
    assert!(order.items[1].included_in_buffet);
    assert_eq!(order.items[0].unit_price, dec("5.00"));
}

#[tokio::test(start_paused = true)]
async fn test_second_order_while_buffet_active() {
    let f = fixture();
    let m = manager(&f);

    m.create_order(CreateOrder::buffet(1, 100, 2, vec![])).unwrap();
    let second = m
        .create_order(CreateOrder::a_la_carte(
            1,
            vec![LineInput::new(3, 1), LineInput::new(4, 2)],
        ))
        .unwrap();

    assert!(!second.is_buffet);
    assert_eq!(second.subtotal, dec("3.00"));
    assert_eq!(second.items[1].unit_price, Decimal::ZERO);
    assert!(second.items[1].included_in_buffet);

    // buffet on another table does not leak
    let other = m
        .create_order(CreateOrder::a_la_carte(2, vec![LineInput::new(4, 2)]))
        .unwrap();
    assert_eq!(other.subtotal, dec("16.00"));
}

#[tokio::test(start_paused = true)]
async fn test_single_buffet_per_table() {
    let f = fixture();
    let m = manager(&f);

    m.create_order(CreateOrder::buffet(1, 100, 2, vec![])).unwrap();

    let err = m
        .create_order(CreateOrder::buffet(1, 101, 2, vec![]))
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::BuffetAlreadyActive {
            table_id: 1,
            active_category: 100
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // same buffet again is an additional order, not charged twice
    let again = m
        .create_order(CreateOrder::buffet(1, 100, 3, vec![LineInput::new(2, 1)]))
        .unwrap();
    assert_eq!(again.subtotal, Decimal::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_validation_failures_leave_no_trace() {
    let f = fixture();
    let m = manager(&f);

    let err = m
        .create_order(CreateOrder::a_la_carte(99, vec![LineInput::new(2, 1)]))
        .unwrap_err();
    assert!(matches!(err, ManagerError::TableNotFound(99)));

    let err = m
        .create_order(CreateOrder::a_la_carte(
            1,
            vec![LineInput::new(2, 1), LineInput::new(5, 1)],
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Pricing(PricingError::MenuItemUnavailable(5))
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = m
        .create_order(CreateOrder::buffet(1, 20, 2, vec![]))
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Pricing(PricingError::CategoryNotBuffet(20))
    ));

    let err = m
        .create_order(CreateOrder::buffet(1, 555, 2, vec![]))
        .unwrap_err();
    assert!(matches!(err, ManagerError::CategoryNotFound(555)));

    assert_eq!(table_status(&f, 1), TableStatus::Free);
    assert!(f.store.active_orders_for_table(1).unwrap().is_empty());
    assert_eq!(f.store.pending_event_count().unwrap(), 0);
    assert!(!f.printer.queue().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_order_without_items_prints_nothing() {
    let f = fixture();
    let m = manager(&f);

    m.create_order(CreateOrder::buffet(1, 100, 2, vec![])).unwrap();
    f.printer.queue().wait_idle().await;
    assert!(f.transport.sent.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transitions() {
    let f = fixture();
    let m = manager(&f);
    let order = m
        .create_order(CreateOrder::a_la_carte(1, vec![LineInput::new(2, 1)]))
        .unwrap();

    let err = m.update_status(order.id, OrderStatus::Paid).unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Paid,
            ..
        }
    ));

    let err = m.update_status(order.id, OrderStatus::Ready).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let updated = m.update_status(order.id, OrderStatus::Preparing).unwrap();
    assert_eq!(updated.status, OrderStatus::Preparing);
    assert_eq!(m.get_order(order.id).unwrap().status, OrderStatus::Preparing);
    assert_occupancy(&f, 1);

    assert!(matches!(
        m.update_status(404, OrderStatus::Preparing),
        Err(ManagerError::OrderNotFound(404))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_releases_table_only_when_last() {
    let f = fixture();
    let m = manager(&f);
    let a = m
        .create_order(CreateOrder::a_la_carte(1, vec![LineInput::new(2, 1)]))
        .unwrap();
    let b = m
        .create_order(CreateOrder::a_la_carte(1, vec![LineInput::new(4, 1)]))
        .unwrap();

    m.cancel_order(a.id).unwrap();
    assert_eq!(table_status(&f, 1), TableStatus::Occupied);
    assert_occupancy(&f, 1);

    m.cancel_order(b.id).unwrap();
    assert_eq!(table_status(&f, 1), TableStatus::Free);
    assert_occupancy(&f, 1);

    let err = m.cancel_order(b.id).unwrap_err();
    assert!(matches!(err, ManagerError::OrderCancelled(_)));

    let events: Vec<_> = f
        .store
        .pending_events(100)
        .unwrap()
        .into_iter()
        .map(|r| r.event)
        .collect();
    assert!(events.contains(&NotificationEvent::OrderCancelled {
        order_id: b.id,
        table_id: 1
    }));
}

#[tokio::test(start_paused = true)]
async fn test_cancelling_paid_order_rejected() {
    let f = fixture();
    let m = manager(&f);
    let order = m
        .create_order(CreateOrder::a_la_carte(1, vec![LineInput::new(2, 1)]))
        .unwrap();
    m.update_status(order.id, OrderStatus::Preparing).unwrap();
    m.update_status(order.id, OrderStatus::Paid).unwrap();
    assert_eq!(table_status(&f, 1), TableStatus::Free);

    let err = m.cancel_order(order.id).unwrap_err();
    assert!(matches!(err, ManagerError::OrderAlreadyPaid(_)));
    assert_eq!(m.get_order(order.id).unwrap().status, OrderStatus::Paid);
}

#[tokio::test(start_paused = true)]
async fn test_reprint_kitchen_ticket() {
    let f = fixture();
    let m = manager(&f);
    let order = m
        .create_order(CreateOrder::a_la_carte(1, vec![LineInput::new(2, 1)]))
        .unwrap();

    let jobs = m.reprint_kitchen_ticket(order.id).unwrap();
    assert_eq!(jobs.len(), 1);
    f.printer.queue().wait_idle().await;

    let tickets = f.transport.kitchen_tickets();
    assert_eq!(tickets.len(), 2);
    assert!(!tickets[0].reprint);
    assert!(tickets[1].reprint);
}

#[tokio::test(start_paused = true)]
async fn test_active_orders_for_unknown_table() {
    let f = fixture();
    let m = manager(&f);
    assert!(matches!(
        m.active_orders_for_table(42),
        Err(ManagerError::TableNotFound(42))
    ));
    assert!(m.active_orders_for_table(1).unwrap().is_empty());
}
