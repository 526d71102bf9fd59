//! Shared fixtures for unit tests

use crate::printing::{
    FallbackDocument, FallbackError, FallbackSink, PrintJob, PrintPayload, PrintQueue,
    PrintQueueConfig, PrintService, PrintTransport, PrinterRegistry, ReceiptData,
};
use crate::store::Store;
use async_trait::async_trait;
use parking_lot::Mutex;
use pos_printer::{PrintError, PrintResult};
use rust_decimal::Decimal;
use shared::models::{Category, DiningTable, MenuItem, PrinterConfig, PrinterTransport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Records every job; fails all sends while `offline` is set
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<PrintJob>>,
    pub offline: AtomicBool,
}

impl RecordingTransport {
    pub fn kitchen_tickets(&self) -> Vec<crate::printing::KitchenTicket> {
        self.sent
            .lock()
            .iter()
            .filter_map(|job| match &job.payload {
                PrintPayload::KitchenTicket(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn receipts(&self) -> Vec<ReceiptData> {
        self.sent
            .lock()
            .iter()
            .filter_map(|job| match &job.payload {
                PrintPayload::CustomerReceipt(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PrintTransport for RecordingTransport {
    async fn send(&self, job: &PrintJob) -> PrintResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PrintError::Offline("test".into()));
        }
        self.sent.lock().push(job.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub written: Mutex<Vec<ReceiptData>>,
}

#[async_trait]
impl FallbackSink for MemorySink {
    async fn write_receipt(&self, receipt: &ReceiptData) -> Result<FallbackDocument, FallbackError> {
        self.written.lock().push(receipt.clone());
        Ok(FallbackDocument {
            path: "memory".into(),
            order_ids: receipt.order_ids.clone(),
            payment_ids: receipt.payment_ids.clone(),
            pages: 1,
        })
    }
}

pub struct Fixture {
    pub store: Store,
    pub printer: PrintService,
    pub transport: Arc<RecordingTransport>,
    pub sink: Arc<MemorySink>,
}

/// In-memory store seeded with a small menu and two printer stations
///
/// - tables 1 "A1", 2 "A2"
/// - categories 10 drinks, 20 sushi, 100 dinner buffet (25.00), 101 lunch buffet (15.00)
/// - items 1 sake 5.00 (always priced), 2 nigiri 4.50, 3 beer 3.00 (always priced),
///   4 wagyu roll 8.00, 5 unavailable, 6 uni 12.00
/// - printer 1 bar (drinks, receipts), printer 2 sushi counter
pub fn fixture() -> Fixture {
    let store = Store::open_in_memory().unwrap();
    store.upsert_table(&DiningTable::new(1, "A1")).unwrap();
    store.upsert_table(&DiningTable::new(2, "A2")).unwrap();

    store.upsert_category(&Category::new(10, "Drinks")).unwrap();
    store.upsert_category(&Category::new(20, "Sushi")).unwrap();
    store
        .upsert_category(&Category::buffet(100, "Dinner buffet", dec("25.00")))
        .unwrap();
    store
        .upsert_category(&Category::buffet(101, "Lunch buffet", dec("15.00")))
        .unwrap();

    for item in [
        MenuItem::new(1, 10, "Sake", dec("5.00")).always_priced(),
        MenuItem::new(2, 20, "Nigiri", dec("4.50")),
        MenuItem::new(3, 10, "Beer", dec("3.00")).always_priced(),
        MenuItem::new(4, 20, "Wagyu roll", dec("8.00")),
        MenuItem::new(5, 20, "Sold out", dec("1.00")).unavailable(),
        MenuItem::new(6, 20, "Uni", dec("12.00")),
    ] {
        store.upsert_menu_item(&item).unwrap();
    }

    for (id, name, categories, receipt) in [(1, "Bar", vec![10], true), (2, "Sushi", vec![20], false)]
    {
        store
            .upsert_printer(&PrinterConfig {
                id,
                name: name.to_string(),
                transport: PrinterTransport::Network {
                    host: "127.0.0.1".to_string(),
                    port: 9100,
                },
                category_ids: categories,
                is_receipt_printer: receipt,
                is_active: true,
                sort_order: id as i32,
            })
            .unwrap();
    }

    let registry = Arc::new(PrinterRegistry::new());
    registry.reload(&store).unwrap();

    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(MemorySink::default());
    let queue = PrintQueue::new(
        PrintQueueConfig::default(),
        Arc::clone(&transport) as Arc<dyn PrintTransport>,
        Arc::clone(&sink) as Arc<dyn FallbackSink>,
        store.clone(),
    );

    Fixture {
        printer: PrintService::new(queue, registry),
        store,
        transport,
        sink,
    }
}
