//! Print transport
//!
//! The queue only sees success or failure. Rendering and the device
//! protocol live behind [`PrintTransport`].

use super::registry::{PrinterConnection, PrinterRegistry};
use super::renderer::{KitchenTicketRenderer, ReceiptRenderer, render_test_page};
use super::types::{PrintJob, PrintPayload};
use async_trait::async_trait;
use pos_printer::{PrintError, PrintResult, Printer};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Render-and-send for one job
#[async_trait]
pub trait PrintTransport: Send + Sync {
    async fn send(&self, job: &PrintJob) -> PrintResult<()>;
}

/// ESC/POS over raw TCP, one connection per job
pub struct EscPosTransport {
    registry: Arc<PrinterRegistry>,
    kitchen: KitchenTicketRenderer,
    receipt: ReceiptRenderer,
    width: usize,
    connect_timeout: Duration,
}

impl EscPosTransport {
    pub fn new(registry: Arc<PrinterRegistry>, width: usize) -> Self {
        Self {
            registry,
            kitchen: KitchenTicketRenderer::new(width),
            receipt: ReceiptRenderer::new(width),
            width,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn printer(&self, printer_id: i64) -> PrintResult<Arc<PrinterConnection>> {
        self.registry
            .get(printer_id)
            .ok_or_else(|| PrintError::InvalidConfig(format!("Unknown printer: {}", printer_id)))
    }

    async fn send_to(&self, printer: &PrinterConnection, data: &[u8]) -> PrintResult<()> {
        let adapter = match printer.network_printer(self.connect_timeout) {
            Some(adapter) => adapter?,
            None => {
                return Err(PrintError::Unsupported(format!(
                    "Driver printing not supported: {}",
                    printer.name
                )));
            }
        };

        let result = adapter.print(data).await;
        printer.set_online(result.is_ok());
        result
    }
}

#[async_trait]
impl PrintTransport for EscPosTransport {
    #[instrument(skip(self, job), fields(job_id = %job.id, kind = %job.kind()))]
    async fn send(&self, job: &PrintJob) -> PrintResult<()> {
        let (printer, data) = match &job.payload {
            PrintPayload::KitchenTicket(ticket) => {
                let printer = self.printer(ticket.printer_id)?;
                let data = self.kitchen.render(ticket, &printer.name).build();
                (printer, data)
            }
            PrintPayload::CustomerReceipt(receipt) => {
                // 收银打印机可能稍后才配置好，按离线处理以便重试
                let printer = self
                    .registry
                    .receipt_printer()
                    .ok_or_else(|| PrintError::Offline("No receipt printer configured".into()))?;
                (printer, self.receipt.render(receipt).build())
            }
            PrintPayload::Test { printer_id } => {
                let printer = self.printer(*printer_id)?;
                let data =
                    render_test_page(self.width, &printer.name, shared::util::now_millis()).build();
                (printer, data)
            }
        };

        self.send_to(&printer, &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::types::{KitchenTicket, TicketItem};
    use shared::models::{PrinterConfig, PrinterTransport};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn registry(port: u16, transport: Option<PrinterTransport>) -> Arc<PrinterRegistry> {
        Arc::new(PrinterRegistry::from_configs(vec![PrinterConfig {
            id: 1,
            name: "Hot kitchen".to_string(),
            transport: transport.unwrap_or(PrinterTransport::Network {
                host: "127.0.0.1".to_string(),
                port,
            }),
            category_ids: vec![10],
            is_receipt_printer: false,
            is_active: true,
            sort_order: 0,
        }]))
    }

    fn ticket_job(printer_id: i64) -> PrintJob {
        PrintJob::new(
            PrintPayload::KitchenTicket(KitchenTicket {
                order_id: 5,
                table_name: "A1".to_string(),
                printer_id,
                items: vec![TicketItem {
                    menu_item_id: 1,
                    category_id: 10,
                    name: "Ramen".to_string(),
                    quantity: 1,
                    note: None,
                }],
                created_at: 0,
                reprint: false,
            }),
            3,
        )
    }

    #[tokio::test]
    async fn test_kitchen_ticket_sent_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let registry = registry(port, None);
        let transport = EscPosTransport::new(Arc::clone(&registry), 32);
        transport.send(&ticket_job(1)).await.unwrap();

        let received = server.await.unwrap();
        assert!(String::from_utf8_lossy(&received).contains("Ramen"));
        assert!(registry.get(1).unwrap().is_online());
    }

    #[tokio::test]
    async fn test_unknown_printer_is_permanent() {
        let transport = EscPosTransport::new(registry(9100, None), 32);
        let err = transport.send(&ticket_job(99)).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_driver_printer_unsupported() {
        let transport = EscPosTransport::new(
            registry(
                0,
                Some(PrinterTransport::Driver {
                    driver_name: "EPSON".to_string(),
                }),
            ),
            32,
        );
        let err = transport.send(&ticket_job(1)).await.unwrap_err();
        assert!(matches!(err, PrintError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_receipt_without_receipt_printer_is_retryable() {
        let transport = EscPosTransport::new(registry(9100, None), 32);
        let job = PrintJob::new(
            PrintPayload::CustomerReceipt(crate::printing::types::ReceiptData::from_orders(
                &[],
                vec![],
                "A1",
                shared::models::PaymentMethod::Cash,
                0,
            )),
            3,
        );
        let err = transport.send(&job).await.unwrap_err();
        assert!(matches!(err, PrintError::Offline(_)));
        assert!(!err.is_permanent());
    }
}
