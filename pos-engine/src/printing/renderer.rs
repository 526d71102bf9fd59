//! Ticket and receipt renderers
//!
//! Both return the [`EscPosBuilder`] so callers can take either the byte
//! stream for a printer or the plain text mirror for a fallback document.

use super::types::{KitchenTicket, ReceiptData};
use pos_printer::{EscPosBuilder, truncate};
use rust_decimal::Decimal;
use shared::util::format_millis;

/// Kitchen ticket renderer (no prices)
#[derive(Debug, Clone)]
pub struct KitchenTicketRenderer {
    width: usize,
}

impl KitchenTicketRenderer {
    /// Common widths: 32 (58mm paper), 48 (80mm paper)
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn render(&self, ticket: &KitchenTicket, station: &str) -> EscPosBuilder {
        let mut b = EscPosBuilder::new(self.width);

        // Header: table name (large, centered) + station + time
        b.center().double_size().bold();
        b.line(&ticket.table_name);
        b.bold_off().reset_size();
        b.line(station);
        b.line(&format!("#{}  {}", ticket.order_id, format_millis(ticket.created_at)));
        b.left().sep_double();

        for item in &ticket.items {
            let qty = format!("x{}", item.quantity);
            let name_width = self.width.saturating_sub(qty.len() + 1);
            b.double_size();
            b.line_lr(&truncate(&item.name, name_width), &qty);
            b.reset_size();

            if let Some(note) = item.note.as_deref()
                && !note.is_empty()
            {
                b.bold();
                b.line(&format!("  * {}", note));
                b.bold_off();
            }
        }
        b.sep_single();

        if ticket.reprint {
            b.center().bold();
            b.line("*** REPRINT ***");
            b.bold_off().left();
        }

        b.feed(3).cut();
        b
    }
}

impl Default for KitchenTicketRenderer {
    fn default() -> Self {
        Self::new(48)
    }
}

/// Customer receipt renderer
#[derive(Debug, Clone)]
pub struct ReceiptRenderer {
    width: usize,
}

impl ReceiptRenderer {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn render(&self, receipt: &ReceiptData) -> EscPosBuilder {
        let mut b = EscPosBuilder::new(self.width);

        b.center().double_size().bold();
        b.line("RECEIPT");
        b.bold_off().reset_size();
        b.line(&format!("Table {}", receipt.table_name));
        b.line(&format_millis(receipt.paid_at));
        b.left().sep_double();

        let ids = |ids: &[i64]| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        b.line(&format!("Order: {}", ids(&receipt.order_ids)));
        b.line(&format!("Payment: {}", ids(&receipt.payment_ids)));
        b.sep_single();

        for line in &receipt.lines {
            let amount = if line.included_in_buffet {
                "incl.".to_string()
            } else {
                money(line.line_total)
            };
            let label = format!("{} x {}", line.quantity, line.name);
            let label_width = self.width.saturating_sub(amount.len() + 1);
            b.line_lr(&truncate(&label, label_width), &amount);
        }
        b.sep_single();

        b.line_lr("Subtotal", &money(receipt.subtotal));
        if !receipt.tax.is_zero() {
            b.line_lr("Tax", &money(receipt.tax));
        }
        if !receipt.discount.is_zero() {
            b.line_lr("Discount", &format!("-{}", money(receipt.discount)));
        }
        if !receipt.service_charge.is_zero() {
            b.line_lr("Service charge", &money(receipt.service_charge));
        }
        if !receipt.tip.is_zero() {
            b.line_lr("Tip", &money(receipt.tip));
        }
        b.bold();
        b.line_lr("TOTAL", &money(receipt.total));
        b.bold_off();
        b.line_lr("Paid by", receipt.method.as_str());

        if receipt.reprint {
            b.newline().center();
            b.line("*** COPY ***");
            b.left();
        }

        b.feed(3).cut();
        b
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(48)
    }
}

/// Connectivity test page
pub fn render_test_page(width: usize, printer_name: &str, now: i64) -> EscPosBuilder {
    let mut b = EscPosBuilder::new(width);
    b.center().bold();
    b.line("PRINTER TEST");
    b.bold_off();
    b.line(printer_name);
    b.line(&format_millis(now));
    b.left().feed(3).cut();
    b
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}
