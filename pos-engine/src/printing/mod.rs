//! Print dispatch
//!
//! - Kitchen tickets: routed by category, one ticket per station
//! - Customer receipts: after payment, with a file fallback when the
//!   printer never takes them
//! - Test pages: connectivity check for a single printer

pub mod fallback;
pub mod queue;
pub mod registry;
pub mod renderer;
pub mod service;
pub mod transport;
pub mod types;

pub use fallback::{FallbackDocument, FallbackError, FallbackSink, FileFallbackSink};
pub use queue::{PrintQueue, PrintQueueStats};
pub use registry::{PrinterConnection, PrinterRegistry, RoutingAvailability};
pub use renderer::{KitchenTicketRenderer, ReceiptRenderer};
pub use service::{PrintQueueError, PrintService, route_kitchen_ticket};
pub use transport::{EscPosTransport, PrintTransport};
pub use types::*;
