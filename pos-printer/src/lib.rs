//! # pos-printer
//!
//! Thermal printer plumbing - HOW bytes reach a device, never WHAT is printed.
//!
//! ## Scope
//!
//! - ESC/POS text building (alignment, emphasis, separators, cut)
//! - A plain-text mirror of everything built, for file fallbacks and logs
//! - Network printing (raw TCP, port 9100), one connection per job
//!
//! Ticket and receipt layout stays in `pos-engine`.
//!
//! ## Example
//!
//! ```ignore
//! use pos_printer::{EscPosBuilder, NetworkPrinter, Printer};
//!
//! let mut b = EscPosBuilder::new(48);
//! b.center().double_size().line("KITCHEN").reset_size();
//! b.left().sep_double().line_lr("2 x Ramen", "T4");
//! b.cut();
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.print(&b.build()).await?;
//! ```

mod error;
mod escpos;
mod printer;
mod text;

// Re-exports
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosBuilder;
pub use printer::{DEFAULT_PORT, NetworkPrinter, Printer};
pub use text::{display_width, pad, truncate};
