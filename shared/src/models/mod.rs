//! Data models

pub mod category;
pub mod dining_table;
pub mod menu_item;
pub mod order;
pub mod payment;
pub mod printer;

pub use category::Category;
pub use dining_table::{DiningTable, TableStatus};
pub use menu_item::MenuItem;
pub use order::{Order, OrderItem, OrderStatus};
pub use payment::{Payment, PaymentMethod};
pub use printer::{PrinterConfig, PrinterTransport};
