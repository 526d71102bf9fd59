//! POS Engine - 订单与支付事务引擎，异步打印派发
//!
//! # 模块结构
//!
//! ```text
//! pos-engine/src/
//! ├── core/       # 配置、状态、后台任务
//! ├── store/      # redb 存储 (目录、订单、支付、发件箱)
//! ├── pricing/    # 单点 / 自助餐计价 (纯函数)
//! ├── orders/     # 订单生命周期、桌台占用
//! ├── payments/   # 单笔 / 批量支付
//! ├── printing/   # 打印队列、路由、渲染、降级小票
//! ├── notify/     # 通知发件箱与广播
//! └── utils/      # 日志
//! ```
//!
//! # 数据流
//!
//! ```text
//! create_order / pay ──▶ write txn (state + outbox) ──commit──┬──▶ PrintQueue ──▶ printer
//!                                                             │        └─ exhausted ─▶ fallback file
//!                                                             └──▶ OutboxDispatcher ──▶ Notifier
//! ```

pub mod core;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod printing;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export 公共类型
pub use crate::core::{Config, EngineState, InitError};
pub use notify::{BroadcastNotifier, Notifier, OutboxDispatcher};
pub use orders::{CreateOrder, ErrorKind, ManagerError, ManagerResult, OrderManager, OrderMode};
pub use payments::{BatchOutcome, BatchPayment, PaymentProcessor, PaymentRequest, ReceiptMode};
pub use pricing::{Adjustments, LineInput, PricingError};
pub use printing::{PrintQueue, PrintQueueConfig, PrintService};
pub use store::{StorageError, Store};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
