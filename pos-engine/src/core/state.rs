use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::notify::{BroadcastNotifier, OutboxDispatcher};
use crate::orders::OrderManager;
use crate::payments::PaymentProcessor;
use crate::printing::{
    EscPosTransport, FallbackSink, FileFallbackSink, PrintQueue, PrintService, PrintTransport,
    PrinterRegistry, RoutingAvailability,
};
use crate::store::{StorageError, Store};

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to prepare work directory {path}: {source}")]
    WorkDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 引擎状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | store | redb 存储 (订单、支付、发件箱) |
/// | registry | 打印机注册表 (分类 → 打印机) |
/// | printer | 打印派发 (单 worker 队列) |
/// | orders | 订单生命周期 |
/// | payments | 支付处理 |
/// | notifier | 通知广播 |
/// | fallback | 降级小票目录 |
///
/// Clone 只复制引用。
#[derive(Clone)]
pub struct EngineState {
    pub config: Config,
    pub store: Store,
    pub registry: Arc<PrinterRegistry>,
    pub printer: PrintService,
    pub orders: OrderManager,
    pub payments: PaymentProcessor,
    pub notifier: Arc<BroadcastNotifier>,
    pub fallback: Arc<FileFallbackSink>,
}

impl EngineState {
    /// 初始化引擎状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 数据库 (work_dir/pos.redb)
    /// 3. 打印机注册表 (旧 schema 时报告 FeatureUnavailable)
    /// 4. 打印队列、订单、支付、通知
    pub fn initialize(config: &Config) -> Result<Self, InitError> {
        std::fs::create_dir_all(&config.work_dir).map_err(|source| InitError::WorkDir {
            path: config.work_dir.display().to_string(),
            source,
        })?;

        let store = Store::open(config.database_path())?;
        let caps = store.capabilities();
        tracing::info!(
            schema_version = caps.schema_version,
            printer_routing = caps.printer_routing,
            path = %config.database_path().display(),
            "Database opened"
        );

        Ok(Self::with_store(config, store))
    }

    /// 使用已打开的存储组装服务
    pub fn with_store(config: &Config, store: Store) -> Self {
        let registry = Arc::new(PrinterRegistry::new());
        match registry.reload(&store) {
            Ok(RoutingAvailability::Ready) => {}
            Ok(RoutingAvailability::FeatureUnavailable { schema_version }) => {
                tracing::warn!(
                    schema_version,
                    "Printer routing unavailable on this schema, kitchen tickets disabled"
                );
            }
            Err(e) => tracing::error!(error = %e, "Failed to load printers"),
        }

        let transport = EscPosTransport::new(Arc::clone(&registry), config.receipt_width)
            .with_connect_timeout(Duration::from_millis(config.printer_connect_timeout_ms));
        let fallback = Arc::new(FileFallbackSink::new(
            config.fallback_dir(),
            config.receipt_width,
        ));
        let queue = PrintQueue::new(
            config.print_queue_config(),
            Arc::new(transport) as Arc<dyn PrintTransport>,
            Arc::clone(&fallback) as Arc<dyn FallbackSink>,
            store.clone(),
        );
        let printer = PrintService::new(queue, Arc::clone(&registry));

        Self {
            config: config.clone(),
            orders: OrderManager::new(store.clone(), printer.clone()),
            payments: PaymentProcessor::new(store.clone(), printer.clone()),
            notifier: Arc::new(BroadcastNotifier::default()),
            store,
            registry,
            printer,
            fallback,
        }
    }

    pub fn outbox_dispatcher(&self) -> OutboxDispatcher {
        OutboxDispatcher::new(
            self.store.clone(),
            self.notifier.clone(),
            self.config.dispatcher_config(),
        )
    }

    /// 启动后台任务：通知发件箱 + 打印机探测
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let dispatcher = self.outbox_dispatcher();
        tasks.spawn(
            "outbox_dispatcher",
            TaskKind::Worker,
            dispatcher.run(tasks.shutdown_token()),
        );

        let probe = printer_probe(
            self.store.clone(),
            Arc::clone(&self.registry),
            Duration::from_millis(self.config.printer_probe_interval_ms.max(1000)),
            tasks.shutdown_token(),
        );
        tasks.spawn("printer_probe", TaskKind::Periodic, probe);

        tracing::info!("Background tasks registered: {}", tasks.len());
        tasks
    }
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineState")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// 定时刷新打印机配置并探测在线状态
async fn printer_probe(
    store: Store,
    registry: Arc<PrinterRegistry>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = registry.reload(&store) {
                    tracing::error!(error = %e, "Failed to reload printers");
                }
                let online = registry.probe_all().await;
                tracing::debug!(online, total = registry.printers().len(), "Printer probe finished");
            }
            _ = shutdown.cancelled() => {
                tracing::info!("Printer probe received shutdown signal");
                return;
            }
        }
    }
}
