use anyhow::Context;
use pos_engine::{Config, EngineState, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(work_dir = %config.work_dir.display(), "POS engine starting...");

    // 2. 初始化引擎状态
    let state = EngineState::initialize(&config).context("Failed to initialize engine")?;

    // 3. 后台任务
    let tasks = state.start_background_tasks();

    tracing::info!(
        printers = state.registry.printers().len(),
        pending_events = state.store.pending_event_count().unwrap_or(0),
        "POS engine ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    state.printer.queue().wait_idle().await;

    tracing::info!("POS engine stopped");
    Ok(())
}
