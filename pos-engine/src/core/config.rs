use crate::notify::DispatcherConfig;
use crate::printing::PrintQueueConfig;
use std::path::PathBuf;
use std::time::Duration;

/// 引擎配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./pos-data | 工作目录 (数据库、降级小票) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，设置后按天滚动写文件 |
/// | PRINT_MAX_RETRIES | 3 | 每个打印任务的最大尝试次数 |
/// | PRINT_RETRY_BASE_MS | 1000 | 首次重试延迟，之后翻倍 |
/// | PRINT_RETRY_MAX_MS | 30000 | 重试延迟上限 |
/// | PRINT_INTER_JOB_DELAY_MS | 200 | 相邻任务间隔 |
/// | PRINT_JOB_TIMEOUT_MS | 10000 | 单次发送超时 |
/// | PRINTER_CONNECT_TIMEOUT_MS | 3000 | 打印机 TCP 连接超时 |
/// | PRINTER_PROBE_INTERVAL_MS | 60000 | 打印机在线探测周期 |
/// | RECEIPT_WIDTH | 48 | 小票字符宽度 (80mm=48, 58mm=32) |
/// | OUTBOX_SCAN_INTERVAL_MS | 5000 | 通知发件箱兜底扫描周期 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/pos PRINT_MAX_RETRIES=5 cargo run -p pos-engine
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub print_max_retries: u32,
    pub print_retry_base_ms: u64,
    pub print_retry_max_ms: u64,
    pub print_inter_job_delay_ms: u64,
    pub print_job_timeout_ms: u64,
    pub printer_connect_timeout_ms: u64,
    pub printer_probe_interval_ms: u64,
    pub receipt_width: usize,
    pub outbox_scan_interval_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let num = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            work_dir: lookup("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./pos-data")),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()),
            print_max_retries: num("PRINT_MAX_RETRIES", 3).clamp(1, u32::MAX as u64) as u32,
            print_retry_base_ms: num("PRINT_RETRY_BASE_MS", 1000),
            print_retry_max_ms: num("PRINT_RETRY_MAX_MS", 30_000),
            print_inter_job_delay_ms: num("PRINT_INTER_JOB_DELAY_MS", 200),
            print_job_timeout_ms: num("PRINT_JOB_TIMEOUT_MS", 10_000),
            printer_connect_timeout_ms: num("PRINTER_CONNECT_TIMEOUT_MS", 3000),
            printer_probe_interval_ms: num("PRINTER_PROBE_INTERVAL_MS", 60_000),
            receipt_width: num("RECEIPT_WIDTH", 48) as usize,
            outbox_scan_interval_ms: num("OUTBOX_SCAN_INTERVAL_MS", 5000),
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::from_lookup(|_| None);
        config.work_dir = work_dir.into();
        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.work_dir.join("pos.redb")
    }

    pub fn fallback_dir(&self) -> PathBuf {
        self.work_dir.join("fallback_receipts")
    }

    pub fn print_queue_config(&self) -> PrintQueueConfig {
        PrintQueueConfig {
            max_retries: self.print_max_retries,
            retry_base_delay: Duration::from_millis(self.print_retry_base_ms),
            retry_max_delay: Duration::from_millis(self.print_retry_max_ms),
            inter_job_delay: Duration::from_millis(self.print_inter_job_delay_ms),
            job_timeout: Duration::from_millis(self.print_job_timeout_ms),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            scan_interval: Duration::from_millis(self.outbox_scan_interval_ms.max(1)),
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
