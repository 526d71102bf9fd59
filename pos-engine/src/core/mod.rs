//! 核心：配置、状态、后台任务

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::{EngineState, InitError};
pub use tasks::{BackgroundTasks, TaskKind};
