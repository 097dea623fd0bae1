//! 日志初始化
//!
//! 两个输出：终端（带时间和级别）和内存缓冲（只有消息本身，供控制面拉取）。

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::utils::log_buffer::LogBuffer;

/// 初始化全局日志，返回内存日志缓冲
///
/// 未设置 `RUST_LOG` 时默认 `info`，`verbose` 为 true 时默认 `debug`。
/// 重复初始化时保留已有的全局订阅者。
pub fn init(verbose: bool) -> LogBuffer {
    let buffer = LogBuffer::default();
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer().with_target(false);
    let memory = fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_level(false)
        .with_writer(buffer.clone());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(memory)
        .try_init();
    buffer
}
