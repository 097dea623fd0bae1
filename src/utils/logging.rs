/// 日志工具模块
///
/// 提供启动横幅、运行开始/结束摘要等格式化输出
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Srivari Seva 团队表单自动填写");
    info!("📄 预约配置: {}", config.booking_config_path.display());
    info!("📌 断点文件: {}", config.checkpoint_path.display());
    info!("🌐 目标页面: {}", config.target_url);
    info!("{}", "=".repeat(60));
}

/// 记录一次运行的开始
///
/// # 参数
/// - `configured`: 配置中的成员总数
/// - `total`: 本次实际要填写的人数（已按团队上限截断）
/// - `resume`: 断点位置
pub fn log_run_start(configured: usize, total: usize, resume: Option<usize>) {
    info!("\n{}", "=".repeat(60));
    info!("📋 开始填写: 共 {} 位成员，本次填写 {} 位", configured, total);
    if total < configured {
        info!("📏 团队人数上限: {}", total);
    }
    match resume {
        Some(next) => info!("📌 断点: 第 {} 位", next),
        None => info!("📌 无断点，从领队开始"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录一次运行的结果
pub fn log_run_summary(outcome: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束: {}", outcome);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
