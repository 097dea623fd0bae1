use anyhow::Result;
use srivari_autofill::{logger, BotContext, Config, RunOutcome};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    let logs = logger::init(config.verbose_logging);

    let bot = BotContext::initialize(config, logs).await?;

    if let Err(e) = bot.open_session().await {
        error!("❌ 无法打开浏览器: {}", e);
        return Err(e.into());
    }

    match bot.run_once().await {
        Ok(RunOutcome::Completed) => info!("✅ 团队表单已全部填写"),
        Ok(RunOutcome::Capped { limit }) => info!("✅ 已按团队上限填写 {} 位", limit),
        Ok(RunOutcome::Stopped { next_index }) => {
            info!("⏹ 已停止，下次从第 {} 位继续", next_index)
        }
        Ok(RunOutcome::Empty) => warn!("⚠️ 配置中没有成员"),
        Err(e) => {
            error!("❌ 填表流程失败: {}", e);
            return Err(e.into());
        }
    }

    info!("浏览器保持打开，按 Ctrl+C 退出");
    tokio::signal::ctrl_c().await?;
    bot.close_session().await;
    Ok(())
}
