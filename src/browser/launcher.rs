use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chromiumoxide::handler::Handler;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// 持久化用户目录（登录状态跨次保留）
    pub profile_dir: PathBuf,
    /// 固定的浏览器可执行文件；None 时由 chromiumoxide 自动查找
    pub executable: Option<PathBuf>,
}

/// 启动带界面的浏览器
///
/// 使用持久化用户目录，并关闭 `AutomationControlled` 特征。
pub async fn launch_browser(options: &LaunchOptions) -> Result<(Browser, Handler)> {
    std::fs::create_dir_all(&options.profile_dir).with_context(|| {
        format!("无法创建浏览器用户目录: {}", options.profile_dir.display())
    })?;
    let profile_dir = std::path::absolute(&options.profile_dir)
        .unwrap_or_else(|_| options.profile_dir.clone());
    cleanup_profile_locks(&profile_dir);

    let mut builder = BrowserConfig::builder()
        .with_head()
        .viewport(None)
        .user_data_dir(&profile_dir)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-notifications")
        .arg("--disable-infobars")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");
    if let Some(executable) = &options.executable {
        debug!("使用固定浏览器: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, handler) = Browser::launch(config).await.context("启动浏览器失败")?;
    info!("🚀 浏览器已启动 (用户目录: {})", profile_dir.display());
    Ok((browser, handler))
}

/// 在后台处理浏览器事件，连接断开时结束
pub fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
        debug!("浏览器事件循环已结束");
    })
}

/// 上次异常退出留下的用户目录锁
fn cleanup_profile_locks(profile_dir: &Path) {
    for name in ["SingletonLock", "SingletonSocket", "SingletonCookie"] {
        let path = profile_dir.join(name);
        if path.exists() || path.is_symlink() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("已清理用户目录锁: {}", path.display()),
                Err(e) => warn!("清理用户目录锁失败 {}: {}", path.display(), e),
            }
        }
    }
}
