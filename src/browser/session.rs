//! 浏览器会话控制
//!
//! 会话是唯一的稀缺资源：同一时间只有一个，由 [`SessionController`] 持有，
//! 其他组件只拿到 `Arc<dyn FormPage>` 引用。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::handler::Handler;
use chromiumoxide::Browser;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::connection::{attach_to_browser, find_or_open_page};
use crate::browser::launcher::{launch_browser, spawn_handler, LaunchOptions};
use crate::browser::page_setup::{
    arrange_window, install_stealth, intercept_file_chooser, set_download_dir,
};
use crate::config::Config;
use crate::error::{AppResult, SessionError};
use crate::infrastructure::{FormPage, JsExecutor};
use crate::utils::logging::truncate_text;

/// 一个打开的会话
struct ActiveSession {
    page: Arc<dyn FormPage>,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
}

/// 会话控制器
pub struct SessionController {
    config: Config,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active: Mutex::new(None),
        }
    }

    /// 打开浏览器会话；已经打开时什么都不做
    ///
    /// 依次尝试：固定版本浏览器 → 自动查找的浏览器 → 附加到调试端口上的浏览器。
    /// 单次失败只记录日志，全部失败才返回 [`SessionError::AcquisitionExhausted`]。
    pub async fn open(&self, download_dir: Option<PathBuf>) -> AppResult<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            info!("浏览器已经打开");
            return Ok(());
        }

        info!("🌐 正在打开浏览器...");
        let (browser, handler) = self.acquire().await?;
        let handler = spawn_handler(handler);

        let page = match self.prepare(&browser, download_dir).await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(SessionError::AcquisitionExhausted {
                    attempts: vec![format!("页面准备失败: {}", truncate_text(&e.to_string(), 100))],
                }
                .into());
            }
        };

        *active = Some(ActiveSession {
            page,
            browser: Some(browser),
            handler: Some(handler),
        });
        info!("✅ 浏览器已打开，请手动登录并进入 Srivari Seva 领队信息页面");
        Ok(())
    }

    /// 使用外部提供的页面作为当前会话（替换已有会话）
    pub async fn adopt(&self, page: Arc<dyn FormPage>) {
        let previous = self.active.lock().await.replace(ActiveSession {
            page,
            browser: None,
            handler: None,
        });
        if let Some(previous) = previous {
            shutdown(previous).await;
        }
    }

    /// 关闭会话；无论关闭是否成功，会话都标记为不存在
    pub async fn close(&self) {
        let previous = self.active.lock().await.take();
        match previous {
            Some(session) => {
                shutdown(session).await;
                info!("🔒 浏览器已关闭");
            }
            None => info!("浏览器未打开"),
        }
    }

    /// 会话已丢失（例如用户手动关闭了浏览器），只做标记
    pub async fn mark_lost(&self) {
        if let Some(session) = self.active.lock().await.take() {
            if let Some(handler) = session.handler {
                handler.abort();
            }
        }
    }

    pub async fn is_open(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// 当前页面
    pub async fn page(&self) -> AppResult<Arc<dyn FormPage>> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|s| s.page.clone())
            .ok_or_else(|| SessionError::NotOpen.into())
    }

    async fn acquire(&self) -> AppResult<(Browser, Handler)> {
        let mut attempts = Vec::new();

        if let Some(executable) = &self.config.chrome_executable {
            let options = self.launch_options(Some(executable.clone()));
            match launch_browser(&options).await {
                Ok(pair) => return Ok(pair),
                Err(e) => record_attempt(&mut attempts, "固定版本浏览器", &e),
            }
        }

        match launch_browser(&self.launch_options(None)).await {
            Ok(pair) => return Ok(pair),
            Err(e) => record_attempt(&mut attempts, "自动查找浏览器", &e),
        }

        match attach_to_browser(self.config.browser_debug_port).await {
            Ok(pair) => return Ok(pair),
            Err(e) => record_attempt(&mut attempts, "附加到调试端口", &e),
        }

        Err(SessionError::AcquisitionExhausted { attempts }.into())
    }

    fn launch_options(&self, executable: Option<PathBuf>) -> LaunchOptions {
        LaunchOptions {
            profile_dir: self.config.chrome_profile_dir.clone(),
            executable,
        }
    }

    async fn prepare(
        &self,
        browser: &Browser,
        download_dir: Option<PathBuf>,
    ) -> Result<Arc<dyn FormPage>> {
        let page = find_or_open_page(browser, &self.config.target_url).await?;
        install_stealth(&page).await?;
        if let Err(e) = intercept_file_chooser(&page).await {
            warn!("⚠️ 无法拦截文件选择框: {}", e);
        }
        if let Some(dir) = download_dir {
            if let Err(e) = set_download_dir(&page, &dir).await {
                warn!("⚠️ 设置下载目录失败: {}", e);
            }
        }

        info!("正在打开预约页面: {}", self.config.target_url);
        page.goto(self.config.target_url.as_str()).await?;

        if let Err(e) = arrange_window(&page, self.config.control_panel_ratio).await {
            warn!("⚠️ 窗口布局调整失败: {}", e);
        }
        Ok(Arc::new(JsExecutor::new(page)))
    }
}

fn record_attempt(attempts: &mut Vec<String>, label: &str, err: &anyhow::Error) {
    let message = format!("{}: {}", label, truncate_text(&format!("{:#}", err), 100));
    warn!("⚠️ {}", message);
    attempts.push(message);
}

async fn shutdown(session: ActiveSession) {
    if let Some(mut browser) = session.browser {
        if let Err(e) = browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        browser.wait().await.ok();
    }
    if let Some(handler) = session.handler {
        handler.abort();
    }
}
