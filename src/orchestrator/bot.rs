//! 控制面 - 编排层
//!
//! ## 职责
//!
//! [`BotContext`] 是整个应用的上下文对象，由宿主进程显式创建并以引用传递。
//!
//! 1. **会话管理**：打开/关闭浏览器会话（委托 [`SessionController`]）
//! 2. **流程启动**：在后台任务中运行团队填写流程，同一时间最多一个
//! 3. **状态查询**：运行标志、会话状态、当前地址、流程状态
//! 4. **配置读写**：读写预约配置，写入后立即刷新填写策略
//! 5. **照片上传**：保存到上传目录，返回可写入配置的相对路径
//! 6. **日志拉取**：从内存日志缓冲按序号增量读取

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::fs;
use tokio::sync::{watch, RwLock};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::browser::SessionController;
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, WorkflowError};
use crate::models::{
    load_booking_config, load_locator_profile, save_booking_config, BookingConfig, LocatorProfile,
};
use crate::services::{
    wait_for_form, CheckpointStore, ElementResolver, FillPolicyState, SharedFillPolicy,
};
use crate::utils::log_buffer::{LogBatch, LogBuffer};
use crate::utils::logging::log_startup;
use crate::workflow::{EntrantFlow, GroupFlow, PhotoDirs, RunOutcome, WorkflowState};

/// 允许上传的照片扩展名
const ALLOWED_PHOTO_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// 上传照片返回路径的前缀
const UPLOAD_PREFIX: &str = "uploads";

/// 状态查询结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotStatus {
    pub running: bool,
    pub session_open: bool,
    pub current_url: Option<String>,
    pub timer_state: WorkflowState,
}

/// 应用上下文
pub struct BotContext {
    config: Config,
    profile: LocatorProfile,
    session: SessionController,
    fill_policy: SharedFillPolicy,
    logs: LogBuffer,
    running: AtomicBool,
    stop_requested: Arc<AtomicBool>,
    state: Arc<watch::Sender<WorkflowState>>,
}

impl BotContext {
    pub fn new(config: Config, profile: LocatorProfile, logs: LogBuffer) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            session: SessionController::new(config.clone()),
            config,
            profile,
            fill_policy: Arc::new(RwLock::new(FillPolicyState::default())),
            logs,
            running: AtomicBool::new(false),
            stop_requested: Arc::new(AtomicBool::new(false)),
            state: Arc::new(state),
        }
    }

    /// 加载定位配置和预约配置，创建上下文
    pub async fn initialize(config: Config, logs: LogBuffer) -> Result<Arc<Self>> {
        log_startup(&config);

        let profile = load_locator_profile(config.locator_profile_path.as_deref()).await?;
        let booking = load_booking_config(&config.booking_config_path).await?;

        let bot = Self::new(config, profile, logs);
        *bot.fill_policy.write().await = FillPolicyState::from_general(&booking.general);
        Ok(Arc::new(bot))
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 打开浏览器会话，下载目录取自预约配置
    pub async fn open_session(&self) -> AppResult<()> {
        let download_dir = match load_booking_config(&self.config.booking_config_path).await {
            Ok(booking) => booking
                .general
                .download_dir
                .filter(|d| !d.trim().is_empty())
                .map(Into::into),
            Err(e) => {
                warn!("⚠️ 读取预约配置失败，不设置下载目录: {:#}", e);
                None
            }
        };
        self.session.open(download_dir).await
    }

    /// 在后台启动填写流程；已在运行时什么都不做，返回 false
    ///
    /// 流程结束后继续每隔一段时间检查会话，浏览器被关闭时标记会话丢失，
    /// 直到调用 [`stop`](Self::stop)。
    pub fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("填表流程已在运行，忽略本次启动");
            return false;
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        info!("▶️ 已启动");

        let bot = Arc::clone(self);
        tokio::spawn(async move {
            match bot.execute().await {
                Ok(outcome) => info!("填表流程结束: {:?}", outcome),
                Err(e) => error!("❌ 填表流程失败: {}", e),
            }
            bot.monitor_session().await;
            bot.running.store(false, Ordering::SeqCst);
        });
        true
    }

    /// 在当前任务中运行一次填写流程并等待结束
    pub async fn run_once(&self) -> AppResult<RunOutcome> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkflowError::AlreadyRunning.into());
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        let result = self.execute().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// 请求停止：当前成员填写完后停止，断点保留
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        info!("⏹ 已请求停止");
    }

    pub async fn close_session(&self) {
        self.stop();
        self.session.close().await;
    }

    pub async fn status(&self) -> BotStatus {
        let current_url = match self.session.page().await {
            Ok(page) => page.current_url().await.ok(),
            Err(_) => None,
        };
        BotStatus {
            running: self.running.load(Ordering::SeqCst),
            session_open: self.session.is_open().await,
            current_url,
            timer_state: self.state.borrow().clone(),
        }
    }

    pub async fn get_config(&self) -> Result<BookingConfig> {
        load_booking_config(&self.config.booking_config_path).await
    }

    /// 保存预约配置并刷新填写策略
    pub async fn set_config(&self, booking: &BookingConfig) -> Result<()> {
        save_booking_config(&self.config.booking_config_path, booking).await?;
        *self.fill_policy.write().await = FillPolicyState::from_general(&booking.general);
        info!("✓ 配置已更新");
        Ok(())
    }

    /// 保存上传的照片，返回 `uploads/<随机文件名>`
    pub async fn upload_photo(&self, bytes: &[u8], filename: &str) -> AppResult<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_PHOTO_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ConfigError::UnsupportedUpload { extension }.into());
        }

        let name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let dir = &self.config.upload_dir;
        fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;
        let path = dir.join(&name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        info!("📷 照片已保存: {}", path.display());
        Ok(format!("{}/{}", UPLOAD_PREFIX, name))
    }

    pub fn logs_since(&self, seq: u64) -> LogBatch {
        self.logs.since(seq)
    }

    pub async fn screenshot(&self) -> AppResult<Vec<u8>> {
        self.session.page().await?.screenshot().await
    }

    pub fn fill_policy(&self) -> SharedFillPolicy {
        Arc::clone(&self.fill_policy)
    }

    async fn execute(&self) -> AppResult<RunOutcome> {
        let page = self.session.page().await?;

        self.state.send_replace(WorkflowState::WaitingForForm);
        let resolver = ElementResolver::new(Arc::clone(&page), self.profile.timings.clone());
        wait_for_form(
            &resolver,
            &self.profile.locators,
            self.config.timings.page_ready_timeout,
        )
        .await;

        let path = &self.config.booking_config_path;
        let booking = load_booking_config(path)
            .await
            .map_err(|e| AppError::parse_failed(path.display().to_string(), format!("{:#}", e)))?;
        *self.fill_policy.write().await = FillPolicyState::from_general(&booking.general);

        let photo_dirs = PhotoDirs {
            config_dir: self.config.config_dir(),
            image_dir: self.config.image_dir.clone(),
        };
        let entrant_flow = EntrantFlow::new(
            page,
            &self.profile,
            Arc::clone(&self.fill_policy),
            photo_dirs,
        );
        let flow = GroupFlow::new(
            entrant_flow,
            CheckpointStore::new(&self.config.checkpoint_path),
            self.config.timings.clone(),
        )
        .with_state(Arc::clone(&self.state))
        .with_stop_flag(Arc::clone(&self.stop_requested));

        let result = flow.run(&booking).await;
        if let Err(AppError::Workflow(WorkflowError::SessionLost { .. })) = &result {
            self.session.mark_lost().await;
        }
        result
    }

    async fn monitor_session(&self) {
        while !self.stop_requested.load(Ordering::SeqCst) {
            sleep(self.config.timings.monitor_interval).await;
            let Ok(page) = self.session.page().await else {
                break;
            };
            if page.current_url().await.is_err() {
                warn!("⚠️ 浏览器已被用户关闭");
                self.session.mark_lost().await;
                break;
            }
        }
    }
}
