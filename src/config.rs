use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
///
/// 进程级设置，来自环境变量；成员数据和表单开关在预约配置文档里（见 `models::booking`）。
#[derive(Clone, Debug)]
pub struct Config {
    /// 目标URL
    pub target_url: String,
    /// 预约配置文档路径（general + members）
    pub booking_config_path: PathBuf,
    /// 断点文件路径（current_member_index）
    pub checkpoint_path: PathBuf,
    /// 浏览器持久化用户目录
    pub chrome_profile_dir: PathBuf,
    /// 固定版本的浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// 附加到已运行浏览器时使用的调试端口
    pub browser_debug_port: u16,
    /// 成员照片目录
    pub image_dir: Option<PathBuf>,
    /// 上传照片存放目录
    pub upload_dir: PathBuf,
    /// 定位器/匹配参数覆盖文件（TOML）
    pub locator_profile_path: Option<PathBuf>,
    /// 控制面板占屏宽度比例，None 表示没有面板，浏览器最大化
    pub control_panel_ratio: Option<f64>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 流程等待时长
    pub timings: WorkflowTimings,
}

/// 流程层的等待时长
#[derive(Clone, Debug)]
pub struct WorkflowTimings {
    /// 等待表单出现
    pub page_ready_timeout: Duration,
    /// 中间成员的人工"保存并添加"等待
    pub interior_save_timeout: Duration,
    /// 最后一位成员的保存等待
    pub final_save_timeout: Duration,
    /// 空白表单轮询间隔
    pub blank_poll_interval: Duration,
    /// 等待"继续"按钮可点击
    pub continue_timeout: Duration,
    /// 运行结束后会话存活检测间隔
    pub monitor_interval: Duration,
}

impl Default for WorkflowTimings {
    fn default() -> Self {
        Self {
            page_ready_timeout: Duration::from_secs(30),
            interior_save_timeout: Duration::from_secs(90),
            final_save_timeout: Duration::from_secs(60),
            blank_poll_interval: Duration::from_millis(300),
            continue_timeout: Duration::from_secs(90),
            monitor_interval: Duration::from_secs(2),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://ttdevasthanams.ap.gov.in".to_string(),
            booking_config_path: PathBuf::from("srivari_group_data.json"),
            checkpoint_path: PathBuf::from("booking_data.json"),
            chrome_profile_dir: PathBuf::from("chrome_profile"),
            chrome_executable: None,
            browser_debug_port: 9222,
            image_dir: None,
            upload_dir: PathBuf::from("uploads"),
            locator_profile_path: None,
            control_panel_ratio: None,
            verbose_logging: false,
            timings: WorkflowTimings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let timings = WorkflowTimings {
            page_ready_timeout: env_secs("PAGE_READY_TIMEOUT_SECS").unwrap_or(default.timings.page_ready_timeout),
            interior_save_timeout: env_secs("SAVE_WAIT_SECS").unwrap_or(default.timings.interior_save_timeout),
            final_save_timeout: env_secs("FINAL_SAVE_WAIT_SECS").unwrap_or(default.timings.final_save_timeout),
            ..default.timings.clone()
        };
        Self {
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            booking_config_path: env_path("TTD_CONFIG_PATH").unwrap_or(default.booking_config_path),
            checkpoint_path: env_path("TTD_CHECKPOINT_PATH").unwrap_or(default.checkpoint_path),
            chrome_profile_dir: env_path("TTD_CHROME_PROFILE").unwrap_or(default.chrome_profile_dir),
            chrome_executable: env_path("CHROME_EXECUTABLE"),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            image_dir: env_path("TTD_IMAGE_DIR"),
            upload_dir: env_path("TTD_UPLOAD_DIR").unwrap_or(default.upload_dir),
            locator_profile_path: env_path("TTD_LOCATOR_PROFILE"),
            control_panel_ratio: std::env::var("CONTROL_PANEL_WIDTH_RATIO")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|r| *r > 0.0 && *r < 1.0),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            timings,
        }
    }

    /// 预约配置文档所在目录（解析相对照片路径用）
    pub fn config_dir(&self) -> PathBuf {
        let absolute = std::path::absolute(&self.booking_config_path)
            .unwrap_or_else(|_| self.booking_config_path.clone());
        absolute
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings_match_manual_save_windows() {
        let config = Config::default();
        assert_eq!(config.timings.interior_save_timeout, Duration::from_secs(90));
        assert_eq!(config.timings.final_save_timeout, Duration::from_secs(60));
        assert_eq!(config.checkpoint_path, PathBuf::from("booking_data.json"));
    }

    #[test]
    fn test_config_dir_is_parent_of_document() {
        let config = Config {
            booking_config_path: PathBuf::from("/data/ttd/srivari_group_data.json"),
            ..Config::default()
        };
        assert_eq!(config.config_dir(), PathBuf::from("/data/ttd"));
    }
}
