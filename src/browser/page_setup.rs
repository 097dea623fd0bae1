//! 新会话的页面准备：隐藏自动化痕迹、下载目录、窗口布局、打开目标地址

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
    SetWindowBoundsParams, WindowState,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::Page;
use tokio::fs;
use tracing::{debug, info};

use crate::infrastructure::STEALTH_SCRIPT;

/// 读不到屏幕尺寸时使用的默认值
const FALLBACK_SCREEN: (i64, i64) = (1920, 1080);

/// 浏览器窗口位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

/// 分屏布局：左侧留给控制面板，浏览器占右侧
pub fn split_layout(screen_width: i64, screen_height: i64, panel_ratio: f64) -> WindowRect {
    let left = (screen_width as f64 * panel_ratio) as i64;
    WindowRect {
        left,
        top: 0,
        width: (screen_width - left).max(800),
        height: (screen_height - 80).max(600),
    }
}

/// 注入反检测脚本（对之后加载的每个文档生效）
pub async fn install_stealth(page: &Page) -> Result<()> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await?;
    // 当前文档也执行一次
    if let Err(e) = page.evaluate(STEALTH_SCRIPT).await {
        debug!("当前文档注入反检测脚本失败: {}", e);
    }
    Ok(())
}

/// 拦截系统文件选择框，照片直接写入文件输入框
pub async fn intercept_file_chooser(page: &Page) -> Result<()> {
    page.execute(SetInterceptFileChooserDialogParams::new(true))
        .await?;
    Ok(())
}

/// 下载文件直接保存到指定目录，不弹窗
pub async fn set_download_dir(page: &Page, dir: &Path) -> Result<()> {
    let dir = ensure_download_dir(dir).await?;
    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(dir.to_string_lossy().to_string())
        .build()
        .map_err(|e| anyhow::anyhow!("下载设置参数无效: {}", e))?;
    page.execute(params).await?;
    info!("📥 下载目录: {}", dir.display());
    Ok(())
}

/// 创建下载目录（不存在时），返回绝对路径
async fn ensure_download_dir(dir: &Path) -> Result<PathBuf> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("无法创建下载目录: {}", dir.display()))?;
        debug!("已创建下载目录: {}", dir.display());
    }
    Ok(std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf()))
}

/// 有控制面板时按比例分屏，否则最大化
pub async fn arrange_window(page: &Page, panel_ratio: Option<f64>) -> Result<()> {
    let window = page.execute(GetWindowForTargetParams::default()).await?;
    let window_id = window.result.window_id;

    let bounds = match panel_ratio {
        Some(ratio) => {
            let (screen_width, screen_height) = screen_size(page).await;
            let rect = split_layout(screen_width, screen_height, ratio);
            debug!("分屏布局: {:?}", rect);
            // 最大化状态下不能直接设置位置
            page.execute(SetWindowBoundsParams::new(
                window_id.clone(),
                Bounds {
                    left: None,
                    top: None,
                    width: None,
                    height: None,
                    window_state: Some(WindowState::Normal),
                },
            ))
            .await?;
            Bounds {
                left: Some(rect.left),
                top: Some(rect.top),
                width: Some(rect.width),
                height: Some(rect.height),
                window_state: None,
            }
        }
        None => Bounds {
            left: None,
            top: None,
            width: None,
            height: None,
            window_state: Some(WindowState::Maximized),
        },
    };
    page.execute(SetWindowBoundsParams::new(window_id, bounds))
        .await?;
    Ok(())
}

async fn screen_size(page: &Page) -> (i64, i64) {
    let script = "[(window.screen && (window.screen.availWidth || window.screen.width)) || 0, \
                  (window.screen && (window.screen.availHeight || window.screen.height)) || 0]";
    let size = match page.evaluate(script).await {
        Ok(result) => result.into_value::<(i64, i64)>().ok(),
        Err(_) => None,
    };
    match size {
        Some((w, h)) if w > 0 && h > 0 => (w, h),
        _ => FALLBACK_SCREEN,
    }
}
