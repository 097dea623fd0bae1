//! 页面就绪检测
//!
//! 等待任一锚点字段出现。找不到锚点不算错误，页面加载慢时可能误判，调用方照常继续。

use std::time::Duration;

use tracing::{info, warn};

use crate::models::locator::FormLocatorMap;
use crate::services::element_resolver::ElementResolver;
use crate::utils::wait::wait_until;

/// 检测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPresence {
    Detected,
    AnchorsMissing,
}

/// 等待表单出现，最多 `timeout`
pub async fn wait_for_form(
    resolver: &ElementResolver,
    locators: &FormLocatorMap,
    timeout: Duration,
) -> FormPresence {
    info!("⏳ 等待预约表单出现...");
    let anchors = locators.anchors();
    let anchors = anchors.as_slice();
    let detected = wait_until(timeout, resolver.timings().poll_interval(), move || async move {
        for anchor in anchors {
            if resolver.find_now(anchor).await.is_some() {
                return true;
            }
        }
        false
    })
    .await;

    if detected {
        info!("✓ 已检测到表单");
        FormPresence::Detected
    } else {
        warn!("⚠️ 未找到表单锚点字段，可能不在正确的页面，继续执行");
        FormPresence::AnchorsMissing
    }
}
