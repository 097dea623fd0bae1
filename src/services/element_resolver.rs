//! 元素定位能力 - 业务能力层
//!
//! 所有 DOM 操作的基础：按主选择器等待元素出现，找不到时依次尝试备用选择器。
//! 每次调用都重新解析，返回的是选择器而不是元素句柄，不会拿到过期元素。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{AppResult, LocatorError};
use crate::infrastructure::{FormPage, Key};
use crate::models::locator::{Locator, Selector};
use crate::models::profile::UiTimings;
use crate::utils::wait::wait_until;

/// 点击前等待可点击的上限
const CLICK_TIMEOUT: Duration = Duration::from_secs(10);

/// 元素定位器
#[derive(Clone)]
pub struct ElementResolver {
    page: Arc<dyn FormPage>,
    timings: UiTimings,
}

impl ElementResolver {
    pub fn new(page: Arc<dyn FormPage>, timings: UiTimings) -> Self {
        Self { page, timings }
    }

    pub fn page(&self) -> &dyn FormPage {
        self.page.as_ref()
    }

    pub fn timings(&self) -> &UiTimings {
        &self.timings
    }

    /// 等待元素出现
    ///
    /// 主选择器最多等 `timeout`，之后每个备用选择器各等 `fallback_timeout`。
    pub async fn locate(&self, locator: &Locator, timeout: Duration) -> AppResult<Selector> {
        self.resolve(locator, timeout, false).await
    }

    /// 等待元素出现且可点击
    pub async fn locate_clickable(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> AppResult<Selector> {
        self.resolve(locator, timeout, true).await
    }

    /// 只做一次存在性检测（不等待），主选择器优先
    pub async fn find_now(&self, locator: &Locator) -> Option<Selector> {
        let candidates = std::iter::once(locator.primary.clone()).chain(locator.fallbacks());
        for selector in candidates {
            if self.page.is_present(&selector).await.unwrap_or(false) {
                return Some(selector);
            }
        }
        None
    }

    /// 立即读取当前值，找不到元素返回 None
    pub async fn read_now(&self, locator: &Locator) -> Option<String> {
        let selector = self.find_now(locator).await?;
        self.page.read_value(&selector).await.ok()
    }

    /// 等待可点击后点击，点击后停顿 `post_select_delay`
    pub async fn click(&self, locator: &Locator) -> bool {
        let selector = match self.locate_clickable(locator, CLICK_TIMEOUT).await {
            Ok(selector) => selector,
            Err(e) => {
                warn!("⚠️ 点击失败: {}", e);
                return false;
            }
        };
        match self.page.click(&selector).await {
            Ok(true) => {
                sleep(self.timings.post_select_delay()).await;
                true
            }
            Ok(false) => {
                warn!("⚠️ 点击时元素已消失: {}", locator);
                false
            }
            Err(e) => {
                warn!("⚠️ 点击失败 {}: {}", locator, e);
                false
            }
        }
    }

    /// 聚焦元素后发送按键
    pub async fn press_key_on(&self, locator: &Locator, key: Key) -> bool {
        let Some(selector) = self.find_now(locator).await else {
            return false;
        };
        match self.page.focus(&selector).await {
            Ok(true) => self.page.press_key(key).await.is_ok(),
            _ => false,
        }
    }

    async fn resolve(
        &self,
        locator: &Locator,
        timeout: Duration,
        clickable: bool,
    ) -> AppResult<Selector> {
        let started = Instant::now();
        if self.wait_for(&locator.primary, timeout, clickable).await {
            return Ok(locator.primary.clone());
        }

        for fallback in locator.fallbacks() {
            debug!("主选择器未命中，尝试备用选择器: {}", fallback);
            if self
                .wait_for(&fallback, self.timings.fallback_timeout(), clickable)
                .await
            {
                return Ok(fallback);
            }
        }

        Err(LocatorError::NotFound {
            locator: locator.to_string(),
            waited_ms: started.elapsed().as_millis(),
        }
        .into())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration, clickable: bool) -> bool {
        let page = self.page.as_ref();
        wait_until(timeout, self.timings.poll_interval(), move || async move {
            let probe = if clickable {
                page.is_interactable(selector).await
            } else {
                page.is_present(selector).await
            };
            probe.unwrap_or_else(|e| {
                debug!("元素检测失败 {}: {}", selector, e);
                false
            })
        })
        .await
    }
}
