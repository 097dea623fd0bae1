//! 字段填写策略 - 业务能力层
//!
//! 网站在输入证件号后会异步回填部分字段。`respect_existing` 打开时，
//! 已有值的字段一律不覆盖；关闭时先清空再写入。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::FillError;
use crate::infrastructure::Key;
use crate::models::booking::GeneralSettings;
use crate::models::locator::{Locator, Selector};
use crate::services::date_format::{digits_only, normalize_date};
use crate::services::element_resolver::ElementResolver;
use crate::utils::wait::wait_until;

/// 填写策略（进程级，配置重载时更新）
#[derive(Debug, Clone, PartialEq)]
pub struct FillPolicyState {
    pub respect_existing: bool,
    /// 输入证件号后等待网站回填的上限
    pub autofill_wait: Duration,
}

impl Default for FillPolicyState {
    fn default() -> Self {
        Self::from_general(&GeneralSettings::default())
    }
}

impl FillPolicyState {
    pub fn from_general(general: &GeneralSettings) -> Self {
        Self {
            respect_existing: general.respect_existing(),
            autofill_wait: Duration::from_secs(general.autofill_wait_secs()),
        }
    }
}

/// 在流程与控制面之间共享的填写策略
pub type SharedFillPolicy = Arc<RwLock<FillPolicyState>>;

/// 单个字段的填写结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// 已写入且（如有校验）回读一致
    Written,
    /// 字段已有值，按策略保留
    KeptExisting,
    /// 没有要填的值
    NoValue,
    /// 找不到字段
    NotFound,
    /// 写入后回读不一致
    Mismatch,
}

impl FillOutcome {
    /// 字段最终是否有值
    pub fn is_filled(self) -> bool {
        matches!(self, FillOutcome::Written | FillOutcome::KeptExisting)
    }
}

/// 字段填写器
#[derive(Clone)]
pub struct FieldFiller {
    resolver: ElementResolver,
    policy: SharedFillPolicy,
}

impl FieldFiller {
    pub fn new(resolver: ElementResolver, policy: SharedFillPolicy) -> Self {
        Self { resolver, policy }
    }

    pub async fn policy(&self) -> FillPolicyState {
        self.policy.read().await.clone()
    }

    /// 清空后写入文本，不看当前值
    pub async fn set_text(&self, field: &str, locator: &Locator, value: &str) -> FillOutcome {
        if value.trim().is_empty() {
            return FillOutcome::NoValue;
        }
        match self.locate(field, locator).await {
            Some(selector) => self.write_text(field, &selector, value).await,
            None => FillOutcome::NotFound,
        }
    }

    /// 字段为空时才写入（`respect_existing` 关闭时总是写入）
    pub async fn set_if_empty(&self, field: &str, locator: &Locator, value: &str) -> FillOutcome {
        if value.trim().is_empty() {
            return FillOutcome::NoValue;
        }
        let Some(selector) = self.locate(field, locator).await else {
            return FillOutcome::NotFound;
        };
        if self.keeps_existing(field, &selector).await {
            return FillOutcome::KeptExisting;
        }
        self.write_text(field, &selector, value).await
    }

    /// 日期字段：为空时按掩码输入
    pub async fn set_date_if_empty(
        &self,
        field: &str,
        locator: &Locator,
        value: &str,
    ) -> FillOutcome {
        if value.trim().is_empty() {
            return FillOutcome::NoValue;
        }
        let Some(selector) = self.locate(field, locator).await else {
            return FillOutcome::NotFound;
        };
        if self.keeps_existing(field, &selector).await {
            return FillOutcome::KeptExisting;
        }
        self.write_masked_date(field, &selector, value).await
    }

    /// 掩码日期输入，不看当前值
    pub async fn set_masked_date(&self, field: &str, locator: &Locator, value: &str) -> FillOutcome {
        if value.trim().is_empty() {
            return FillOutcome::NoValue;
        }
        match self.locate(field, locator).await {
            Some(selector) => self.write_masked_date(field, &selector, value).await,
            None => FillOutcome::NotFound,
        }
    }

    /// 清空字段（降级处理用）
    pub async fn clear(&self, locator: &Locator) -> bool {
        let Some(selector) = self.resolver.find_now(locator).await else {
            return false;
        };
        self.resolver
            .page()
            .force_value(&selector, "")
            .await
            .unwrap_or(false)
    }

    /// 等待网站回填：任一字段出现值即返回 true
    pub async fn wait_for_autofill(&self, fields: &[&Locator]) -> bool {
        let timeout = self.policy.read().await.autofill_wait;
        if timeout.is_zero() || fields.is_empty() {
            return false;
        }
        let resolver = &self.resolver;
        let filled = wait_until(timeout, resolver.timings().poll_interval(), move || async move {
            for locator in fields {
                if let Some(value) = resolver.read_now(locator).await {
                    if !value.is_empty() {
                        return true;
                    }
                }
            }
            false
        })
        .await;
        if filled {
            info!("✓ 检测到网站自动回填");
        } else {
            debug!("{}s 内未检测到自动回填", timeout.as_secs());
        }
        filled
    }

    /// `respect_existing` 打开且字段非空时保留已有值
    async fn keeps_existing(&self, field: &str, selector: &Selector) -> bool {
        if !self.policy.read().await.respect_existing {
            return false;
        }
        let current = self.read(selector).await;
        if current.is_empty() {
            return false;
        }
        info!("⏭️ {} 已有值 '{}'，保留", field, current);
        true
    }

    async fn write_text(&self, field: &str, selector: &Selector, value: &str) -> FillOutcome {
        let page = self.resolver.page();
        if let Err(e) = page.force_value(selector, "").await {
            debug!("{} 清空失败: {}", field, e);
        }
        match page.type_text(selector, value).await {
            Ok(true) => {
                info!("✓ {} = {}", field, value);
                FillOutcome::Written
            }
            Ok(false) => {
                warn!("⚠️ {} 输入时元素已消失", field);
                FillOutcome::NotFound
            }
            Err(e) => {
                warn!("⚠️ {} 输入失败: {}", field, e);
                FillOutcome::NotFound
            }
        }
    }

    /// 全选删除并强制清空后只键入数字，由页面掩码补分隔符；失焦后回读校验，
    /// 不一致时直接赋值并派发事件，再校验一次。不一致只记录，不报错。
    async fn write_masked_date(&self, field: &str, selector: &Selector, value: &str) -> FillOutcome {
        let expected = normalize_date(value);
        let page = self.resolver.page();
        let timings = self.resolver.timings();

        if !page.click(selector).await.unwrap_or(false) {
            warn!("⚠️ {} 无法点击", field);
            return FillOutcome::NotFound;
        }
        sleep(timings.key_delay()).await;
        self.press(Key::SelectAll).await;
        sleep(timings.key_delay()).await;
        self.press(Key::Backspace).await;
        page.force_value(selector, "").await.ok();

        for ch in digits_only(&expected).chars() {
            self.press(Key::Char(ch)).await;
            sleep(timings.key_delay()).await;
        }
        self.press(Key::Tab).await;
        sleep(timings.post_select_delay()).await;

        let mut actual = self.read(selector).await;
        if actual != expected {
            debug!("{} 掩码输入结果 '{}'，改为直接赋值", field, actual);
            page.force_value(selector, &expected).await.ok();
            sleep(timings.post_select_delay()).await;
            actual = self.read(selector).await;
        }

        if actual == expected {
            info!("✓ {} = {} (OK)", field, actual);
            FillOutcome::Written
        } else {
            let err = FillError::MaskedInputMismatch { expected, actual };
            warn!("⚠️ {} MISMATCH: {}", field, err);
            FillOutcome::Mismatch
        }
    }

    async fn locate(&self, field: &str, locator: &Locator) -> Option<Selector> {
        match self
            .resolver
            .locate(locator, self.resolver.timings().locate_timeout())
            .await
        {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("⚠️ {}: {}", field, e);
                None
            }
        }
    }

    async fn read(&self, selector: &Selector) -> String {
        self.resolver
            .page()
            .read_value(selector)
            .await
            .unwrap_or_default()
    }

    async fn press(&self, key: Key) {
        if let Err(e) = self.resolver.page().press_key(key).await {
            debug!("按键 {:?} 发送失败: {}", key, e);
        }
    }
}
