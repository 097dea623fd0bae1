//! 下拉框选值 - 业务能力层
//!
//! 同时处理原生 `<select>` 和自定义浮层下拉框。
//!
//! 流程：
//! 1. 已有非占位的选中值 → 直接返回成功，不动它（可能是网站回填的）
//! 2. 原生下拉框 → 精确 / 包含 / 相似度（≥ `native_threshold`）
//! 3. 自定义下拉框 → 点开，收集触发控件下方浮层中的合理候选项（没有时搜索全页面），
//!    同样的匹配梯度（≥ `custom_threshold`）
//! 4. 一个候选都没有 → 键盘兜底（↓ + 回车）
//!
//! 找不到可接受的候选时返回 false 并记录日志，从不报错。

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AppResult, FillError};
use crate::infrastructure::{Key, OverlayOption, Rect};
use crate::models::locator::{Locator, Selector};
use crate::models::profile::MatchingProfile;
use crate::services::element_resolver::ElementResolver;
use crate::services::matching::{
    best_match, is_placeholder, is_plausible_option, is_random_pick_candidate, normalize,
    panel_is_below, MatchKind,
};
use crate::utils::wait::wait_until;

/// 下拉框选择器
#[derive(Clone)]
pub struct DropdownResolver {
    resolver: ElementResolver,
    matching: MatchingProfile,
}

impl DropdownResolver {
    pub fn new(resolver: ElementResolver, matching: MatchingProfile) -> Self {
        Self { resolver, matching }
    }

    /// 选中与 `value` 最匹配的选项，返回字段最终是否有合适的值
    pub async fn select(&self, field: &str, locator: &Locator, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let Some(selector) = self.locate(field, locator).await else {
            return false;
        };
        let page = self.resolver.page();

        let current = page.read_value(&selector).await.unwrap_or_default();
        if !is_placeholder(&current, &self.matching) {
            info!("⏭️ {} 已选中 '{}'，保留", field, current);
            return true;
        }

        if let Ok(Some(tag)) = page.tag_name(&selector).await {
            if tag == "select" {
                match self.select_native(field, &selector, value).await {
                    Ok(selected) => return selected,
                    Err(e) => debug!("{} 原生下拉框操作失败，改用自定义流程: {}", field, e),
                }
            }
        }

        self.select_custom(field, &selector, value).await
    }

    /// 等待级联下拉框就绪
    ///
    /// 原生下拉框：有期望值时等到选项中包含它，否则等到至少 `min_options` 个选项。
    /// 自定义下拉框无法预读选项，短暂停顿后视为就绪。
    pub async fn wait_for_ready(
        &self,
        field: &str,
        locator: &Locator,
        expected: Option<&str>,
        min_options: usize,
    ) -> bool {
        let Some(selector) = self.locate(field, locator).await else {
            return false;
        };
        let page = self.resolver.page();
        let timings = self.resolver.timings();

        if !matches!(page.tag_name(&selector).await, Ok(Some(ref tag)) if tag == "select") {
            sleep(timings.open_delay()).await;
            return true;
        }

        let target = expected.map(normalize).filter(|t| !t.is_empty());
        let selector = &selector;
        let target = target.as_deref();
        let ready = wait_until(
            timings.dependent_ready_timeout(),
            timings.poll_interval(),
            move || async move {
                let options = page.native_options(selector).await.unwrap_or_default();
                match target {
                    Some(target) => options.iter().any(|o| normalize(o).contains(target)),
                    None => options.len() >= min_options,
                }
            },
        )
        .await;
        if !ready {
            warn!("⚠️ {} 选项未就绪 (期望 {:?})", field, expected);
        }
        ready
    }

    /// 当前非占位的选中值
    pub async fn current_selection(&self, locator: &Locator) -> Option<String> {
        let current = self.resolver.read_now(locator).await?;
        (!is_placeholder(&current, &self.matching)).then_some(current)
    }

    /// 随机选一个看起来合理的选项
    pub async fn pick_random(&self, field: &str, locator: &Locator) -> bool {
        let Some(selector) = self.locate(field, locator).await else {
            return false;
        };
        let page = self.resolver.page();
        if !page.click(&selector).await.unwrap_or(false) {
            return false;
        }
        sleep(self.resolver.timings().open_delay()).await;

        let options = page.page_options().await.unwrap_or_default();
        let candidates: Vec<&OverlayOption> = options
            .iter()
            .filter(|o| is_random_pick_candidate(&o.text, &self.matching))
            .collect();
        let choice = {
            let mut rng = rand::rng();
            candidates.choose(&mut rng).copied()
        };
        let Some(choice) = choice else {
            debug!("{} 没有可随机选择的选项", field);
            return false;
        };

        if page.click_option(&choice.token).await.unwrap_or(false) {
            sleep(self.resolver.timings().post_select_delay()).await;
            info!("🎲 {} 随机选择: {}", field, choice.text);
            true
        } else {
            false
        }
    }

    /// 键盘导航：按 `downs` 次 ↓ 后回车，返回之后字段是否有值
    pub async fn keyboard_select(&self, field: &str, locator: &Locator, downs: usize) -> bool {
        let Some(selector) = self.resolver.find_now(locator).await else {
            return false;
        };
        if !self.resolver.page().focus(&selector).await.unwrap_or(false) {
            return false;
        }
        self.keyboard_step(field, &selector, downs).await
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

    async fn select_native(&self, field: &str, selector: &Selector, value: &str) -> AppResult<bool> {
        let page = self.resolver.page();
        let options = page.native_options(selector).await?;
        match best_match(value, &options, self.matching.native_threshold) {
            Ok(found) => {
                let chosen = page.choose_native_option(selector, found.index).await?;
                if chosen {
                    sleep(self.resolver.timings().post_select_delay()).await;
                    info!("✓ {} 选择 '{}' ({})", field, found.text, describe(found.kind));
                }
                Ok(chosen)
            }
            Err(miss) => {
                let err = FillError::DropdownNoMatch {
                    value: value.to_string(),
                    best: miss.best,
                    ratio: miss.ratio,
                };
                warn!("⚠️ {} {}", field, err);
                Ok(false)
            }
        }
    }

    async fn select_custom(&self, field: &str, selector: &Selector, value: &str) -> bool {
        let page = self.resolver.page();
        let timings = self.resolver.timings();

        let trigger = page.bounding_box(selector).await.ok().flatten();
        if !page.click(selector).await.unwrap_or(false) {
            warn!("⚠️ {} 无法打开下拉框", field);
            return false;
        }
        sleep(timings.open_delay()).await;

        let candidates = self.collect_candidates(trigger).await;
        if candidates.is_empty() {
            debug!("{} 浮层中没有候选项，改用键盘选择", field);
            return self.keyboard_step(field, selector, 1).await;
        }

        let texts: Vec<&str> = candidates.iter().map(|o| o.text.as_str()).collect();
        match best_match(value, &texts, self.matching.custom_threshold) {
            Ok(found) => {
                let token = &candidates[found.index].token;
                if page.click_option(token).await.unwrap_or(false) {
                    sleep(timings.post_select_delay()).await;
                    info!("✓ {} 选择 '{}' ({})", field, found.text, describe(found.kind));
                    true
                } else {
                    warn!("⚠️ {} 点击选项 '{}' 失败", field, found.text);
                    false
                }
            }
            Err(miss) => {
                let err = FillError::DropdownNoMatch {
                    value: value.to_string(),
                    best: miss.best,
                    ratio: miss.ratio,
                };
                warn!("⚠️ {} {}", field, err);
                page.press_key(Key::Escape).await.ok();
                false
            }
        }
    }

    async fn keyboard_step(&self, field: &str, selector: &Selector, downs: usize) -> bool {
        let page = self.resolver.page();
        let timings = self.resolver.timings();
        for _ in 0..downs {
            page.press_key(Key::ArrowDown).await.ok();
            sleep(timings.key_delay()).await;
        }
        page.press_key(Key::Enter).await.ok();
        sleep(timings.post_select_delay()).await;

        let current = page.read_value(selector).await.unwrap_or_default();
        let selected = !is_placeholder(&current, &self.matching);
        if selected {
            info!("⌨️ {} 键盘选择: {}", field, current);
        } else {
            warn!("⚠️ {} 键盘选择后仍未选中", field);
        }
        selected
    }

    /// 触发控件下方浮层里看起来合理的候选项；一个都没有时退回全页面搜索
    async fn collect_candidates(&self, trigger: Option<Rect>) -> Vec<OverlayOption> {
        let page = self.resolver.page();
        let panels = page.overlay_panels().await.unwrap_or_default();
        let in_panels = panels
            .into_iter()
            .filter(|panel| trigger.is_none_or(|t| panel_is_below(&panel.rect, &t)))
            .flat_map(|panel| panel.options);
        let options = self.plausible_unique(in_panels);
        if !options.is_empty() {
            return options;
        }

        let page_wide = page.page_options().await.unwrap_or_default();
        if !page_wide.is_empty() {
            debug!("浮层中没有合理的候选项，改用全页面搜索 ({} 个节点)", page_wide.len());
        }
        self.plausible_unique(page_wide)
    }

    /// 过滤不合理的文本，按规范化文本去重
    fn plausible_unique(
        &self,
        options: impl IntoIterator<Item = OverlayOption>,
    ) -> Vec<OverlayOption> {
        let mut seen = HashSet::new();
        options
            .into_iter()
            .filter(|o| is_plausible_option(&o.text, &self.matching))
            .filter(|o| seen.insert(normalize(&o.text)))
            .collect()
    }
}

fn describe(kind: MatchKind) -> String {
    match kind {
        MatchKind::Exact => "精确".to_string(),
        MatchKind::Contains => "包含".to_string(),
        MatchKind::Fuzzy(ratio) => format!("相似度 {:.2}", ratio),
    }
}
