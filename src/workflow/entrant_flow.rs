//! 单人填写流程 - 流程层
//!
//! 核心职责：定义"一位成员"在表单上的完整填写顺序
//!
//! 流程顺序：
//! 1. 照片
//! 2. 证件类型 → 证件号 → 等待网站回填
//! 3. 姓名 / 出生日期 / 年龄 / 手机 / 邮箱（按策略只填空字段）
//! 4. 血型 → 性别 → 健康声明
//! 5. 地址：国家 → 州 → 区 → 城市 → 街道 / 门牌 / 邮编 → 最近的 TTD 寺庙
//!
//! 单个字段失败只记日志，不中断整个流程。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::infrastructure::{FormPage, Key};
use crate::models::entrant::DEFAULT_COUNTRY;
use crate::models::locator::{FormLocatorMap, Locator, Selector};
use crate::models::profile::LocatorProfile;
use crate::models::{resolve_photo_path, Entrant};
use crate::services::matching::normalize;
use crate::services::{DropdownResolver, ElementResolver, FieldFiller, FillOutcome, SharedFillPolicy};
use crate::workflow::entrant_ctx::EntrantCtx;

/// 照片上传前点击触发控件后的停顿
const PHOTO_TRIGGER_SETTLE: Duration = Duration::from_secs(1);

/// 寺庙下拉框键盘兜底时按 ↓ 的次数
const TEMPLE_KEYBOARD_DOWNS: usize = 4;

/// 地址填写方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// 领队：国家缺省 India，寺庙选不上时随机兜底
    Full,
    /// 成员：只填有值的地址字段
    IfProvided,
}

/// 单人填写统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub written: usize,
    pub kept: usize,
    pub failed: usize,
}

impl FillReport {
    fn record(&mut self, outcome: FillOutcome) {
        match outcome {
            FillOutcome::Written => self.written += 1,
            FillOutcome::KeptExisting => self.kept += 1,
            FillOutcome::NoValue => {}
            FillOutcome::NotFound | FillOutcome::Mismatch => self.failed += 1,
        }
    }

    fn record_selection(&mut self, selected: bool) {
        if selected {
            self.written += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// 照片查找目录
#[derive(Debug, Clone, Default)]
pub struct PhotoDirs {
    /// 配置文件所在目录，相对路径以它为基准
    pub config_dir: PathBuf,
    /// 额外的图片目录
    pub image_dir: Option<PathBuf>,
}

/// 单人填写流程
///
/// - 不持有浏览器会话，只通过 services 操作页面
/// - 领队和成员共用同一套字段顺序，区别只在 [`AddressMode`]
pub struct EntrantFlow {
    resolver: ElementResolver,
    filler: FieldFiller,
    dropdowns: DropdownResolver,
    locators: FormLocatorMap,
    photo_dirs: PhotoDirs,
}

impl EntrantFlow {
    pub fn new(
        page: Arc<dyn FormPage>,
        profile: &LocatorProfile,
        policy: SharedFillPolicy,
        photo_dirs: PhotoDirs,
    ) -> Self {
        let resolver = ElementResolver::new(page, profile.timings.clone());
        Self {
            filler: FieldFiller::new(resolver.clone(), policy),
            dropdowns: DropdownResolver::new(resolver.clone(), profile.matching.clone()),
            resolver,
            locators: profile.locators.clone(),
            photo_dirs,
        }
    }

    pub fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    pub fn locators(&self) -> &FormLocatorMap {
        &self.locators
    }

    /// 填写一位成员
    pub async fn run(&self, entrant: &Entrant, ctx: &EntrantCtx, mode: AddressMode) -> FillReport {
        info!("{} 📝 开始填写: {}", ctx, entrant.display_name());
        let mut report = FillReport::default();

        self.upload_photo(entrant, ctx).await;
        self.fill_identity(entrant, ctx, &mut report).await;
        self.fill_personal(entrant, ctx, &mut report).await;
        self.select_blood_group(entrant, ctx, &mut report).await;
        self.select_gender(entrant, ctx).await;
        self.ensure_fitness(ctx).await;
        self.fill_address(entrant, ctx, mode, &mut report).await;

        info!(
            "{} ✓ 填写完成: 写入 {} / 保留 {} / 失败 {}",
            ctx, report.written, report.kept, report.failed
        );
        report
    }

    /// 表单是否已被网站重置（姓名和证件号都为空）
    ///
    /// 任一字段读不到时视为未重置。
    pub async fn is_form_blank(&self) -> bool {
        for locator in self.locators.blank_probe_fields() {
            match self.resolver.read_now(locator).await {
                Some(value) if value.trim().is_empty() => continue,
                _ => return false,
            }
        }
        true
    }

    /// 降级清空：清掉所有文本字段，并关闭可能展开的寺庙下拉框
    pub async fn force_clear(&self) {
        let mut cleared = 0;
        for locator in self.locators.clearable_fields() {
            if self.filler.clear(locator).await {
                cleared += 1;
            }
        }
        if let Some(temple) = &self.locators.nearest_ttd_temple_dropdown {
            self.resolver.press_key_on(temple, Key::Escape).await;
        }
        info!("🧹 已清空 {} 个字段", cleared);
    }

    async fn upload_photo(&self, entrant: &Entrant, ctx: &EntrantCtx) {
        if entrant.photo.trim().is_empty() {
            return;
        }
        let Some(path) = resolve_photo_path(
            &entrant.photo,
            &self.photo_dirs.config_dir,
            self.photo_dirs.image_dir.as_deref(),
        ) else {
            warn!("{} ⚠️ 找不到照片文件: {}", ctx, entrant.photo);
            return;
        };
        let path = std::path::absolute(&path).unwrap_or(path);

        if let Some(trigger) = &self.locators.photo_trigger {
            if self.resolver.click(trigger).await {
                sleep(PHOTO_TRIGGER_SETTLE).await;
            } else {
                debug!("{} 照片触发控件点击失败，直接查找文件输入框", ctx);
            }
        }

        let input = match &self.locators.photo_file_input {
            Some(locator) => self.resolver.find_now(locator).await,
            None => None,
        };
        match self
            .resolver
            .page()
            .attach_file(input.as_ref(), &path)
            .await
        {
            Ok(true) => info!("{} ✓ 照片已上传: {}", ctx, path.display()),
            Ok(false) => warn!("{} ⚠️ 页面上没有文件输入框，照片未上传", ctx),
            Err(e) => warn!("{} ⚠️ 照片上传失败: {}", ctx, e),
        }
    }

    async fn fill_identity(&self, entrant: &Entrant, ctx: &EntrantCtx, report: &mut FillReport) {
        if let Some(locator) = &self.locators.id_proof_type_dropdown {
            let selected = self
                .dropdowns
                .select(&label(ctx, "证件类型"), locator, &entrant.id_proof_type)
                .await;
            report.record_selection(selected);
        }

        let mut id_written = false;
        if let Some(locator) = &self.locators.id_proof_number_input {
            let outcome = self
                .filler
                .set_text(&label(ctx, "证件号"), locator, &entrant.id_number)
                .await;
            id_written = outcome == FillOutcome::Written;
            report.record(outcome);
        }

        // 网站根据证件号异步回填，回填完成后再写其它字段
        if id_written {
            self.filler
                .wait_for_autofill(&self.locators.autofill_fields())
                .await;
        }
    }

    async fn fill_personal(&self, entrant: &Entrant, ctx: &EntrantCtx, report: &mut FillReport) {
        let l = &self.locators;

        if let Some(locator) = &l.name_input {
            report.record(
                self.filler
                    .set_if_empty(&label(ctx, "姓名"), locator, &entrant.name)
                    .await,
            );
        }
        if let Some(locator) = &l.dob_input {
            report.record(
                self.filler
                    .set_date_if_empty(&label(ctx, "出生日期"), locator, &entrant.dob)
                    .await,
            );
        }
        for (name, locator, value) in [
            ("年龄", &l.age_input, &entrant.age),
            ("手机", &l.mobile_input, &entrant.mobile),
            ("邮箱", &l.email_input, &entrant.email),
        ] {
            if let Some(locator) = locator {
                report.record(
                    self.filler
                        .set_if_empty(&label(ctx, name), locator, value)
                        .await,
                );
            }
        }
    }

    async fn select_blood_group(
        &self,
        entrant: &Entrant,
        ctx: &EntrantCtx,
        report: &mut FillReport,
    ) {
        let Some(locator) = &self.locators.blood_group_dropdown else {
            return;
        };
        if entrant.blood_group.trim().is_empty() {
            return;
        }
        let selected = self
            .dropdowns
            .select(&label(ctx, "血型"), locator, &entrant.blood_group)
            .await;
        report.record_selection(selected);
    }

    async fn select_gender(&self, entrant: &Entrant, ctx: &EntrantCtx) {
        let gender = entrant.gender.trim().to_lowercase();
        let radio = if gender.starts_with('f') {
            self.locators.gender_female_radio.as_ref()
        } else if gender.starts_with('m') {
            self.locators.gender_male_radio.as_ref()
        } else {
            None
        };

        if let Some(locator) = radio {
            if self.check_once(locator).await {
                info!("{} ✓ 性别 = {}", ctx, entrant.gender);
                return;
            }
        }

        if let Some(container) = &self.locators.gender_container {
            if self.resolver.click(container).await {
                debug!("{} 已点击性别区域", ctx);
            } else {
                warn!("{} ⚠️ 性别区域点击失败", ctx);
            }
        }
    }

    /// 勾选"身心健康"两项声明，已勾选的不再点击
    ///
    /// 先按 id、再按显式定位器；都不能确认已勾选时才按标签文本查找。
    async fn ensure_fitness(&self, ctx: &EntrantCtx) {
        let page = self.resolver.page();
        let l = &self.locators;

        let scope = match &l.fitness_container {
            Some(container) => self.resolver.find_now(container).await,
            None => None,
        };
        for (text, id, locator) in [
            ("mentally", &l.mentally_checkbox_id, &l.mentally_checkbox),
            ("physically", &l.physically_checkbox_id, &l.physically_checkbox),
        ] {
            if self
                .check_known_box(ctx, id.as_deref(), locator.as_ref())
                .await
            {
                continue;
            }
            let checked = match page.check_by_label(scope.as_ref(), text).await {
                Ok(true) => true,
                _ if scope.is_some() => page.check_by_label(None, text).await.unwrap_or(false),
                _ => false,
            };
            if !checked {
                warn!("{} ⚠️ 未能勾选健康声明: {}", ctx, text);
            }
        }
    }

    /// 按 id 和显式定位器勾选，返回是否已确认勾选
    async fn check_known_box(
        &self,
        ctx: &EntrantCtx,
        id: Option<&str>,
        locator: Option<&Locator>,
    ) -> bool {
        let page = self.resolver.page();
        let mut targets = Vec::new();
        if let Some(id) = id {
            targets.push(Selector::Id(id.to_string()));
        }
        if let Some(locator) = locator {
            if let Some(selector) = self.resolver.find_now(locator).await {
                targets.push(selector);
            }
        }

        for selector in targets {
            match page.is_checked(&selector).await {
                Ok(Some(true)) => return true,
                Ok(Some(false)) => {
                    if let Err(e) = page.click(&selector).await {
                        debug!("{} 勾选 {} 失败: {}", ctx, selector, e);
                    }
                    if let Ok(Some(true)) = page.is_checked(&selector).await {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    async fn fill_address(
        &self,
        entrant: &Entrant,
        ctx: &EntrantCtx,
        mode: AddressMode,
        report: &mut FillReport,
    ) {
        let l = &self.locators;

        let country = match (entrant.country.trim(), mode) {
            ("", AddressMode::Full) => DEFAULT_COUNTRY,
            (country, _) => country,
        };
        if let (Some(locator), false) = (&l.country_dropdown, country.is_empty()) {
            let selected = self
                .dropdowns
                .select(&label(ctx, "国家"), locator, country)
                .await;
            report.record_selection(selected);
        }

        // 州和区的选项依赖上一级的选择，先等选项加载
        for (name, locator, value) in [
            ("州", &l.state_dropdown, &entrant.state),
            ("区", &l.district_dropdown, &entrant.district),
        ] {
            let (Some(locator), false) = (locator, value.trim().is_empty()) else {
                continue;
            };
            let field = label(ctx, name);
            self.dropdowns
                .wait_for_ready(&field, locator, Some(value), 2)
                .await;
            report.record_selection(self.dropdowns.select(&field, locator, value).await);
        }

        self.fill_city(entrant, ctx, report).await;

        for (name, locator, value) in [
            ("街道", &l.street_input, &entrant.street),
            ("门牌号", &l.doorno_input, &entrant.doorno),
            ("邮编", &l.pincode_input, &entrant.pincode),
        ] {
            if let Some(locator) = locator {
                report.record(
                    self.filler
                        .set_if_empty(&label(ctx, name), locator, value)
                        .await,
                );
            }
        }

        self.select_temple(entrant, ctx, mode, report).await;
    }

    /// 城市：有下拉框先选，选完回读输入框，不一致再直接输入
    async fn fill_city(&self, entrant: &Entrant, ctx: &EntrantCtx, report: &mut FillReport) {
        let city = entrant.city.trim();
        if city.is_empty() {
            return;
        }
        let field = label(ctx, "城市");

        if let Some(dropdown) = &self.locators.city_dropdown {
            let selected = self.dropdowns.select(&field, dropdown, city).await;
            let Some(input) = &self.locators.city_input else {
                report.record_selection(selected);
                return;
            };
            let current = self.resolver.read_now(input).await.unwrap_or_default();
            if normalize(&current) == normalize(city) {
                report.record_selection(true);
                return;
            }
            debug!("{} 城市下拉框选择后输入框为 '{}'，改为直接输入", ctx, current);
        }

        if let Some(input) = &self.locators.city_input {
            report.record(self.filler.set_if_empty(&field, input, city).await);
        }
    }

    /// 最近的 TTD 寺庙：按配置值选择；领队选不上时随机选一个，再不行用键盘
    async fn select_temple(
        &self,
        entrant: &Entrant,
        ctx: &EntrantCtx,
        mode: AddressMode,
        report: &mut FillReport,
    ) {
        let Some(locator) = &self.locators.nearest_ttd_temple_dropdown else {
            return;
        };
        let field = label(ctx, "最近的 TTD 寺庙");
        let wanted = entrant.nearest_ttd_temple.trim();

        if !wanted.is_empty() && self.dropdowns.select(&field, locator, wanted).await {
            report.record_selection(true);
            return;
        }
        if mode != AddressMode::Full {
            if !wanted.is_empty() {
                report.record_selection(false);
            }
            return;
        }
        if self.dropdowns.current_selection(locator).await.is_some() {
            return;
        }

        let picked = self.dropdowns.pick_random(&field, locator).await
            || self
                .dropdowns
                .keyboard_select(&field, locator, TEMPLE_KEYBOARD_DOWNS)
                .await;
        if !picked {
            warn!("{} ⚠️ 无法选择最近的 TTD 寺庙", ctx);
        }
        report.record_selection(picked);
    }

    /// 单选框/复选框：未选中才点击，返回是否找到
    async fn check_once(&self, locator: &Locator) -> bool {
        let Some(selector) = self.resolver.find_now(locator).await else {
            return false;
        };
        let page = self.resolver.page();
        match page.is_checked(&selector).await {
            Ok(Some(true)) => true,
            _ => page.click(&selector).await.unwrap_or(false),
        }
    }
}

fn label(ctx: &EntrantCtx, field: &str) -> String {
    format!("{} {}", ctx, field)
}
