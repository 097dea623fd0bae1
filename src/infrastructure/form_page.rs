//! 页面能力接口 - 基础设施层
//!
//! 服务层只通过 [`FormPage`] 接触页面。每次调用都按选择器重新解析元素，
//! 不在调用之间持有元素句柄。

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::locator::Selector;

/// 元素在视口中的位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// 页面上的一个可点击选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayOption {
    /// 页面内给选项打的临时标记，用于随后点击
    pub token: String,
    pub text: String,
}

/// 一个可见的下拉浮层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayPanel {
    pub rect: Rect,
    pub options: Vec<OverlayOption>,
}

/// 发给当前焦点元素的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    Enter,
    Escape,
    Tab,
    Backspace,
    /// Ctrl+A
    SelectAll,
    Char(char),
}

/// 页面能力
///
/// 找不到元素时返回 `Ok(false)` / `Ok(None)` / 空值，而不是错误；
/// `Err` 只表示与浏览器的通信失败。
#[async_trait]
pub trait FormPage: Send + Sync {
    /// 元素是否存在
    async fn is_present(&self, selector: &Selector) -> AppResult<bool>;

    /// 元素是否可见且可用（可点击）
    async fn is_interactable(&self, selector: &Selector) -> AppResult<bool>;

    /// 小写标签名
    async fn tag_name(&self, selector: &Selector) -> AppResult<Option<String>>;

    /// 当前值：输入框取 value，原生下拉框取选中项文本，其他元素取内部输入框的值或可见文本
    async fn read_value(&self, selector: &Selector) -> AppResult<String>;

    /// 原生下拉框的全部选项文本
    async fn native_options(&self, selector: &Selector) -> AppResult<Vec<String>>;

    /// 按下标选中原生下拉框的选项，并触发 change
    async fn choose_native_option(&self, selector: &Selector, index: usize) -> AppResult<bool>;

    /// 滚动到视口中央后点击，失败时改用脚本点击
    async fn click(&self, selector: &Selector) -> AppResult<bool>;

    /// 聚焦元素
    async fn focus(&self, selector: &Selector) -> AppResult<bool>;

    /// 向元素输入文本（先聚焦）
    async fn type_text(&self, selector: &Selector, text: &str) -> AppResult<bool>;

    /// 向当前焦点发送一次按键
    async fn press_key(&self, key: Key) -> AppResult<()>;

    /// 直接赋值并派发 input/change 事件
    async fn force_value(&self, selector: &Selector, value: &str) -> AppResult<bool>;

    async fn bounding_box(&self, selector: &Selector) -> AppResult<Option<Rect>>;

    /// 当前可见的下拉浮层及其中的选项
    async fn overlay_panels(&self) -> AppResult<Vec<OverlayPanel>>;

    /// 全页面范围内可见的选项类元素
    async fn page_options(&self) -> AppResult<Vec<OverlayOption>>;

    /// 点击之前由 `overlay_panels` / `page_options` 返回的选项
    async fn click_option(&self, token: &str) -> AppResult<bool>;

    /// 复选框/单选框是否已选中；找不到返回 `None`
    async fn is_checked(&self, selector: &Selector) -> AppResult<Option<bool>>;

    /// 在范围内（`None` 表示全页面）按标签文本找到复选框并勾选
    async fn check_by_label(&self, scope: Option<&Selector>, label: &str) -> AppResult<bool>;

    /// 设置文件输入框；`input` 为 `None` 时使用页面上第一个文件输入框
    async fn attach_file(&self, input: Option<&Selector>, path: &Path) -> AppResult<bool>;

    /// 当前页面地址；会话断开时返回错误
    async fn current_url(&self) -> AppResult<String>;

    /// PNG 截图
    async fn screenshot(&self) -> AppResult<Vec<u8>>;
}
