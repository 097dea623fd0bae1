//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和"操作表单控件"的能力

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppResult, SessionError};
use crate::infrastructure::form_page::{FormPage, Key, OverlayOption, OverlayPanel, Rect};
use crate::infrastructure::scripts;
use crate::models::locator::Selector;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 实现 [`FormPage`]，不认识成员/表单字段
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 脚本返回 `undefined` / `null` 时得到 `JsonValue::Null`
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 在选择器指向的元素上执行脚本体（`el` 为元素）
    async fn eval_on(&self, selector: &Selector, body: &str) -> AppResult<JsonValue> {
        let selector_json = serde_json::to_string(selector)?;
        self.eval(scripts::on_element(&selector_json, body)).await
    }

    async fn eval_flag(&self, selector: &Selector, body: &str) -> AppResult<bool> {
        Ok(self.eval_on(selector, body).await?.as_bool().unwrap_or(false))
    }

    /// 用 CDP 查找元素，找不到返回 None
    async fn element(&self, selector: &Selector) -> Option<Element> {
        let found = match selector {
            Selector::XPath(xpath) => self.page.find_xpath(xpath.as_str()).await,
            Selector::Css(css) => self.page.find_element(css.as_str()).await,
            Selector::Id(id) => self.page.find_element(attr_selector("id", id)).await,
            Selector::Name(name) => self.page.find_element(attr_selector("name", name)).await,
        };
        found.ok()
    }

    async fn dispatch_key(&self, params: DispatchKeyEventParams) -> AppResult<()> {
        self.page.execute(params).await?;
        Ok(())
    }
}

/// `[attr="value"]` 形式的 CSS 选择器
fn attr_selector(attr: &str, value: &str) -> String {
    format!(
        "[{}=\"{}\"]",
        attr,
        value.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

/// 按键对应的 (key, code, 虚拟键码, 文本)
fn key_definition(key: Key) -> (String, String, i64, Option<String>) {
    match key {
        Key::ArrowDown => ("ArrowDown".into(), "ArrowDown".into(), 40, None),
        Key::Enter => ("Enter".into(), "Enter".into(), 13, Some("\r".into())),
        Key::Escape => ("Escape".into(), "Escape".into(), 27, None),
        Key::Tab => ("Tab".into(), "Tab".into(), 9, None),
        Key::Backspace => ("Backspace".into(), "Backspace".into(), 8, None),
        Key::SelectAll => ("a".into(), "KeyA".into(), 65, None),
        Key::Char(ch) => {
            let code = if ch.is_ascii_digit() {
                format!("Digit{}", ch)
            } else if ch.is_ascii_alphabetic() {
                format!("Key{}", ch.to_ascii_uppercase())
            } else {
                String::new()
            };
            let vk = if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase() as i64
            } else {
                0
            };
            (ch.to_string(), code, vk, Some(ch.to_string()))
        }
    }
}

#[async_trait]
impl FormPage for JsExecutor {
    async fn is_present(&self, selector: &Selector) -> AppResult<bool> {
        self.eval_flag(selector, "return true;").await
    }

    async fn is_interactable(&self, selector: &Selector) -> AppResult<bool> {
        self.eval_flag(selector, scripts::IS_INTERACTABLE).await
    }

    async fn tag_name(&self, selector: &Selector) -> AppResult<Option<String>> {
        let value = self
            .eval_on(selector, "return el.tagName.toLowerCase();")
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn read_value(&self, selector: &Selector) -> AppResult<String> {
        let value = self.eval_on(selector, scripts::READ_VALUE).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn native_options(&self, selector: &Selector) -> AppResult<Vec<String>> {
        let value = self.eval_on(selector, scripts::NATIVE_OPTIONS).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn choose_native_option(&self, selector: &Selector, index: usize) -> AppResult<bool> {
        let body = format!(
            "const o = el.options[{}]; if (!o) return false; __setValue(el, o.value); return true;",
            index
        );
        self.eval_flag(selector, &body).await
    }

    async fn click(&self, selector: &Selector) -> AppResult<bool> {
        if !self
            .eval_flag(selector, "el.scrollIntoView({block: 'center'}); return true;")
            .await?
        {
            return Ok(false);
        }
        if let Some(element) = self.element(selector).await {
            match element.click().await {
                Ok(_) => return Ok(true),
                Err(e) => debug!("原生点击失败，改用脚本点击: {}", e),
            }
        }
        self.eval_flag(selector, "el.click(); return true;").await
    }

    async fn focus(&self, selector: &Selector) -> AppResult<bool> {
        self.eval_flag(
            selector,
            "el.scrollIntoView({block: 'center'}); el.focus(); return true;",
        )
        .await
    }

    async fn type_text(&self, selector: &Selector, text: &str) -> AppResult<bool> {
        if !self.focus(selector).await? {
            return Ok(false);
        }
        match self.element(selector).await {
            Some(element) => {
                element.type_str(text).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn press_key(&self, key: Key) -> AppResult<()> {
        let (name, code, vk, text) = key_definition(key);
        let modifiers = if key == Key::SelectAll { 2 } else { 0 };

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(name.clone())
            .code(code.clone())
            .windows_virtual_key_code(vk)
            .native_virtual_key_code(vk)
            .modifiers(modifiers);
        if let Some(text) = &text {
            down = down.text(text.clone());
        }
        self.dispatch_key(down.build().map_err(SessionError::Command)?)
            .await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(name)
            .code(code)
            .windows_virtual_key_code(vk)
            .native_virtual_key_code(vk)
            .modifiers(modifiers)
            .build()
            .map_err(SessionError::Command)?;
        self.dispatch_key(up).await
    }

    async fn force_value(&self, selector: &Selector, value: &str) -> AppResult<bool> {
        let body = format!(
            "__setValue(el, {}); return true;",
            serde_json::to_string(value)?
        );
        self.eval_flag(selector, &body).await
    }

    async fn bounding_box(&self, selector: &Selector) -> AppResult<Option<Rect>> {
        let value = self.eval_on(selector, "return __rect(el);").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn overlay_panels(&self) -> AppResult<Vec<OverlayPanel>> {
        self.eval_as(scripts::with_prelude(scripts::OVERLAY_PANELS))
            .await
    }

    async fn page_options(&self) -> AppResult<Vec<OverlayOption>> {
        self.eval_as(scripts::with_prelude(scripts::PAGE_OPTIONS)).await
    }

    async fn click_option(&self, token: &str) -> AppResult<bool> {
        let selector = Selector::Css(attr_selector("data-autofill-opt", token));
        self.click(&selector).await
    }

    async fn is_checked(&self, selector: &Selector) -> AppResult<Option<bool>> {
        Ok(self.eval_on(selector, scripts::IS_CHECKED).await?.as_bool())
    }

    async fn check_by_label(&self, scope: Option<&Selector>, label: &str) -> AppResult<bool> {
        let scope_json = match scope {
            Some(selector) => serde_json::to_string(selector)?,
            None => "null".to_string(),
        };
        let script = scripts::with_prelude(scripts::CHECK_BY_LABEL)
            .replace("SCOPE_HERE", &scope_json)
            .replace("LABEL_HERE", &serde_json::to_string(label)?);
        Ok(self.eval(script).await?.as_bool().unwrap_or(false))
    }

    async fn attach_file(&self, input: Option<&Selector>, path: &Path) -> AppResult<bool> {
        let element = match input {
            Some(selector) => self.element(selector).await,
            None => None,
        };
        let element = match element {
            Some(element) => element,
            None => match self.page.find_element("input[type='file']").await {
                Ok(element) => element,
                Err(_) => return Ok(false),
            },
        };

        let params = SetFileInputFilesParams::builder()
            .files(vec![path.to_string_lossy().to_string()])
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(SessionError::Command)?;
        self.page.execute(params).await?;
        Ok(true)
    }

    async fn current_url(&self) -> AppResult<String> {
        let value = self.eval("window.location.href").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&self) -> AppResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        Ok(self.page.screenshot(params).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_selector_escapes_quotes() {
        assert_eq!(attr_selector("id", "dob"), "[id=\"dob\"]");
        assert_eq!(attr_selector("name", "a\"b"), "[name=\"a\\\"b\"]");
    }

    #[test]
    fn test_digit_key_definition() {
        let (key, code, vk, text) = key_definition(Key::Char('7'));
        assert_eq!(key, "7");
        assert_eq!(code, "Digit7");
        assert_eq!(vk, '7' as i64);
        assert_eq!(text.as_deref(), Some("7"));
    }

    #[test]
    fn test_select_all_has_no_text() {
        let (_, code, vk, text) = key_definition(Key::SelectAll);
        assert_eq!(code, "KeyA");
        assert_eq!(vk, 65);
        assert!(text.is_none());
    }
}
