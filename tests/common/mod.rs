//! 测试用的内存页面
//!
//! 以元素 id 为键模拟表单控件：文本框、带日期掩码的输入框、原生下拉框、
//! 自定义浮层下拉框和复选框。只识别 `id=`、`#id` 和 `//*[@id="..."]` 三种选择器。

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use srivari_autofill::error::{AppResult, SessionError};
use srivari_autofill::infrastructure::{FormPage, Key, OverlayOption, OverlayPanel, Rect};
use srivari_autofill::models::{Entrant, LocatorProfile, Selector, UiTimings};
use srivari_autofill::services::{FillPolicyState, SharedFillPolicy};
use tokio::sync::RwLock;

pub const FORM_URL: &str = "https://ttdevasthanams.ap.gov.in/srivari/leader";

pub const STATES: [&str; 3] = ["Select State", "Andhra Pradesh", "Telangana"];

#[derive(Debug, Clone, PartialEq)]
enum Widget {
    Input { masked_date: bool },
    Select { options: Vec<String> },
    Custom { options: Vec<String>, panel_above: bool },
    Checkbox,
    /// 页面脚本不停把值重置回空，任何写入都不生效
    Frozen,
}

#[derive(Debug, Clone)]
struct Element {
    widget: Widget,
    value: String,
    checked: bool,
}

#[derive(Debug, Default)]
struct State {
    elements: HashMap<String, Element>,
    focused: Option<String>,
    open: Option<String>,
    select_all: bool,
    cursor: usize,
    typed: Vec<(String, String)>,
    keys: Vec<Key>,
    clicked_options: Vec<String>,
    attached: Vec<PathBuf>,
    saved: Vec<String>,
    label_checks: Vec<String>,
    kill_on_typing: Option<String>,
    /// 浮层只显示干扰文本的自定义下拉框 → (干扰文本, 真实选项能否被全页面搜索找到)
    noise_panels: HashMap<String, (Vec<String>, bool)>,
    alive: bool,
}

/// 内存表单页面
pub struct FakePage {
    state: Mutex<State>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                alive: true,
                ..State::default()
            }),
        }
    }
}

impl FakePage {
    /// 与默认定位配置对应的 Srivari Seva 表单
    pub fn ttd_form() -> Self {
        let page = Self::default();
        page.add_select("idType", &["Select", "Aadhaar", "Passport"]);
        for id in [
            "idNumber", "sevakName", "age", "mobileNo", "email", "city", "street", "doorNo",
            "pincode",
        ] {
            page.add_input(id);
        }
        page.add_masked_date("dob");
        page.add_select("state", &STATES);
        page.add_checkbox("mentally");
        page.add_checkbox("physically");
        page
    }

    pub fn add_input(&self, id: &str) {
        self.insert(id, Widget::Input { masked_date: false });
    }

    pub fn add_masked_date(&self, id: &str) {
        self.insert(id, Widget::Input { masked_date: true });
    }

    pub fn add_select(&self, id: &str, options: &[&str]) {
        self.insert(
            id,
            Widget::Select {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        );
    }

    pub fn add_custom(&self, id: &str, options: &[&str], panel_above: bool) {
        self.insert(
            id,
            Widget::Custom {
                options: options.iter().map(|o| o.to_string()).collect(),
                panel_above,
            },
        );
    }

    pub fn add_checkbox(&self, id: &str) {
        self.insert(id, Widget::Checkbox);
    }

    pub fn add_frozen(&self, id: &str) {
        self.insert(id, Widget::Frozen);
    }

    /// 让 `id` 的浮层只显示 `noise`；`page_wide` 为 true 时真实选项散落在页面别处
    pub fn show_noise_panel(&self, id: &str, noise: &[&str], page_wide: bool) {
        self.lock().noise_panels.insert(
            id.to_string(),
            (noise.iter().map(|n| n.to_string()).collect(), page_wide),
        );
    }

    pub fn remove(&self, id: &str) {
        self.lock().elements.remove(id);
    }

    pub fn set_checked(&self, id: &str, checked: bool) {
        if let Some(el) = self.lock().elements.get_mut(id) {
            el.checked = checked;
        }
    }

    pub fn set_value(&self, id: &str, value: &str) {
        if let Some(el) = self.lock().elements.get_mut(id) {
            el.value = value.to_string();
        }
    }

    pub fn value(&self, id: &str) -> String {
        self.lock()
            .elements
            .get(id)
            .map(|el| el.value.clone())
            .unwrap_or_default()
    }

    pub fn checked(&self, id: &str) -> bool {
        self.lock().elements.get(id).is_some_and(|el| el.checked)
    }

    /// 通过键入写进 `id` 的全部文本
    pub fn typed(&self, id: &str) -> Vec<String> {
        self.lock()
            .typed
            .iter()
            .filter(|(field, _)| field == id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.lock().keys.clone()
    }

    pub fn clicked_options(&self) -> Vec<String> {
        self.lock().clicked_options.clone()
    }

    pub fn attached(&self) -> Vec<PathBuf> {
        self.lock().attached.clone()
    }

    /// 按标签文本勾选的调用记录
    pub fn label_checks(&self) -> Vec<String> {
        self.lock().label_checks.clone()
    }

    /// 操作员点击"保存并添加"：记录姓名，网站重置整张表单
    pub fn operator_save(&self) {
        let mut state = self.lock();
        let name = state
            .elements
            .get("sevakName")
            .map(|el| el.value.clone())
            .unwrap_or_default();
        if name.is_empty() {
            return;
        }
        state.saved.push(name);
        for el in state.elements.values_mut() {
            el.value.clear();
            el.checked = false;
        }
    }

    pub fn saved(&self) -> Vec<String> {
        self.lock().saved.clone()
    }

    /// 模拟用户关闭浏览器
    pub fn kill(&self) {
        self.lock().alive = false;
    }

    /// 键入 `text` 的那一刻浏览器被关闭
    pub fn kill_on_typing(&self, text: &str) {
        self.lock().kill_on_typing = Some(text.to_string());
    }

    fn insert(&self, id: &str, widget: Widget) {
        self.lock().elements.insert(
            id.to_string(),
            Element {
                widget,
                value: String::new(),
                checked: false,
            },
        );
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn find(&self, selector: &Selector) -> Option<(String, Element)> {
        let id = element_id(selector)?;
        let state = self.lock();
        state.elements.get(&id).map(|el| (id, el.clone()))
    }
}

fn element_id(selector: &Selector) -> Option<String> {
    match selector {
        Selector::Id(id) => Some(id.clone()),
        Selector::Css(css) => css.strip_prefix('#').map(str::to_string),
        Selector::XPath(xpath) => xpath
            .strip_prefix("//*[@id=\"")
            .and_then(|rest| rest.strip_suffix("\"]"))
            .filter(|id| !id.contains('"'))
            .map(str::to_string),
        Selector::Name(_) => None,
    }
}

fn apply_date_mask(digits: &str) -> String {
    let digits: String = digits.chars().filter(|c| c.is_ascii_digit()).take(8).collect();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i == 2 || i == 4 {
            out.push('/');
        }
        out.push(ch);
    }
    out
}

fn tokens(id: &str, options: &[String]) -> Vec<OverlayOption> {
    options
        .iter()
        .enumerate()
        .map(|(i, text)| OverlayOption {
            token: format!("{}#{}", id, i),
            text: text.clone(),
        })
        .collect()
}

const TRIGGER: Rect = Rect {
    left: 0.0,
    top: 100.0,
    right: 200.0,
    bottom: 120.0,
};

#[async_trait]
impl FormPage for FakePage {
    async fn is_present(&self, selector: &Selector) -> AppResult<bool> {
        Ok(self.find(selector).is_some())
    }

    async fn is_interactable(&self, selector: &Selector) -> AppResult<bool> {
        Ok(self.find(selector).is_some())
    }

    async fn tag_name(&self, selector: &Selector) -> AppResult<Option<String>> {
        Ok(self.find(selector).map(|(_, el)| {
            match el.widget {
                Widget::Select { .. } => "select",
                Widget::Custom { .. } => "div",
                Widget::Input { .. } | Widget::Checkbox | Widget::Frozen => "input",
            }
            .to_string()
        }))
    }

    async fn read_value(&self, selector: &Selector) -> AppResult<String> {
        Ok(self.find(selector).map(|(_, el)| el.value).unwrap_or_default())
    }

    async fn native_options(&self, selector: &Selector) -> AppResult<Vec<String>> {
        Ok(match self.find(selector) {
            Some((_, Element { widget: Widget::Select { options }, .. })) => options,
            _ => Vec::new(),
        })
    }

    async fn choose_native_option(&self, selector: &Selector, index: usize) -> AppResult<bool> {
        let Some(id) = element_id(selector) else {
            return Ok(false);
        };
        let mut state = self.lock();
        let Some(el) = state.elements.get_mut(&id) else {
            return Ok(false);
        };
        let Widget::Select { options } = &el.widget else {
            return Ok(false);
        };
        match options.get(index) {
            Some(option) => {
                el.value = option.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn click(&self, selector: &Selector) -> AppResult<bool> {
        let Some((id, el)) = self.find(selector) else {
            return Ok(false);
        };
        let mut state = self.lock();
        state.focused = Some(id.clone());
        match el.widget {
            Widget::Custom { .. } => {
                state.open = Some(id);
                state.cursor = 0;
            }
            Widget::Checkbox => {
                if let Some(el) = state.elements.get_mut(&id) {
                    el.checked = !el.checked;
                }
            }
            _ => {}
        }
        Ok(true)
    }

    async fn focus(&self, selector: &Selector) -> AppResult<bool> {
        let Some((id, _)) = self.find(selector) else {
            return Ok(false);
        };
        self.lock().focused = Some(id);
        Ok(true)
    }

    async fn type_text(&self, selector: &Selector, text: &str) -> AppResult<bool> {
        let Some(id) = element_id(selector) else {
            return Ok(false);
        };
        let mut state = self.lock();
        let Some(el) = state.elements.get_mut(&id) else {
            return Ok(false);
        };
        if el.widget != Widget::Frozen {
            el.value.push_str(text);
        }
        state.focused = Some(id.clone());
        state.typed.push((id, text.to_string()));
        if state.kill_on_typing.as_deref() == Some(text) {
            state.alive = false;
        }
        Ok(true)
    }

    async fn press_key(&self, key: Key) -> AppResult<()> {
        let mut state = self.lock();
        state.keys.push(key);
        let Some(id) = state.focused.clone() else {
            return Ok(());
        };
        let select_all = std::mem::take(&mut state.select_all);
        let cursor = state.cursor;

        match key {
            Key::SelectAll => state.select_all = true,
            Key::Tab => state.focused = None,
            Key::Escape => state.open = None,
            Key::ArrowDown => state.cursor += 1,
            Key::Enter => {
                let Some(el) = state.elements.get_mut(&id) else {
                    return Ok(());
                };
                if let Widget::Custom { options, .. } = &el.widget {
                    if let Some(option) = options.get(cursor.saturating_sub(1)) {
                        el.value = option.clone();
                    }
                }
                state.open = None;
            }
            Key::Backspace => {
                if let Some(el) = state.elements.get_mut(&id) {
                    if select_all {
                        el.value.clear();
                    } else {
                        el.value.pop();
                    }
                }
            }
            Key::Char(ch) => {
                if let Some(el) = state.elements.get_mut(&id) {
                    if el.widget != Widget::Frozen {
                        el.value.push(ch);
                    }
                    if el.widget == (Widget::Input { masked_date: true }) {
                        el.value = apply_date_mask(&el.value);
                    }
                }
            }
        }
        Ok(())
    }

    async fn force_value(&self, selector: &Selector, value: &str) -> AppResult<bool> {
        let Some(id) = element_id(selector) else {
            return Ok(false);
        };
        match self.lock().elements.get_mut(&id) {
            Some(el) => {
                if el.widget != Widget::Frozen {
                    el.value = value.to_string();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn bounding_box(&self, selector: &Selector) -> AppResult<Option<Rect>> {
        Ok(self.find(selector).map(|_| TRIGGER))
    }

    async fn overlay_panels(&self) -> AppResult<Vec<OverlayPanel>> {
        let state = self.lock();
        let Some(id) = &state.open else {
            return Ok(Vec::new());
        };
        let Some(Element {
            widget: Widget::Custom {
                options,
                panel_above,
            },
            ..
        }) = state.elements.get(id)
        else {
            return Ok(Vec::new());
        };
        let top = if *panel_above { 10.0 } else { 125.0 };
        let options = match state.noise_panels.get(id) {
            Some((noise, _)) => noise
                .iter()
                .enumerate()
                .map(|(i, text)| OverlayOption {
                    token: format!("{}#n{}", id, i),
                    text: text.clone(),
                })
                .collect(),
            None => tokens(id, options),
        };
        Ok(vec![OverlayPanel {
            rect: Rect {
                left: 0.0,
                top,
                right: 200.0,
                bottom: top + 80.0,
            },
            options,
        }])
    }

    async fn page_options(&self) -> AppResult<Vec<OverlayOption>> {
        let state = self.lock();
        let Some(id) = &state.open else {
            return Ok(Vec::new());
        };
        match (state.noise_panels.get(id), state.elements.get(id)) {
            (
                Some((_, true)),
                Some(Element {
                    widget: Widget::Custom { options, .. },
                    ..
                }),
            ) => Ok(tokens(id, options)),
            _ => Ok(Vec::new()),
        }
    }

    async fn click_option(&self, token: &str) -> AppResult<bool> {
        let Some((id, index)) = token.rsplit_once('#') else {
            return Ok(false);
        };
        let index: usize = index.parse().unwrap_or(usize::MAX);
        let mut state = self.lock();
        state.clicked_options.push(token.to_string());
        let Some(el) = state.elements.get_mut(id) else {
            return Ok(false);
        };
        let Widget::Custom { options, .. } = &el.widget else {
            return Ok(false);
        };
        let Some(option) = options.get(index).cloned() else {
            return Ok(false);
        };
        el.value = option;
        state.open = None;
        Ok(true)
    }

    async fn is_checked(&self, selector: &Selector) -> AppResult<Option<bool>> {
        Ok(match self.find(selector) {
            Some((_, el)) if el.widget == Widget::Checkbox => Some(el.checked),
            _ => None,
        })
    }

    async fn check_by_label(&self, _scope: Option<&Selector>, label: &str) -> AppResult<bool> {
        let mut state = self.lock();
        state.label_checks.push(label.to_string());
        match state.elements.get_mut(label) {
            Some(el) if el.widget == Widget::Checkbox => {
                el.checked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn attach_file(&self, _input: Option<&Selector>, path: &Path) -> AppResult<bool> {
        self.lock().attached.push(path.to_path_buf());
        Ok(true)
    }

    async fn current_url(&self) -> AppResult<String> {
        if self.lock().alive {
            Ok(FORM_URL.to_string())
        } else {
            Err(SessionError::Command("target closed".to_string()).into())
        }
    }

    async fn screenshot(&self) -> AppResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// 默认定位配置，去掉在内存页面上会长时间等待的控件，界面节奏压到最短
pub fn test_profile() -> LocatorProfile {
    let mut profile = LocatorProfile::default();
    profile.locators.photo_trigger = None;
    profile.locators.gender_container = None;
    profile.locators.continue_button = None;
    profile.timings = UiTimings {
        open_delay_ms: 0,
        post_select_delay_ms: 0,
        key_delay_ms: 0,
        locate_timeout_ms: 20,
        fallback_timeout_ms: 5,
        probe_timeout_ms: 5,
        dependent_ready_timeout_ms: 50,
        poll_interval_ms: 10,
    };
    profile
}

pub fn fill_policy(respect_existing: bool) -> SharedFillPolicy {
    Arc::new(RwLock::new(FillPolicyState {
        respect_existing,
        autofill_wait: Duration::from_millis(20),
    }))
}

/// 第 `index` 位测试成员
pub fn entrant(index: usize) -> Entrant {
    Entrant {
        name: format!("Sevak {}", index),
        dob: "07-06-1995".to_string(),
        age: "30".to_string(),
        id_number: format!("4321 8765 {:04}", index),
        mobile: format!("98480{:05}", index),
        email: format!("sevak{}@example.com", index),
        state: "Andhra Pradesh".to_string(),
        city: "Tirupati".to_string(),
        pincode: "517501".to_string(),
        ..Entrant::default()
    }
    .normalized()
}

pub fn entrants(count: usize) -> Vec<Entrant> {
    (1..=count).map(entrant).collect()
}
