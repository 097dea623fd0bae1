//! 表单定位器
//!
//! 每个逻辑字段对应一个 [`Locator`]：一个主选择器 + 若干备用选择器。
//! 字段集合是固定的 [`FormLocatorMap`]，加载时校验一次，运行期间不可变。

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ConfigError};

static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@id\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@name\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// 单一定位方式
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Selector {
    XPath(String),
    Css(String),
    Id(String),
    Name(String),
}

impl Selector {
    /// 从字符串解析：`id=` / `name=` / `css=` 前缀，`/` 或 `(` 开头视为 XPath，其余视为 CSS
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(v) = raw.strip_prefix("id=") {
            Selector::Id(v.to_string())
        } else if let Some(v) = raw.strip_prefix("name=") {
            Selector::Name(v.to_string())
        } else if let Some(v) = raw.strip_prefix("css=") {
            Selector::Css(v.to_string())
        } else if let Some(v) = raw.strip_prefix("xpath=") {
            Selector::XPath(v.to_string())
        } else if raw.starts_with('/') || raw.starts_with('(') {
            Selector::XPath(raw.to_string())
        } else {
            Selector::Css(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selector::XPath(v) | Selector::Css(v) | Selector::Id(v) | Selector::Name(v) => {
                v.trim().is_empty()
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::XPath(v) => write!(f, "{}", v),
            Selector::Css(v) => write!(f, "css={}", v),
            Selector::Id(v) => write!(f, "id={}", v),
            Selector::Name(v) => write!(f, "name={}", v),
        }
    }
}

/// 一个控件的定位描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LocatorRepr", into = "LocatorRepr")]
pub struct Locator {
    pub primary: Selector,
    pub alternates: Vec<Selector>,
}

impl Locator {
    pub fn new(primary: Selector) -> Self {
        Self {
            primary,
            alternates: Vec::new(),
        }
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::new(Selector::XPath(xpath.into()))
    }

    pub fn with_alternate(mut self, alternate: Selector) -> Self {
        self.alternates.push(alternate);
        self
    }

    /// 主选择器之后依次尝试的备用选择器
    ///
    /// 顺序：显式配置的备用项 → XPath 末级步骤中的 `@id` → `@name` → CSS `#id`，去重。
    /// 只看末级步骤，`//*[@id="__next"]/div/button` 这类路径不会退化成 `#__next`。
    pub fn fallbacks(&self) -> Vec<Selector> {
        let mut out: Vec<Selector> = self.alternates.clone();
        if let Selector::XPath(xpath) = &self.primary {
            let step = last_step(xpath);
            let id = ID_ATTR.captures(step).map(|c| c[1].to_string());
            if let Some(id) = &id {
                out.push(Selector::Id(id.clone()));
            }
            if let Some(c) = NAME_ATTR.captures(step) {
                out.push(Selector::Name(c[1].to_string()));
            }
            if let Some(id) = id {
                out.push(Selector::Css(format!("#{}", id)));
            }
        }
        let mut seen = Vec::with_capacity(out.len());
        out.retain(|s| {
            if *s == self.primary || seen.contains(s) {
                false
            } else {
                seen.push(s.clone());
                true
            }
        });
        out
    }
}

/// XPath 的最后一个步骤（忽略谓词方括号内的 `/`）
fn last_step(xpath: &str) -> &str {
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in xpath.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => start = i + 1,
            _ => {}
        }
    }
    &xpath[start..]
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)
    }
}

/// 配置文件中的定位器写法：纯字符串，或 `{ primary, alternates }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocatorRepr {
    Plain(String),
    Full {
        primary: String,
        #[serde(default)]
        alternates: Vec<String>,
    },
}

impl TryFrom<LocatorRepr> for Locator {
    type Error = String;

    fn try_from(repr: LocatorRepr) -> Result<Self, Self::Error> {
        let (primary, alternates) = match repr {
            LocatorRepr::Plain(p) => (p, Vec::new()),
            LocatorRepr::Full {
                primary,
                alternates,
            } => (primary, alternates),
        };
        let primary = Selector::parse(&primary);
        if primary.is_empty() {
            return Err("primary selector is empty".to_string());
        }
        Ok(Self {
            primary,
            alternates: alternates
                .iter()
                .map(|a| Selector::parse(a))
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

impl From<Locator> for LocatorRepr {
    fn from(locator: Locator) -> Self {
        let primary = match &locator.primary {
            Selector::XPath(v) => v.clone(),
            other => other.to_string(),
        };
        if locator.alternates.is_empty() {
            LocatorRepr::Plain(primary)
        } else {
            LocatorRepr::Full {
                primary,
                alternates: locator.alternates.iter().map(|s| s.to_string()).collect(),
            }
        }
    }
}

/// 逻辑字段名 -> 定位器（领队 + N 位成员共用的一张表单）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLocatorMap {
    pub photo_trigger: Option<Locator>,
    pub photo_file_input: Option<Locator>,
    pub id_proof_type_dropdown: Option<Locator>,
    pub id_proof_number_input: Option<Locator>,
    pub name_input: Option<Locator>,
    pub dob_input: Option<Locator>,
    pub age_input: Option<Locator>,
    pub mobile_input: Option<Locator>,
    pub email_input: Option<Locator>,
    pub blood_group_dropdown: Option<Locator>,
    pub gender_container: Option<Locator>,
    pub gender_male_radio: Option<Locator>,
    pub gender_female_radio: Option<Locator>,
    pub fitness_container: Option<Locator>,
    pub mentally_checkbox: Option<Locator>,
    pub physically_checkbox: Option<Locator>,
    pub mentally_checkbox_id: Option<String>,
    pub physically_checkbox_id: Option<String>,
    pub country_dropdown: Option<Locator>,
    pub state_dropdown: Option<Locator>,
    pub district_dropdown: Option<Locator>,
    pub city_dropdown: Option<Locator>,
    pub city_input: Option<Locator>,
    pub street_input: Option<Locator>,
    pub doorno_input: Option<Locator>,
    pub pincode_input: Option<Locator>,
    pub nearest_ttd_temple_dropdown: Option<Locator>,
    pub save_add_sevak_button: Option<Locator>,
    pub continue_button: Option<Locator>,
}

impl Default for FormLocatorMap {
    fn default() -> Self {
        let by_id = |id: &str| Some(Locator::xpath(format!("//*[@id=\"{}\"]", id)));
        Self {
            photo_trigger: Some(Locator::xpath(
                "//*[@id=\"__next\"]/div/main/div/div/div/div[1]/div[1]/div[1]/div[1]/img",
            )),
            photo_file_input: None,
            id_proof_type_dropdown: by_id("idType"),
            id_proof_number_input: by_id("idNumber"),
            name_input: by_id("sevakName"),
            dob_input: by_id("dob"),
            age_input: by_id("age"),
            mobile_input: by_id("mobileNo"),
            email_input: by_id("email"),
            blood_group_dropdown: None,
            gender_container: Some(Locator::xpath(
                "//*[@id=\"__next\"]/div/main/div/div/div/div[1]/div/div/div/div",
            )),
            gender_male_radio: None,
            gender_female_radio: None,
            fitness_container: by_id("fitness"),
            mentally_checkbox: None,
            physically_checkbox: Some(Locator::xpath("//*[@id=\"fitness\"]/div/label[2]")),
            mentally_checkbox_id: Some("mentally".to_string()),
            physically_checkbox_id: Some("physically".to_string()),
            country_dropdown: by_id("country"),
            state_dropdown: by_id("state"),
            district_dropdown: by_id("district"),
            city_dropdown: None,
            city_input: by_id("city"),
            street_input: by_id("street"),
            doorno_input: by_id("doorNo"),
            pincode_input: by_id("pincode"),
            nearest_ttd_temple_dropdown: by_id("nearestTtdTemple"),
            save_add_sevak_button: Some(Locator::xpath(
                "//*[@id=\"__next\"]/div/main/div/div/div/div/button/span",
            )),
            continue_button: Some(Locator::xpath("//*[@id=\"__next\"]/div/main/div/div/button")),
        }
    }
}

impl FormLocatorMap {
    /// 校验：空白表单检测依赖姓名和证件号输入框，必须配置
    pub fn validate(&self) -> AppResult<()> {
        for (field, locator) in [
            ("name_input", &self.name_input),
            ("id_proof_number_input", &self.id_proof_number_input),
        ] {
            if locator.is_none() {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    reason: "必须配置".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// 页面就绪检测使用的锚点字段
    pub fn anchors(&self) -> Vec<&Locator> {
        [
            &self.id_proof_type_dropdown,
            &self.id_proof_number_input,
            &self.name_input,
            &self.mobile_input,
            &self.email_input,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// 判定"表单已清空"时检查的字段（姓名 + 证件号）
    pub fn blank_probe_fields(&self) -> Vec<&Locator> {
        [&self.name_input, &self.id_proof_number_input]
            .into_iter()
            .flatten()
            .collect()
    }

    /// 可能被网站自动回填的文本输入框
    pub fn autofill_fields(&self) -> Vec<&Locator> {
        [
            &self.name_input,
            &self.dob_input,
            &self.age_input,
            &self.mobile_input,
            &self.email_input,
            &self.city_input,
            &self.street_input,
            &self.doorno_input,
            &self.pincode_input,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// 降级清空时需要清掉的全部文本输入框
    pub fn clearable_fields(&self) -> Vec<&Locator> {
        let mut fields = vec![&self.name_input, &self.id_proof_number_input];
        fields.extend([
            &self.dob_input,
            &self.age_input,
            &self.mobile_input,
            &self.email_input,
            &self.city_input,
            &self.street_input,
            &self.doorno_input,
            &self.pincode_input,
        ]);
        fields.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse_prefixes() {
        assert_eq!(Selector::parse("id=dob"), Selector::Id("dob".to_string()));
        assert_eq!(Selector::parse("name=email"), Selector::Name("email".to_string()));
        assert_eq!(
            Selector::parse("//*[@id=\"dob\"]"),
            Selector::XPath("//*[@id=\"dob\"]".to_string())
        );
        assert_eq!(Selector::parse("#dob"), Selector::Css("#dob".to_string()));
    }

    #[test]
    fn test_fallbacks_extract_id_and_name() {
        let locator = Locator::xpath("//input[@id=\"idNumber\" and @name='idNo']");
        assert_eq!(
            locator.fallbacks(),
            vec![
                Selector::Id("idNumber".to_string()),
                Selector::Name("idNo".to_string()),
                Selector::Css("#idNumber".to_string()),
            ]
        );
    }

    #[test]
    fn test_fallbacks_keep_explicit_alternates_first_and_dedup() {
        let locator = Locator::xpath("//*[@id=\"city\"]")
            .with_alternate(Selector::Id("city".to_string()))
            .with_alternate(Selector::Css("input.city".to_string()));
        assert_eq!(
            locator.fallbacks(),
            vec![
                Selector::Id("city".to_string()),
                Selector::Css("input.city".to_string()),
                Selector::Css("#city".to_string()),
            ]
        );
    }

    #[test]
    fn test_ancestor_id_is_not_used_as_fallback() {
        let locator = Locator::xpath("//*[@id=\"__next\"]/div/main/div/div/button");
        assert!(locator.fallbacks().is_empty());

        let locator = Locator::xpath("//div[@class='a/b']/input[@name=\"mobile\"]");
        assert_eq!(locator.fallbacks(), vec![Selector::Name("mobile".to_string())]);
    }

    #[test]
    fn test_css_primary_has_no_derived_fallbacks() {
        assert!(Locator::new(Selector::Css("#x".to_string())).fallbacks().is_empty());
    }

    #[test]
    fn test_default_map_is_valid_and_has_anchors() {
        let map = FormLocatorMap::default();
        map.validate().unwrap();
        assert_eq!(map.anchors().len(), 5);
        assert_eq!(map.blank_probe_fields().len(), 2);
    }

    #[test]
    fn test_missing_name_input_is_rejected() {
        let map = FormLocatorMap {
            name_input: None,
            ..FormLocatorMap::default()
        };
        assert!(map.validate().is_err());
    }
}
