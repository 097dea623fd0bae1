use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::models::entrant::Entrant;

/// 默认的自动填充等待秒数（输入证件号后网站可能自动回填）
pub const DEFAULT_AUTOFILL_WAIT_SECS: u64 = 6;

/// 预约配置文档中的 `general` 部分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// 团队人数上限
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub group_size: Option<usize>,
    /// 票据下载目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    /// 全部成员保存后自动点击"继续"
    #[serde(alias = "auto_continue")]
    pub auto_select_date: bool,
    /// 期望浏览器自动下载票据
    pub auto_download_ticket: bool,
    /// 不覆盖已有值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respect_existing: Option<bool>,
    /// 输入证件号后等待网站回填的秒数
    #[serde(
        alias = "aadhaar_autofill_wait_seconds",
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub autofill_wait_seconds: Option<usize>,
}

impl GeneralSettings {
    /// 生效的团队人数上限（0 或未设置表示不限）
    pub fn group_limit(&self) -> Option<usize> {
        self.group_size.filter(|n| *n > 0)
    }

    pub fn respect_existing(&self) -> bool {
        self.respect_existing.unwrap_or(true)
    }

    pub fn autofill_wait_secs(&self) -> u64 {
        self.autofill_wait_seconds
            .map(|n| n as u64)
            .unwrap_or(DEFAULT_AUTOFILL_WAIT_SECS)
    }
}

/// 预约配置文档：团队设置 + 有序成员列表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingConfig {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub members: Vec<Entrant>,
}

impl BookingConfig {
    /// 领队（第 1 位成员）
    pub fn leader(&self) -> Option<&Entrant> {
        self.members.first()
    }

    /// 成员总数（含领队）
    pub fn entrant_count(&self) -> usize {
        self.members.len()
    }
}

/// 接受数字或数字字符串；空字符串、null 视为未设置
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(JsonValue::String(s)) => s.trim().parse::<usize>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_general_settings_defaults() {
        let general = GeneralSettings::default();
        assert!(general.respect_existing());
        assert_eq!(general.autofill_wait_secs(), DEFAULT_AUTOFILL_WAIT_SECS);
        assert_eq!(general.group_limit(), None);
    }

    #[test]
    fn test_group_size_from_string_and_zero() {
        let general: GeneralSettings =
            serde_json::from_value(json!({ "group_size": "3", "auto_continue": true })).unwrap();
        assert_eq!(general.group_limit(), Some(3));
        assert!(general.auto_select_date);

        let general: GeneralSettings = serde_json::from_value(json!({ "group_size": 0 })).unwrap();
        assert_eq!(general.group_limit(), None);
    }
}
