//! 定位器/匹配参数配置
//!
//! 相似度阈值、干扰词表、占位词和界面节奏都是针对某一版页面标记调出来的，
//! 因此做成可由 TOML 覆盖的配置，而不是写死的常量。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ConfigError};
use crate::models::locator::FormLocatorMap;

/// 下拉框匹配参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingProfile {
    /// 原生下拉框的相似度下限
    pub native_threshold: f64,
    /// 自定义浮层的相似度下限（候选噪声更大，要求更严）
    pub custom_threshold: f64,
    /// 候选文本中出现即丢弃的子串（小写）
    pub denylist: Vec<String>,
    /// 视为"未选择"的占位文本（小写）
    pub placeholders: Vec<String>,
}

impl Default for MatchingProfile {
    fn default() -> Self {
        Self {
            native_threshold: 0.70,
            custom_threshold: 0.80,
            denylist: [
                "dob",
                "xxxxxx",
                "yrs",
                "years",
                "team leader",
                "sevak",
                "mobile",
                "email",
                "important note",
                "address details",
                "fitness",
                "profession",
                "qualification",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            placeholders: ["select", "choose", "--select--", "-- choose --"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// 界面节奏（毫秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiTimings {
    /// 打开浮层后的等待
    pub open_delay_ms: u64,
    /// 选中选项后的等待
    pub post_select_delay_ms: u64,
    /// 逐键输入间隔
    pub key_delay_ms: u64,
    /// 主选择器的等待上限
    pub locate_timeout_ms: u64,
    /// 每个备用选择器的等待上限
    pub fallback_timeout_ms: u64,
    /// 单次存在性检测的等待上限（可选字段用）
    pub probe_timeout_ms: u64,
    /// 级联下拉框（州/区）就绪等待上限
    pub dependent_ready_timeout_ms: u64,
    /// 所有轮询的间隔
    pub poll_interval_ms: u64,
}

impl Default for UiTimings {
    fn default() -> Self {
        Self {
            open_delay_ms: 150,
            post_select_delay_ms: 120,
            key_delay_ms: 60,
            locate_timeout_ms: 8_000,
            fallback_timeout_ms: 6_000,
            probe_timeout_ms: 2_000,
            dependent_ready_timeout_ms: 15_000,
            poll_interval_ms: 200,
        }
    }
}

impl UiTimings {
    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }

    pub fn post_select_delay(&self) -> Duration {
        Duration::from_millis(self.post_select_delay_ms)
    }

    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }

    pub fn locate_timeout(&self) -> Duration {
        Duration::from_millis(self.locate_timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn dependent_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.dependent_ready_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

/// 一个页面版本对应的全部定位/匹配配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorProfile {
    pub locators: FormLocatorMap,
    pub matching: MatchingProfile,
    pub timings: UiTimings,
}

impl LocatorProfile {
    /// 加载后校验一次
    pub fn validate(&self) -> AppResult<()> {
        self.locators.validate()?;
        for (field, value) in [
            ("matching.native_threshold", self.matching.native_threshold),
            ("matching.custom_threshold", self.matching.custom_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    reason: format!("{} 不在 0..=1 范围内", value),
                }
                .into());
            }
        }
        Ok(())
    }
}
