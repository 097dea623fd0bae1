//! 选项文本匹配
//!
//! 下拉框选值的判定规则，与页面无关，可单独测试。
//! 匹配梯度：精确（忽略大小写和空白）→ 包含（目标是候选的子串）→ 相似度不低于阈值。

use similar::TextDiff;

use crate::infrastructure::Rect;
use crate::models::profile::MatchingProfile;

/// 命中方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Exact,
    Contains,
    Fuzzy(f64),
}

/// 命中的候选项
#[derive(Debug, Clone, PartialEq)]
pub struct OptionMatch {
    pub index: usize,
    pub text: String,
    pub kind: MatchKind,
}

/// 未命中时记录的最佳候选
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    pub best: Option<String>,
    pub ratio: f64,
}

/// 小写、去首尾空白、合并连续空白
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 两段已规范化文本的相似度，范围 0..=1
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio() as f64
}

/// 在候选项中选出最佳匹配
///
/// - 精确匹配在所有候选中优先，与顺序无关
/// - 包含匹配取最短的候选，等长取靠前的
/// - 相似度取最高的，并列取靠前的；低于 `threshold` 不选
pub fn best_match<S: AsRef<str>>(
    target: &str,
    candidates: &[S],
    threshold: f64,
) -> Result<OptionMatch, NearMiss> {
    let target = normalize(target);
    if target.is_empty() || candidates.is_empty() {
        return Err(NearMiss {
            best: None,
            ratio: 0.0,
        });
    }

    let normalized: Vec<String> = candidates.iter().map(|c| normalize(c.as_ref())).collect();
    let pick = |index: usize, kind: MatchKind| OptionMatch {
        index,
        text: candidates[index].as_ref().trim().to_string(),
        kind,
    };

    if let Some(index) = normalized.iter().position(|n| *n == target) {
        return Ok(pick(index, MatchKind::Exact));
    }

    let contained = normalized
        .iter()
        .enumerate()
        .filter(|(_, n)| n.contains(&target))
        .min_by_key(|(i, n)| (n.chars().count(), *i))
        .map(|(i, _)| i);
    if let Some(index) = contained {
        return Ok(pick(index, MatchKind::Contains));
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, n) in normalized.iter().enumerate() {
        let ratio = similarity(&target, n);
        if best.is_none_or(|(_, r)| ratio > r) {
            best = Some((i, ratio));
        }
    }

    match best {
        Some((index, ratio)) if ratio >= threshold => Ok(pick(index, MatchKind::Fuzzy(ratio))),
        Some((index, ratio)) => Err(NearMiss {
            best: Some(candidates[index].as_ref().trim().to_string()),
            ratio,
        }),
        None => Err(NearMiss {
            best: None,
            ratio: 0.0,
        }),
    }
}

/// 当前值是否只是占位文本（"select" / "choose" 等）
pub fn is_placeholder(text: &str, profile: &MatchingProfile) -> bool {
    let text = normalize(text);
    text.is_empty() || profile.placeholders.iter().any(|p| normalize(p) == text)
}

/// 自定义浮层中的文本是否可能是真正的选项
///
/// 排除单字符、纯数字、掩码号码（xxxx）、命中干扰词表的文本
pub fn is_plausible_option(text: &str, profile: &MatchingProfile) -> bool {
    let text = text.trim();
    if text.chars().count() <= 1 {
        return false;
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = text.to_lowercase();
    if lower.contains("xxxx") {
        return false;
    }
    !profile
        .denylist
        .iter()
        .any(|banned| lower.contains(banned.to_lowercase().as_str()))
}

/// 随机挑选时额外排除占位文本
pub fn is_random_pick_candidate(text: &str, profile: &MatchingProfile) -> bool {
    is_plausible_option(text, profile) && !is_placeholder(text, profile)
}

/// 浮层是否在触发控件下方（或与之重叠）；明显在上方的浮层与本控件无关
pub fn panel_is_below(panel: &Rect, trigger: &Rect) -> bool {
    panel.top + 1.0 >= trigger.top - 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [&str; 4] = ["Andhra Pradesh", "Arunachal Pradesh", "Tamil Nadu", "Telangana"];

    #[test]
    fn test_exact_match_wins_regardless_of_order() {
        let forward = ["Tamil Nadu (South)", " tamil  NADU ", "Telangana"];
        let m = best_match("Tamil Nadu", &forward, 0.7).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.kind, MatchKind::Exact);

        let reversed = ["Telangana", " tamil  NADU ", "Tamil Nadu (South)"];
        let m = best_match("Tamil Nadu", &reversed, 0.7).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_containment_prefers_shortest() {
        let options = ["Chittoor District Headquarters", "Chittoor Rural", "Nellore"];
        let m = best_match("chittoor", &options, 0.7).unwrap();
        assert_eq!(m.text, "Chittoor Rural");
        assert_eq!(m.kind, MatchKind::Contains);
    }

    #[test]
    fn test_fuzzy_match_above_threshold() {
        let m = best_match("Telangaana", &STATES, 0.7).unwrap();
        assert_eq!(m.text, "Telangana");
        assert!(matches!(m.kind, MatchKind::Fuzzy(r) if r >= 0.7));
    }

    #[test]
    fn test_no_selection_below_threshold() {
        let miss = best_match("Karnataka", &STATES, 0.8).unwrap_err();
        assert!(miss.ratio < 0.8);
        assert!(miss.best.is_some());

        let miss = best_match("Karnataka", &STATES, 0.7).unwrap_err();
        assert!(miss.ratio < 0.7);
    }

    #[test]
    fn test_empty_inputs_never_match() {
        assert!(best_match("", &STATES, 0.0).is_err());
        let none: [&str; 0] = [];
        assert!(best_match("Telangana", &none, 0.0).is_err());
    }

    #[test]
    fn test_plausibility_filter() {
        let profile = MatchingProfile::default();
        assert!(is_plausible_option("Tirupati", &profile));
        assert!(!is_plausible_option("A", &profile));
        assert!(!is_plausible_option("123456", &profile));
        assert!(!is_plausible_option("XXXX XXXX 1234", &profile));
        assert!(!is_plausible_option("Team Leader Details", &profile));
        assert!(!is_plausible_option("25 Yrs", &profile));
    }

    #[test]
    fn test_placeholder_detection() {
        let profile = MatchingProfile::default();
        assert!(is_placeholder("", &profile));
        assert!(is_placeholder(" Select ", &profile));
        assert!(is_placeholder("-- Choose --", &profile));
        assert!(!is_placeholder("Select Seva", &profile));
        assert!(!is_random_pick_candidate("Select", &profile));
    }

    #[test]
    fn test_panel_position_filter() {
        let trigger = Rect {
            top: 300.0,
            bottom: 330.0,
            ..Rect::default()
        };
        let below = Rect {
            top: 332.0,
            ..Rect::default()
        };
        let overlapping = Rect {
            top: 298.0,
            ..Rect::default()
        };
        let above = Rect {
            top: 100.0,
            ..Rect::default()
        };
        assert!(panel_is_below(&below, &trigger));
        assert!(panel_is_below(&overlapping, &trigger));
        assert!(!panel_is_below(&above, &trigger));
    }
}
