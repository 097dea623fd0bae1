use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::models::booking::{BookingConfig, GeneralSettings};
use crate::models::entrant::Entrant;

/// 配置文件不存在时，在同目录下查找的旧版成员文件
pub const LEGACY_MEMBERS_FILE: &str = "srivari_members.json";

/// 加载预约配置文档
///
/// 支持的写法：
/// - `{"general": {...}, "members": [...]}`
/// - `{"data": [...]}`
/// - 顶层数组（旧版，只有成员）
///
/// 文件不存在时回退到同目录下的 `srivari_members.json`，都没有则返回空配置。
/// `.toml` 扩展名按 TOML 解析，其余按 JSON。
pub async fn load_booking_config(path: &Path) -> Result<BookingConfig> {
    let document = if fs::try_exists(path).await.unwrap_or(false) {
        read_document(path).await?
    } else {
        let legacy = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(LEGACY_MEMBERS_FILE);
        if fs::try_exists(&legacy).await.unwrap_or(false) {
            info!("📁 配置文件不存在，使用旧版成员文件: {}", legacy.display());
            read_document(&legacy).await?
        } else {
            warn!("⚠️ 配置文件不存在: {}", path.display());
            return Ok(BookingConfig::default());
        }
    };

    let config = booking_from_value(document)
        .with_context(|| format!("无法解析预约配置: {}", path.display()))?;
    info!(
        "✓ 已加载预约配置: {} 位成员, 团队上限 {:?}",
        config.entrant_count(),
        config.general.group_limit()
    );
    Ok(config)
}

/// 保存预约配置，保留原文件的形态
///
/// 原文件是顶层数组时仍写成数组；是对象时只替换 `general` 和 `members`，其他键原样保留。
pub async fn save_booking_config(path: &Path, config: &BookingConfig) -> Result<()> {
    let existing = if fs::try_exists(path).await.unwrap_or(false) {
        read_document(path).await.ok()
    } else {
        None
    };

    let members = serde_json::to_value(&config.members)?;
    let document = match existing {
        Some(JsonValue::Array(_)) => members,
        Some(JsonValue::Object(mut map)) => {
            map.remove("data");
            map.insert("general".to_string(), serde_json::to_value(&config.general)?);
            map.insert("members".to_string(), members);
            JsonValue::Object(map)
        }
        _ => serde_json::to_value(config)?,
    };

    let text = if is_toml(path) {
        toml::to_string_pretty(&document).context("无法序列化为 TOML")?
    } else {
        serde_json::to_string_pretty(&document)?
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.ok();
    }
    fs::write(path, text)
        .await
        .with_context(|| format!("无法写入配置文件: {}", path.display()))?;
    info!("💾 已保存预约配置: {}", path.display());
    Ok(())
}

/// 解析成员照片路径
///
/// 绝对路径直接使用；相对路径依次在配置目录、照片目录、`images/` 下查找，
/// 找不到返回 `None`。
pub fn resolve_photo_path(
    photo: &str,
    config_dir: &Path,
    image_dir: Option<&Path>,
) -> Option<PathBuf> {
    let photo = photo.trim();
    if photo.is_empty() {
        return None;
    }
    let raw = Path::new(photo);
    if raw.is_absolute() {
        return raw.is_file().then(|| raw.to_path_buf());
    }

    let mut candidates = vec![config_dir.join(raw)];
    if let Some(dir) = image_dir {
        candidates.push(dir.join(raw));
    }
    candidates.push(Path::new("images").join(raw));

    candidates.into_iter().find(|p| p.is_file())
}

async fn read_document(path: &Path) -> Result<JsonValue> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取配置文件: {}", path.display()))?;

    if is_toml(path) {
        let value: toml::Table = toml::from_str(&content)
            .with_context(|| format!("无法解析TOML文件: {}", path.display()))?;
        Ok(serde_json::to_value(value)?)
    } else if content.trim().is_empty() {
        Ok(JsonValue::Null)
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("无法解析JSON文件: {}", path.display()))
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

/// 从任意支持的文档形态构造配置
pub(crate) fn booking_from_value(document: JsonValue) -> Result<BookingConfig> {
    let (general, members) = match document {
        JsonValue::Array(members) => (JsonValue::Null, members),
        JsonValue::Object(mut map) => {
            let general = map.remove("general").unwrap_or(JsonValue::Null);
            let members = match map.remove("members").or_else(|| map.remove("data")) {
                Some(JsonValue::Array(list)) => list,
                _ => Vec::new(),
            };
            (general, members)
        }
        _ => (JsonValue::Null, Vec::new()),
    };

    let general: GeneralSettings = match general {
        JsonValue::Object(map) => serde_json::from_value(JsonValue::Object(lowercase_keys(map)))
            .context("general 字段格式错误")?,
        _ => GeneralSettings::default(),
    };

    let mut entrants = Vec::with_capacity(members.len());
    for (idx, raw) in members.into_iter().enumerate() {
        let JsonValue::Object(map) = raw else {
            warn!("⚠️ 第 {} 位成员不是对象，已忽略", idx + 1);
            continue;
        };
        let entrant: Entrant = serde_json::from_value(JsonValue::Object(lowercase_keys(map)))
            .with_context(|| format!("第 {} 位成员格式错误", idx + 1))?;
        let entrant = entrant.normalized();
        if entrant.is_blank() {
            debug!("跳过空白成员行 {}", idx + 1);
            continue;
        }
        entrants.push(entrant);
    }

    Ok(BookingConfig {
        general,
        members: entrants,
    })
}

fn lowercase_keys(map: Map<String, JsonValue>) -> Map<String, JsonValue> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect()
}
