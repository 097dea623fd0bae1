use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

use crate::models::profile::LocatorProfile;

/// 加载定位器/匹配配置
///
/// 未指定文件时使用内置默认值；指定了则读取 TOML，缺省字段取默认值，加载后校验一次。
pub async fn load_locator_profile(path: Option<&Path>) -> Result<LocatorProfile> {
    let Some(path) = path else {
        return Ok(LocatorProfile::default());
    };

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取定位器配置: {}", path.display()))?;
    let profile: LocatorProfile = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", path.display()))?;
    profile.validate()?;

    info!("✓ 已加载定位器配置: {}", path.display());
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_path_gives_defaults() {
        let profile = load_locator_profile(None).await.unwrap();
        assert_eq!(profile, LocatorProfile::default());
    }

    #[tokio::test]
    async fn test_invalid_threshold_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        fs::write(&path, "[matching]\nnative_threshold = 2.0\n")
            .await
            .unwrap();

        let err = load_locator_profile(Some(&path)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("native_threshold"));
    }
}
