//! 断点存储
//!
//! 记录"下一位要填写的成员序号"，进程崩溃后从这里续填。
//! 断点文件里可能还有别的键，读写时原样保留。

use std::path::{Path, PathBuf};

use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// 断点文件中的键
pub const CHECKPOINT_KEY: &str = "current_member_index";

/// 领队是第 1 位，续填最早从第 2 位开始
pub const FIRST_MEMBER_INDEX: usize = 2;

/// 断点文件
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取断点；没有断点或文件损坏时返回 None
    pub async fn load(&self) -> AppResult<Option<usize>> {
        let Some(document) = self.read_document().await? else {
            return Ok(None);
        };
        let index = document
            .get(CHECKPOINT_KEY)
            .and_then(|v| match v {
                JsonValue::Number(n) => n.as_u64().map(|n| n as usize),
                JsonValue::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .map(|n| n.max(FIRST_MEMBER_INDEX));
        if let Some(index) = index {
            info!("📌 读取到断点: 从第 {} 位继续", index);
        }
        Ok(index)
    }

    /// 保存下一位要填写的序号
    pub async fn save(&self, next_index: usize) -> AppResult<()> {
        let mut document = self.read_document().await?.unwrap_or_default();
        document.insert(CHECKPOINT_KEY.to_string(), JsonValue::from(next_index));
        self.write_document(&document).await?;
        debug!("断点已保存: {}", next_index);
        Ok(())
    }

    /// 清除断点（只删除断点键）
    pub async fn clear(&self) -> AppResult<()> {
        let Some(mut document) = self.read_document().await? else {
            return Ok(());
        };
        if document.remove(CHECKPOINT_KEY).is_some() {
            self.write_document(&document).await?;
            info!("🧹 断点已清除");
        }
        Ok(())
    }

    /// 文件不存在返回 None；内容无法解析时记录警告并视为空文档
    async fn read_document(&self) -> AppResult<Option<Map<String, JsonValue>>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::file_read_failed(self.path.display().to_string(), e)),
        };
        match serde_json::from_str::<JsonValue>(&content) {
            Ok(JsonValue::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                warn!("⚠️ 断点文件格式无效，忽略: {}", self.path.display());
                Ok(Some(Map::new()))
            }
        }
    }

    async fn write_document(&self, document: &Map<String, JsonValue>) -> AppResult<()> {
        let text = serde_json::to_string_pretty(document)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
        fs::write(&self.path, text)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))
    }
}
