use thiserror::Error;

/// 应用程序错误类型
///
/// 只有 [`SessionError`] 和 [`WorkflowError::SessionLost`] 会中断一次完整的填表流程，
/// 其余错误都在调用点记录日志后按"失败"返回，流程继续往下走。
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 元素定位错误
    #[error("定位错误: {0}")]
    Locator(#[from] LocatorError),
    /// 字段填写错误
    #[error("填写错误: {0}")]
    Fill(#[from] FillError),
    /// 流程错误
    #[error("流程错误: {0}")]
    Workflow(#[from] WorkflowError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

impl AppError {
    /// 是否为必须终止流程的错误
    ///
    /// 单次 CDP 调用失败不算致命；会话是否真的断开由流程层的存活检测判定。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Session(SessionError::AcquisitionExhausted { .. })
                | AppError::Session(SessionError::NotOpen)
                | AppError::Workflow(WorkflowError::SessionLost { .. })
        )
    }
}

/// 浏览器会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 所有驱动获取方式都失败
    #[error("无法建立浏览器会话，已尝试: {}", attempts.join(" | "))]
    AcquisitionExhausted { attempts: Vec<String> },
    /// 会话尚未打开
    #[error("浏览器会话未打开")]
    NotOpen,
    /// CDP 调用失败
    #[error("浏览器驱动错误: {0}")]
    Driver(#[from] chromiumoxide::error::CdpError),
    /// CDP 命令参数构造失败
    #[error("CDP 命令构造失败: {0}")]
    Command(String),
    /// 页面脚本返回值无法解析
    #[error("脚本返回值无法解析: {0}")]
    ScriptResult(#[from] serde_json::Error),
}

/// 元素定位错误
#[derive(Debug, Error)]
pub enum LocatorError {
    /// 主选择器和所有备用选择器都找不到元素
    #[error("找不到元素: {locator} (等待 {waited_ms}ms)")]
    NotFound { locator: String, waited_ms: u128 },
}

/// 字段填写错误（均为可恢复错误）
#[derive(Debug, Error)]
pub enum FillError {
    /// 下拉框没有可接受的候选项
    #[error("下拉框无匹配项: 目标 '{value}', 最佳候选 {best:?} (相似度 {ratio:.2})")]
    DropdownNoMatch {
        value: String,
        best: Option<String>,
        ratio: f64,
    },
    /// 掩码输入框回读值与期望不一致
    #[error("掩码输入不一致: 期望 '{expected}', 实际 '{actual}'")]
    MaskedInputMismatch { expected: String, actual: String },
}

/// 流程错误
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// 等待人工保存超时（降级处理，不终止流程）
    #[error("等待 {phase} 超时 ({waited_secs}s)")]
    Timeout { phase: String, waited_secs: u64 },
    /// 运行中浏览器会话丢失
    #[error("浏览器会话已丢失: {reason}")]
    SessionLost { reason: String },
    /// 已有流程在运行
    #[error("填表流程已在运行")]
    AlreadyRunning,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件解析失败
    #[error("解析失败 ({path}): {reason}")]
    ParseFailed { path: String, reason: String },
    /// 配置校验失败
    #[error("字段 {field} 无效: {reason}")]
    Invalid { field: String, reason: String },
    /// 不支持的上传文件类型
    #[error("不支持的文件类型: {extension}")]
    UnsupportedUpload { extension: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Session(SessionError::Driver(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Session(SessionError::ScriptResult(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建配置解析错误
    pub fn parse_failed(path: impl Into<String>, reason: impl ToString) -> Self {
        AppError::Config(ConfigError::ParseFailed {
            path: path.into(),
            reason: reason.to_string(),
        })
    }

    /// 创建会话丢失错误
    pub fn session_lost(reason: impl Into<String>) -> Self {
        AppError::Workflow(WorkflowError::SessionLost {
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::from(SessionError::NotOpen).is_fatal());
        assert!(AppError::session_lost("closed").is_fatal());

        let timeout = AppError::from(WorkflowError::Timeout {
            phase: "保存".to_string(),
            waited_secs: 90,
        });
        assert!(!timeout.is_fatal());

        let not_found = AppError::from(LocatorError::NotFound {
            locator: "//*[@id=\"x\"]".to_string(),
            waited_ms: 10,
        });
        assert!(!not_found.is_fatal());

        let bad_script = AppError::Session(SessionError::Command("bad".to_string()));
        assert!(!bad_script.is_fatal());
    }

    #[test]
    fn test_acquisition_message_lists_attempts() {
        let err = SessionError::AcquisitionExhausted {
            attempts: vec!["pinned: missing".to_string(), "attach: refused".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("pinned: missing"));
        assert!(msg.contains("attach: refused"));
    }
}
