//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（Page），只暴露能力：
//! - `FormPage` - 服务层看到的页面能力接口
//! - `JsExecutor` - 唯一的 page owner，基于 CDP + 注入脚本实现 `FormPage`

pub mod form_page;
pub mod js_executor;
mod scripts;

pub use form_page::{FormPage, Key, OverlayOption, OverlayPanel, Rect};
pub use js_executor::JsExecutor;

pub(crate) use scripts::STEALTH as STEALTH_SCRIPT;
