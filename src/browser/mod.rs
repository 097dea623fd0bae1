//! 浏览器会话（资源获取）
//!
//! - `launcher` - 以持久化用户目录启动浏览器
//! - `connection` - 附加到调试端口、挑选要操作的标签页
//! - `page_setup` - 反检测脚本、下载目录、窗口布局
//! - `session` - 会话生命周期

pub mod connection;
pub mod launcher;
pub mod page_setup;
pub mod session;

pub use session::SessionController;
