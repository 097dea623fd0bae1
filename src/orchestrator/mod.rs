//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是整个系统的"指挥中心"，持有会话和进程级状态，对外提供控制操作。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::BotContext (控制面：会话 / 启停 / 状态 / 配置)
//!     ↓
//! workflow::GroupFlow (领队 + N 位成员，断点续填)
//!     ↓
//! workflow::EntrantFlow (单人填写顺序)
//!     ↓
//! services (能力层：定位 / 下拉框 / 填写策略 / 断点)
//!     ↓
//! infrastructure (基础设施：FormPage / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **显式上下文**：`BotContext` 由宿主创建并传引用，没有全局单例
//! 2. **资源隔离**：只有编排层（经 `SessionController`）持有浏览器
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod bot;

pub use bot::{BotContext, BotStatus};
