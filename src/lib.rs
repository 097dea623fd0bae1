//! # Srivari Autofill
//!
//! TTD Srivari Seva 团队预约表单的自动填写引擎
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `FormPage` - 服务层看到的页面能力接口
//! - `JsExecutor` - 唯一的 page owner，基于 CDP 实现 `FormPage`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个字段
//! - `ElementResolver` - 主选择器 + 备用选择器定位
//! - `DropdownResolver` - 原生 / 自定义下拉框的模糊匹配选值
//! - `FieldFiller` - 尊重已有值的填写策略、掩码日期输入
//! - `CheckpointStore` - 断点持久化
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一位成员"和"一个团队"的填写流程
//! - `EntrantFlow` - 单人字段顺序
//! - `GroupFlow` - 领队 → 人工保存 → 成员 … → 最终保存，断点续填
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/bot` - 控制面：会话、启停、状态、配置、照片上传、日志
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::SessionController;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{FormPage, JsExecutor};
pub use models::{BookingConfig, Entrant, LocatorProfile};
pub use orchestrator::{BotContext, BotStatus};
pub use workflow::{EntrantFlow, GroupFlow, RunOutcome, WorkflowState};
