//! 业务能力层（Services）
//!
//! 描述"我能对一个表单控件做什么"，不关心当前是第几位成员：
//! - `ElementResolver` - 主选择器 + 备用选择器定位
//! - `DropdownResolver` - 原生/自定义下拉框选值
//! - `FieldFiller` - 尊重已有值的文本填写、掩码日期输入
//! - `CheckpointStore` - 断点读写
//! - `page_readiness` - 等待表单出现

pub mod checkpoint_store;
pub mod date_format;
pub mod dropdown_resolver;
pub mod element_resolver;
pub mod fill_policy;
pub mod matching;
pub mod page_readiness;

pub use checkpoint_store::{CheckpointStore, FIRST_MEMBER_INDEX};
pub use date_format::normalize_date;
pub use dropdown_resolver::DropdownResolver;
pub use element_resolver::ElementResolver;
pub use fill_policy::{FieldFiller, FillOutcome, FillPolicyState, SharedFillPolicy};
pub use page_readiness::{wait_for_form, FormPresence};
