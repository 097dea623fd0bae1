//! 团队填写流程 - 流程层
//!
//! 核心职责：按顺序驱动领队 + N 位成员，等待人工保存，并持久化断点
//!
//! 状态顺序：
//! `Idle → FillingLeader → AwaitingManualSave(2) → FillingEntrant(2) → … → AwaitingFinalSave → Completed`
//!
//! - 每位成员之间等待操作员点击网站的"保存并添加"，通过轮询姓名/证件号是否变空来推断
//! - 等待超时不终止流程：自动清空表单后继续
//! - 填完第 i 位立即保存断点 i+1；全部完成才清除断点
//! - 会话丢失时停止流程，保留断点

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::WorkflowTimings;
use crate::error::{AppError, AppResult, WorkflowError};
use crate::models::BookingConfig;
use crate::services::{CheckpointStore, FIRST_MEMBER_INDEX};
use crate::utils::logging::{log_run_start, log_run_summary};
use crate::utils::wait::wait_until;
use crate::workflow::entrant_ctx::EntrantCtx;
use crate::workflow::entrant_flow::{AddressMode, EntrantFlow};

/// 流程状态（对外发布，控制面读取）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    WaitingForForm,
    FillingLeader,
    /// 等待操作员保存第 i-1 位，随后填写第 i 位
    AwaitingManualSave(usize),
    FillingEntrant(usize),
    AwaitingFinalSave,
    Completed,
    Stopped,
    Failed,
}

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 全部成员已填写并确认保存，断点已清除
    Completed,
    /// 达到团队人数上限提前结束，断点保留
    Capped { limit: usize },
    /// 收到停止请求，下次从 `next_index` 继续
    Stopped { next_index: usize },
    /// 配置中没有成员
    Empty,
}

/// 团队填写流程
pub struct GroupFlow {
    entrant_flow: EntrantFlow,
    checkpoints: CheckpointStore,
    timings: WorkflowTimings,
    state: Arc<watch::Sender<WorkflowState>>,
    stop_requested: Arc<AtomicBool>,
}

impl GroupFlow {
    pub fn new(
        entrant_flow: EntrantFlow,
        checkpoints: CheckpointStore,
        timings: WorkflowTimings,
    ) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            entrant_flow,
            checkpoints,
            timings,
            state: Arc::new(state),
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 使用外部的状态发布通道
    pub fn with_state(mut self, state: Arc<watch::Sender<WorkflowState>>) -> Self {
        self.state = state;
        self
    }

    /// 使用外部的停止标志（每位成员开始前检查一次）
    pub fn with_stop_flag(mut self, stop_requested: Arc<AtomicBool>) -> Self {
        self.stop_requested = stop_requested;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// 执行一次完整的团队填写
    pub async fn run(&self, booking: &BookingConfig) -> AppResult<RunOutcome> {
        let result = self.run_inner(booking).await;
        match &result {
            Ok(outcome) => log_run_summary(&format!("{:?}", outcome)),
            Err(e) => {
                error!("❌ 填表流程中止: {}", e);
                self.publish(WorkflowState::Failed);
            }
        }
        result
    }

    async fn run_inner(&self, booking: &BookingConfig) -> AppResult<RunOutcome> {
        let members = &booking.members;
        if members.is_empty() {
            warn!("⚠️ 配置中没有成员，无需填写");
            self.publish(WorkflowState::Idle);
            return Ok(RunOutcome::Empty);
        }

        let limit = booking.general.group_limit();
        let total = limit.map_or(members.len(), |n| n.min(members.len()));

        let resume = match self.checkpoints.load().await {
            Ok(resume) => resume,
            Err(e) => {
                warn!("⚠️ 读取断点失败，从头开始: {}", e);
                None
            }
        };
        log_run_start(members.len(), total, resume);

        let start_index = match resume {
            Some(next) => {
                info!("📌 从第 {} 位继续，跳过领队和已完成的成员", next);
                next
            }
            None => {
                if self.stop_is_requested() {
                    return Ok(self.stopped(1));
                }
                self.ensure_session().await?;
                self.publish(WorkflowState::FillingLeader);
                self.entrant_flow
                    .run(&members[0], &EntrantCtx::new(1, total), AddressMode::Full)
                    .await;
                // 填写途中会话断开时各字段只会静默失败，先确认会话仍在再记断点
                self.ensure_session().await?;
                self.persist(FIRST_MEMBER_INDEX).await;
                FIRST_MEMBER_INDEX
            }
        };

        for index in start_index..=total {
            if self.stop_is_requested() {
                return Ok(self.stopped(index));
            }
            self.ensure_session().await?;

            self.publish(WorkflowState::AwaitingManualSave(index));
            self.await_manual_save(index - 1, self.timings.interior_save_timeout, true)
                .await;

            self.ensure_session().await?;
            self.publish(WorkflowState::FillingEntrant(index));
            let ctx = EntrantCtx::new(index, total);
            self.entrant_flow
                .run(&members[index - 1], &ctx, AddressMode::IfProvided)
                .await;
            self.ensure_session().await?;
            self.persist(index + 1).await;
        }

        let capped = total < members.len();
        if capped {
            info!("📌 已达到团队人数上限 {}，不再填写后续成员", total);
        }

        self.publish(WorkflowState::AwaitingFinalSave);
        self.await_manual_save(total, self.timings.final_save_timeout, false)
            .await;

        if booking.general.auto_select_date {
            self.click_continue().await;
        }
        if booking.general.auto_download_ticket {
            info!("📥 已开启自动下载，票据应会保存到下载目录");
        }

        if capped {
            self.publish(WorkflowState::Completed);
            return Ok(RunOutcome::Capped { limit: total });
        }

        if let Err(e) = self.checkpoints.clear().await {
            warn!("⚠️ 清除断点失败: {}", e);
        }
        self.publish(WorkflowState::Completed);
        info!("🎉 全部 {} 位成员已填写完成", total);
        Ok(RunOutcome::Completed)
    }

    /// 等待操作员保存第 `saved_index` 位
    ///
    /// 超时后 `force_clear` 为 true 时自动清空表单，然后照常继续。
    async fn await_manual_save(&self, saved_index: usize, timeout: Duration, force_clear: bool) {
        info!(
            "⏸ 请在浏览器中点击 'Save and Add Sevak' 保存第 {} 位 (最多等待 {}s)",
            saved_index,
            timeout.as_secs()
        );
        let flow = &self.entrant_flow;
        let blank = wait_until(timeout, self.timings.blank_poll_interval, move || {
            flow.is_form_blank()
        })
        .await;

        if blank {
            info!("✅ 检测到表单已重置，继续");
            return;
        }

        let timeout_err = WorkflowError::Timeout {
            phase: format!("第 {} 位保存", saved_index),
            waited_secs: timeout.as_secs(),
        };
        if force_clear {
            warn!("⚠️ {}，自动清空表单后继续", timeout_err);
            self.entrant_flow.force_clear().await;
        } else {
            warn!("⚠️ {}，请确认最后一位已保存", timeout_err);
        }
    }

    async fn click_continue(&self) {
        let Some(locator) = &self.entrant_flow.locators().continue_button else {
            return;
        };
        let resolver = self.entrant_flow.resolver();
        match resolver
            .locate_clickable(locator, self.timings.continue_timeout)
            .await
        {
            Ok(selector) => match resolver.page().click(&selector).await {
                Ok(true) => info!("➡️ 已点击继续"),
                Ok(false) => warn!("⚠️ 继续按钮点击失败"),
                Err(e) => warn!("⚠️ 继续按钮点击失败: {}", e),
            },
            Err(e) => warn!("⚠️ 继续按钮不可用: {}", e),
        }
    }

    /// 会话仍可用；否则返回 `SessionLost`
    async fn ensure_session(&self) -> AppResult<()> {
        self.entrant_flow
            .resolver()
            .page()
            .current_url()
            .await
            .map(|_| ())
            .map_err(|e| AppError::session_lost(e.to_string()))
    }

    async fn persist(&self, next_index: usize) {
        if let Err(e) = self.checkpoints.save(next_index).await {
            warn!("⚠️ 保存断点失败: {}", e);
        }
    }

    fn stop_is_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn stopped(&self, next_index: usize) -> RunOutcome {
        info!("⏹ 已停止，下次从第 {} 位继续", next_index);
        self.publish(WorkflowState::Stopped);
        RunOutcome::Stopped { next_index }
    }

    fn publish(&self, state: WorkflowState) {
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_state_serializes_with_index() {
        let json = serde_json::to_value(WorkflowState::AwaitingManualSave(3)).unwrap();
        assert_eq!(json["state"], "awaiting_manual_save");
        assert_eq!(json["index"], 3);

        let json = serde_json::to_value(WorkflowState::Completed).unwrap();
        assert_eq!(json["state"], "completed");
    }
}
