//! 批次提交调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **资源所有者**：持有浏览器会话，任何结束路径都会关闭它
//! 2. **登入与导航**：任务开始前的致命步骤，失败即中止整个运行
//! 3. **顺序调度**：日期递增、编号依使用者顺序，逐笔提交，不并发
//! 4. **节奏与重试**：任务之间固定间隔；只有短暂性失败会重试
//! 5. **中止**：操作者要求停止时完成当前任务后停下，其余记为略过
//!
//! 单笔失败不会中断整批，只有登入/导航失败会。

use std::fmt;
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::models::{
    materialize_tasks, Credentials, DateRange, JournalContent, OutcomeStatus, PortalProfile,
    RunReport, RunStatus, SchoolId, SubmissionOutcome, SubmissionTask,
};
use crate::services::{FailureWriter, JournalNavigator, LoginService};
use crate::session::{Session, Timeouts};
use crate::workflow::{EntrySubmitter, TaskCtx};

/// 重试间隔的增长方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// 每次都等待相同的间隔
    #[default]
    Fixed,
    /// 每次重试间隔加倍，不超过 `max_secs`
    Exponential { max_secs: u64 },
}

/// 重试与节奏策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 短暂性失败最多重试几次（不含第一次）
    pub max_retries: u32,
    /// 任务之间的间隔
    pub pacing: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            pacing: Duration::from_secs(1),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试前的等待时间（从1开始）
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.pacing,
            Backoff::Exponential { max_secs } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                self.pacing
                    .saturating_mul(factor)
                    .min(Duration::from_secs(max_secs).max(self.pacing))
            }
        }
    }
}

/// 单笔任务的状态，只用于调试日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    InProgress { attempt: u32 },
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
    SkippedByUser,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => f.write_str("Pending"),
            TaskState::InProgress { attempt } => write!(f, "InProgress(#{})", attempt),
            TaskState::Retrying { attempt } => write!(f, "Retrying(#{})", attempt),
            TaskState::Succeeded => f.write_str("Succeeded"),
            TaskState::Failed => f.write_str("Failed"),
            TaskState::SkippedByUser => f.write_str("SkippedByUser"),
        }
    }
}

/// 批次提交调度器
///
/// 以值的方式持有会话：`run`/`run_tasks` 消耗调度器，结束时关闭会话。
pub struct BatchDriver<S: Session> {
    session: S,
    profile: PortalProfile,
    timeouts: Timeouts,
    policy: RetryPolicy,
    cancel: CancellationToken,
    outcome_sink: Option<UnboundedSender<SubmissionOutcome>>,
    failure_writer: Option<FailureWriter>,
}

impl<S: Session> BatchDriver<S> {
    pub fn new(
        session: S,
        profile: PortalProfile,
        timeouts: Timeouts,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            session,
            profile,
            timeouts,
            policy,
            cancel: CancellationToken::new(),
            outcome_sink: None,
            failure_writer: None,
        }
    }

    /// 由外部（例如 Ctrl-C）触发的停止信号
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 每产生一笔最终结果就送出一份
    pub fn with_outcome_sink(mut self, sink: UnboundedSender<SubmissionOutcome>) -> Self {
        self.outcome_sink = Some(sink);
        self
    }

    pub fn with_failure_writer(mut self, writer: FailureWriter) -> Self {
        self.failure_writer = Some(writer);
        self
    }

    /// 展开日期 × 编号后执行
    ///
    /// 编号清单为空时不会开启任何页面，直接回传中止的报告。
    pub async fn run(
        self,
        portal_url: &str,
        credentials: Credentials,
        range: &DateRange,
        identifiers: &[SchoolId],
        content: &JournalContent,
    ) -> RunReport {
        match materialize_tasks(range, identifiers, content) {
            Ok(tasks) => self.run_tasks(portal_url, credentials, tasks).await,
            Err(e) => {
                error!("❌ 任务计划无效: {}", e);
                let report = RunReport::aborted(e.to_string(), Local::now());
                self.shutdown().await;
                report
            }
        }
    }

    /// 执行明确给定的任务清单（例如只重跑上次失败的部分）
    ///
    /// 清单为空时不登入，直接回传完成的空报告。
    pub async fn run_tasks(
        self,
        portal_url: &str,
        credentials: Credentials,
        tasks: Vec<SubmissionTask>,
    ) -> RunReport {
        let started_at = Local::now();
        info!("📋 共 {} 笔日志待提交", tasks.len());

        let report = if tasks.is_empty() {
            info!("✅ 没有需要提交的日志");
            RunReport::new(RunStatus::Completed, started_at, Vec::new())
        } else if self.cancel.is_cancelled() {
            warn!("⏹️ 运行开始前已收到停止请求");
            let outcomes = self.skip_all(tasks).await;
            RunReport::new(RunStatus::Cancelled, started_at, outcomes)
        } else {
            match self.prepare(portal_url, credentials).await {
                Ok(form_url) => self.process_all(&form_url, tasks, started_at).await,
                Err(e) => {
                    error!("❌ 运行中止: {}", e);
                    RunReport::aborted(e.to_string(), started_at)
                }
            }
        };

        self.shutdown().await;
        report
    }

    /// 登入并找到日志表单，回传表单网址
    async fn prepare(&self, portal_url: &str, credentials: Credentials) -> AppResult<String> {
        LoginService::new(&self.session, &self.profile.login, self.timeouts)
            .login(portal_url, credentials)
            .await?;

        let form_url = JournalNavigator::new(
            &self.session,
            &self.profile.navigation,
            &self.profile.form,
            self.timeouts,
        )
        .locate(portal_url)
        .await?;

        info!("📄 日志表单: {}", form_url);
        Ok(form_url)
    }

    async fn process_all(
        &self,
        form_url: &str,
        tasks: Vec<SubmissionTask>,
        started_at: chrono::DateTime<Local>,
    ) -> RunReport {
        let submitter = EntrySubmitter::new(&self.session, &self.profile, self.timeouts, form_url);
        let total = tasks.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut stopped = false;

        for (i, task) in tasks.into_iter().enumerate() {
            let ctx = TaskCtx::new(i + 1, total, &task);
            debug!("{} {}", ctx, TaskState::Pending);

            if !stopped && i > 0 && !self.pause(self.policy.pacing).await {
                stopped = true;
            }
            if stopped || self.cancel.is_cancelled() {
                if !stopped {
                    info!("⏹️ 收到停止请求，剩余任务将略过");
                    stopped = true;
                }
                debug!("{} {}", ctx, TaskState::SkippedByUser);
                self.record(&mut outcomes, SubmissionOutcome::skipped(task))
                    .await;
                continue;
            }

            let outcome = self.submit_with_retry(&submitter, &task, &ctx).await;
            self.record(&mut outcomes, outcome).await;
        }

        let status = if stopped {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        RunReport::new(status, started_at, outcomes)
    }

    /// 提交一笔日志，短暂性失败依策略重试
    async fn submit_with_retry(
        &self,
        submitter: &EntrySubmitter<'_, S>,
        task: &SubmissionTask,
        ctx: &TaskCtx,
    ) -> SubmissionOutcome {
        let mut attempt = 1;
        loop {
            let ctx = ctx.with_attempt(attempt);
            debug!("{} {}", ctx, TaskState::InProgress { attempt });
            let outcome = submitter.submit(task, &ctx).await;

            let retryable = outcome
                .status
                .failure()
                .is_some_and(|reason| reason.is_retryable());
            if !retryable || attempt > self.policy.max_retries {
                let state = if outcome.status.is_success() {
                    TaskState::Succeeded
                } else {
                    TaskState::Failed
                };
                debug!("{} {}", ctx, state);
                return outcome;
            }

            let delay = self.policy.delay_for(attempt);
            info!(
                "{} 🔄 {:?} 后重试 ({}/{})",
                ctx, delay, attempt, self.policy.max_retries
            );
            debug!("{} {}", ctx, TaskState::Retrying { attempt });
            if !self.pause(delay).await {
                // 停止请求只在任务之间生效；等待重试期间收到就以目前结果收尾
                return outcome;
            }
            attempt += 1;
        }
    }

    /// 可被停止请求打断的等待，被打断时回传 false
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }

    async fn record(&self, outcomes: &mut Vec<SubmissionOutcome>, outcome: SubmissionOutcome) {
        if let OutcomeStatus::Failed(reason) = outcome.status {
            error!(
                "❌ {} 最终失败 [{}]: {}",
                outcome.task,
                reason,
                outcome.detail.as_deref().unwrap_or("")
            );
            if let Some(writer) = &self.failure_writer {
                if let Err(e) = writer
                    .write(&outcome.task, reason, outcome.detail.as_deref().unwrap_or(""))
                    .await
                {
                    warn!("写入失败清单失败: {}", e);
                }
            }
        }

        if let Some(sink) = &self.outcome_sink {
            // 接收端已关闭不影响运行
            let _ = sink.send(outcome.clone());
        }
        outcomes.push(outcome);
    }

    async fn skip_all(&self, tasks: Vec<SubmissionTask>) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            self.record(&mut outcomes, SubmissionOutcome::skipped(task))
                .await;
        }
        outcomes
    }

    async fn shutdown(&self) {
        match self.session.close().await {
            Ok(()) => debug!("浏览器会话已关闭"),
            Err(e) => warn!("关闭浏览器会话失败: {}", e),
        }
    }
}
