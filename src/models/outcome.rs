use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::SubmissionTask;

/// 失败类别
///
/// 操作者依类别决定是否只重跑失败的部分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// 页面结构与预期不符，盲目重试无用
    FormNotFound,
    /// 超时、元素失效等短暂问题，可以重试
    Transient,
    /// 已提交但无法确认结果
    Unconfirmed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::FormNotFound => "form-not-found",
            FailureReason::Transient => "transient",
            FailureReason::Unconfirmed => "unconfirmed",
        }
    }

    /// 只有短暂性失败会自动重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureReason::Transient)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// 操作者中止后未执行
    Skipped,
    Failed(FailureReason),
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success)
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            OutcomeStatus::Failed(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Success => f.write_str("Success"),
            OutcomeStatus::Skipped => f.write_str("Skipped"),
            OutcomeStatus::Failed(reason) => write!(f, "Failed(\"{}\")", reason),
        }
    }
}

/// 单笔日志的结果，建立后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub task: SubmissionTask,
    pub status: OutcomeStatus,
    /// 实际尝试次数（未执行为 0）
    pub attempts: u32,
    /// 给操作者看的补充说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl SubmissionOutcome {
    pub fn success(task: SubmissionTask, attempts: u32, detail: Option<String>) -> Self {
        Self::build(task, OutcomeStatus::Success, attempts, detail)
    }

    pub fn failed(
        task: SubmissionTask,
        reason: FailureReason,
        attempts: u32,
        detail: impl Into<String>,
    ) -> Self {
        Self::build(
            task,
            OutcomeStatus::Failed(reason),
            attempts,
            Some(detail.into()),
        )
    }

    pub fn skipped(task: SubmissionTask) -> Self {
        Self::build(task, OutcomeStatus::Skipped, 0, None)
    }

    fn build(
        task: SubmissionTask,
        status: OutcomeStatus,
        attempts: u32,
        detail: Option<String>,
    ) -> Self {
        Self {
            task,
            status,
            attempts,
            detail,
            timestamp: Local::now(),
        }
    }
}
