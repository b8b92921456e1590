use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{OutcomeStatus, SubmissionOutcome, SubmissionTask};

/// 整体运行状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// 所有任务都已处理
    Completed,
    /// 操作者中途停止
    Cancelled,
    /// 任务开始前的致命错误（登入失败、浏览器不可用、找不到日志页面）
    Aborted { reason: String },
}

/// 运行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<SubmissionOutcome>,
}

impl RunReport {
    pub fn new(
        status: RunStatus,
        started_at: DateTime<Local>,
        outcomes: Vec<SubmissionOutcome>,
    ) -> Self {
        let count = |pred: fn(&OutcomeStatus) -> bool| {
            outcomes.iter().filter(|o| pred(&o.status)).count()
        };
        let succeeded = count(|s| matches!(s, OutcomeStatus::Success));
        let failed = count(|s| matches!(s, OutcomeStatus::Failed(_)));
        let skipped = count(|s| matches!(s, OutcomeStatus::Skipped));

        Self {
            status,
            started_at,
            finished_at: Local::now(),
            succeeded,
            failed,
            skipped,
            outcomes,
        }
    }

    /// 任务开始前即中止的报告，不含任何结果
    pub fn aborted(reason: impl Into<String>, started_at: DateTime<Local>) -> Self {
        Self::new(
            RunStatus::Aborted {
                reason: reason.into(),
            },
            started_at,
            Vec::new(),
        )
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// 成功率（百分比），无结果时为 0
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.succeeded as f64 / self.outcomes.len() as f64 * 100.0
        }
    }

    /// 最终失败的任务，用于只重跑失败的部分
    pub fn failed_tasks(&self) -> Vec<SubmissionTask> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed(_)))
            .map(|o| o.task.clone())
            .collect()
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| report_error(path, e))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| report_error(path, e))
    }

    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| report_error(path, e))?;
        serde_json::from_str(&content).map_err(|e| report_error(path, e))
    }
}

fn report_error(path: &Path, source: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::Report {
        path: path.display().to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureReason, JournalContent, SchoolId};

    fn task(day: u32, id: &str) -> SubmissionTask {
        SubmissionTask::new(
            chrono::NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            SchoolId::new(id),
            JournalContent::new("Lab work"),
        )
    }

    fn sample() -> RunReport {
        RunReport::new(
            RunStatus::Completed,
            Local::now(),
            vec![
                SubmissionOutcome::success(task(1, "S1"), 1, None),
                SubmissionOutcome::failed(task(1, "S2"), FailureReason::Transient, 3, "超时"),
                SubmissionOutcome::skipped(task(2, "S1")),
            ],
        )
    }

    #[test]
    fn test_counts() {
        let report = sample();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total(), 3);
        assert!((report.success_rate() - 33.33).abs() < 0.1);
    }

    #[test]
    fn test_failed_tasks_for_rerun() {
        let failed = sample().failed_tasks();
        assert_eq!(failed, vec![task(1, "S2")]);
    }

    #[test]
    fn test_aborted_report_is_empty() {
        let report = RunReport::aborted("登入失败", Local::now());
        assert!(report.is_aborted());
        assert_eq!(report.total(), 0);
        assert_eq!(report.success_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = sample();

        report.save(&path).await.unwrap();
        let loaded = RunReport::load(&path).await.unwrap();

        assert_eq!(loaded.status, RunStatus::Completed);
        assert_eq!(loaded.outcomes.len(), 3);
        assert_eq!(loaded.failed_tasks(), report.failed_tasks());
    }
}
