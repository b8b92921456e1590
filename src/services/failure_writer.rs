//! 失败清单写入服务 - 业务能力层
//!
//! 只负责把最终失败的日志追加到文字档，方便操作者手动补登

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::AppResult;
use crate::models::{FailureReason, SubmissionTask};

/// 失败清单写入服务
///
/// 每笔一行：`日期 | 校内编号 | 失败类别 | 说明`
pub struct FailureWriter {
    path: PathBuf,
}

impl FailureWriter {
    pub fn new() -> Self {
        Self::with_path("failed.txt")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(
        &self,
        task: &SubmissionTask,
        reason: FailureReason,
        detail: &str,
    ) -> AppResult<()> {
        debug!("写入失败清单: {} | {}", task, reason);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let line = format!(
            "{} | {} | {} | {}\n",
            task.date,
            task.school_id,
            reason,
            detail.replace('\n', " ")
        );
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

impl Default for FailureWriter {
    fn default() -> Self {
        Self::new()
    }
}
