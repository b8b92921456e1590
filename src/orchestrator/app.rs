//! 应用主结构 - 编排层
//!
//! 配置 → 取得浏览器 → 批次调度 → 报告文件，串起一次完整运行。

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::models::{RunReport, RunStatus, SubmissionOutcome, SubmissionTask};
use crate::orchestrator::BatchDriver;
use crate::services::FailureWriter;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 执行任务清单并写出报告
    ///
    /// 浏览器无法取得时回传中止的报告，不视为程序错误。
    /// 任务清单为空时不开启浏览器。
    pub async fn run(&self, tasks: Vec<SubmissionTask>, cancel: CancellationToken) -> RunReport {
        logging::log_startup(&self.config, tasks.len());
        let started_at = chrono::Local::now();

        let report = if tasks.is_empty() {
            info!("✅ 没有需要提交的日志，不开启浏览器");
            RunReport::new(RunStatus::Completed, started_at, Vec::new())
        } else {
            self.run_with_browser(tasks, cancel, started_at).await
        };

        match report.save(&self.config.report_file).await {
            Ok(()) => info!("📄 运行报告已保存至: {}", self.config.report_file),
            Err(e) => error!("❌ {}", e),
        }

        logging::print_final_stats(&report, &self.config.output_log_file);
        report
    }

    async fn run_with_browser(
        &self,
        tasks: Vec<SubmissionTask>,
        cancel: CancellationToken,
        started_at: chrono::DateTime<chrono::Local>,
    ) -> RunReport {
        let timeouts = self.config.timeouts();
        match browser::acquire_session(&self.config.browser, &timeouts).await {
            Ok(session) => {
                let (sink, progress) = spawn_progress(tasks.len());
                let report = BatchDriver::new(
                    session,
                    self.config.portal.clone(),
                    timeouts,
                    self.config.retry_policy(),
                )
                .with_cancellation(cancel)
                .with_outcome_sink(sink)
                .with_failure_writer(FailureWriter::with_path(&self.config.failed_file))
                .run_tasks(&self.config.url, self.config.credentials(), tasks)
                .await;

                // 调度器已释放发送端，进度任务随之结束
                if let Err(e) = progress.await {
                    warn!("进度任务异常结束: {}", e);
                }
                report
            }
            Err(e) => {
                error!("❌ {}", e);
                RunReport::aborted(e.to_string(), started_at)
            }
        }
    }
}

/// 逐笔显示进度
fn spawn_progress(total: usize) -> (mpsc::UnboundedSender<SubmissionOutcome>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SubmissionOutcome>();
    let handle = tokio::spawn(async move {
        let mut done = 0;
        while let Some(outcome) = rx.recv().await {
            done += 1;
            info!(
                "📈 进度 {}/{}: {} → {}",
                done, total, outcome.task, outcome.status
            );
        }
    });
    (tx, handle)
}
