use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use journal_autofill::cli::Args;
use journal_autofill::models::{materialize_tasks, RunReport};
use journal_autofill::utils::logging;
use journal_autofill::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置；日志尚未初始化，先输出到终端
    let mut config = logging::with_startup_logging(|| Config::load(&args.config))?;
    args.apply(&mut config);

    // 初始化日志
    logging::init(config.verbose_logging, &config.output_log_file)?;

    let tasks = match &args.retry_failed {
        Some(path) => {
            let previous = RunReport::load(path).await?;
            info!("🔁 只重跑 {} 中失败的 {} 笔", path.display(), previous.failed);
            previous.failed_tasks()
        }
        None => {
            let range = args.date_range(chrono::Local::now().date_naive())?;
            materialize_tasks(&range, &args.identifiers(&config), &config.content())?
        }
    };

    if args.dry_run {
        info!("📋 任务计划（共 {} 笔）:", tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            info!("  {:>3}. {}", i + 1, task);
        }
        return Ok(());
    }

    config.validate()?;

    // Ctrl-C 只在任务之间生效
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到停止请求，完成当前任务后停止");
            trigger.cancel();
        }
    });

    let report = App::new(config).run(tasks, cancel).await;
    if report.is_aborted() {
        bail!("运行中止");
    }

    Ok(())
}
