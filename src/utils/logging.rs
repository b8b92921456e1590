//! 日志工具模块
//!
//! 提供日志初始化与输出格式的辅助函数

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::Result;
use tracing::{info, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::models::{RunReport, RunStatus};

/// 初始化日志：同时输出到终端与日志文件
///
/// `RUST_LOG` 优先；未设定时为 `info`，详细模式为 `debug`。
pub fn init(verbose: bool, log_file_path: &str) -> Result<()> {
    init_log_file(log_file_path)?;
    let file = OpenOptions::new().append(true).open(log_file_path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}

/// 在正式初始化日志之前执行 `f`，期间的日志只输出到终端
///
/// 日志文件路径与详细模式都来自配置，读取配置时只能先用这个。
pub fn with_startup_logging<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(startup_subscriber(std::io::stdout), f)
}

fn startup_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .finish()
}

/// 初始化日志文件
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n学习日志自动填写 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, total_tasks: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 学习日志自动填写");
    info!("🔗 入口网址: {}", config.url);
    info!("📋 待提交: {} 笔", total_tasks);
    info!(
        "⏱️ 操作延迟: {} 秒 | 最多重试: {} 次",
        config.delay_secs, config.max_retries
    );
    info!("📝 工作内容: {}", truncate_text(&config.work_content, 30));
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &RunReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 执行完成统计");
    info!(
        "完成时间: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    match &report.status {
        RunStatus::Completed => info!("🏁 状态: 全部处理完毕"),
        RunStatus::Cancelled => info!("⏹️ 状态: 已由使用者停止"),
        RunStatus::Aborted { reason } => info!("💥 状态: 运行中止 ({})", reason),
    }
    info!("📋 总计: {}", report.total());
    info!("✅ 成功: {}", report.succeeded);
    info!("❌ 失败: {}", report.failed);
    info!("⏭️ 略过: {}", report.skipped);
    info!("📈 成功率: {:.1}%", report.success_rate());
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_text("整理實驗數據", 4), "整理實驗...");
        assert_eq!(truncate_text("Lab work", 20), "Lab work");
    }

    #[test]
    fn test_config_warning_is_logged_before_init() {
        let dir = tempfile::tempdir().unwrap();
        let captured = dir.path().join("startup.txt");
        let file = fs::File::create(&captured).unwrap();

        let missing = dir.path().join("missing.json");
        tracing::subscriber::with_default(startup_subscriber(Mutex::new(file)), || {
            Config::from_file(&missing).unwrap();
        });

        let content = fs::read_to_string(&captured).unwrap();
        assert!(content.contains("WARN"));
        assert!(content.contains("不存在"));
    }

    #[test]
    fn test_log_file_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        init_log_file(path.to_str().unwrap()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("学习日志自动填写"));
    }
}
