//! 命令列参数

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::config::Config;
use crate::error::PlanError;
use crate::models::{DateRange, SchoolId};

/// 批次填写学习日志
#[derive(Parser, Debug, Clone)]
#[command(name = "journal_autofill")]
#[command(about = "Fill daily learning-journal entries through a browser", long_about = None)]
pub struct Args {
    /// 配置文件（.json 或 .toml）
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// 开始日期 YYYY-MM-DD，预设今天
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// 结束日期 YYYY-MM-DD，预设今天（开始日期晚于今天时同开始日期）
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// 校内编号，可重复指定；未指定时使用配置文件
    #[arg(long = "school-id")]
    pub school_ids: Vec<String>,

    /// 工作内容，覆盖配置文件
    #[arg(long)]
    pub content: Option<String>,

    /// 任务之间的间隔（秒）
    #[arg(long)]
    pub delay: Option<u64>,

    /// 短暂性失败的重试次数
    #[arg(long)]
    pub retries: Option<u32>,

    /// 无头模式
    #[arg(long)]
    pub headless: bool,

    /// 连接到既有浏览器的远端除错埠
    #[arg(long)]
    pub port: Option<u16>,

    /// 只重跑上次报告中失败的任务
    #[arg(long, value_name = "REPORT")]
    pub retry_failed: Option<PathBuf>,

    /// 运行报告输出路径
    #[arg(long)]
    pub report: Option<String>,

    /// 只列出任务计划，不开启浏览器
    #[arg(long)]
    pub dry_run: bool,

    /// 详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 以命令列参数覆盖配置
    pub fn apply(&self, config: &mut Config) {
        if let Some(content) = &self.content {
            config.work_content = content.clone();
        }
        if let Some(delay) = self.delay {
            config.delay_secs = delay;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(port) = self.port {
            config.browser.debug_port = Some(port);
        }
        if let Some(report) = &self.report {
            config.report_file = report.clone();
        }
        if self.verbose {
            config.verbose_logging = true;
        }
    }

    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange, PlanError> {
        let start = self.start.unwrap_or(today);
        let end = self.end.unwrap_or_else(|| today.max(start));
        DateRange::new(start, end)
    }

    pub fn identifiers(&self, config: &Config) -> Vec<SchoolId> {
        if self.school_ids.is_empty() {
            config.default_identifiers()
        } else {
            self.school_ids.iter().map(SchoolId::new).collect()
        }
    }
}
