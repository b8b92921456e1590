//! 程序配置
//!
//! 来源依序覆盖：预设值 → 配置文件（JSON 或 TOML）→ 环境变量 → 命令列参数。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::models::{Credentials, JournalContent, PortalProfile, SchoolId};
use crate::orchestrator::{Backoff, RetryPolicy};
use crate::session::Timeouts;

/// 程序配置文件
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 校内帐号
    pub username: String,
    pub password: String,
    /// 所有可选的校内编号
    pub school_ids: Vec<String>,
    /// 预设选取的校内编号
    pub school_id: Option<String>,
    /// 入口网址
    pub url: String,
    /// 工作内容，原样填入
    pub work_content: String,
    /// 任务之间的间隔（秒）
    pub delay_secs: u64,
    pub max_retries: u32,
    pub backoff: Backoff,
    pub element_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub browser: BrowserSettings,
    /// 输出日志文件
    pub output_log_file: String,
    /// 运行报告（JSON）
    pub report_file: String,
    /// 最终失败清单
    pub failed_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub portal: PortalProfile,
}

/// 浏览器设定
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 设定后连接到既有浏览器的远端除错埠，否则启动新的浏览器
    pub debug_port: Option<u16>,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            debug_port: None,
            headless: false,
            chrome_executable: None,
            window_width: 1280,
            window_height: 900,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            school_ids: Vec::new(),
            school_id: None,
            url: "https://psf.nchu.edu.tw/punch/Menu.jsp".to_string(),
            work_content: String::new(),
            delay_secs: 1,
            max_retries: 2,
            backoff: Backoff::Fixed,
            element_timeout_secs: 10,
            page_load_timeout_secs: 30,
            confirm_timeout_secs: 5,
            browser: BrowserSettings::default(),
            output_log_file: "output.txt".to_string(),
            report_file: "report.json".to_string(),
            failed_file: "failed.txt".to_string(),
            verbose_logging: false,
            portal: PortalProfile::default(),
        }
    }
}

impl Config {
    /// 读取配置文件并套用环境变量
    ///
    /// 文件不存在时使用预设值；副档名为 `.toml` 时以 TOML 解析，其余以 JSON 解析。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path.as_ref())?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("💡 配置文件 {} 不存在，将使用预设值", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(path, &content)?;
        info!("✅ 已载入配置文件 {}", path.display());
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let parse_failed = |message: String| ConfigError::ParseFailed {
            path: path.display().to_string(),
            message,
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(content).map_err(|e| parse_failed(e.to_string())),
            _ => serde_json::from_str(content).map_err(|e| parse_failed(e.to_string())),
        }
    }

    /// 以环境变量覆盖设定
    ///
    /// `lookup` 回传变量值；测试时可传入固定表而不必修改行程环境。
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("JOURNAL_USERNAME") {
            self.username = v;
        }
        if let Some(v) = lookup("JOURNAL_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = lookup("JOURNAL_URL") {
            self.url = v;
        }
        if let Some(v) = lookup("BROWSER_DEBUG_PORT") {
            self.browser.debug_port = Some(parse_env("BROWSER_DEBUG_PORT", &v, "u16")?);
        }
        if let Some(v) = lookup("BROWSER_HEADLESS") {
            self.browser.headless = parse_env("BROWSER_HEADLESS", &v, "bool")?;
        }
        if let Some(v) = lookup("VERBOSE_LOGGING") {
            self.verbose_logging = parse_env("VERBOSE_LOGGING", &v, "bool")?;
        }
        Ok(())
    }

    /// 运行前的必填检查
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "校内帐号" });
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingField { field: "密码" });
        }
        if self.work_content.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "工作内容" });
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "入口网址" });
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn content(&self) -> JournalContent {
        JournalContent::new(self.work_content.clone())
    }

    /// 未在命令列指定编号时使用的编号：预设编号优先，否则全部编号
    pub fn default_identifiers(&self) -> Vec<SchoolId> {
        match self.school_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => vec![SchoolId::new(id)],
            _ => self
                .school_ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(SchoolId::new)
                .collect(),
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            element: Duration::from_secs(self.element_timeout_secs),
            page_load: Duration::from_secs(self.page_load_timeout_secs),
            confirm: Duration::from_secs(self.confirm_timeout_secs),
            ..Timeouts::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            pacing: Duration::from_secs(self.delay_secs),
            backoff: self.backoff,
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    var_name: &str,
    value: &str,
    expected_type: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type,
        })
}
