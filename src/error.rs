use std::time::Duration;

use thiserror::Error;

use crate::session::Locator;

/// 应用程序错误类型
///
/// 只覆盖"整个运行"级别的失败；单条日志的失败会被收进
/// `SubmissionOutcome`，不会以错误的形式向上冒泡。
#[derive(Debug, Error)]
pub enum AppError {
    /// 登入失败（致命，任何任务开始前中止）
    #[error("登入失败: {reason}")]
    LoginFailed { reason: String },

    /// 浏览器会话不可用（启动/连接/打开入口页失败）
    #[error("浏览器会话不可用: {source}")]
    SessionUnavailable {
        #[source]
        source: SessionError,
    },

    /// 找不到学习日志页面
    #[error("无法导航到学习日志页面: {reason}")]
    NavigationFailed { reason: String },

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 任务计划错误
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// 报告读写失败
    #[error("报告文件 {path} 处理失败: {source}")]
    Report {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 浏览器会话错误
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// 元素不存在
    #[error("找不到元素: {locator}")]
    ElementNotFound { locator: Locator },

    /// 元素存在但不可见或已禁用
    #[error("元素不可互动: {locator}")]
    NotInteractable { locator: Locator },

    /// 元素引用已失效（页面已重新载入）
    #[error("元素引用已失效: {reference}")]
    StaleElement { reference: String },

    /// 下拉选单中没有指定选项
    #[error("选单中没有选项 '{value}' (可用: {available:?})")]
    OptionMissing { value: String, available: Vec<String> },

    /// 操作超时
    #[error("{operation} 超时 ({after:?})")]
    Timeout { operation: String, after: Duration },

    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    Navigation { url: String, message: String },

    /// CDP / 脚本层面的错误
    #[error("浏览器协议错误: {message}")]
    Protocol { message: String },

    /// 浏览器已断开
    #[error("浏览器连接已断开: {message}")]
    Disconnected { message: String },
}

impl SessionError {
    /// 是否为短暂性错误（重新整理表单后再试可能成功）
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::ElementNotFound { .. } | SessionError::OptionMissing { .. } => false,
            SessionError::NotInteractable { .. }
            | SessionError::StaleElement { .. }
            | SessionError::Timeout { .. }
            | SessionError::Navigation { .. }
            | SessionError::Protocol { .. }
            | SessionError::Disconnected { .. } => true,
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        SessionError::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn protocol(message: impl std::fmt::Display) -> Self {
        SessionError::Protocol {
            message: message.to_string(),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        match err {
            chromiumoxide::error::CdpError::Timeout => SessionError::Timeout {
                operation: "CDP 请求".to_string(),
                after: Duration::ZERO,
            },
            other => SessionError::protocol(other),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::protocol(format!("脚本返回值解析失败: {}", err))
    }
}

/// 表单定位错误
#[derive(Debug, Clone, Error)]
pub enum LocateError {
    /// 所有策略都找不到该栏位
    #[error("找不到栏位 {role} (已尝试 {} 种策略)", tried.len())]
    NotFound {
        role: String,
        tried: Vec<Locator>,
    },

    /// 会话层错误（超时、断线等）
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 解析配置文件失败
    #[error("无法解析配置文件 {path}: {message}")]
    ParseFailed { path: String, message: String },

    /// 必填栏位为空
    #[error("请输入{field}")]
    MissingField { field: &'static str },

    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
}

/// 任务计划错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("开始日期 {start} 不能晚于结束日期 {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("至少需要一个校内编号")]
    NoIdentifiers,
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 会话操作结果类型
pub type SessionResult<T> = Result<T, SessionError>;
