//! 浏览器会话 - 远程控制接口
//!
//! 上层（定位器、提交器、批次驱动）只认识 `Session` trait，
//! 不直接接触 chromiumoxide。测试时可以换成内存中的假门户。

pub mod chrome;
mod scripts;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionResult;

#[cfg(test)]
use mockall::automock;

pub use chrome::{BrowserOwnership, ChromeSession};

/// 元素查找方式
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// CSS 选择器
    Css(String),
    /// XPath 表达式
    #[serde(rename = "xpath")]
    XPath(String),
    /// `<label>` 文字，解析为其对应的控件
    LabelText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn label(text: impl Into<String>) -> Self {
        Locator::LabelText(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
            Locator::LabelText(s) => write!(f, "label={}", s),
        }
    }
}

/// 已定位元素的不透明引用
///
/// 页面重新载入后引用即失效，再使用会得到 `StaleElement`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `find` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub element: ElementRef,
    /// 可互动的匹配数量
    pub matches: usize,
    /// 元素所在文件的 URL（表单位于 iframe 时与顶层 URL 不同）
    pub document_url: Option<String>,
}

/// 远程浏览器会话
///
/// 所有操作都带有上限等待时间，不会无限阻塞。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Session: Send + Sync {
    /// 打开页面并等待载入
    async fn open(&self, url: &str, timeout: Duration) -> SessionResult<()>;

    /// 查找元素，在超时前持续轮询直到元素出现且可互动
    async fn find(&self, locator: &Locator, timeout: Duration) -> SessionResult<Found>;

    /// 以 `text` 取代栏位的整个值
    async fn set_value(
        &self,
        element: &ElementRef,
        text: &str,
        timeout: Duration,
    ) -> SessionResult<()>;

    /// 读取栏位当前的值
    async fn read_value(&self, element: &ElementRef, timeout: Duration) -> SessionResult<String>;

    async fn click(&self, element: &ElementRef, timeout: Duration) -> SessionResult<()>;

    /// 在栏位中按下 Enter
    async fn press_enter(&self, element: &ElementRef, timeout: Duration) -> SessionResult<()>;

    async fn current_url(&self, timeout: Duration) -> SessionResult<String>;

    /// 页面可见文字（含 iframe 与自上次 `open` 以来弹出的对话框讯息）
    async fn page_text(&self, timeout: Duration) -> SessionResult<String>;

    /// 释放会话；重复调用无副作用
    async fn close(&self) -> SessionResult<()>;
}

/// 会话操作使用的时间上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// 等待元素出现
    pub element: Duration,
    /// 等待页面载入
    pub page_load: Duration,
    /// 提交后等待确认讯息
    pub confirm: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(10),
            page_load: Duration::from_secs(30),
            confirm: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Timeouts {
    /// 所有等待都为零，测试用
    pub fn immediate() -> Self {
        Self {
            element: Duration::ZERO,
            page_load: Duration::ZERO,
            confirm: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}
