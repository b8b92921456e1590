//! # Journal Autofill
//!
//! 透过浏览器批次填写学习日志的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构，上层只依赖下层：
//!
//! ### ① 会话层（Session / Infrastructure / Browser）
//! - `session/` - `Session` trait 与 chromiumoxide 实现 `ChromeSession`
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner，只提供有时限的 eval()
//! - `browser/` - 启动本机浏览器或连接远端除错埠
//!
//! ### ② 业务能力层（Services）
//! - `FormLocator` - 把逻辑栏位对应到页面元素
//! - `LoginService` / `JournalNavigator` - 登入与找到日志表单
//! - `ConfirmationCheck` - 提交后的确认讯息判定
//! - `FailureWriter` - 写失败清单
//!
//! ### ③ 流程层（Workflow）
//! - `EntrySubmitter` - 一笔日志的完整提交流程
//! - `TaskCtx` - 第几笔、第几次尝试
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchDriver` - 顺序调度、节奏、重试、停止
//! - `App` - 一次完整运行
//!
//! ## 模块结构

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{BrowserSettings, Config};
pub use error::{AppError, AppResult, SessionError};
pub use models::{
    Credentials, DateRange, FailureReason, JournalContent, OutcomeStatus, PortalProfile,
    RunReport, RunStatus, SchoolId, SubmissionOutcome, SubmissionTask,
};
pub use orchestrator::{App, Backoff, BatchDriver, RetryPolicy};
pub use session::{ElementRef, Found, Locator, Session, Timeouts};
pub use workflow::{EntrySubmitter, TaskCtx};
