//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用主结构
//! - 取得浏览器会话
//! - 建立调度器并接上进度显示与失败清单
//! - 写出运行报告、输出最终统计
//!
//! ### `batch_driver` - 批次提交调度器
//! - 持有会话直到运行结束
//! - 登入、导航、逐笔提交、重试与停止
//!
//! ## 层次关系
//!
//! ```text
//! app (一次运行)
//!     ↓
//! batch_driver (处理 Vec<SubmissionTask>)
//!     ↓
//! workflow::EntrySubmitter (处理单笔日志)
//!     ↓
//! services (能力层：login / navigator / form_locator / confirmation)
//!     ↓
//! session (浏览器会话)
//! ```

pub mod app;
pub mod batch_driver;

pub use app::App;
pub use batch_driver::{Backoff, BatchDriver, RetryPolicy};
