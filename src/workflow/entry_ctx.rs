//! 日志处理上下文
//!
//! 封装"我正在处理第几笔、第几次尝试"这一信息

use std::fmt::Display;

use chrono::NaiveDate;

use crate::models::{SchoolId, SubmissionTask};

/// 单笔日志的处理上下文，只用于日志前缀与尝试计数
#[derive(Debug, Clone)]
pub struct TaskCtx {
    /// 第几笔（从1开始）
    pub index: usize,
    /// 总笔数
    pub total: usize,
    /// 第几次尝试（从1开始）
    pub attempt: u32,
    pub date: NaiveDate,
    pub school_id: SchoolId,
}

impl TaskCtx {
    pub fn new(index: usize, total: usize, task: &SubmissionTask) -> Self {
        Self {
            index,
            total,
            attempt: 1,
            date: task.date,
            school_id: task.school_id.clone(),
        }
    }

    pub fn with_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }
}

impl Display for TaskCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{} {} {}]",
            self.index, self.total, self.date, self.school_id
        )
    }
}
