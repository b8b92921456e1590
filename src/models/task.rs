use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::models::DateRange;

/// 校内编号
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(String);

impl SchoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 工作内容，逐字填入每一笔日志
///
/// 内部以 `Arc<str>` 共享，复制任务时不会复制内容本身。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct JournalContent(Arc<str>);

impl JournalContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Arc::from(text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for JournalContent {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<JournalContent> for String {
    fn from(content: JournalContent) -> Self {
        content.0.to_string()
    }
}

/// 登入帐密，只在登入步骤使用，不落地
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 一笔待提交的日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionTask {
    pub date: NaiveDate,
    pub school_id: SchoolId,
    pub content: JournalContent,
}

impl SubmissionTask {
    pub fn new(date: NaiveDate, school_id: SchoolId, content: JournalContent) -> Self {
        Self {
            date,
            school_id,
            content,
        }
    }
}

impl fmt::Display for SubmissionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.date, self.school_id)
    }
}

/// 去除重复的校内编号，保留第一次出现的顺序
pub fn dedup_identifiers(identifiers: &[SchoolId]) -> Vec<SchoolId> {
    let mut seen = std::collections::HashSet::new();
    identifiers
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// 展开日期 × 校内编号的任务清单
///
/// 顺序固定：日期递增为主，同一天内依使用者给定的编号顺序。
pub fn materialize_tasks(
    range: &DateRange,
    identifiers: &[SchoolId],
    content: &JournalContent,
) -> Result<Vec<SubmissionTask>, PlanError> {
    let identifiers = dedup_identifiers(identifiers);
    if identifiers.is_empty() {
        return Err(PlanError::NoIdentifiers);
    }

    Ok(range
        .days()
        .flat_map(|date| {
            identifiers
                .iter()
                .map(move |id| SubmissionTask::new(date, id.clone(), content.clone()))
        })
        .collect())
}
