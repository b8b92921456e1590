//! 表单定位器 - 业务能力层
//!
//! 把逻辑栏位（日期、校内编号、工作内容、新增按钮）对应到页面上的具体元素。
//! 每个栏位依序尝试设定档中的策略，第一个策略等待页面就绪，
//! 其余备援策略立即查找。这里不做重试，重试由呼叫端决定。

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::error::{LocateError, SessionError};
use crate::models::{FormProfile, Pick, Strategy};
use crate::session::{ElementRef, Found, Session};

/// 表单上的逻辑栏位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Date,
    Identifier,
    Content,
    Submit,
}

impl FieldRole {
    pub const ALL: [FieldRole; 4] = [
        FieldRole::Date,
        FieldRole::Identifier,
        FieldRole::Content,
        FieldRole::Submit,
    ];
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldRole::Date => "日期",
            FieldRole::Identifier => "校内编号",
            FieldRole::Content => "工作内容",
            FieldRole::Submit => "新增按钮",
        };
        f.write_str(name)
    }
}

/// 解析完成的表单栏位
#[derive(Debug, Clone)]
pub struct FormFields {
    pub date: ElementRef,
    pub identifier: ElementRef,
    pub content: ElementRef,
    pub submit: ElementRef,
}

/// 表单定位器
pub struct FormLocator<'a, S: Session + ?Sized> {
    session: &'a S,
    profile: &'a FormProfile,
    wait: Duration,
}

impl<'a, S: Session + ?Sized> FormLocator<'a, S> {
    /// `wait` 为第一个策略等待页面就绪的时间
    pub fn new(session: &'a S, profile: &'a FormProfile, wait: Duration) -> Self {
        Self {
            session,
            profile,
            wait,
        }
    }

    pub fn strategies(&self, role: FieldRole) -> &'a [Strategy] {
        match role {
            FieldRole::Date => &self.profile.date,
            FieldRole::Identifier => &self.profile.identifier,
            FieldRole::Content => &self.profile.content,
            FieldRole::Submit => &self.profile.submit,
        }
    }

    /// 解析单一栏位
    pub async fn resolve(&self, role: FieldRole) -> Result<Found, LocateError> {
        resolve_with(self.session, &role.to_string(), self.strategies(role), self.wait).await
    }

    /// 解析全部四个栏位，任何一个找不到即失败
    pub async fn resolve_all(&self) -> Result<FormFields, LocateError> {
        Ok(FormFields {
            date: self.resolve(FieldRole::Date).await?.element,
            identifier: self.resolve(FieldRole::Identifier).await?.element,
            content: self.resolve(FieldRole::Content).await?.element,
            submit: self.resolve(FieldRole::Submit).await?.element,
        })
    }
}

/// 依序尝试策略，回传第一个符合的元素
///
/// - 找不到或匹配数不符 `Pick::Unique` 时换下一个策略
/// - 全部落空时：若曾遇到"存在但不可互动"，回传该短暂性错误；否则 `NotFound`
/// - 其他会话错误（超时、断线）直接向上传递
pub async fn resolve_with<S: Session + ?Sized>(
    session: &S,
    role: &str,
    strategies: &[Strategy],
    first_wait: Duration,
) -> Result<Found, LocateError> {
    let mut not_interactable = None;

    for (i, strategy) in strategies.iter().enumerate() {
        let wait = if i == 0 { first_wait } else { Duration::ZERO };

        match session.find(&strategy.locator, wait).await {
            Ok(found) if strategy.pick == Pick::Unique && found.matches > 1 => {
                debug!(
                    "{} 策略 {} 匹配到 {} 个元素，略过",
                    role, strategy.locator, found.matches
                );
            }
            Ok(found) => {
                debug!("✓ 找到{} ({})", role, strategy.locator);
                return Ok(found);
            }
            Err(SessionError::ElementNotFound { .. }) => {
                debug!("{} 策略 {} 未命中", role, strategy.locator);
            }
            Err(e @ SessionError::NotInteractable { .. }) => {
                debug!("{} 策略 {} 命中但不可互动", role, strategy.locator);
                not_interactable = Some(e);
            }
            Err(e) => return Err(LocateError::Session(e)),
        }
    }

    match not_interactable {
        Some(e) => Err(LocateError::Session(e)),
        None => Err(LocateError::NotFound {
            role: role.to_string(),
            tried: strategies.iter().map(|s| s.locator.clone()).collect(),
        }),
    }
}
