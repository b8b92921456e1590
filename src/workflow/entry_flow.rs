//! 单笔日志提交流程 - 流程层
//!
//! 流程顺序：
//! 1. 重新开启表单网址（同时是失败后的重置）
//! 2. 定位四个栏位
//! 3. 填入日期、校内编号、工作内容并回读
//! 4. 记录点击前的页面文字，点击新增
//! 5. 等待确认讯息
//!
//! 只做一次尝试，是否重试由调度层决定。

use tracing::{debug, info, warn};

use crate::error::{LocateError, SessionError};
use crate::models::{FailureReason, PortalProfile, SubmissionOutcome, SubmissionTask};
use crate::services::{ConfirmationCheck, FormFields, FormLocator, Verdict};
use crate::session::{Session, Timeouts};
use crate::workflow::entry_ctx::TaskCtx;

/// 一次尝试的失败
#[derive(Debug)]
struct Failure {
    reason: FailureReason,
    detail: String,
}

impl Failure {
    fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    /// 点击之后的任何错误都只能算"未确认"，重试可能造成重复提交
    fn unconfirmed(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::Unconfirmed, detail)
    }
}

/// 点击之前的会话错误
impl From<SessionError> for Failure {
    fn from(e: SessionError) -> Self {
        let reason = if e.is_transient() {
            FailureReason::Transient
        } else {
            FailureReason::FormNotFound
        };
        Self::new(reason, e.to_string())
    }
}

impl From<LocateError> for Failure {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::NotFound { .. } => Self::new(FailureReason::FormNotFound, e.to_string()),
            LocateError::Session(e) => e.into(),
        }
    }
}

/// 单笔日志提交流程
///
/// - 不持有会话，只借用
/// - 失败时一定重置表单，不把残留的栏位值带到下一次
pub struct EntrySubmitter<'a, S: Session + ?Sized> {
    session: &'a S,
    profile: &'a PortalProfile,
    timeouts: Timeouts,
    form_url: &'a str,
}

impl<'a, S: Session + ?Sized> EntrySubmitter<'a, S> {
    pub fn new(
        session: &'a S,
        profile: &'a PortalProfile,
        timeouts: Timeouts,
        form_url: &'a str,
    ) -> Self {
        Self {
            session,
            profile,
            timeouts,
            form_url,
        }
    }

    /// 提交一笔日志，回传本次尝试的结果
    pub async fn submit(&self, task: &SubmissionTask, ctx: &TaskCtx) -> SubmissionOutcome {
        match self.attempt(task, ctx).await {
            Ok(marker) => {
                info!("{} ✅ 提交成功 ({})", ctx, marker);
                SubmissionOutcome::success(task.clone(), ctx.attempt, Some(marker))
            }
            Err(failure) => {
                warn!(
                    "{} ⚠️ 第 {} 次尝试失败 [{}]: {}",
                    ctx, ctx.attempt, failure.reason, failure.detail
                );
                self.reset(ctx).await;
                SubmissionOutcome::failed(task.clone(), failure.reason, ctx.attempt, failure.detail)
            }
        }
    }

    async fn attempt(&self, task: &SubmissionTask, ctx: &TaskCtx) -> Result<String, Failure> {
        debug!("{} 开启表单: {}", ctx, self.form_url);
        self.session
            .open(self.form_url, self.timeouts.page_load)
            .await?;

        let fields = FormLocator::new(self.session, &self.profile.form, self.timeouts.element)
            .resolve_all()
            .await?;

        self.fill(task, &fields, ctx).await?;
        self.verify_fill(task, &fields).await?;

        let baseline = self.session.page_text(self.timeouts.element).await?;

        info!("{} 🖱️ 点击新增", ctx);
        match self
            .session
            .click(&fields.submit, self.timeouts.element)
            .await
        {
            Ok(()) => {}
            // 脚本在派送点击前就发现元素失效或被遮挡，表单尚未送出
            Err(e @ (SessionError::StaleElement { .. } | SessionError::NotInteractable { .. })) => {
                return Err(e.into());
            }
            Err(e) => return Err(Failure::unconfirmed(format!("点击后状态不明: {}", e))),
        }

        let check = ConfirmationCheck::new(
            &self.profile.confirmation,
            self.timeouts.confirm,
            self.timeouts.poll_interval,
        );
        match check.wait(self.session, &baseline).await {
            Verdict::Confirmed(marker) => Ok(marker),
            Verdict::Rejected(marker) => {
                Err(Failure::unconfirmed(format!("门户回应: {}", marker)))
            }
            Verdict::NoSignal => Err(Failure::unconfirmed("未出现确认讯息")),
        }
    }

    async fn fill(
        &self,
        task: &SubmissionTask,
        fields: &FormFields,
        ctx: &TaskCtx,
    ) -> Result<(), Failure> {
        let date = self.profile.date_format.format(task.date);
        debug!("{} 📅 日期: {}", ctx, date);
        self.session
            .set_value(&fields.date, &date, self.timeouts.element)
            .await?;

        debug!("{} 🔢 校内编号: {}", ctx, task.school_id);
        self.session
            .set_value(&fields.identifier, task.school_id.as_str(), self.timeouts.element)
            .await?;

        debug!("{} 📝 工作内容: {} 字", ctx, task.content.as_str().chars().count());
        self.session
            .set_value(&fields.content, task.content.as_str(), self.timeouts.element)
            .await?;

        Ok(())
    }

    /// 回读校内编号与工作内容；不一致时不点击
    async fn verify_fill(&self, task: &SubmissionTask, fields: &FormFields) -> Result<(), Failure> {
        let identifier = self
            .session
            .read_value(&fields.identifier, self.timeouts.element)
            .await?;
        if identifier != task.school_id.as_str() {
            return Err(Failure::unconfirmed(format!(
                "校内编号回读不一致: '{}'",
                identifier
            )));
        }

        let content = self
            .session
            .read_value(&fields.content, self.timeouts.element)
            .await?;
        if content != task.content.as_str() {
            return Err(Failure::unconfirmed(format!(
                "工作内容回读不一致: 预期 {} 字，实际 {} 字",
                task.content.as_str().chars().count(),
                content.chars().count()
            )));
        }

        Ok(())
    }

    /// 尽力重置表单，失败只记录
    async fn reset(&self, ctx: &TaskCtx) {
        if let Err(e) = self
            .session
            .open(self.form_url, self.timeouts.page_load)
            .await
        {
            warn!("{} 重置表单失败: {}", ctx, e);
        }
    }
}
