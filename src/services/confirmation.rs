//! 提交结果确认 - 业务能力层
//!
//! 点击新增后必须明确看到成功讯息才算成功；没有讯息就是"未确认"，
//! 不因为没有例外而推定成功。

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::models::ConfirmationProfile;
use crate::session::Session;

/// 确认结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 出现新的成功讯息
    Confirmed(String),
    /// 出现新的失败讯息（例如重复、已存在）
    Rejected(String),
    /// 时限内没有任何新讯息
    NoSignal,
}

/// 关键字比对式的确认检查
///
/// 只计算点击后"新出现"的关键字：页面原本就含有的"完成"之类字样不算数。
pub struct ConfirmationCheck<'a> {
    profile: &'a ConfirmationProfile,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'a> ConfirmationCheck<'a> {
    pub fn new(
        profile: &'a ConfirmationProfile,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            profile,
            timeout,
            poll_interval,
        }
    }

    /// 轮询页面文字直到出现判定关键字或逾时
    ///
    /// 读取页面失败（例如页面正在跳转）不中断轮询。
    pub async fn wait<S: Session + ?Sized>(&self, session: &S, baseline: &str) -> Verdict {
        let deadline = Instant::now() + self.timeout;
        loop {
            match session.page_text(self.poll_interval).await {
                Ok(text) => {
                    let verdict = self.judge(baseline, &text);
                    if verdict != Verdict::NoSignal {
                        return verdict;
                    }
                }
                Err(e) => debug!("读取页面文字失败，继续等待: {}", e),
            }

            if Instant::now() >= deadline {
                return Verdict::NoSignal;
            }
            sleep(self.poll_interval).await;
        }
    }

    /// 比较点击前后的页面文字
    ///
    /// 失败关键字优先：同时出现"新增"与"失敗"时视为失败。
    pub fn judge(&self, baseline: &str, current: &str) -> Verdict {
        if let Some(marker) = newly_appeared(&self.profile.failure_markers, baseline, current) {
            return Verdict::Rejected(marker);
        }
        if let Some(marker) = newly_appeared(&self.profile.success_markers, baseline, current) {
            return Verdict::Confirmed(marker);
        }
        Verdict::NoSignal
    }
}

fn newly_appeared(markers: &[String], baseline: &str, current: &str) -> Option<String> {
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .find(|m| current.matches(m.as_str()).count() > baseline.matches(m.as_str()).count())
        .cloned()
}
