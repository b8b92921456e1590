//! 日志页导航 - 业务能力层
//!
//! 登入后找出学习日志表单所在的网址。依序尝试：
//! 1. 点击选单中的日志连结
//! 2. 直接存取常见的日志页路径
//! 3. 等待操作者手动点击

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::models::{FormProfile, NavigationProfile};
use crate::services::form_locator::resolve_with;
use crate::services::{FieldRole, FormLocator};
use crate::session::{Session, Timeouts};

/// 每个日志连结的等待时间
const LINK_WAIT: Duration = Duration::from_secs(3);

pub struct JournalNavigator<'a, S: Session + ?Sized> {
    session: &'a S,
    navigation: &'a NavigationProfile,
    form: &'a FormProfile,
    timeouts: Timeouts,
}

impl<'a, S: Session + ?Sized> JournalNavigator<'a, S> {
    pub fn new(
        session: &'a S,
        navigation: &'a NavigationProfile,
        form: &'a FormProfile,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            session,
            navigation,
            form,
            timeouts,
        }
    }

    /// 回传日志表单所在文件的网址
    pub async fn locate(&self, portal_url: &str) -> AppResult<String> {
        info!("📋 正在导航到学习日志页面...");

        if let Some(url) = self.via_links().await {
            return Ok(url);
        }
        if let Some(url) = self.via_direct_urls(portal_url).await {
            return Ok(url);
        }
        if let Some(url) = self.via_operator().await {
            return Ok(url);
        }

        error!("❌ 无法导航到学习日志页面");
        Err(AppError::NavigationFailed {
            reason: "选单连结、直接网址与手动导航都找不到日志表单".to_string(),
        })
    }

    async fn via_links(&self) -> Option<String> {
        for strategy in &self.navigation.links {
            let link = match self.session.find(&strategy.locator, self.link_wait()).await {
                Ok(found) => found,
                Err(e) => {
                    debug!("日志连结 {} 未命中: {}", strategy.locator, e);
                    continue;
                }
            };

            info!("✅ 找到学习日志连结，准备点击: {}", strategy.locator);
            if let Err(e) = self.session.click(&link.element, self.timeouts.element).await {
                warn!("点击连结失败: {}", e);
                continue;
            }
            if let Some(url) = self.form_url(self.timeouts.element).await {
                info!("✅ 成功点击学习日志连结");
                return Some(url);
            }
        }
        None
    }

    async fn via_direct_urls(&self, portal_url: &str) -> Option<String> {
        for candidate in candidate_urls(portal_url, &self.navigation.direct_paths) {
            info!("🔗 尝试直接访问: {}", candidate);
            if let Err(e) = self.session.open(&candidate, self.timeouts.page_load).await {
                warn!("访问 {} 失败: {}", candidate, e);
                continue;
            }
            if let Some(url) = self.form_url(self.link_wait()).await {
                info!("✅ 成功访问学习日志页面");
                return Some(url);
            }
        }
        None
    }

    async fn via_operator(&self) -> Option<String> {
        if self.navigation.manual_wait_secs == 0 {
            return None;
        }
        info!("🤖 自动导航失败，请在浏览器中手动点击'學習日誌'连结");
        info!(
            "⏳ 等待 {} 秒...",
            self.navigation.manual_wait_secs
        );
        sleep(Duration::from_secs(self.navigation.manual_wait_secs)).await;

        let url = self.form_url(self.timeouts.element).await;
        if url.is_some() {
            info!("✅ 检测到已在学习日志页面");
        }
        url
    }

    /// 日期栏位存在即视为日志表单已载入
    ///
    /// 回传日期栏位所在文件的网址；表单放在 iframe 中时就是 iframe 的网址。
    async fn form_url(&self, wait: Duration) -> Option<String> {
        let locator = FormLocator::new(self.session, self.form, wait);
        let found = resolve_with(
            self.session,
            &FieldRole::Date.to_string(),
            locator.strategies(FieldRole::Date),
            wait,
        )
        .await
        .ok()?;

        match found.document_url {
            Some(url) if !url.is_empty() => Some(url),
            _ => self.session.current_url(self.timeouts.element).await.ok(),
        }
    }

    fn link_wait(&self) -> Duration {
        LINK_WAIT.min(self.timeouts.element)
    }
}

/// 由入口网址推出可能的日志页网址
///
/// 路径接在入口网址的 origin 之后，无法解析的入口网址不产生任何候选。
pub fn candidate_urls(portal_url: &str, paths: &[String]) -> Vec<String> {
    let Ok(base) = Url::parse(portal_url) else {
        warn!("无法解析入口网址: {}", portal_url);
        return Vec::new();
    };

    paths
        .iter()
        .filter_map(|path| base.join(path).ok())
        .map(String::from)
        .collect()
}
