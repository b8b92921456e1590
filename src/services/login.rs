//! 登入服务 - 业务能力层

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, LocateError};
use crate::models::{Credentials, LoginProfile};
use crate::services::form_locator::resolve_with;
use crate::session::{Session, Timeouts};

/// 登入服务
///
/// 登入失败是致命错误：回传错误后整个运行即中止。
pub struct LoginService<'a, S: Session + ?Sized> {
    session: &'a S,
    profile: &'a LoginProfile,
    timeouts: Timeouts,
}

impl<'a, S: Session + ?Sized> LoginService<'a, S> {
    pub fn new(session: &'a S, profile: &'a LoginProfile, timeouts: Timeouts) -> Self {
        Self {
            session,
            profile,
            timeouts,
        }
    }

    /// 开启入口网址并登入
    pub async fn login(&self, portal_url: &str, credentials: Credentials) -> AppResult<()> {
        info!("🔗 正在访问: {}", portal_url);
        self.session
            .open(portal_url, self.timeouts.page_load)
            .await
            .map_err(|source| AppError::SessionUnavailable { source })?;

        info!("🔍 正在寻找登入表单...");
        let username = self.locate("帐号栏位", &self.profile.username).await?;
        let password = self.locate("密码栏位", &self.profile.password).await?;

        info!("⌨️ 正在输入帐号密码...");
        self.session
            .set_value(&username, &credentials.username, self.timeouts.element)
            .await
            .map_err(login_failed)?;
        self.session
            .set_value(&password, &credentials.password, self.timeouts.element)
            .await
            .map_err(login_failed)?;

        let baseline = self
            .session
            .page_text(self.timeouts.element)
            .await
            .unwrap_or_default();

        match resolve_with(
            self.session,
            "登入按钮",
            &self.profile.submit,
            std::time::Duration::ZERO,
        )
        .await
        {
            Ok(button) => {
                info!("🖱️ 点击登入按钮");
                self.session
                    .click(&button.element, self.timeouts.element)
                    .await
                    .map_err(login_failed)?;
            }
            Err(LocateError::NotFound { .. }) => {
                info!("🔍 找不到登入按钮，按 Enter 键登入");
                self.session
                    .press_enter(&password, self.timeouts.element)
                    .await
                    .map_err(login_failed)?;
            }
            Err(LocateError::Session(e)) => return Err(login_failed(e)),
        }

        self.await_result(&credentials.username, &baseline).await
    }

    async fn locate(
        &self,
        role: &str,
        strategies: &[crate::models::Strategy],
    ) -> AppResult<crate::session::ElementRef> {
        resolve_with(self.session, role, strategies, self.timeouts.element)
            .await
            .map(|found| found.element)
            .map_err(|e| {
                error!("❌ 找不到{}", role);
                AppError::LoginFailed {
                    reason: e.to_string(),
                }
            })
    }

    /// 等待登入结果：成功标记（含帐号本身）或失败标记
    async fn await_result(&self, username: &str, baseline: &str) -> AppResult<()> {
        let deadline = Instant::now() + self.timeouts.page_load;
        let mut success_markers: Vec<&str> = self
            .profile
            .success_markers
            .iter()
            .map(String::as_str)
            .collect();
        if !username.is_empty() {
            success_markers.push(username);
        }

        loop {
            match self.session.page_text(self.timeouts.element).await {
                Ok(text) => {
                    if let Some(marker) = self
                        .profile
                        .failure_markers
                        .iter()
                        .find(|m| appeared(&text, baseline, m))
                    {
                        error!("❌ 登入失败: {}", marker);
                        return Err(AppError::LoginFailed {
                            reason: format!("门户回应: {}", marker),
                        });
                    }
                    if success_markers.iter().any(|m| appeared(&text, baseline, m)) {
                        info!("✅ 登入成功");
                        return Ok(());
                    }
                }
                Err(e) => debug!("读取登入结果失败，继续等待: {}", e),
            }

            if Instant::now() >= deadline {
                error!("❌ 登入失败");
                return Err(AppError::LoginFailed {
                    reason: "unconfirmed".to_string(),
                });
            }
            sleep(self.timeouts.poll_interval).await;
        }
    }
}

fn appeared(text: &str, baseline: &str, marker: &str) -> bool {
    !marker.is_empty() && text.matches(marker).count() > baseline.matches(marker).count()
}

fn login_failed(e: crate::error::SessionError) -> AppError {
    AppError::LoginFailed {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::session::{ElementRef, Found, Locator, MockSession};
    use mockall::predicate::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn found(id: &str) -> Found {
        Found {
            element: ElementRef::new(id),
            matches: 1,
            document_url: None,
        }
    }

    fn login_page(session: &mut MockSession, clicked: Arc<AtomicBool>, after_click: &'static str) {
        session.expect_open().returning(|_, _| Ok(()));
        session
            .expect_find()
            .with(eq(Locator::css("#txtLoginID")), always())
            .returning(|_, _| Ok(found("user")));
        session
            .expect_find()
            .with(eq(Locator::css("#txtLoginPWD")), always())
            .returning(|_, _| Ok(found("pwd")));
        session
            .expect_find()
            .with(eq(Locator::css("#button")), always())
            .returning(|_, _| Ok(found("btn")));
        session.expect_set_value().returning(|_, _, _| Ok(()));
        let flag = clicked.clone();
        session.expect_click().returning(move |_, _| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        session.expect_page_text().returning(move |_| {
            if clicked.load(Ordering::SeqCst) {
                Ok(after_click.to_string())
            } else {
                Ok("校園入口 Menu".to_string())
            }
        });
    }

    #[tokio::test]
    async fn test_login_success_by_logout_marker() {
        let mut session = MockSession::new();
        login_page(&mut session, Arc::new(AtomicBool::new(false)), "歡迎 | 登出");

        let profile = LoginProfile::default();
        let service = LoginService::new(&session, &profile, Timeouts::immediate());
        tokio_test::assert_ok!(
            service
                .login("https://portal.test/punch/Menu.jsp", Credentials::new("s1", "pw"))
                .await
        );
    }

    #[tokio::test]
    async fn test_login_failure_marker_is_fatal() {
        let mut session = MockSession::new();
        login_page(&mut session, Arc::new(AtomicBool::new(false)), "密碼錯誤");

        let profile = LoginProfile::default();
        let service = LoginService::new(&session, &profile, Timeouts::immediate());
        let err = service
            .login("https://portal.test/punch/Menu.jsp", Credentials::new("s1", "bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LoginFailed { .. }));
    }

    #[tokio::test]
    async fn test_login_without_marker_is_unconfirmed() {
        let mut session = MockSession::new();
        login_page(&mut session, Arc::new(AtomicBool::new(false)), "校園入口 Menu");

        let profile = LoginProfile::default();
        let service = LoginService::new(&session, &profile, Timeouts::immediate());
        match service
            .login("https://portal.test/punch/Menu.jsp", Credentials::new("s1", "pw"))
            .await
        {
            Err(AppError::LoginFailed { reason }) => assert_eq!(reason, "unconfirmed"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_portal_is_session_error() {
        let mut session = MockSession::new();
        session.expect_open().returning(|url, _| {
            Err(SessionError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            })
        });

        let profile = LoginProfile::default();
        let service = LoginService::new(&session, &profile, Timeouts::immediate());
        let err = service
            .login("https://nowhere.test", Credentials::new("s1", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_missing_button_falls_back_to_enter() {
        let mut session = MockSession::new();
        session.expect_open().returning(|_, _| Ok(()));
        session.expect_find().returning(|l, _| match l {
            Locator::Css(s) if s == "#txtLoginID" => Ok(found("user")),
            Locator::Css(s) if s == "#txtLoginPWD" => Ok(found("pwd")),
            other => Err(SessionError::ElementNotFound {
                locator: other.clone(),
            }),
        });
        session.expect_set_value().returning(|_, _, _| Ok(()));
        let pressed = Arc::new(AtomicBool::new(false));
        let flag = pressed.clone();
        session
            .expect_press_enter()
            .withf(|el, _| el.id() == "pwd")
            .times(1)
            .returning(move |_, _| {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            });
        session.expect_page_text().returning(move |_| {
            Ok(if pressed.load(Ordering::SeqCst) {
                "s1 您好 登出".to_string()
            } else {
                String::new()
            })
        });

        let profile = LoginProfile::default();
        let service = LoginService::new(&session, &profile, Timeouts::immediate());
        tokio_test::assert_ok!(
            service
                .login("https://portal.test/punch/Menu.jsp", Credentials::new("s1", "pw"))
                .await
        );
    }
}
