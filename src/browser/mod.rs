//! 浏览器取得：本机启动，或连接到已开启远端除错埠的浏览器

pub mod connection;
pub mod launch;

use futures::StreamExt;
use tokio::task::JoinHandle;

pub use connection::connect_to_browser;
pub use launch::launch_browser;

use crate::config::BrowserSettings;
use crate::error::{AppError, AppResult};
use crate::session::{BrowserOwnership, ChromeSession, Timeouts};

/// 依设定取得浏览器会话
///
/// 设定了 `debug_port` 时连接既有浏览器，否则启动新的浏览器。
/// 连接来的浏览器在会话关闭后继续运行。
pub async fn acquire_session(
    settings: &BrowserSettings,
    timeouts: &Timeouts,
) -> AppResult<ChromeSession> {
    let ((browser, page, handler_task), ownership) = match settings.debug_port {
        Some(port) => (connect_to_browser(port).await?, BrowserOwnership::Attached),
        None => (launch_browser(settings).await?, BrowserOwnership::Launched),
    };

    ChromeSession::new(
        browser,
        ownership,
        page,
        handler_task,
        timeouts.poll_interval,
    )
    .await
    .map_err(|source| AppError::SessionUnavailable { source })
}

/// 在后台处理浏览器事件
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}
