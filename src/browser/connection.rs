use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, SessionError};

/// 连接到已开启远端除错埠的浏览器，并开一个新分页
///
/// 适用于操作者想沿用自己已登入的浏览器的情况。
pub async fn connect_to_browser(port: u16) -> AppResult<(Browser, Page, JoinHandle<()>)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("🔗 正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        unavailable(e)
    })?;
    debug!("浏览器连接成功");

    let handler_task = super::spawn_handler(handler);

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        unavailable(e)
    })?;

    Ok((browser, page, handler_task))
}

fn unavailable(e: chromiumoxide::error::CdpError) -> AppError {
    AppError::SessionUnavailable {
        source: SessionError::Disconnected {
            message: e.to_string(),
        },
    }
}
