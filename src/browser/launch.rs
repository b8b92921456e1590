use chromiumoxide::{Browser, BrowserConfig, Page};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::BrowserSettings;
use crate::error::{AppError, AppResult, SessionError};

/// 启动本机浏览器
///
/// 预设为可视模式，操作者可以看到每一步的填写过程。
pub async fn launch_browser(
    settings: &BrowserSettings,
) -> AppResult<(Browser, Page, JoinHandle<()>)> {
    info!(
        "🌐 正在开启浏览器 ({})...",
        if settings.headless { "无头模式" } else { "可视模式" }
    );

    let mut builder = BrowserConfig::builder()
        .window_size(settings.window_width, settings.window_height)
        .args(vec!["--disable-gpu", "--disable-dev-shm-usage"])
        .no_sandbox();

    builder = if settings.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(path) = &settings.chrome_executable {
        debug!("浏览器执行档: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        unavailable(e)
    })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        unavailable(e)
    })?;
    debug!("浏览器启动成功");

    let handler_task = super::spawn_handler(handler);

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        unavailable(e)
    })?;

    Ok((browser, page, handler_task))
}

fn unavailable(e: impl std::fmt::Display) -> AppError {
    AppError::SessionUnavailable {
        source: SessionError::Disconnected {
            message: e.to_string(),
        },
    }
}
