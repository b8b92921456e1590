//! 基于 chromiumoxide 的会话实现

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::infrastructure::JsExecutor;
use crate::session::scripts::{self, ActionResult, FindScan};
use crate::session::{ElementRef, Found, Locator, Session};

/// 单次脚本执行的最短时限；`find` 的等待时间为零时仍需给脚本本身留时间
const MIN_SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// 浏览器的来源，决定 `close()` 要收掉多少东西
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserOwnership {
    /// 本程序启动的浏览器，关闭时结束整个进程
    Launched,
    /// 连接到操作者已开启的浏览器，只关闭本会话开的分页
    Attached,
}

impl BrowserOwnership {
    pub fn closes_browser(self) -> bool {
        matches!(self, Self::Launched)
    }
}

/// chromiumoxide 会话
///
/// 持有 Browser、CDP 事件处理任务与唯一的 `JsExecutor`。
/// `close()` 之后所有操作都会得到 `Disconnected`。
pub struct ChromeSession {
    browser: tokio::sync::Mutex<Option<Browser>>,
    ownership: BrowserOwnership,
    executor: JsExecutor,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    dialog_task: Mutex<Option<JoinHandle<()>>>,
    dialogs: Arc<Mutex<Vec<String>>>,
    poll_interval: Duration,
}

impl ChromeSession {
    /// 由已启动的浏览器建立会话
    ///
    /// `handler_task` 为处理 CDP 事件的背景任务，会话关闭时一并停止。
    pub async fn new(
        browser: Browser,
        ownership: BrowserOwnership,
        page: chromiumoxide::Page,
        handler_task: JoinHandle<()>,
        poll_interval: Duration,
    ) -> SessionResult<Self> {
        let dialogs = Arc::new(Mutex::new(Vec::new()));
        let dialog_task = spawn_dialog_acceptor(&page, dialogs.clone()).await?;

        Ok(Self {
            browser: tokio::sync::Mutex::new(Some(browser)),
            ownership,
            executor: JsExecutor::new(page),
            handler_task: Mutex::new(Some(handler_task)),
            dialog_task: Mutex::new(Some(dialog_task)),
            dialogs,
            poll_interval,
        })
    }

    async fn action(
        &self,
        operation: &str,
        element: &ElementRef,
        script: String,
        timeout: Duration,
    ) -> SessionResult<ActionResult> {
        self.ensure_open().await?;
        let result: ActionResult = self
            .executor
            .eval_as(operation, script, timeout.max(MIN_SCRIPT_TIMEOUT))
            .await?;
        if result.ok {
            return Ok(result);
        }
        match result.error.as_deref() {
            Some("stale") => Err(SessionError::StaleElement {
                reference: element.id().to_string(),
            }),
            Some("hidden") => Err(SessionError::NotInteractable {
                locator: Locator::css(format!(
                    "[{}=\"{}\"]",
                    scripts::REF_ATTRIBUTE,
                    element.id()
                )),
            }),
            Some("option_missing") => Err(SessionError::OptionMissing {
                value: result.value.unwrap_or_default(),
                available: result.options,
            }),
            other => Err(SessionError::protocol(format!(
                "{} 失败: {}",
                operation,
                other.unwrap_or("未知错误")
            ))),
        }
    }

    async fn ensure_open(&self) -> SessionResult<()> {
        if self.browser.lock().await.is_none() {
            return Err(SessionError::Disconnected {
                message: "会话已关闭".to_string(),
            });
        }
        Ok(())
    }

    /// 等待 document.readyState 变为 complete
    async fn wait_until_ready(&self, timeout: Duration) -> SessionResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let state: ActionResult = self
                .executor
                .eval_as("readyState", scripts::READY_STATE, MIN_SCRIPT_TIMEOUT)
                .await?;
            if state.value.as_deref() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::timeout("等待页面载入", timeout));
            }
            sleep(self.poll_interval).await;
        }
    }

    fn clear_dialogs(&self) {
        if let Ok(mut dialogs) = self.dialogs.lock() {
            dialogs.clear();
        }
    }

    fn dialog_text(&self) -> String {
        self.dialogs
            .lock()
            .map(|d| d.join("\n"))
            .unwrap_or_default()
    }

    pub fn ownership(&self) -> BrowserOwnership {
        self.ownership
    }

    fn abort_tasks(&self) {
        for task in [&self.dialog_task, &self.handler_task] {
            if let Ok(mut slot) = task.lock() {
                if let Some(handle) = slot.take() {
                    handle.abort();
                }
            }
        }
    }
}

/// 自动接受页面弹出的 alert / confirm，并记录讯息
///
/// 未处理的对话框会卡住 Runtime.evaluate。
async fn spawn_dialog_acceptor(
    page: &chromiumoxide::Page,
    dialogs: Arc<Mutex<Vec<String>>>,
) -> SessionResult<JoinHandle<()>> {
    let mut events = page.event_listener::<EventJavascriptDialogOpening>().await?;
    let page = page.clone();

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            debug!("💬 页面对话框: {}", event.message);
            if let Ok(mut log) = dialogs.lock() {
                log.push(event.message.clone());
            }
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                warn!("⚠️ 无法关闭页面对话框: {}", e);
            }
        }
    }))
}

#[async_trait]
impl Session for ChromeSession {
    async fn open(&self, url: &str, timeout: Duration) -> SessionResult<()> {
        self.ensure_open().await?;
        debug!("🔗 打开页面: {}", url);
        self.clear_dialogs();

        let navigation = tokio::time::timeout(timeout, self.executor.page().goto(url)).await;
        match navigation {
            Err(_) => return Err(SessionError::timeout(format!("打开 {}", url), timeout)),
            Ok(Err(e)) => {
                return Err(SessionError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
            Ok(Ok(_)) => {}
        }
        self.wait_until_ready(timeout).await
    }

    async fn find(&self, locator: &Locator, timeout: Duration) -> SessionResult<Found> {
        self.ensure_open().await?;
        let script = scripts::find(locator);
        let deadline = Instant::now() + timeout;

        loop {
            let scan: FindScan = self
                .executor
                .eval_as("find", script.clone(), MIN_SCRIPT_TIMEOUT)
                .await?;

            let miss = match scan.status.as_str() {
                "found" => {
                    let reference = scan.reference.ok_or_else(|| {
                        SessionError::protocol("find 脚本未回传元素引用")
                    })?;
                    return Ok(Found {
                        element: ElementRef::new(reference),
                        matches: scan.matches,
                        document_url: scan.document_url,
                    });
                }
                "hidden" => SessionError::NotInteractable {
                    locator: locator.clone(),
                },
                "invalid" => {
                    warn!(
                        "⚠️ 无效的定位方式 {}: {}",
                        locator,
                        scan.error.unwrap_or_default()
                    );
                    return Err(SessionError::ElementNotFound {
                        locator: locator.clone(),
                    });
                }
                _ => SessionError::ElementNotFound {
                    locator: locator.clone(),
                },
            };

            if Instant::now() >= deadline {
                return Err(miss);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn set_value(
        &self,
        element: &ElementRef,
        text: &str,
        timeout: Duration,
    ) -> SessionResult<()> {
        self.action("set_value", element, scripts::set_value(element.id(), text), timeout)
            .await
            .map_err(|e| match e {
                SessionError::OptionMissing { available, .. } => SessionError::OptionMissing {
                    value: text.to_string(),
                    available,
                },
                other => other,
            })?;
        Ok(())
    }

    async fn read_value(&self, element: &ElementRef, timeout: Duration) -> SessionResult<String> {
        let result = self
            .action("read_value", element, scripts::read_value(element.id()), timeout)
            .await?;
        Ok(result.value.unwrap_or_default())
    }

    async fn click(&self, element: &ElementRef, timeout: Duration) -> SessionResult<()> {
        self.action("click", element, scripts::click(element.id()), timeout)
            .await?;
        Ok(())
    }

    async fn press_enter(&self, element: &ElementRef, timeout: Duration) -> SessionResult<()> {
        self.action("press_enter", element, scripts::press_enter(element.id()), timeout)
            .await?;
        Ok(())
    }

    async fn current_url(&self, timeout: Duration) -> SessionResult<String> {
        self.ensure_open().await?;
        let result: ActionResult = self
            .executor
            .eval_as("current_url", scripts::CURRENT_URL, timeout.max(MIN_SCRIPT_TIMEOUT))
            .await?;
        Ok(result.value.unwrap_or_default())
    }

    async fn page_text(&self, timeout: Duration) -> SessionResult<String> {
        self.ensure_open().await?;
        let result: ActionResult = self
            .executor
            .eval_as("page_text", scripts::page_text(), timeout.max(MIN_SCRIPT_TIMEOUT))
            .await?;
        let mut text = self.dialog_text();
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&result.value.unwrap_or_default());
        Ok(text)
    }

    async fn close(&self) -> SessionResult<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let closed = if self.ownership.closes_browser() {
            info!("🔒 正在关闭浏览器...");
            let closed = browser.close().await.map(|_| ());
            if let Err(e) = browser.wait().await {
                debug!("等待浏览器进程结束失败: {}", e);
            }
            closed
        } else {
            // 操作者自己的浏览器继续运行
            info!("🔒 正在关闭分页，保留已连接的浏览器");
            self.executor.page().clone().close().await
        };

        self.abort_tasks();

        closed.map_err(|e| SessionError::Disconnected {
            message: e.to_string(),
        })
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
