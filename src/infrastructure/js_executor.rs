//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"在时限内执行 JS"的能力

use std::time::Duration;

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{SessionError, SessionResult};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露带时限的 eval() 能力
/// - 不认识表单栏位，也不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（导航、事件监听等非脚本操作使用）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 超过 `timeout` 即返回 `SessionError::Timeout`，`operation` 只用于错误讯息。
    pub async fn eval(
        &self,
        operation: &str,
        js_code: impl Into<String>,
        timeout: Duration,
    ) -> SessionResult<JsonValue> {
        let js_code = js_code.into();
        let evaluation = tokio::time::timeout(timeout, self.page.evaluate(js_code))
            .await
            .map_err(|_| SessionError::timeout(operation, timeout))??;
        Ok(evaluation.into_value()?)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        operation: &str,
        js_code: impl Into<String>,
        timeout: Duration,
    ) -> SessionResult<T> {
        let json_value = self.eval(operation, js_code, timeout).await?;
        Ok(serde_json::from_value(json_value)?)
    }
}
