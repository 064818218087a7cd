// 按名称调用远程过程的抽象层
use async_trait::async_trait;
use serde_json::Value;

use crate::infrastructure::PanelError;

/// Call-by-name remote procedure invoker.
///
/// Implementations return the parsed JSON payload of a successful call, or a
/// `PanelError::Transport` when the backend could not be reached at all.
#[async_trait]
pub trait RpcInvoker: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, PanelError>;

    /// Names of every method the backend exposes. Used once for capability
    /// negotiation at connect time.
    async fn list_methods(&self) -> Result<Vec<String>, PanelError>;
}
