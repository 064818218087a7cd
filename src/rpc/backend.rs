use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::envelope::unwrap_envelope;
use super::invoker::RpcInvoker;
use super::methods::{BackendMethod, MethodTable};
use super::models::{
    ConflictContent, GitStatus, RawStatusResponse, RebaseRunReport, RebaseStatusReport,
    StartRebaseResponse,
};
use crate::infrastructure::PanelError;
use crate::rebase::plan::RebaseStep;

/// Typed facade over the negotiated RPC surface.
///
/// Every response is unwrapped from its correlation envelope before it is
/// interpreted. Transport failures flip the connection flag; any successful
/// round trip restores it.
pub struct Backend {
    invoker: Arc<dyn RpcInvoker>,
    methods: MethodTable,
    connected: AtomicBool,
}

impl Backend {
    pub async fn connect(invoker: Arc<dyn RpcInvoker>) -> Result<Self, PanelError> {
        let methods = MethodTable::negotiate(invoker.as_ref()).await?;
        tracing::info!(
            "Backend ready ({} of {} operations available)",
            BackendMethod::ALL.len() - methods.missing().len(),
            BackendMethod::ALL.len()
        );
        Ok(Self::with_methods(invoker, methods))
    }

    pub fn with_methods(invoker: Arc<dyn RpcInvoker>, methods: MethodTable) -> Self {
        Self {
            invoker,
            methods,
            connected: AtomicBool::new(true),
        }
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn invoke(&self, method: BackendMethod, params: Vec<Value>) -> Result<Value, PanelError> {
        let name = self.methods.resolve(method)?;
        match self.invoker.call(name, params).await {
            Ok(value) => {
                self.mark_connected(true);
                Ok(unwrap_envelope(value))
            }
            Err(e) => {
                self.mark_connected(!e.is_transport());
                Err(e)
            }
        }
    }

    fn mark_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        if was != connected {
            if connected {
                tracing::info!("Backend connection restored");
            } else {
                tracing::warn!("Backend connection lost");
            }
        }
    }

    fn backend_error(method: BackendMethod, value: &Value) -> Option<PanelError> {
        match value.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(PanelError::backend(method.label(), message.clone())),
            Some(other) => Some(PanelError::backend(method.label(), other.to_string())),
        }
    }

    fn decode_or_default<T: DeserializeOwned + Default>(method: BackendMethod, value: Value) -> T {
        match serde_json::from_value(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Unexpected response shape from {}: {}", method, e);
                T::default()
            }
        }
    }

    /// 解析 `{success}` / `{error}` 形式的确认响应
    fn ack(method: BackendMethod, value: &Value) -> Result<(), PanelError> {
        if let Some(err) = Self::backend_error(method, value) {
            return Err(err);
        }
        if value.get("success") == Some(&Value::Bool(false)) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("operation reported failure");
            return Err(PanelError::backend(method.label(), message));
        }
        Ok(())
    }

    /// Raw history page; decoding is the caller's business.
    pub async fn commit_history(
        &self,
        page_size: usize,
        branch: Option<&str>,
        skip: usize,
    ) -> Result<Value, PanelError> {
        let method = BackendMethod::CommitHistory;
        let params = vec![
            json!(page_size),
            branch.map(Value::from).unwrap_or(Value::Null),
            json!(skip),
        ];
        let value = self.invoke(method, params).await?;
        match Self::backend_error(method, &value) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    pub async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<String>, PanelError> {
        let method = BackendMethod::ChangedFiles;
        let value = self.invoke(method, vec![json!(from), json!(to)]).await?;
        if let Some(err) = Self::backend_error(method, &value) {
            return Err(err);
        }

        let Value::Array(items) = value else {
            tracing::warn!("Unexpected response shape from {}: not a list", method);
            return Ok(Vec::new());
        };

        let files = items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(path) => Some(path),
                Value::Object(map) => map.get("file").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect();
        Ok(files)
    }

    /// `version` 可以是提交哈希、`HEAD` 或 `working`
    pub async fn file_content(&self, path: &str, version: &str) -> Result<String, PanelError> {
        let method = BackendMethod::FileContent;
        let value = self.invoke(method, vec![json!(path), json!(version)]).await?;
        match value {
            Value::String(content) => Ok(content),
            Value::Null => Ok(String::new()),
            other => {
                if let Some(err) = Self::backend_error(method, &other) {
                    return Err(err);
                }
                tracing::warn!("Unexpected response shape from {} for {}", method, path);
                Ok(String::new())
            }
        }
    }

    pub async fn conflict_content(&self, path: &str) -> Result<ConflictContent, PanelError> {
        let method = BackendMethod::ConflictContent;
        let value = self.invoke(method, vec![json!(path)]).await?;
        Self::ack(method, &value)?;
        Ok(Self::decode_or_default(method, value))
    }

    /// 状态报告解析失败时返回错误而不是默认值，
    /// 默认值会被当作"未在 rebase 中"从而触发重置。
    pub async fn rebase_status(&self) -> Result<RebaseStatusReport, PanelError> {
        let method = BackendMethod::RebaseStatus;
        let value = self.invoke(method, Vec::new()).await?;
        if let Some(err) = Self::backend_error(method, &value) {
            return Err(err);
        }
        serde_json::from_value(value).map_err(|e| PanelError::decode(method.label(), e.to_string()))
    }

    pub async fn status(&self) -> Result<GitStatus, PanelError> {
        let method = BackendMethod::Status;
        let value = self.invoke(method, Vec::new()).await?;
        if let Some(err) = Self::backend_error(method, &value) {
            return Err(err);
        }
        Ok(Self::decode_or_default(method, value))
    }

    pub async fn raw_status(&self) -> Result<Option<String>, PanelError> {
        let method = BackendMethod::RawStatus;
        let value = self.invoke(method, Vec::new()).await?;
        if let Value::String(text) = value {
            return Ok(Some(text));
        }
        let response: RawStatusResponse = Self::decode_or_default(method, value);
        match response.error {
            Some(message) => Err(PanelError::backend(method.label(), message)),
            None => Ok(response.raw_status),
        }
    }

    pub async fn start_interactive_rebase(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<RebaseStep>, PanelError> {
        let method = BackendMethod::StartInteractiveRebase;
        let value = self.invoke(method, vec![json!(from), json!(to)]).await?;
        Self::ack(method, &value)?;
        let response: StartRebaseResponse = Self::decode_or_default(method, value);
        if let Some(message) = response.error {
            return Err(PanelError::backend(method.label(), message));
        }
        if !response.success {
            tracing::debug!("{} response carried no success flag", method);
        }
        Ok(response.commits)
    }

    pub async fn execute_rebase(&self, plan: &[RebaseStep]) -> Result<RebaseRunReport, PanelError> {
        let method = BackendMethod::ExecuteRebase;
        let params = vec![serde_json::to_value(plan)?];
        let value = self.invoke(method, params).await?;
        Self::run_report(method, value)
    }

    pub async fn continue_rebase(&self) -> Result<RebaseRunReport, PanelError> {
        let method = BackendMethod::ContinueRebase;
        let value = self.invoke(method, Vec::new()).await?;
        Self::run_report(method, value)
    }

    /// 有冲突列表时即使附带 error 也算有效结果
    fn run_report(method: BackendMethod, value: Value) -> Result<RebaseRunReport, PanelError> {
        let report: RebaseRunReport = Self::decode_or_default(method, value);
        if report.has_conflicts() {
            return Ok(report);
        }
        if let Some(message) = &report.error {
            return Err(PanelError::backend(method.label(), message.clone()));
        }
        Ok(report)
    }

    pub async fn abort_rebase(&self) -> Result<(), PanelError> {
        let method = BackendMethod::AbortRebase;
        let value = self.invoke(method, Vec::new()).await?;
        Self::ack(method, &value)
    }

    pub async fn resolve_conflict(&self, path: &str, content: &str) -> Result<(), PanelError> {
        let method = BackendMethod::ResolveConflict;
        let value = self.invoke(method, vec![json!(path), json!(content)]).await?;
        Self::ack(method, &value)
    }

    pub async fn save_git_editor_file(&self, kind: &str, content: &str) -> Result<(), PanelError> {
        let method = BackendMethod::SaveGitEditorFile;
        let value = self.invoke(method, vec![json!(kind), json!(content)]).await?;
        Self::ack(method, &value)
    }

    pub async fn commit_staged_changes(&self, message: &str) -> Result<(), PanelError> {
        let method = BackendMethod::CommitStaged;
        let value = self.invoke(method, vec![json!(message)]).await?;
        Self::ack(method, &value)
    }

    pub async fn commit_amend(&self) -> Result<(), PanelError> {
        let method = BackendMethod::CommitAmend;
        let value = self.invoke(method, Vec::new()).await?;
        Self::ack(method, &value)
    }
}
