#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use rebase_panel::editor::BufferEditor;
use rebase_panel::infrastructure::PanelError;
use rebase_panel::rebase::RebaseSession;
use rebase_panel::rpc::{Backend, BackendMethod, MethodTable, RpcInvoker};
use rebase_panel::updates::BatchedUpdateCoordinator;

type Scripted = Result<Value, PanelError>;

/// 按方法排队返回预设响应的调用器，并记录所有调用
#[derive(Default)]
pub struct ScriptedInvoker {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    defaults: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

fn name(method: BackendMethod) -> String {
    method.candidates()[0].to_string()
}

impl ScriptedInvoker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 下一次调用返回 `response`
    pub fn push(&self, method: BackendMethod, response: Value) {
        self.queues
            .lock()
            .unwrap()
            .entry(name(method))
            .or_default()
            .push_back(Ok(response));
    }

    pub fn push_err(&self, method: BackendMethod, error: PanelError) {
        self.queues
            .lock()
            .unwrap()
            .entry(name(method))
            .or_default()
            .push_back(Err(error));
    }

    /// 队列为空时的固定响应
    pub fn set_default(&self, method: BackendMethod, response: Value) {
        self.defaults.lock().unwrap().insert(name(method), Ok(response));
    }

    /// 调用会阻塞直到返回的 Notify 被触发
    pub fn gate(&self, method: BackendMethod) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(name(method), notify.clone());
        notify
    }

    pub fn calls(&self, method: BackendMethod) -> Vec<Vec<Value>> {
        let method = name(method);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn call_count(&self, method: BackendMethod) -> usize {
        self.calls(method).len()
    }

    /// 后端不在 rebase 中时的默认状态
    pub fn idle_backend(&self) {
        self.set_default(BackendMethod::RebaseStatus, json!({"in_rebase": false}));
        self.set_default(BackendMethod::Status, json!({"modified_files": []}));
        self.set_default(
            BackendMethod::RawStatus,
            json!({"success": true, "raw_status": "On branch main\nnothing to commit"}),
        );
    }
}

#[async_trait]
impl RpcInvoker for ScriptedInvoker {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, PanelError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let gate = self.gates.lock().unwrap().get(method).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return response;
        }
        if let Some(response) = self.defaults.lock().unwrap().get(method).cloned() {
            return response;
        }
        Err(PanelError::backend(method, "no scripted response"))
    }

    async fn list_methods(&self) -> Result<Vec<String>, PanelError> {
        Ok(BackendMethod::ALL.iter().map(|m| name(*m)).collect())
    }
}

pub fn backend(invoker: &Arc<ScriptedInvoker>) -> Arc<Backend> {
    Arc::new(Backend::with_methods(
        invoker.clone(),
        MethodTable::assume_defaults(),
    ))
}

pub struct Harness {
    pub invoker: Arc<ScriptedInvoker>,
    pub editor: Arc<BufferEditor>,
    pub updates: BatchedUpdateCoordinator,
    pub session: Arc<RebaseSession>,
}

pub fn harness() -> Harness {
    let invoker = ScriptedInvoker::new();
    invoker.idle_backend();
    let editor = Arc::new(BufferEditor::new());
    let updates = BatchedUpdateCoordinator::detached();
    let session = Arc::new(RebaseSession::new(
        backend(&invoker),
        editor.clone(),
        updates.clone(),
    ));
    Harness {
        invoker,
        editor,
        updates,
        session,
    }
}

pub fn commits_json(hashes: &[&str]) -> Value {
    Value::Array(
        hashes
            .iter()
            .enumerate()
            .map(|(i, hash)| {
                json!({
                    "hash": hash,
                    "author": "dev",
                    "email": "dev@example.com",
                    "date": format!("2024-01-{:02}T10:00:00+00:00", 28 - i.min(27)),
                    "message": format!("commit {}", hash),
                })
            })
            .collect(),
    )
}

pub fn rebase_steps_json(hashes: &[&str]) -> Value {
    json!({
        "success": true,
        "commits": hashes
            .iter()
            .map(|h| json!({"hash": h, "message": format!("commit {}", h), "action": "pick"}))
            .collect::<Vec<_>>(),
    })
}
