// RPC 层：调用抽象、信封解包、能力协商与类型化后端

pub mod backend;
pub mod envelope;
pub mod http;
pub mod invoker;
pub mod methods;
pub mod models;

pub use backend::Backend;
pub use envelope::unwrap_envelope;
pub use http::HttpRpcInvoker;
pub use invoker::RpcInvoker;
pub use methods::{BackendMethod, MethodTable};
pub use models::{
    ConflictContent, EditorFileKind, EditorStatus, GitEditorRequest, GitStatus, RebaseRunReport,
    RebaseStatusReport,
};
