use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 面板错误类型
///
/// 网络与解析错误在组件边界被吸收，转换为状态中的 `last_error` 字段，
/// 不会直接抛给展示层。
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelError {
    #[error("Backend unreachable: {message}")]
    Transport { message: String },

    #[error("Backend reported failure in {method}: {message}")]
    Backend { method: String, message: String },

    #[error("Unexpected response from {method}: {message}")]
    Decode { method: String, message: String },

    #[error("Feature unavailable: backend does not provide {operation}")]
    Unavailable { operation: String },

    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PanelError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, PanelError::Transport { .. } | PanelError::Decode { .. })
    }

    /// 是否为连接类错误（需要显示持久横幅）
    pub fn is_transport(&self) -> bool {
        matches!(self, PanelError::Transport { .. })
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            PanelError::Transport { .. } => ErrorCategory::Connection,
            PanelError::Backend { .. } => ErrorCategory::Backend,
            PanelError::Decode { .. } => ErrorCategory::Data,
            PanelError::Unavailable { .. } => ErrorCategory::Capability,
            PanelError::Validation { .. } => ErrorCategory::Data,
            PanelError::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// 创建连接错误
    pub fn transport(message: impl Into<String>) -> Self {
        PanelError::Transport {
            message: message.into(),
        }
    }

    /// 创建后端失败错误
    pub fn backend(method: impl Into<String>, message: impl Into<String>) -> Self {
        PanelError::Backend {
            method: method.into(),
            message: message.into(),
        }
    }

    /// 创建响应解析错误
    pub fn decode(method: impl Into<String>, message: impl Into<String>) -> Self {
        PanelError::Decode {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(operation: impl Into<String>) -> Self {
        PanelError::Unavailable {
            operation: operation.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PanelError::Validation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PanelError::Configuration {
            message: message.into(),
        }
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Connection,
    Backend,
    Data,
    Capability,
    Configuration,
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::decode("json", err.to_string())
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PanelError::decode("http", err.to_string())
        } else {
            PanelError::transport(err.to_string())
        }
    }
}
