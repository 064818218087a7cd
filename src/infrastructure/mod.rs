pub mod error;
pub mod logging;

pub use error::{ErrorCategory, PanelError};
pub use logging::{setup_logging, LogFormat, LogOutput, LoggingConfig};
