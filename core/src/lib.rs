// AiLogos Core Library
// Embedded interpreter session and runtime adapters for the speech bridge

pub mod config;
pub mod runtime;
pub mod telemetry;
pub mod tts;
pub mod utils;

// Export core types
pub use config::{RuntimeConfig, RuntimeKind, RuntimeToml, TtsConfig, TtsToml};
pub use runtime::native::{FunctionModule, NativeFunction, NativeModule, NativeRuntime};
pub use runtime::python::PythonRuntime;
pub use runtime::session::{install_process_session, process_session, InterpreterSession, ModuleRef};
pub use runtime::{value_to_text, EmbeddedRuntime, HostPlatform, RuntimeValue};
pub use tts::LocalTtsModule;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogosError {
    #[error("Runtime start failed: {0}")]
    RuntimeStart(String),

    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    #[error("Module '{module}' has no attribute '{function}'")]
    FunctionNotFound { module: String, function: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{kind}: {message}")]
    Script {
        kind: String,
        message: String,
        traceback: String,
    },

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Runtime panicked: {0}")]
    Panicked(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LogosError {
    /// Interpreter traceback captured alongside a script failure, if any.
    pub fn traceback(&self) -> Option<&str> {
        match self {
            LogosError::Script { traceback, .. } if !traceback.trim().is_empty() => {
                Some(traceback.as_str())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LogosError>;
