//! Embedded runtime capability interface
//!
//! An [`EmbeddedRuntime`] resolves callables by module and function name at call
//! time. Adapters:
//! - [`python::PythonRuntime`]: drives an external Python interpreter
//! - [`native::NativeRuntime`]: in-process registry of Rust modules
//!
//! The [`session::InterpreterSession`] owns one runtime and starts it at most once.

pub mod native;
pub mod python;
pub mod session;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::Result;

/// Value returned by an embedded function.
pub type RuntimeValue = serde_json::Value;

/// Host process facts the runtime is bound to when it starts.
#[derive(Clone, Debug, Default)]
pub struct HostPlatform {
    pub app_name: String,
    pub data_dir: PathBuf,
    /// Directories searched for embedded modules, in priority order
    pub module_paths: Vec<PathBuf>,
}

/// Capability interface over a dynamically dispatched runtime
#[async_trait]
pub trait EmbeddedRuntime: Send + Sync {
    /// Short name used in logs (e.g. "python", "native")
    fn name(&self) -> &'static str;

    /// Bind the runtime to the host platform. Called at most once per session.
    async fn start(&self, platform: &HostPlatform) -> Result<()>;

    /// Resolve `module.function` and call it positionally with `args`
    async fn invoke(&self, module: &str, function: &str, args: &[String]) -> Result<RuntimeValue>;
}

/// String form of a runtime value, as the caller receives it.
///
/// Strings pass through unquoted and `null` renders as `None`, the way the
/// interpreter prints a missing return value.
pub fn value_to_text(value: &RuntimeValue) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}
