//! Python interpreter adapter
//!
//! Each call runs the interpreter with a small driver program. The driver reads
//! a `{"module", "function", "args"}` request as JSON from stdin, imports the
//! module, resolves the attribute, and calls it with the arguments. It then
//! writes one marker-prefixed JSON line to stdout:
//! - `{"ok": <value>}` on success (non-JSON values are sent as `str(value)`)
//! - `{"error": {"kind", "message", "traceback"}}` on failure
//!
//! Module search path: `HostPlatform::module_paths`, prepended to `PYTHONPATH`.
//! Relative entries are resolved against the server's working directory at start,
//! since calls run inside `HostPlatform::data_dir`.
//!
//! Env overrides:
//! - AILOGOS_PYTHON_BIN (via `RuntimeConfig`)

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{EmbeddedRuntime, HostPlatform, RuntimeValue};
use crate::utils::{feed_stdin, find_on_path};
use crate::{LogosError, Result};

const RESULT_MARKER: &str = "__AILOGOS_RESULT__ ";

const DRIVER: &str = r#"
import importlib, json, sys, traceback

MARKER = "__AILOGOS_RESULT__ "

def emit(payload):
    sys.stdout.write("\n" + MARKER + json.dumps(payload) + "\n")
    sys.stdout.flush()

def fail(kind, message, tb):
    emit({"error": {"kind": kind, "message": message, "traceback": tb}})
    return 1

def main():
    request = json.load(sys.stdin)
    module_name, function_name, args = request["module"], request["function"], request["args"]
    try:
        module = importlib.import_module(module_name)
    except ModuleNotFoundError as e:
        if e.name == module_name:
            return fail("ModuleNotFound", str(e), traceback.format_exc())
        raise
    func = getattr(module, function_name, None)
    if func is None or not callable(func):
        return fail("FunctionNotFound", "module %r has no callable %r" % (module_name, function_name), "")
    result = func(*args)
    try:
        line = json.dumps({"ok": result})
    except (TypeError, ValueError):
        line = json.dumps({"ok": str(result)})
    sys.stdout.write("\n" + MARKER + line + "\n")
    sys.stdout.flush()
    return 0

try:
    code = main()
except SystemExit:
    raise
except BaseException as e:
    code = fail(type(e).__name__, str(e), traceback.format_exc())
sys.exit(code)
"#;

#[derive(Clone, Debug)]
struct PythonState {
    interpreter: PathBuf,
    version: String,
    python_path: OsString,
    working_dir: Option<PathBuf>,
}

/// [`EmbeddedRuntime`] backed by an external Python interpreter
pub struct PythonRuntime {
    python_bin: Option<PathBuf>,
    state: RwLock<Option<PythonState>>,
}

impl PythonRuntime {
    /// `python_bin` overrides interpreter discovery (`python3`, then `python`, on `PATH`)
    pub fn new(python_bin: Option<PathBuf>) -> Self {
        Self {
            python_bin,
            state: RwLock::new(None),
        }
    }

    /// Interpreter version reported at start, e.g. "3.11.4"
    pub async fn version(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.version.clone())
    }

    fn resolve_interpreter(&self) -> Option<PathBuf> {
        if let Some(bin) = &self.python_bin {
            if bin.exists() {
                return Some(bin.clone());
            }
            return find_on_path(&bin.to_string_lossy());
        }
        find_on_path("python3").or_else(|| find_on_path("python"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DriverOutcome {
    Ok(RuntimeValue),
    Error(DriverError),
}

#[derive(Debug, Deserialize)]
struct DriverError {
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    traceback: String,
}

#[async_trait]
impl EmbeddedRuntime for PythonRuntime {
    fn name(&self) -> &'static str {
        "python"
    }

    async fn start(&self, platform: &HostPlatform) -> Result<()> {
        let interpreter = self.resolve_interpreter().ok_or_else(|| {
            LogosError::RuntimeStart(match &self.python_bin {
                Some(bin) => format!("python interpreter not found: {}", bin.display()),
                None => "python interpreter not found on PATH (tried python3, python)".into(),
            })
        })?;

        let python_path = build_python_path(&platform.module_paths)?;

        let working_dir = if platform.data_dir.as_os_str().is_empty() {
            None
        } else {
            tokio::fs::create_dir_all(&platform.data_dir).await?;
            Some(platform.data_dir.clone())
        };

        // probe from the same directory calls run in
        let mut probe = Command::new(&interpreter);
        probe
            .arg("-c")
            .arg("import sys; print('%d.%d.%d' % tuple(sys.version_info[:3]))")
            .env("PYTHONPATH", &python_path)
            .stdin(Stdio::null());
        if let Some(dir) = &working_dir {
            probe.current_dir(dir);
        }
        let output = probe
            .output()
            .await
            .map_err(|e| {
                LogosError::RuntimeStart(format!(
                    "failed to launch {}: {}",
                    interpreter.display(),
                    e
                ))
            })?;
        if !output.status.success() {
            return Err(LogosError::RuntimeStart(format!(
                "{} probe failed: {}",
                interpreter.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(target: "python_runtime", interpreter = ?interpreter, version = %version, module_paths = ?platform.module_paths, "Python interpreter bound");

        *self.state.write().await = Some(PythonState {
            interpreter,
            version,
            python_path,
            working_dir,
        });
        Ok(())
    }

    async fn invoke(&self, module: &str, function: &str, args: &[String]) -> Result<RuntimeValue> {
        let state = self
            .state
            .read()
            .await
            .clone()
            .ok_or_else(|| LogosError::RuntimeStart("python runtime not started".into()))?;

        let request = serde_json::to_vec(&json!({
            "module": module,
            "function": function,
            "args": args,
        }))?;

        let mut cmd = Command::new(&state.interpreter);
        cmd.arg("-c")
            .arg(DRIVER)
            .env("PYTHONPATH", &state.python_path)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &state.working_dir {
            cmd.current_dir(dir);
        }

        debug!(target: "python_runtime", module = %module, function = %function, request_bytes = request.len(), "Running python driver");
        let mut child = cmd.spawn()?;
        feed_stdin(&mut child, &request).await?;
        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(target: "python_runtime", stderr = %stderr.trim(), "python stderr");
        }

        parse_outcome(module, function, &stdout, &stderr, output.status.code())
    }
}

fn parse_outcome(
    module: &str,
    function: &str,
    stdout: &str,
    stderr: &str,
    exit_code: Option<i32>,
) -> Result<RuntimeValue> {
    let Some(line) = stdout
        .lines()
        .rev()
        .find_map(|l| l.strip_prefix(RESULT_MARKER))
    else {
        warn!(target: "python_runtime", module = %module, function = %function, exit_code = ?exit_code, "Interpreter exited without a result");
        let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(LogosError::Script {
            kind: "InterpreterExit".into(),
            message: format!("interpreter exited ({}) without returning a result", code),
            traceback: stderr.trim().to_string(),
        });
    };

    match serde_json::from_str::<DriverOutcome>(line)? {
        DriverOutcome::Ok(value) => Ok(value),
        DriverOutcome::Error(e) => Err(match e.kind.as_str() {
            "ModuleNotFound" => LogosError::ModuleNotFound(module.to_string()),
            "FunctionNotFound" => LogosError::FunctionNotFound {
                module: module.to_string(),
                function: function.to_string(),
            },
            _ => LogosError::Script {
                kind: e.kind,
                message: e.message,
                traceback: e.traceback,
            },
        }),
    }
}

fn build_python_path(module_paths: &[PathBuf]) -> Result<OsString> {
    let cwd = std::env::current_dir()?;
    let mut entries: Vec<PathBuf> = module_paths.to_vec();
    if let Some(existing) = std::env::var_os("PYTHONPATH") {
        entries.extend(std::env::split_paths(&existing));
    }
    let entries = entries
        .into_iter()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| if p.is_absolute() { p } else { cwd.join(p) });
    std::env::join_paths(entries)
        .map_err(|e| LogosError::ConfigError(format!("invalid module path: {}", e)))
}
