use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::runtime::native::NativeRuntime;
use crate::runtime::python::PythonRuntime;
use crate::runtime::{EmbeddedRuntime, HostPlatform};
use crate::tts::LocalTtsModule;
use crate::utils::{find_from_env_or_path, find_on_path};
use crate::LogosError;

/// Which runtime backs the interpreter session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Python,
    Native,
}

impl FromStr for RuntimeKind {
    type Err = LogosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(RuntimeKind::Python),
            "native" => Ok(RuntimeKind::Native),
            other => Err(LogosError::ConfigError(format!(
                "unknown runtime kind '{}' (expected python|native)",
                other
            ))),
        }
    }
}

/// Embedded runtime configuration
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub kind: RuntimeKind,
    pub python_bin: Option<PathBuf>,
    pub module_paths: Vec<PathBuf>,
    pub app_name: String,
    /// Working directory handed to the runtime; empty means inherit
    pub data_dir: PathBuf,
    pub tts: TtsConfig,
}

/// Local TTS engine settings for the native `local_tts` module
#[derive(Clone, Debug)]
pub struct TtsConfig {
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    /// espeak-ng voice code
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            piper_bin: find_from_env_or_path("PIPER_BIN", "piper"),
            piper_voice: std::env::var("PIPER_VOICE").ok().map(PathBuf::from),
            espeak_bin: find_from_env_or_path("ESPEAK_BIN", "espeak-ng")
                .or_else(|| find_on_path("espeak")),
            voice: std::env::var("TTS_VOICE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "en".to_string()),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let kind = match std::env::var("AILOGOS_RUNTIME") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!(target: "config", error = %e, "Ignoring AILOGOS_RUNTIME");
                RuntimeKind::default()
            }),
            Err(_) => RuntimeKind::default(),
        };
        let module_paths = std::env::var_os("AILOGOS_MODULE_PATH")
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_default();

        Self {
            kind,
            python_bin: std::env::var("AILOGOS_PYTHON_BIN")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            module_paths,
            app_name: std::env::var("AILOGOS_APP_NAME").unwrap_or_else(|_| "ailogos".into()),
            data_dir: std::env::var("AILOGOS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_default(),
            tts: TtsConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn host_platform(&self) -> HostPlatform {
        HostPlatform {
            app_name: self.app_name.clone(),
            data_dir: self.data_dir.clone(),
            module_paths: self.module_paths.clone(),
        }
    }

    /// Build the runtime adapter selected by `kind`
    pub fn build_runtime(&self) -> Arc<dyn EmbeddedRuntime> {
        match self.kind {
            RuntimeKind::Python => Arc::new(PythonRuntime::new(self.python_bin.clone())),
            RuntimeKind::Native => Arc::new(
                NativeRuntime::new().with_module(Arc::new(LocalTtsModule::new(self.tts.clone()))),
            ),
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

/// `[runtime]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeToml {
    pub kind: Option<RuntimeKind>,
    pub python_bin: Option<PathBuf>,
    pub module_paths: Option<Vec<PathBuf>>,
    pub app_name: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl RuntimeToml {
    pub fn apply(self, r: &mut RuntimeConfig) {
        if let Some(x) = self.kind {
            r.kind = x;
        }
        if let Some(x) = self.python_bin {
            r.python_bin = Some(x);
        }
        if let Some(x) = self.module_paths {
            r.module_paths = x
                .into_iter()
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(x) = self.app_name {
            r.app_name = x;
        }
        if let Some(x) = self.data_dir {
            r.data_dir = x;
        }
    }
}

/// `[tts]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TtsToml {
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    pub voice: Option<String>,
}

impl TtsToml {
    pub fn apply(self, t: &mut TtsConfig) {
        if let Some(x) = self.piper_bin {
            t.piper_bin = Some(x);
        }
        if let Some(x) = self.piper_voice {
            t.piper_voice = Some(x);
        }
        if let Some(x) = self.espeak_bin {
            t.espeak_bin = Some(x);
        }
        if let Some(x) = self.voice {
            t.voice = x;
        }
    }
}
