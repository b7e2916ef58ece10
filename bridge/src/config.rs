use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use ailogos_core::{RuntimeConfig, RuntimeToml, TtsToml};
use serde::Deserialize;

use crate::speech::SpeechTarget;
use crate::{BridgeError, Result};

pub const DEFAULT_CHANNEL: &str = "ailogos/tts";

/// Bridge server configuration
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub channel: String,
    pub addr: SocketAddr,
    pub target: SpeechTarget,
    pub runtime: RuntimeConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let defaults = SpeechTarget::default();
        let addr = std::env::var("AILOGOS_BRIDGE_ADDR")
            .ok()
            .and_then(|s| match s.parse::<SocketAddr>() {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::warn!(target: "bridge", value = %s, error = %e, "Ignoring AILOGOS_BRIDGE_ADDR");
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 50061)));

        Self {
            channel: env_or("AILOGOS_CHANNEL", DEFAULT_CHANNEL),
            addr,
            target: SpeechTarget {
                method: env_or("AILOGOS_METHOD", &defaults.method),
                module: env_or("AILOGOS_MODULE", &defaults.module),
                function: env_or("AILOGOS_FUNCTION", &defaults.function),
            },
            runtime: RuntimeConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl BridgeConfig {
    /// Load configuration from a TOML file (path via AILOGOS_CONFIG or ./ailogos.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path = std::env::var("AILOGOS_CONFIG").unwrap_or_else(|_| "ailogos.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "bridge", path = %path, "No TOML config found; using defaults/env");
            return Self::default();
        }
        match Self::from_file(p) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "bridge", path = %path, error = %e, "Failed to load TOML; using defaults");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&s, Self::default())
    }

    pub fn from_toml_str(s: &str, base: Self) -> Result<Self> {
        let t = toml::from_str::<BridgeFileToml>(s)
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(t.overlay(base))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, Deserialize)]
struct BridgeFileToml {
    pub bridge: Option<BridgeToml>,
    pub runtime: Option<RuntimeToml>,
    pub tts: Option<TtsToml>,
}

impl BridgeFileToml {
    fn overlay(self, mut base: BridgeConfig) -> BridgeConfig {
        if let Some(b) = self.bridge {
            b.apply(&mut base);
        }
        if let Some(r) = self.runtime {
            r.apply(&mut base.runtime);
        }
        if let Some(t) = self.tts {
            t.apply(&mut base.runtime.tts);
        }
        base
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BridgeToml {
    pub channel: Option<String>,
    pub addr: Option<SocketAddr>,
    pub method: Option<String>,
    pub module: Option<String>,
    pub function: Option<String>,
}

impl BridgeToml {
    fn apply(self, b: &mut BridgeConfig) {
        if let Some(x) = self.channel {
            b.channel = x;
        }
        if let Some(x) = self.addr {
            b.addr = x;
        }
        if let Some(x) = self.method {
            b.target.method = x;
        }
        if let Some(x) = self.module {
            b.target.module = x;
        }
        if let Some(x) = self.function {
            b.target.function = x;
        }
    }
}
