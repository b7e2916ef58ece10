//! Native `local_tts` module
//!
//! Exposes `generate_tts(text, path)`, which writes a WAV file to `path` using
//! local CLI engines and returns the path:
//! - Prefer Piper (higher quality, requires a voice model)
//! - Fallback to espeak-ng (widely available)
//! - If neither is present the call fails
//!
//! Blank text is synthesized as a single space so engines never see empty input.
//!
//! Env overrides (via `TtsConfig`):
//! - PIPER_BIN, PIPER_VOICE
//! - ESPEAK_BIN, TTS_VOICE

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TtsConfig;
use crate::runtime::native::NativeModule;
use crate::runtime::{HostPlatform, RuntimeValue};
use crate::utils::feed_stdin;
use crate::{LogosError, Result};

pub const MODULE_NAME: &str = "local_tts";
pub const GENERATE_TTS: &str = "generate_tts";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Engine {
    Piper { bin: PathBuf, voice: PathBuf },
    Espeak { bin: PathBuf },
    None,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Piper { .. } => "piper",
            Engine::Espeak { .. } => "espeak-ng",
            Engine::None => "none",
        }
    }
}

pub struct LocalTtsModule {
    cfg: TtsConfig,
}

impl LocalTtsModule {
    pub fn new(cfg: TtsConfig) -> Self {
        Self { cfg }
    }

    pub fn engine(&self) -> Engine {
        select_engine(&self.cfg)
    }

    async fn generate(&self, args: &[String]) -> Result<RuntimeValue> {
        let [text, path] = args else {
            return Err(LogosError::InvalidArguments(format!(
                "{}() takes 2 positional arguments but {} were given",
                GENERATE_TTS,
                args.len()
            )));
        };
        if path.is_empty() {
            return Err(LogosError::InvalidArguments("output path is empty".into()));
        }
        let text = if text.trim().is_empty() { " " } else { text.as_str() };
        let out = Path::new(path);

        let engine = self.engine();
        info!(target: "local_tts", engine = engine.as_str(), path = %path, chars = text.chars().count(), "Synthesizing speech");
        match &engine {
            Engine::Piper { bin, voice } => synth_with_piper(bin, voice, text, out).await?,
            Engine::Espeak { bin } => synth_with_espeak(bin, &self.cfg.voice, text, out).await?,
            Engine::None => {
                warn!(target: "local_tts", "No TTS engine detected (Piper/espeak-ng missing)");
                return Err(LogosError::Synthesis(
                    "no TTS engine found; install piper or espeak-ng".into(),
                ));
            }
        }
        Ok(json!(path))
    }
}

#[async_trait]
impl NativeModule for LocalTtsModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn functions(&self) -> Vec<String> {
        vec![GENERATE_TTS.to_string()]
    }

    async fn on_start(&self, _platform: &HostPlatform) -> Result<()> {
        match self.engine() {
            Engine::None => {
                warn!(target: "local_tts", "No TTS engine detected; generate_tts will fail until one is installed")
            }
            engine => info!(target: "local_tts", engine = engine.as_str(), "Detected TTS engine"),
        }
        Ok(())
    }

    async fn call(&self, function: &str, args: &[String]) -> Result<RuntimeValue> {
        match function {
            GENERATE_TTS => self.generate(args).await,
            other => Err(LogosError::FunctionNotFound {
                module: MODULE_NAME.to_string(),
                function: other.to_string(),
            }),
        }
    }
}

fn select_engine(cfg: &TtsConfig) -> Engine {
    if let (Some(bin), Some(voice)) = (&cfg.piper_bin, &cfg.piper_voice) {
        if voice.exists() {
            return Engine::Piper {
                bin: bin.clone(),
                voice: voice.clone(),
            };
        }
    }
    if let Some(bin) = &cfg.espeak_bin {
        return Engine::Espeak { bin: bin.clone() };
    }
    Engine::None
}

async fn synth_with_piper(piper: &Path, voice: &Path, text: &str, out_wav: &Path) -> Result<()> {
    let mut cmd = Command::new(piper);
    cmd.arg("-m").arg(voice).arg("-f").arg(out_wav);
    run_with_stdin(cmd, "piper", text).await
}

async fn synth_with_espeak(espeak: &Path, voice: &str, text: &str, out_wav: &Path) -> Result<()> {
    let mut cmd = Command::new(espeak);
    if !voice.is_empty() {
        cmd.arg("-v").arg(voice);
    }
    cmd.arg("-w").arg(out_wav).arg("--stdin");
    run_with_stdin(cmd, "espeak-ng", text).await
}

async fn run_with_stdin(mut cmd: Command, label: &str, text: &str) -> Result<()> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(target: "local_tts", command = ?cmd, "Running {}", label);

    let mut child = cmd.spawn()?;
    feed_stdin(&mut child, text.as_bytes()).await?;
    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(LogosError::Synthesis(format!(
            "{} failed: {}",
            label,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
