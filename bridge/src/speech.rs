//! Speech generation endpoint
//!
//! Handles `generateSpeech(text, path)` on the method channel. Each call starts
//! the interpreter session if needed, then calls `local_tts.generate_tts(text, path)`
//! and returns the result's text form.
//!
//! This is the recovery boundary for the embedded runtime. Start failures,
//! lookup failures, script faults and panics all become one `EMBEDDED_RUNTIME_ERROR`
//! failure that carries a message and a diagnostic trace.

use std::error::Error as _;
use std::sync::Arc;

use ailogos_core::{value_to_text, InterpreterSession, LogosError};
use async_trait::async_trait;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::channel::{MethodCall, MethodError, MethodHandler, MethodResult};

pub const EMBEDDED_RUNTIME_ERROR: &str = "EMBEDDED_RUNTIME_ERROR";

pub const DEFAULT_METHOD: &str = "generateSpeech";
pub const DEFAULT_MODULE: &str = "local_tts";
pub const DEFAULT_FUNCTION: &str = "generate_tts";

/// Method name plus the embedded callable it is bound to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechTarget {
    pub method: String,
    pub module: String,
    pub function: String,
}

impl Default for SpeechTarget {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            module: DEFAULT_MODULE.to_string(),
            function: DEFAULT_FUNCTION.to_string(),
        }
    }
}

pub struct SpeechEndpoint {
    session: Arc<InterpreterSession>,
    target: SpeechTarget,
}

impl SpeechEndpoint {
    pub fn new(session: Arc<InterpreterSession>, target: SpeechTarget) -> Self {
        Self { session, target }
    }

    pub fn target(&self) -> &SpeechTarget {
        &self.target
    }

    pub fn session(&self) -> &Arc<InterpreterSession> {
        &self.session
    }

    /// Generate speech for `text` into `path`. Neither argument is validated here.
    #[tracing::instrument(skip(self, text, path), fields(path = %path, chars = text.chars().count()))]
    pub async fn generate_speech(&self, text: &str, path: &str) -> Result<String, MethodError> {
        let session = Arc::clone(&self.session);
        let module = self.target.module.clone();
        let function = self.target.function.clone();
        let args = vec![text.to_string(), path.to_string()];

        // a panicking adapter surfaces as a JoinError instead of unwinding into the caller
        let task = tokio::spawn(async move {
            session.ensure_started().await?;
            let value = session.module(&module).call_attr(&function, &args).await?;
            Ok::<_, LogosError>(value_to_text(&value))
        });
        let outcome = match task.await {
            Ok(res) => res,
            Err(e) => Err(LogosError::Panicked(join_error_message(e))),
        };

        match outcome {
            Ok(output) => {
                info!(target: "speech", module = %self.target.module, function = %self.target.function, "Speech generated");
                Ok(output)
            }
            Err(e) => {
                warn!(target: "speech", module = %self.target.module, function = %self.target.function, error = %e, "Embedded runtime call failed");
                Err(runtime_failure(&e))
            }
        }
    }
}

#[async_trait]
impl MethodHandler for SpeechEndpoint {
    fn method(&self) -> &str {
        &self.target.method
    }

    async fn handle(&self, call: MethodCall) -> MethodResult {
        if call.method != self.target.method {
            return MethodResult::NotImplemented;
        }
        let text = call.argument_str("text").unwrap_or_default();
        let path = call.argument_str("path").unwrap_or_default();
        match self.generate_speech(text, path).await {
            Ok(output) => MethodResult::Success(output),
            Err(e) => MethodResult::Error(e),
        }
    }
}

/// Convert an embedded runtime failure into the caller-facing error
pub fn runtime_failure(err: &LogosError) -> MethodError {
    let mut message = err.to_string();
    if message
        .trim_matches(|c: char| c == ':' || c.is_whitespace())
        .is_empty()
    {
        message = "embedded runtime failure".to_string();
    }
    MethodError {
        code: EMBEDDED_RUNTIME_ERROR.to_string(),
        message,
        details: diagnostic_trace(err),
    }
}

/// Interpreter traceback when one was captured, else the error and its source chain
pub fn diagnostic_trace(err: &LogosError) -> String {
    if let Some(tb) = err.traceback() {
        return tb.to_string();
    }
    let mut out = format!("{:?}", err);
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "embedded runtime task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "embedded runtime task panicked".to_string()
    }
}
