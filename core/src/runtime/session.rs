//! Embedded interpreter session
//!
//! One session owns one [`EmbeddedRuntime`] and moves it from NotStarted to
//! Started exactly once. Started is terminal; there is no shutdown.
//! Concurrent first callers share a single in-flight initialization, and a failed
//! initialization leaves the session NotStarted so the next caller retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{EmbeddedRuntime, HostPlatform, RuntimeValue};
use crate::{LogosError, Result};

pub struct InterpreterSession {
    runtime: Arc<dyn EmbeddedRuntime>,
    platform: HostPlatform,
    // set once the runtime has started; holds the start time
    started: OnceCell<DateTime<Utc>>,
    initializations: AtomicU64,
}

impl InterpreterSession {
    pub fn new(runtime: Arc<dyn EmbeddedRuntime>, platform: HostPlatform) -> Self {
        Self {
            runtime,
            platform,
            started: OnceCell::new(),
            initializations: AtomicU64::new(0),
        }
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    pub fn platform(&self) -> &HostPlatform {
        &self.platform
    }

    pub fn is_started(&self) -> bool {
        self.started.initialized()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started.get().copied()
    }

    /// Number of initialization sequences that completed successfully
    pub fn initializations(&self) -> u64 {
        self.initializations.load(Ordering::SeqCst)
    }

    /// Start the runtime if it has not been started yet
    #[tracing::instrument(skip(self), fields(runtime = %self.runtime.name()))]
    pub async fn ensure_started(&self) -> Result<()> {
        if self.started.initialized() {
            return Ok(());
        }

        self.started
            .get_or_try_init(|| async {
                info!(
                    target: "session",
                    runtime = %self.runtime.name(),
                    app = %self.platform.app_name,
                    "Starting embedded runtime"
                );
                if let Err(e) = self.runtime.start(&self.platform).await {
                    warn!(target: "session", runtime = %self.runtime.name(), error = %e, "Embedded runtime failed to start");
                    return Err(e);
                }
                self.initializations.fetch_add(1, Ordering::SeqCst);
                info!(target: "session", runtime = %self.runtime.name(), "Embedded runtime started");
                Ok::<_, LogosError>(Utc::now())
            })
            .await?;
        Ok(())
    }

    /// Handle to a module by name. Resolution happens on the first call.
    pub fn module(&self, name: &str) -> ModuleRef<'_> {
        ModuleRef {
            session: self,
            name: name.to_string(),
        }
    }
}

/// Named module inside a started session
pub struct ModuleRef<'a> {
    session: &'a InterpreterSession,
    name: String,
}

impl ModuleRef<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call `function` in this module with positional string arguments
    pub async fn call_attr(&self, function: &str, args: &[String]) -> Result<RuntimeValue> {
        if !self.session.is_started() {
            return Err(LogosError::RuntimeStart(
                "embedded runtime not started".into(),
            ));
        }
        debug!(target: "session", module = %self.name, function = %function, argc = args.len(), "Calling embedded function");
        self.session
            .runtime
            .invoke(&self.name, function, args)
            .await
    }
}

static PROCESS_SESSION: OnceLock<Arc<InterpreterSession>> = OnceLock::new();

/// Install the process-wide session. The first installation wins; later calls
/// return the already-installed session.
pub fn install_process_session(session: InterpreterSession) -> Arc<InterpreterSession> {
    let candidate = Arc::new(session);
    let installed = PROCESS_SESSION.get_or_init(|| Arc::clone(&candidate));
    if !Arc::ptr_eq(installed, &candidate) {
        warn!(target: "session", "Process session already installed; keeping existing one");
    }
    Arc::clone(installed)
}

/// The process-wide session, if one was installed
pub fn process_session() -> Option<Arc<InterpreterSession>> {
    PROCESS_SESSION.get().cloned()
}
