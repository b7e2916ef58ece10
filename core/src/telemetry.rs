// Tracing subscriber setup shared by the bridge binary and tools
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,ailogos_core=info,ailogos_bridge=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (falls back to [`DEFAULT_FILTER`]).
///
/// Returns `false` when a global subscriber was already installed, which is
/// expected when tests or an embedding host set up tracing first.
pub fn init_tracing() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(target: "telemetry", service = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"), "Tracing initialized");
    }
    installed
}
