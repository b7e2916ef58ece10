use ailogos_bridge::{build_channel, start_server, BridgeConfig};
use ailogos_core::{install_process_session, telemetry, InterpreterSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = BridgeConfig::load();
    tracing::info!(
        target: "bridge",
        channel = %cfg.channel,
        method = %cfg.target.method,
        module = %cfg.target.module,
        function = %cfg.target.function,
        runtime = ?cfg.runtime.kind,
        "Loaded bridge configuration"
    );

    // The runtime starts lazily on the first generateSpeech call
    let session = install_process_session(InterpreterSession::new(
        cfg.runtime.build_runtime(),
        cfg.runtime.host_platform(),
    ));
    let channel = build_channel(&cfg, session);

    start_server(cfg.addr, channel).await.map_err(|e| e.into())
}
