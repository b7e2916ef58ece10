//! Bridge Integration Test Module

use std::net::SocketAddr;
use std::sync::Arc;

use ailogos_bridge::{build_channel, serve_with_listener, BridgeConfig};
use ailogos_core::{InterpreterSession, NativeRuntime};
use tokio::net::TcpListener;

pub use ailogos_proto::{
    method_call_response::Outcome, method_channel_client::MethodChannelClient, HeartbeatRequest,
    ListMethodsRequest, MethodCallRequest,
};

/// Start a bridge gRPC server on an ephemeral localhost port and return the bound address
pub async fn start_test_server(
    runtime: NativeRuntime,
) -> (
    SocketAddr,
    tokio::task::JoinHandle<()>,
    Arc<InterpreterSession>,
) {
    let session = Arc::new(InterpreterSession::new(
        Arc::new(runtime),
        Default::default(),
    ));
    let channel = build_channel(&BridgeConfig::default(), Arc::clone(&session));

    // Bind to 127.0.0.1:0 for an ephemeral port
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        serve_with_listener(listener, channel)
            .await
            .expect("server exited cleanly");
    });

    (addr, handle, session)
}

/// Create a new client connected to the given address
pub async fn new_client(addr: SocketAddr) -> MethodChannelClient<tonic::transport::Channel> {
    let endpoint = format!("http://{}", addr);
    MethodChannelClient::connect(endpoint)
        .await
        .expect("connect client")
}

mod e2e_speech;
