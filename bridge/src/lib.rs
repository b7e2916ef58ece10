pub mod channel;
pub mod config;
pub mod speech;

use std::sync::Arc;

use ailogos_core::InterpreterSession;
use ailogos_proto as pb;
use pb::method_channel_server::{MethodChannel as MethodChannelRpc, MethodChannelServer};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

pub use channel::{MethodCall, MethodChannel, MethodError, MethodHandler, MethodResult};
pub use config::BridgeConfig;
pub use speech::{SpeechEndpoint, SpeechTarget, EMBEDDED_RUNTIME_ERROR};

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Clone)]
pub struct BridgeState {
    pub channel: Arc<MethodChannel>,
}

impl BridgeState {
    pub fn new(channel: Arc<MethodChannel>) -> Self {
        Self { channel }
    }
}

#[derive(Clone)]
pub struct BridgeService {
    state: BridgeState,
}

impl BridgeService {
    pub fn new(state: BridgeState) -> Self {
        Self { state }
    }

    // an empty name addresses the served channel
    fn check_channel(&self, requested: &str) -> std::result::Result<(), Status> {
        if requested.is_empty() || requested == self.state.channel.name() {
            Ok(())
        } else {
            Err(Status::not_found(format!("unknown channel: {}", requested)))
        }
    }
}

/// Channel named by `cfg.channel` with the speech endpoint registered on it
pub fn build_channel(cfg: &BridgeConfig, session: Arc<InterpreterSession>) -> Arc<MethodChannel> {
    let channel = MethodChannel::new(cfg.channel.clone());
    channel.register(Arc::new(SpeechEndpoint::new(session, cfg.target.clone())));
    Arc::new(channel)
}

fn to_wire(result: MethodResult) -> pb::method_call_response::Outcome {
    use pb::method_call_response::Outcome;
    match result {
        MethodResult::Success(value) => Outcome::Success(pb::MethodSuccess { value }),
        MethodResult::Error(e) => Outcome::Error(pb::MethodError {
            code: e.code,
            message: e.message,
            details: e.details,
        }),
        MethodResult::NotImplemented => Outcome::NotImplemented(pb::MethodNotImplemented {}),
    }
}

#[tonic::async_trait]
impl MethodChannelRpc for BridgeService {
    async fn invoke_method(
        &self,
        request: Request<pb::MethodCallRequest>,
    ) -> std::result::Result<Response<pb::MethodCallResponse>, Status> {
        let pb::MethodCallRequest {
            id,
            channel,
            method,
            arguments,
        } = request.into_inner();
        self.check_channel(&channel)?;

        debug!(target: "bridge", call_id = %id, method = %method, "Method call received");
        let call = MethodCall {
            method,
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect(),
        };
        let outcome = self.state.channel.dispatch(call).await;
        Ok(Response::new(pb::MethodCallResponse {
            id,
            outcome: Some(to_wire(outcome)),
        }))
    }

    async fn list_methods(
        &self,
        request: Request<pb::ListMethodsRequest>,
    ) -> std::result::Result<Response<pb::ListMethodsResponse>, Status> {
        let req = request.into_inner();
        self.check_channel(&req.channel)?;
        Ok(Response::new(pb::ListMethodsResponse {
            channel: self.state.channel.name().to_string(),
            methods: self.state.channel.methods(),
        }))
    }

    async fn heartbeat(
        &self,
        request: Request<pb::HeartbeatRequest>,
    ) -> std::result::Result<Response<pb::HeartbeatResponse>, Status> {
        Ok(Response::new(pb::HeartbeatResponse {
            timestamp_ms: request.into_inner().timestamp_ms,
            status: "ok".into(),
        }))
    }
}

/// Serve the bridge on an already-bound listener until the transport stops
pub async fn serve_with_listener(listener: TcpListener, channel: Arc<MethodChannel>) -> Result<()> {
    let addr = listener.local_addr()?;
    let svc = BridgeService::new(BridgeState::new(Arc::clone(&channel)));
    info!(target: "bridge", %addr, channel = %channel.name(), methods = ?channel.methods(), "Starting AiLogos bridge gRPC server");
    tonic::transport::Server::builder()
        .add_service(MethodChannelServer::new(svc))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;
    Ok(())
}

pub async fn start_server(addr: std::net::SocketAddr, channel: Arc<MethodChannel>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener, channel).await
}
