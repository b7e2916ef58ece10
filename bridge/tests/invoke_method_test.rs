use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ailogos_bridge::{build_channel, BridgeConfig, BridgeService, BridgeState, EMBEDDED_RUNTIME_ERROR};
use ailogos_core::{
    FunctionModule, HostPlatform, InterpreterSession, LogosError, NativeModule, NativeRuntime,
    RuntimeValue,
};
use ailogos_proto::{
    method_call_response::Outcome, method_channel_server::MethodChannel as _, ListMethodsRequest,
    MethodCallRequest,
};
use async_trait::async_trait;
use serde_json::json;
use tonic::{Code, Request};

fn tts_module() -> FunctionModule {
    FunctionModule::new("local_tts").with_fn("generate_tts", |args| {
        match args {
            [text, _] if text == "explode" => Err(LogosError::Script {
                kind: "RuntimeError".into(),
                message: "engine exploded".into(),
                traceback: "Traceback (most recent call last):\n  File \"local_tts.py\", line 3, in generate_tts\nRuntimeError: engine exploded".into(),
            }),
            [text, _] if text == "panic" => panic!("synthesizer crashed"),
            [_, path] => Ok(json!(path)),
            _ => Ok(RuntimeValue::Null),
        }
    })
}

fn service_with(runtime: NativeRuntime) -> (BridgeService, Arc<InterpreterSession>) {
    let session = Arc::new(InterpreterSession::new(
        Arc::new(runtime),
        HostPlatform::default(),
    ));
    let channel = build_channel(&BridgeConfig::default(), Arc::clone(&session));
    (BridgeService::new(BridgeState::new(channel)), session)
}

fn request(method: &str, args: &[(&str, &str)]) -> Request<MethodCallRequest> {
    Request::new(MethodCallRequest {
        id: "call-1".into(),
        channel: "ailogos/tts".into(),
        method: method.into(),
        arguments: args
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    })
}

#[tokio::test]
async fn test_generate_speech_success() {
    let (svc, session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    let resp = svc
        .invoke_method(request(
            "generateSpeech",
            &[("text", "Hello"), ("path", "/tmp/out.mp3")],
        ))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(resp.id, "call-1");
    match resp.outcome {
        Some(Outcome::Success(s)) => assert_eq!(s.value, "/tmp/out.mp3"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(session.is_started());
}

#[tokio::test]
async fn test_missing_arguments_still_invoke() {
    let (svc, session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    let resp = svc
        .invoke_method(request("generateSpeech", &[]))
        .await
        .unwrap()
        .into_inner();

    match resp.outcome {
        Some(Outcome::Success(s)) => assert_eq!(s.value, ""),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.initializations(), 1);
}

#[tokio::test]
async fn test_unknown_method_does_not_start_runtime() {
    let (svc, session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    let resp = svc
        .invoke_method(request("GenerateSpeech", &[("text", "Hi")]))
        .await
        .unwrap()
        .into_inner();

    assert!(matches!(resp.outcome, Some(Outcome::NotImplemented(_))));
    assert!(!session.is_started());
    assert_eq!(session.initializations(), 0);
}

#[tokio::test]
async fn test_script_fault_becomes_embedded_runtime_error() {
    let (svc, _session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    let resp = svc
        .invoke_method(request(
            "generateSpeech",
            &[("text", "explode"), ("path", "/tmp/x.mp3")],
        ))
        .await
        .unwrap()
        .into_inner();

    match resp.outcome {
        Some(Outcome::Error(e)) => {
            assert_eq!(e.code, EMBEDDED_RUNTIME_ERROR);
            assert_eq!(e.message, "RuntimeError: engine exploded");
            assert!(e.details.contains("Traceback"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_module_is_reported() {
    let (svc, session) = service_with(NativeRuntime::new());

    let resp = svc
        .invoke_method(request("generateSpeech", &[("text", "Hi"), ("path", "/tmp/a.mp3")]))
        .await
        .unwrap()
        .into_inner();

    match resp.outcome {
        Some(Outcome::Error(e)) => {
            assert_eq!(e.code, EMBEDDED_RUNTIME_ERROR);
            assert!(e.message.contains("local_tts"));
            assert!(!e.details.is_empty());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    // the session itself started fine
    assert!(session.is_started());
}

#[tokio::test]
async fn test_panic_is_contained() {
    let (svc, _session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    let resp = svc
        .invoke_method(request("generateSpeech", &[("text", "panic"), ("path", "/tmp/p.mp3")]))
        .await
        .unwrap()
        .into_inner();

    match resp.outcome {
        Some(Outcome::Error(e)) => {
            assert_eq!(e.code, EMBEDDED_RUNTIME_ERROR);
            assert!(e.message.contains("synthesizer crashed"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // service keeps answering after a panic
    let resp = svc
        .invoke_method(request("generateSpeech", &[("text", "ok"), ("path", "/tmp/q.mp3")]))
        .await
        .unwrap()
        .into_inner();
    assert!(matches!(resp.outcome, Some(Outcome::Success(_))));
}

struct FlakyStartModule {
    starts: AtomicUsize,
}

#[async_trait]
impl NativeModule for FlakyStartModule {
    fn name(&self) -> &str {
        "local_tts"
    }

    fn functions(&self) -> Vec<String> {
        vec!["generate_tts".into()]
    }

    async fn on_start(&self, _platform: &HostPlatform) -> ailogos_core::Result<()> {
        if self.starts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(LogosError::RuntimeStart("voice model missing".into()));
        }
        Ok(())
    }

    async fn call(&self, _function: &str, args: &[String]) -> ailogos_core::Result<RuntimeValue> {
        Ok(json!(args.get(1).cloned().unwrap_or_default()))
    }
}

#[tokio::test]
async fn test_failed_start_is_reported_then_retried() {
    let module = Arc::new(FlakyStartModule {
        starts: AtomicUsize::new(0),
    });
    let (svc, session) = service_with(NativeRuntime::new().with_module(module));

    let resp = svc
        .invoke_method(request("generateSpeech", &[("text", "Hi"), ("path", "/tmp/a.mp3")]))
        .await
        .unwrap()
        .into_inner();
    match resp.outcome {
        Some(Outcome::Error(e)) => {
            assert_eq!(e.code, EMBEDDED_RUNTIME_ERROR);
            assert!(e.message.contains("voice model missing"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!session.is_started());

    let resp = svc
        .invoke_method(request("generateSpeech", &[("text", "Hi"), ("path", "/tmp/a.mp3")]))
        .await
        .unwrap()
        .into_inner();
    match resp.outcome {
        Some(Outcome::Success(s)) => assert_eq!(s.value, "/tmp/a.mp3"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.initializations(), 1);
}

#[tokio::test]
async fn test_repeated_calls_start_once() {
    let (svc, session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    for i in 0..3 {
        let path = format!("/tmp/out{}.mp3", i);
        let resp = svc
            .invoke_method(request("generateSpeech", &[("text", "Hi"), ("path", path.as_str())]))
            .await
            .unwrap()
            .into_inner();
        match resp.outcome {
            Some(Outcome::Success(s)) => assert_eq!(s.value, path),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(session.initializations(), 1);
}

#[tokio::test]
async fn test_foreign_channel_is_rejected() {
    let (svc, session) = service_with(NativeRuntime::new().with_module(Arc::new(tts_module())));

    let mut req = request("generateSpeech", &[("text", "Hi")]);
    req.get_mut().channel = "other/channel".into();
    let status = svc.invoke_method(req).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert!(!session.is_started());

    let status = svc
        .list_methods(Request::new(ListMethodsRequest {
            channel: "other/channel".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_list_methods_reports_speech() {
    let (svc, _session) = service_with(NativeRuntime::new());

    let resp = svc
        .list_methods(Request::new(ListMethodsRequest {
            channel: "ailogos/tts".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.methods, vec!["generateSpeech".to_string()]);
}
