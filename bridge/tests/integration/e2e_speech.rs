use super::*;
use ailogos_core::FunctionModule;
use serde_json::json;

fn tts_runtime() -> NativeRuntime {
    NativeRuntime::new().with_module(Arc::new(FunctionModule::new("local_tts").with_fn(
        "generate_tts",
        |args| Ok(json!(format!("{}:{}", args[1], args[0].len()))),
    )))
}

fn speech_request(id: &str, text: &str, path: &str) -> MethodCallRequest {
    MethodCallRequest {
        id: id.into(),
        channel: String::new(),
        method: "generateSpeech".into(),
        arguments: [("text", text), ("path", path)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[tokio::test]
async fn test_generate_speech_over_grpc() {
    let (addr, handle, session) = start_test_server(tts_runtime()).await;
    let mut client = new_client(addr).await;

    let hb = client
        .heartbeat(HeartbeatRequest { timestamp_ms: 7 })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(hb.status, "ok");
    assert!(!session.is_started());

    let methods = client
        .list_methods(ListMethodsRequest {
            channel: "ailogos/tts".into(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(methods.methods, vec!["generateSpeech".to_string()]);

    let resp = client
        .invoke_method(speech_request("r1", "Hello", "/tmp/out.mp3"))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.id, "r1");
    match resp.outcome {
        Some(Outcome::Success(s)) => assert_eq!(s.value, "/tmp/out.mp3:5"),
        other => panic!("unexpected outcome: {:?}", other),
    }

    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_session() {
    let (addr, handle, session) = start_test_server(tts_runtime()).await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let mut client = new_client(addr).await;
        tasks.push(tokio::spawn(async move {
            let path = format!("/tmp/out{}.mp3", i);
            let resp = client
                .invoke_method(speech_request(&format!("c{}", i), "Hi", &path))
                .await
                .unwrap()
                .into_inner();
            (path, resp)
        }));
    }

    for t in tasks {
        let (path, resp) = t.await.unwrap();
        match resp.outcome {
            Some(Outcome::Success(s)) => assert_eq!(s.value, format!("{}:2", path)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(session.initializations(), 1);

    handle.abort();
}
