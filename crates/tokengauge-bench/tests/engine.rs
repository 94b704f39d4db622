use httpmock::prelude::*;
use tokio_util::sync::CancellationToken;

use tokengauge_bench::{BenchmarkEngine, LiveView};
use tokengauge_core::{BenchError, PromptJob, ServiceDescriptor, ServiceKind};

fn test_view(service: &ServiceDescriptor, dir: &tempfile::TempDir) -> LiveView {
    LiveView::start_session(service, dir.path()).silenced()
}

#[tokio::test]
async fn ollama_stream_yields_authoritative_count_and_accumulated_text() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .json_body_partial(r#"{"model": "test-model", "stream": true}"#);
        then.status(200).body(concat!(
            "{\"response\":\"Hi \",\"done\":false}\n",
            "{\"response\":\"there\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true,\"eval_count\":7}\n",
        ));
    });

    let service =
        ServiceDescriptor::new(ServiceKind::Ollama, server.base_url()).with_model("test-model");
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);
    let log_path = view.log_path().unwrap().to_path_buf();

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "say hi");
    let metrics = engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap();
    drop(view);

    mock.assert();
    assert_eq!(metrics.total_tokens, 7);
    assert_eq!(metrics.service_name, "Ollama");
    assert_eq!(metrics.prompt_name, "Prompt 1");
    assert!(metrics.prompt_delay_time >= 0.0);
    assert!(metrics.total_time >= metrics.prompt_delay_time);
    assert!(metrics.total_time >= metrics.generation_time);

    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("Hi there"));
}

#[tokio::test]
async fn vllm_stream_handles_sse_framing_and_done_sentinel() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/completions");
        then.status(200).body(concat!(
            "data: {\"choices\":[{\"text\":\"one \"}]}\n",
            "\n",
            "data: {\"choices\":[{\"text\":\"two\"}]}\n",
            "data: [DONE]\n",
        ));
    });

    let service = ServiceDescriptor::new(ServiceKind::Vllm, server.base_url()).with_model("m");
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);
    let log_path = view.log_path().unwrap().to_path_buf();

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "count");
    let metrics = engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap();
    drop(view);

    // no usage block on the stream path, so the estimate stands
    assert!(metrics.total_tokens > 0);
    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("one two"));
}

#[tokio::test]
async fn corrupt_lines_are_skipped_without_aborting_the_stream() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(200).body(concat!(
            "{\"response\":\"good \",\"done\":false}\n",
            "{not valid json\n",
            "{\"response\":\"still good\",\"done\":true,\"eval_count\":3}\n",
        ));
    });

    let service = ServiceDescriptor::new(ServiceKind::Ollama, server.base_url());
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);
    let log_path = view.log_path().unwrap().to_path_buf();

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "robust");
    let metrics = engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap();
    drop(view);

    assert_eq!(metrics.total_tokens, 3);
    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("good still good"));
}

#[tokio::test]
async fn stream_without_final_marker_finalizes_with_accumulated_state() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/completion");
        // body ends with no stop record
        then.status(200)
            .body("{\"content\":\"only chunk\",\"stop\":false}\n");
    });

    let service = ServiceDescriptor::new(ServiceKind::LlamaCpp, server.base_url());
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "eof");
    let metrics = engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap();

    // estimate of "only chunk": 2 words * 1.3, rounded
    assert_eq!(metrics.total_tokens, 3);
    assert!(metrics.tokens_per_second >= 0.0);
}

#[tokio::test]
async fn unknown_service_fails_before_any_request() {
    let server = MockServer::start();
    let catch_all = server.mock(|when, then| {
        when.path_contains("/");
        then.status(200).body("{}");
    });

    let service = ServiceDescriptor::new(ServiceKind::Unknown, server.base_url());
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "never sent");
    let err = engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::UnsupportedService(_)));
    assert_eq!(catch_all.hits(), 0);
}

#[tokio::test]
async fn server_errors_on_both_paths_fail_the_job() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(500);
    });

    let service = ServiceDescriptor::new(ServiceKind::Ollama, server.base_url());
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "doomed");
    let err = engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Transport(_)));
    // streaming attempt plus exactly one fallback
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn auth_headers_are_forwarded_verbatim() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .header("Authorization", "Bearer secret")
            .header("X-API-Key", "secret");
        then.status(200)
            .body("{\"response\":\"ok\",\"done\":true,\"eval_count\":1}\n");
    });

    let service = ServiceDescriptor::new(ServiceKind::Ollama, server.base_url()).with_headers(vec![
        ("Authorization".to_string(), "Bearer secret".to_string()),
        ("X-API-Key".to_string(), "secret".to_string()),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut view = test_view(&service, &dir);

    let engine = BenchmarkEngine::new(service).unwrap();
    let job = PromptJob::new("Prompt 1", "authed");
    engine
        .run_prompt(&job, &mut view, &CancellationToken::new())
        .await
        .unwrap();

    mock.assert();
}
