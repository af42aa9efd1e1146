use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use fragments_api::{FragmentsApiClient, FragmentsApiConfig, FragmentsApiError};
use generation_provider::{
    FragmentSnapshot, GenerationEndpoint, GenerationRequest, LlmModel, LlmModelConfig,
    RequestMessage, SandboxRequest,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

fn allow_local_integration() -> bool {
    std::env::var("FRAGMENTS_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
enum ScriptedResponse {
    Respond {
        status: u16,
        content_type: &'static str,
        chunks: Vec<ResponseChunk>,
    },
}

struct ScriptedServer {
    base_url: String,
    request_lines: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let request_lines = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_lines = Arc::clone(&request_lines);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let request_lines = Arc::clone(&request_lines);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, request_lines).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_lines,
            handle,
        }
    }

    fn request_lines(&self) -> Vec<String> {
        self.request_lines
            .lock()
            .expect("request line log should not be poisoned")
            .clone()
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn response_text(status: u16, chunks: &[&str]) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type: "text/plain; charset=utf-8",
        chunks: chunks
            .iter()
            .map(|chunk| ResponseChunk {
                delay_ms: 0,
                bytes: chunk.as_bytes().to_vec(),
            })
            .collect(),
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

fn generation_request(endpoint: GenerationEndpoint) -> GenerationRequest {
    GenerationRequest {
        run_id: 1,
        endpoint,
        user_id: "user-1".to_string(),
        team_id: None,
        messages: vec![RequestMessage::user_text("build a counter")],
        template: json!({"nextjs-developer": {}}),
        model: LlmModel {
            id: "claude-sonnet-4-20250514".to_string(),
            provider: "Anthropic".to_string(),
            provider_id: "anthropic".to_string(),
            name: "Claude Sonnet 4".to_string(),
            multi_modal: true,
        },
        config: LlmModelConfig::for_model("claude-sonnet-4-20250514"),
        context: None,
        context_meta: None,
        current_fragment: None,
    }
}

fn client_for(server: &ScriptedServer) -> FragmentsApiClient {
    FragmentsApiClient::new(FragmentsApiConfig::new(&server.base_url)).expect("client")
}

#[tokio::test]
async fn stream_integration_reports_cumulative_snapshots_and_final_object() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_text(
        200,
        &[
            r#"{"commentary":"a"#,
            r#" b c","code":"x"#,
            r#" y","file_path":"pages/index.tsx","port":3000}"#,
        ],
    )])
    .await;

    let client = client_for(&server);
    let mut snapshots = Vec::new();
    let object = client
        .stream_object(&generation_request(GenerationEndpoint::Chat), None, |snapshot| {
            snapshots.push(snapshot)
        })
        .await
        .expect("stream should succeed");

    assert!(!snapshots.is_empty());
    assert_eq!(object.commentary.as_deref(), Some("a b c"));
    assert_eq!(object.code.as_deref(), Some("x y"));
    assert_eq!(object.port, Some(3000));
    assert_eq!(snapshots.last(), Some(&object));
    assert!(server.request_lines()[0].starts_with("POST /api/chat "));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_morph_endpoint_uses_its_own_route() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_text(200, &[r#"{"commentary":"patched"}"#])]).await;

    let mut request = generation_request(GenerationEndpoint::MorphChat);
    request.current_fragment = Some(FragmentSnapshot {
        code: Some("old".to_string()),
        file_path: Some("app.py".to_string()),
        ..FragmentSnapshot::default()
    });

    let object = client_for(&server)
        .stream_object(&request, None, |_| {})
        .await
        .expect("morph stream should succeed");

    assert_eq!(object.commentary.as_deref(), Some("patched"));
    assert!(server.request_lines()[0].starts_with("POST /api/morph-chat "));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_rate_limit_body_becomes_error_message() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_text(
        429,
        &["You have reached your request limit for the day."],
    )])
    .await;

    let error = client_for(&server)
        .stream_object(&generation_request(GenerationEndpoint::Chat), None, |_| {})
        .await
        .expect_err("429 should fail");

    assert!(matches!(error, FragmentsApiError::Status { status, .. } if status.as_u16() == 429));
    assert!(error.to_string().contains("limit"));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_cancellation_during_stream() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/plain; charset=utf-8",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: br#"{"commentary":"stream"#.to_vec(),
            },
            ResponseChunk {
                delay_ms: 300,
                bytes: br#"ing"}"#.to_vec(),
            },
        ],
    }])
    .await;

    let client = Arc::new(client_for(&server));
    let cancellation = Arc::new(AtomicBool::new(false));
    let stream_task = tokio::spawn({
        let client = Arc::clone(&client);
        let cancellation = Arc::clone(&cancellation);
        async move {
            client
                .stream_object(
                    &generation_request(GenerationEndpoint::Chat),
                    Some(&cancellation),
                    |_| {},
                )
                .await
        }
    });

    sleep(Duration::from_millis(120)).await;
    cancellation.store(true, Ordering::Release);

    let result = timeout(Duration::from_secs(5), stream_task)
        .await
        .expect("stream task should resolve")
        .expect("join handle should resolve")
        .expect_err("cancellation should abort stream");

    assert!(matches!(result, FragmentsApiError::Cancelled));
    server.shutdown();
}

#[tokio::test]
async fn sandbox_integration_decodes_execution_result() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_json(
        200,
        r#"{"sbxId":"sbx-1","template":"nextjs-developer","url":"https://3000-sbx-1.e2b.app"}"#,
    )])
    .await;

    let result = client_for(&server)
        .provision_sandbox(
            &SandboxRequest {
                fragment: FragmentSnapshot::default(),
                user_id: Some("user-1".to_string()),
                team_id: None,
                access_token: None,
            },
            None,
        )
        .await
        .expect("sandbox should succeed");

    assert_eq!(result.sbx_id.as_deref(), Some("sbx-1"));
    assert_eq!(result.url.as_deref(), Some("https://3000-sbx-1.e2b.app"));
    assert!(server.request_lines()[0].starts_with("POST /api/sandbox "));

    server.shutdown();
}

#[tokio::test]
async fn sandbox_integration_failure_surfaces_status() {
    if !allow_local_integration() {
        return;
    }

    let server =
        ScriptedServer::new(vec![response_json(500, r#"{"error":"sandbox quota exceeded"}"#)])
            .await;

    let error = client_for(&server)
        .provision_sandbox(
            &SandboxRequest {
                fragment: FragmentSnapshot::default(),
                user_id: None,
                team_id: None,
                access_token: None,
            },
            None,
        )
        .await
        .expect_err("500 should fail");

    assert_eq!(error.to_string(), "sandbox quota exceeded");
    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    request_lines: Arc<Mutex<Vec<String>>>,
) {
    let Ok(request_line) = read_request_headers(&mut socket).await else {
        return;
    };
    request_lines
        .lock()
        .expect("request line log should not be poisoned")
        .push(request_line);

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r##"{"error":"unexpected request"}"##));

    let ScriptedResponse::Respond {
        status,
        content_type,
        chunks,
    } = response;

    let headers = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        status_reason(status),
        content_type,
    );

    if socket.write_all(headers.as_bytes()).await.is_err() {
        return;
    }

    for chunk in chunks {
        if chunk.delay_ms > 0 {
            sleep(Duration::from_millis(chunk.delay_ms)).await;
        }
        let prefix = format!("{:X}\r\n", chunk.bytes.len());
        if socket.write_all(prefix.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(&chunk.bytes).await.is_err() {
            return;
        }
        if socket.write_all(b"\r\n").await.is_err() {
            return;
        }
    }

    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

/// Reads through the end of the request headers and returns the request line.
async fn read_request_headers(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    let text = String::from_utf8_lossy(&request);
    Ok(text.lines().next().unwrap_or_default().to_string())
}
