//! Integration tests for estimation over real HTTP.
//!
//! A loopback server answers range requests for in-memory safetensors files,
//! so these tests exercise the reqwest transport end to end.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use modelsize::memory::bytes_to_gb;
use modelsize::model_config::{self, ModelConfig};
use modelsize::range::FetchError;
use modelsize::{EstimateError, EstimateOptions, Estimator, GpuMemoryMode, ReqwestTransport};

const TIMEOUT: Duration = Duration::from_secs(5);

/// A file served by the loopback server.
#[derive(Clone)]
struct Served {
    bytes: Vec<u8>,
    ranges: bool,
}

fn safetensors_file(header: &str, data_len: usize) -> Vec<u8> {
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(header.as_bytes());
    bytes.resize(bytes.len() + data_len, 0);
    bytes
}

fn oversized_file(len: usize) -> Vec<u8> {
    let mut bytes = 2_000_000u64.to_le_bytes().to_vec();
    bytes.resize(len, b' ');
    bytes
}

/// Serve `files` by path until the test process exits.
fn spawn_server(files: HashMap<&'static str, Served>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            handle(stream, &files);
        }
    });

    addr
}

fn read_request(stream: &mut TcpStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set_read_timeout");

    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut tmp) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn requested_range(request: &str) -> Option<(usize, usize)> {
    let line = request
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("range:"))?;
    let spec = line.split_once("bytes=")?.1.trim();
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn handle(mut stream: TcpStream, files: &HashMap<&'static str, Served>) {
    let request = read_request(&mut stream);
    let path = request.split_whitespace().nth(1).unwrap_or("/");

    let (status, extra, body) = match files.get(path) {
        None => ("404 Not Found", String::new(), b"not found".to_vec()),
        Some(file) => match requested_range(&request) {
            Some((start, end)) if file.ranges => {
                let total = file.bytes.len();
                let end = end.min(total - 1);
                (
                    "206 Partial Content",
                    format!("Content-Range: bytes {start}-{end}/{total}\r\n"),
                    file.bytes[start..=end].to_vec(),
                )
            }
            _ => ("200 OK", String::new(), file.bytes.clone()),
        },
    };

    let head = format!(
        "HTTP/1.1 {status}\r\n{extra}Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

fn ranged(bytes: Vec<u8>) -> Served {
    Served {
        bytes,
        ranges: true,
    }
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn estimates_sharded_model_over_http() {
    let shard1 = r#"{
        "__metadata__": {"format": "pt"},
        "model.embed_tokens.weight": {"dtype": "BF16", "shape": [1024, 64], "data_offsets": [0, 131072]},
        "model.norm.weight": {"dtype": "F32", "shape": [64], "data_offsets": [131072, 131328]}
    }"#;
    let shard2 = r#"{
        "lm_head.weight": {"dtype": "BF16", "shape": [1024, 64], "data_offsets": [0, 131072]}
    }"#;

    let addr = spawn_server(HashMap::from([
        ("/model-00001-of-00002.safetensors", ranged(safetensors_file(shard1, 131_328))),
        ("/model-00002-of-00002.safetensors", ranged(safetensors_file(shard2, 131_072))),
    ]));
    let urls = [
        url(addr, "/model-00001-of-00002.safetensors"),
        url(addr, "/model-00002-of-00002.safetensors"),
    ];

    let estimator = Estimator::with_reqwest(TIMEOUT, false).expect("client builds");
    let info = estimator
        .estimate_model_info(&urls, 2048)
        .await
        .expect("estimate succeeds");

    assert_eq!(info.total_params, 1024 * 64 * 2 + 64);
    assert_eq!(info.params_billions, 0.0);
    assert_eq!(info.tensor_type, "BF16 F32");
    assert_eq!(info.bytes_per_param, 2);
    assert_eq!(info.model_weights_gb, 0.0);
    assert_eq!(info.mini_gpu_memory_gb, 1.0);
    assert_eq!(info.context_size, 2048);
    assert_eq!(info.batch_size, 1);
}

#[tokio::test]
async fn concurrent_estimate_matches_sequential_over_http() {
    let header = r#"{"w": {"dtype": "F16", "shape": [32, 32]}}"#;
    let addr = spawn_server(HashMap::from([
        ("/a.safetensors", ranged(safetensors_file(header, 2048))),
        ("/b.safetensors", ranged(safetensors_file(header, 2048))),
        ("/c.safetensors", ranged(safetensors_file(header, 2048))),
    ]));
    let urls = [
        url(addr, "/a.safetensors"),
        url(addr, "/b.safetensors"),
        url(addr, "/c.safetensors"),
    ];

    let sequential = Estimator::with_reqwest(TIMEOUT, false)
        .expect("client builds")
        .estimate_model_info(&urls, 512)
        .await
        .expect("sequential succeeds");
    let concurrent = Estimator::with_reqwest(TIMEOUT, false)
        .expect("client builds")
        .with_options(EstimateOptions::default().concurrency(3))
        .estimate_model_info(&urls, 512)
        .await
        .expect("concurrent succeeds");

    assert_eq!(concurrent, sequential);
    assert_eq!(concurrent.total_params, 3 * 32 * 32);
}

#[tokio::test]
async fn oversized_header_falls_back_to_content_range_totals() {
    let first = safetensors_file(r#"{"w": {"dtype": "F32", "shape": [4]}}"#, 16);
    let second = oversized_file(4096);
    let expected = bytes_to_gb(first.len() as u64) + bytes_to_gb(second.len() as u64);

    let addr = spawn_server(HashMap::from([
        ("/first.safetensors", ranged(first)),
        ("/second.safetensors", ranged(second)),
    ]));
    let urls = [url(addr, "/first.safetensors"), url(addr, "/second.safetensors")];

    let info = Estimator::with_reqwest(TIMEOUT, false)
        .expect("client builds")
        .with_options(EstimateOptions::default().gpu_memory(GpuMemoryMode::FromWeights))
        .estimate_model_info(&urls, 1024)
        .await
        .expect("fallback succeeds");

    assert_eq!(info.model_weights_gb, expected);
    assert_eq!(info.total_params, 0);
    assert_eq!(info.tensor_type, "");
    assert_eq!(info.mini_gpu_memory_gb, 0.0);
    assert_eq!(info.context_size, 1024);
}

#[tokio::test]
async fn server_without_range_support_fails_with_url() {
    let addr = spawn_server(HashMap::from([(
        "/model.safetensors",
        Served {
            bytes: safetensors_file(r#"{"w": {"dtype": "F32", "shape": [4]}}"#, 16),
            ranges: false,
        },
    )]));
    let model_url = url(addr, "/model.safetensors");

    let err = Estimator::with_reqwest(TIMEOUT, false)
        .expect("client builds")
        .estimate_model_info(&[model_url.as_str()], 1024)
        .await
        .expect_err("200 is not a range answer");

    match &err {
        EstimateError::Fetch { url, source } => {
            assert_eq!(url, &model_url);
            assert!(matches!(
                source,
                FetchError::UnexpectedStatus { status: 200, .. }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("url: http://"));
}

#[tokio::test]
async fn missing_shard_reports_status() {
    let addr = spawn_server(HashMap::new());
    let missing = url(addr, "/missing.safetensors");

    let err = Estimator::with_reqwest(TIMEOUT, false)
        .expect("client builds")
        .file_size_gb(&missing)
        .await
        .expect_err("404");

    assert!(matches!(
        err,
        EstimateError::Fetch {
            source: FetchError::UnexpectedStatus { status: 404, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn config_document_refines_gpu_memory() {
    let config = br#"{
        "architectures": ["Qwen2ForCausalLM"],
        "model_type": "qwen2",
        "hidden_size": 3584,
        "num_hidden_layers": 28,
        "num_attention_heads": 28
    }"#;
    let addr = spawn_server(HashMap::from([(
        "/config.json",
        Served {
            bytes: config.to_vec(),
            ranges: false,
        },
    )]));

    let transport = ReqwestTransport::with_timeout(TIMEOUT).expect("client builds");
    let config: ModelConfig =
        model_config::fetch_json_document(&transport, &url(addr, "/config.json"))
            .await
            .expect("config decodes");

    let mut info = modelsize::ModelInfo {
        params_billions: 7.62,
        model_weights_gb: 14.0,
        context_size: 5120,
        batch_size: 1,
        bytes_per_param: 2,
        ..Default::default()
    };
    model_config::apply_model_config(&mut info, &config, 512);

    assert_eq!(info.architecture.as_deref(), Some("Qwen2ForCausalLM"));
    assert_eq!(info.mini_gpu_memory_gb, 23.0);
    assert_eq!(info.mini_gpu_finetune_gb, 18.86);
}
