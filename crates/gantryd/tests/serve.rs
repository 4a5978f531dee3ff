//! Serve real requests over loopback TCP.

use std::sync::Arc;
use std::time::Duration;

use gantry_gateway::{Application, HeaderList, SendLimits, Value, app_fn};
use gantryd::{ConnectionContext, GatewayServer, apps};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

struct Running {
    addr: std::net::SocketAddr,
    shutdown: watch::Sender<bool>,
}

async fn start(app: Arc<dyn Application>, limits: SendLimits) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = ConnectionContext {
        app,
        limits,
        max_request_head: 8192,
    };
    let server = GatewayServer::new(addr, ctx);
    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(async move { server.serve_listener(listener, rx).await });
    Running { addr, shutdown }
}

async fn get(addr: std::net::SocketAddr, path: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nX-Probe: yes\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("response timed out")
        .unwrap();
    response
}

fn split(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator")
        + 4;
    (
        String::from_utf8(response[..end].to_vec()).unwrap(),
        response[end..].to_vec(),
    )
}

#[tokio::test]
async fn hello_over_tcp() {
    let server = start(Arc::new(apps::hello()), SendLimits::default()).await;

    let response = get(server.addr, "/").await;
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 14\r\n"));
    assert_eq!(body, b"Hello, World!\n");

    server.shutdown.send(true).unwrap();
}

#[tokio::test]
async fn streamed_lines_arrive_in_order() {
    let limits = SendLimits {
        turn_budget: 32,
        ..SendLimits::default()
    };
    let server = start(Arc::new(apps::stream(500)), limits).await;

    let response = get(server.addr, "/").await;
    let (_, body) = split(&response);
    let expected: String = (1..=500).map(|i| format!("line {i} of 500\n")).collect();
    assert_eq!(String::from_utf8(body).unwrap(), expected);
}

#[tokio::test]
async fn environ_reflects_the_request() {
    let server = start(Arc::new(apps::environ()), SendLimits::default()).await;

    let response = get(server.addr, "/some/path?x=1").await;
    let (_, body) = split(&response);
    let body = String::from_utf8(body).unwrap();
    assert!(body.contains("PATH_INFO=/some/path\n"));
    assert!(body.contains("QUERY_STRING=x=1\n"));
    assert!(body.contains("HTTP_X_PROBE=yes\n"));
}

#[tokio::test]
async fn large_file_is_streamed_intact() {
    let dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..3_000_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(dir.path().join("blob.bin"), &data).unwrap();

    let limits = SendLimits {
        file_chunk_size: 16 * 1024,
        ..SendLimits::default()
    };
    let server = start(Arc::new(apps::FileApp::new(dir.path())), limits).await;

    let response = get(server.addr, "/blob.bin").await;
    let (head, body) = split(&response);
    assert!(head.contains("Content-Length: 3000000\r\n"));
    assert_eq!(body.len(), data.len());
    assert!(body == data);

    let missing = get(server.addr, "/../secret").await;
    assert!(missing.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn failure_before_headers_becomes_500() {
    let app = app_fn(|_, _| Ok(Value::Int(7)));
    let server = start(Arc::new(app), SendLimits::default()).await;

    let response = get(server.addr, "/").await;
    assert!(response.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(response.ends_with(b"Internal Server Error"));
}

#[tokio::test]
async fn failure_after_headers_truncates() {
    let app = app_fn(|_, sr| {
        sr.call("200 OK", HeaderList::new(), None)?;
        Ok(Value::List(vec!["partial".into(), Value::None]))
    });
    let server = start(Arc::new(app), SendLimits::default()).await;

    let response = get(server.addr, "/").await;
    assert_eq!(response, b"HTTP/1.1 200 OK\r\n\r\npartial");
}
