//! Per-connection driver.
//!
//! Reads one request head, invokes the application and streams the
//! response, suspending on socket backpressure. One response per
//! connection; the connection is closed afterwards.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use gantry_gateway::{
    Application, Environ, FailurePolicy, PartialWrite, Request, SendLimits, SendStatus, invoke,
    send_response,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, warn};

/// Written when the application fails before any response byte went out.
pub const INTERNAL_ERROR_RESPONSE: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\n\
Content-Type: text/plain\r\n\
Content-Length: 21\r\n\
Connection: close\r\n\
\r\n\
Internal Server Error";

/// Limits and application shared by every connection of a server.
#[derive(Clone)]
pub struct ConnectionContext {
    pub app: Arc<dyn Application>,
    pub limits: SendLimits,
    pub max_request_head: usize,
}

/// Best-effort writer over a tokio socket.
struct TokioConn<'a>(&'a TcpStream);

impl PartialWrite for TokioConn<'_> {
    fn write_partial(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.try_write(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Serve a single request on `stream`.
pub async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    ctx: ConnectionContext,
) -> anyhow::Result<()> {
    let Some(head) = read_request_head(&mut stream, ctx.max_request_head).await? else {
        debug!(%peer, "connection closed before a request was received");
        return Ok(());
    };
    let environ = parse_request_head(&head, peer)?;
    debug!(
        %peer,
        method = environ.get("REQUEST_METHOD").unwrap_or_default(),
        path = environ.get("PATH_INFO").unwrap_or_default(),
        "request"
    );

    let mut request = Request::new(environ);
    if let Err(e) = invoke(ctx.app.as_ref(), &mut request) {
        error!(%peer, error = %e, "application failed");
        stream.write_all(INTERNAL_ERROR_RESPONSE).await?;
        stream.shutdown().await?;
        return Ok(());
    }

    loop {
        let result = send_response(&mut request, &mut TokioConn(&stream), &ctx.limits);
        match result {
            Ok(SendStatus::Done) => break,
            Ok(SendStatus::WouldBlock) => {
                stream.writable().await?;
                // Budget exhaustion also lands here with a writable socket.
                tokio::task::yield_now().await;
            }
            Err(e) => match request.failure_policy() {
                FailurePolicy::ErrorResponse => {
                    error!(%peer, error = %e, "response failed before headers were sent");
                    stream.write_all(INTERNAL_ERROR_RESPONSE).await?;
                    stream.shutdown().await?;
                    return Ok(());
                }
                FailurePolicy::Abort => {
                    warn!(
                        %peer,
                        error = %e,
                        bytes_sent = request.bytes_sent(),
                        "response failed midway; aborting connection"
                    );
                    // Dropping the stream closes it; the peer sees a
                    // truncated response.
                    return Ok(());
                }
            },
        }
    }

    debug!(%peer, bytes_sent = request.bytes_sent(), "response sent");
    stream.shutdown().await?;
    Ok(())
}

/// Read up to and including the blank line ending the request head.
///
/// Returns `None` if the peer closed the connection without sending
/// anything.
pub async fn read_request_head(
    stream: &mut TcpStream,
    max_len: usize,
) -> anyhow::Result<Option<Vec<u8>>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(end) = find_head_end(&buf) {
            buf.truncate(end);
            return Ok(Some(buf));
        }
        if buf.len() >= max_len {
            bail!("request head exceeds {max_len} bytes");
        }
        let n = stream.read(&mut chunk).await.context("reading request head")?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            bail!("connection closed inside the request head");
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Build the application environ from a raw request head.
pub fn parse_request_head(head: &[u8], peer: SocketAddr) -> anyhow::Result<Environ> {
    let text = std::str::from_utf8(head).context("request head is not valid UTF-8")?;
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(protocol)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("malformed request line: {request_line:?}");
    };
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let mut environ = Environ::new();
    environ.insert("REQUEST_METHOD", method);
    environ.insert("PATH_INFO", path);
    environ.insert("QUERY_STRING", query);
    environ.insert("SERVER_PROTOCOL", protocol);
    environ.insert("REMOTE_ADDR", peer.ip().to_string());
    environ.insert("REMOTE_PORT", peer.port().to_string());

    for line in lines.take_while(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            bail!("malformed header line: {line:?}");
        };
        environ.insert_header(name, value.trim());
    }
    Ok(environ)
}
