//! Resumable response emission.
//!
//! [`send_response`] is called once per write-ready notification. Each
//! call writes what the connection accepts and returns
//! [`SendStatus::WouldBlock`] to be called again, or [`SendStatus::Done`]
//! once the whole response is out. Nothing is ever written twice: the
//! header buffer, string buffers and file chunks are advanced in place and
//! a partially written iterator chunk is kept for the next turn.
//!
//! ```text
//! headers pending ──flush──▶ HEADERS_SENT ──▶ string │ file │ iterator ──▶ Done
//!        ▲    │                                  ▲   │
//!        └────┘ WouldBlock                       └───┘ WouldBlock
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::conn::{PartialWrite, send_some};
use crate::error::{GatewayError, GatewayResult};
use crate::request::{Payload, Request, RequestState};
use crate::start_response::StartResponse;
use crate::value::Value;
use crate::wire::render_headers;

/// Default per-turn byte budget for iterator bodies.
pub const DEFAULT_TURN_BUDGET: usize = 4096;

/// Default read size for file bodies.
pub const DEFAULT_FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Bounds on how much one call to [`send_response`] may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendLimits {
    /// Once an iterator body has sent this many bytes in a turn, the turn
    /// ends so other connections on the same loop get to run.
    pub turn_budget: usize,
    /// Bytes read from a file body at a time. A turn sends at most one
    /// such chunk.
    pub file_chunk_size: usize,
}

impl Default for SendLimits {
    fn default() -> Self {
        Self {
            turn_budget: DEFAULT_TURN_BUDGET,
            file_chunk_size: DEFAULT_FILE_CHUNK_SIZE,
        }
    }
}

/// Outcome of one send turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The whole response has been written.
    Done,
    /// Call again on the next write-ready notification.
    WouldBlock,
}

/// Write the next part of the response.
///
/// Flushes the rendered headers first; no body byte is written before the
/// last header byte. Once complete, further calls keep returning
/// [`SendStatus::Done`]. An error leaves the request failed: later calls
/// return a protocol error and write nothing. See
/// [`Request::failure_policy`] for what the caller should do next.
pub fn send_response<W>(
    request: &mut Request,
    conn: &mut W,
    limits: &SendLimits,
) -> GatewayResult<SendStatus>
where
    W: PartialWrite + ?Sized,
{
    if request.failed {
        return Err(GatewayError::Protocol("response already failed".to_string()));
    }
    if request.done {
        return Ok(SendStatus::Done);
    }
    if !request.head.state.contains(RequestState::RESPONSE_FROM_APPLICATION) {
        return Err(GatewayError::Protocol(
            "send_response called before the application was invoked".to_string(),
        ));
    }

    let result = send_turn(request, conn, limits);
    if let Err(e) = &result {
        request.failed = true;
        request.payload = None;
        request.curiter = None;
        request.header_buf = None;
        debug!(error = %e, bytes_sent = request.bytes_sent, "response failed");
    }
    result
}

fn send_turn<W>(request: &mut Request, conn: &mut W, limits: &SendLimits) -> GatewayResult<SendStatus>
where
    W: PartialWrite + ?Sized,
{
    if !request.head.headers_sent() {
        if send_headers(request, conn)? == SendStatus::WouldBlock {
            return Ok(SendStatus::WouldBlock);
        }
        request.head.state.insert(RequestState::HEADERS_SENT);
    }

    let status = match request.payload {
        Some(Payload::Buffer { .. }) => send_string(request, conn)?,
        Some(Payload::File { .. }) => send_file(request, conn, limits)?,
        Some(Payload::Iter(_)) => send_iter(request, conn, limits)?,
        None => {
            return Err(GatewayError::Protocol(
                "response has no payload".to_string(),
            ));
        }
    };

    if status == SendStatus::Done {
        request.done = true;
        // Release the body as soon as it is no longer needed.
        request.payload = None;
        request.curiter = None;
        debug!(bytes_sent = request.bytes_sent, "response complete");
    }
    Ok(status)
}

fn send_headers<W>(request: &mut Request, conn: &mut W) -> GatewayResult<SendStatus>
where
    W: PartialWrite + ?Sized,
{
    let mut buf = match request.header_buf.take() {
        Some(buf) => buf,
        None => render_headers(&request.head)?,
    };

    let n = send_some(conn, &buf)?;
    request.bytes_sent += n as u64;
    buf.advance(n);

    if buf.has_remaining() {
        trace!(remaining = buf.len(), "header write incomplete");
        request.header_buf = Some(buf);
        Ok(SendStatus::WouldBlock)
    } else {
        Ok(SendStatus::Done)
    }
}

fn send_string<W>(request: &mut Request, conn: &mut W) -> GatewayResult<SendStatus>
where
    W: PartialWrite + ?Sized,
{
    let Some(Payload::Buffer { buf }) = request.payload.as_mut() else {
        unreachable!("send_string on a non-string payload");
    };

    let n = send_some(conn, buf)?;
    buf.advance(n);
    request.bytes_sent += n as u64;

    if buf.has_remaining() {
        Ok(SendStatus::WouldBlock)
    } else {
        Ok(SendStatus::Done)
    }
}

fn send_file<W>(request: &mut Request, conn: &mut W, limits: &SendLimits) -> GatewayResult<SendStatus>
where
    W: PartialWrite + ?Sized,
{
    let Some(Payload::File {
        file,
        pending,
        offset,
        eof,
    }) = request.payload.as_mut()
    else {
        unreachable!("send_file on a non-file payload");
    };

    if !pending.has_remaining() {
        if *eof {
            return Ok(SendStatus::Done);
        }
        let mut chunk = BytesMut::zeroed(limits.file_chunk_size.max(1));
        let read = file.read(&mut chunk)?;
        if read == 0 {
            *eof = true;
            return Ok(SendStatus::Done);
        }
        chunk.truncate(read);
        *pending = chunk.freeze();
    }

    let n = send_some(conn, pending)?;
    pending.advance(n);
    *offset += n as u64;
    request.bytes_sent += n as u64;
    trace!(offset = *offset, "file chunk sent");

    // Even a fully written chunk yields; the next turn reads the next one.
    Ok(SendStatus::WouldBlock)
}

fn send_iter<W>(request: &mut Request, conn: &mut W, limits: &SendLimits) -> GatewayResult<SendStatus>
where
    W: PartialWrite + ?Sized,
{
    let Request {
        head,
        payload,
        curiter,
        bytes_sent,
        ..
    } = request;
    let Some(Payload::Iter(chunks)) = payload.as_mut() else {
        unreachable!("send_iter on a non-iterator payload");
    };

    let mut sent = 0usize;
    while let Some(current) = curiter.take() {
        if sent >= limits.turn_budget.max(1) {
            *curiter = Some(current);
            return Ok(SendStatus::WouldBlock);
        }

        let mut chunk: Bytes = match current {
            Value::Bytes(chunk) => chunk,
            other => {
                return Err(GatewayError::Type(format!(
                    "response iterable items must be strings, not {}",
                    other.type_name()
                )));
            }
        };

        let n = send_some(conn, &chunk)?;
        *bytes_sent += n as u64;
        sent += n;
        if n < chunk.len() {
            chunk.advance(n);
            *curiter = Some(Value::Bytes(chunk));
            return Ok(SendStatus::WouldBlock);
        }

        let mut start_response = StartResponse::new(head);
        *curiter = chunks.next_chunk(&mut start_response).transpose()?;
    }

    Ok(SendStatus::Done)
}
