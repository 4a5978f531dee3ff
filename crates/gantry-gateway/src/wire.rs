//! Status line and header serialization.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{GatewayError, GatewayResult};
use crate::request::ResponseHead;

const STATUS_PREFIX: &[u8] = b"HTTP/1.1 ";
const CRLF: &[u8] = b"\r\n";
const SEPARATOR: &[u8] = b": ";

/// Render the reported status and headers into wire format.
///
/// ```text
/// HTTP/1.1 <status>\r\n
/// <name>: <value>\r\n      (per header, in order)
/// \r\n
/// ```
///
/// Header entries shorter than two items are rejected; items past the
/// second are ignored.
pub fn render_headers(head: &ResponseHead) -> GatewayResult<Bytes> {
    let (Some(status), Some(headers)) = (head.status(), head.headers()) else {
        return Err(GatewayError::Protocol(
            "cannot render headers before start_response was called".to_string(),
        ));
    };

    let mut capacity = STATUS_PREFIX.len() + status.len() + 2 * CRLF.len();
    for entry in headers.iter() {
        let (Some(name), Some(value)) = (entry.name(), entry.value()) else {
            return Err(GatewayError::Type(format!(
                "headers must be tuples of length 2, not {}",
                entry.len()
            )));
        };
        capacity += name.len() + SEPARATOR.len() + value.len() + CRLF.len();
    }

    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_slice(STATUS_PREFIX);
    buf.put_slice(status);
    buf.put_slice(CRLF);
    for entry in headers.iter() {
        // Arity was checked above.
        if let (Some(name), Some(value)) = (entry.name(), entry.value()) {
            buf.put_slice(name);
            buf.put_slice(SEPARATOR);
            buf.put_slice(value);
            buf.put_slice(CRLF);
        }
    }
    buf.put_slice(CRLF);
    Ok(buf.freeze())
}
