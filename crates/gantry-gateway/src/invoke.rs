//! Application invocation and payload classification.

use tracing::debug;

use crate::application::Application;
use crate::error::{GatewayError, GatewayResult};
use crate::request::{Payload, Request, RequestState};
use crate::start_response::StartResponse;
use crate::value::Value;

/// Call the application once and classify what it returned.
///
/// Classification order:
/// 1. a list holding exactly one string buffer is treated as that buffer;
/// 2. a file becomes a file response;
/// 3. a string buffer becomes a string response;
/// 4. anything iterable becomes an iterator response, and its first chunk
///    is pulled right away since pulling it may be what reports the status.
///
/// Fails if the application did not report a status by then.
pub fn invoke<A>(app: &A, request: &mut Request) -> GatewayResult<()>
where
    A: Application + ?Sized,
{
    let Request {
        environ,
        head,
        payload,
        curiter,
        ..
    } = request;

    let retval = {
        let mut start_response = StartResponse::new(head);
        app.call(environ, &mut start_response)?
    };

    head.state.insert(RequestState::RESPONSE_FROM_APPLICATION);

    let retval = match retval {
        Value::List(mut items) if items.len() == 1 && matches!(items[0], Value::Bytes(_)) => {
            items.pop().unwrap_or(Value::None)
        }
        other => other,
    };

    let classified = match retval {
        Value::File(file) => {
            head.state.insert(RequestState::FILE_RESPONSE);
            Payload::File {
                file,
                pending: Default::default(),
                offset: 0,
                eof: false,
            }
        }
        Value::Bytes(buf) => {
            head.state.insert(RequestState::STRING_RESPONSE);
            Payload::Buffer { buf }
        }
        other => {
            let mut chunks = other.into_chunks().map_err(|v| {
                GatewayError::Type(format!(
                    "application return value must be iterable, not {}",
                    v.type_name()
                ))
            })?;
            head.state.insert(RequestState::ITER_RESPONSE);

            let mut start_response = StartResponse::new(head);
            *curiter = chunks.next_chunk(&mut start_response).transpose()?;
            Payload::Iter(chunks)
        }
    };
    *payload = Some(classified);

    if head.headers.is_none() {
        return Err(GatewayError::Protocol(
            "application returned before start_response was called".to_string(),
        ));
    }

    debug!(state = ?head.state, primed = curiter.is_some(), "application invoked");
    Ok(())
}
