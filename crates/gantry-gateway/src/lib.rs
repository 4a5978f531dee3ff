//! Gantry gateway core: application invocation and resumable response
//! emission.
//!
//! A request goes through three steps:
//!
//! ```text
//! invoke()                 call the application once, capture status and
//!   │                      headers, classify the body, prime lazy bodies
//!   ▼
//! send_response()  ◀──┐    flush headers, then stream the body through a
//!   │                 │    best-effort writer; WouldBlock suspends the
//!   │    WouldBlock ──┘    response until the next write-ready event
//!   ▼
//! Done
//! ```
//!
//! # Bodies
//!
//! The application returns a [`Value`]. A list holding a single string is
//! sent as that string; a file is read in bounded chunks; a string is sent
//! as-is; anything else iterable becomes a lazy body whose chunks are
//! pulled on demand, a bounded number of bytes per turn so one response
//! cannot starve the other connections sharing the loop.
//!
//! # Failure
//!
//! Errors are returned unmodified. Whether the caller may still answer
//! with an error response or has to drop the connection is decided by
//! [`Request::failure_policy`].

mod application;
mod conn;
mod environ;
mod error;
mod header;
mod invoke;
mod request;
mod send;
mod start_response;
mod value;
mod wire;

pub use application::{Application, app_fn};
pub use conn::PartialWrite;
pub use environ::Environ;
pub use error::{AppError, ExcInfo, GatewayError, GatewayResult};
pub use header::{HeaderList, HeaderTuple};
pub use invoke::invoke;
pub use request::{FailurePolicy, Request, RequestState, ResponseHead};
pub use send::{DEFAULT_FILE_CHUNK_SIZE, DEFAULT_TURN_BUDGET, SendLimits, SendStatus, send_response};
pub use start_response::StartResponse;
pub use value::{Chunks, FileBody, Value};
pub use wire::render_headers;
