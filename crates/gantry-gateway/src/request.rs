use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use bytes::Bytes;

use crate::environ::Environ;
use crate::header::HeaderList;
use crate::value::{Chunks, FileBody, Value};

/// Progress flags of a request's response.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestState(u8);

impl RequestState {
    pub const RESPONSE_FROM_APPLICATION: Self = Self(1 << 0);
    pub const HEADERS_SENT: Self = Self(1 << 1);
    pub const STRING_RESPONSE: Self = Self(1 << 2);
    pub const FILE_RESPONSE: Self = Self(1 << 3);
    pub const ITER_RESPONSE: Self = Self(1 << 4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for RequestState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RequestState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(RequestState, &str); 5] = [
            (RequestState::RESPONSE_FROM_APPLICATION, "RESPONSE_FROM_APPLICATION"),
            (RequestState::HEADERS_SENT, "HEADERS_SENT"),
            (RequestState::STRING_RESPONSE, "STRING_RESPONSE"),
            (RequestState::FILE_RESPONSE, "FILE_RESPONSE"),
            (RequestState::ITER_RESPONSE, "ITER_RESPONSE"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Status line and headers reported through the status callback.
///
/// This is the only part of a [`Request`] the status callback may touch.
#[derive(Debug, Default)]
pub struct ResponseHead {
    pub(crate) status: Option<Bytes>,
    pub(crate) headers: Option<HeaderList>,
    pub(crate) state: RequestState,
}

impl ResponseHead {
    pub fn status(&self) -> Option<&Bytes> {
        self.status.as_ref()
    }

    /// `Some` once the status callback has succeeded at least once.
    pub fn headers(&self) -> Option<&HeaderList> {
        self.headers.as_ref()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn headers_sent(&self) -> bool {
        self.state.contains(RequestState::HEADERS_SENT)
    }
}

/// The classified response body.
pub(crate) enum Payload {
    /// A single buffer; `buf` holds the bytes not yet written.
    Buffer { buf: Bytes },
    /// A file streamed in bounded reads.
    File {
        file: FileBody,
        pending: Bytes,
        offset: u64,
        eof: bool,
    },
    /// A lazy body; the next unsent chunk lives in `Request::curiter`.
    Iter(Box<dyn Chunks>),
}

/// What the connection driver should do when a response fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Nothing reached the peer yet; an error response may be written.
    ErrorResponse,
    /// The peer has part of the response; close the connection.
    Abort,
}

/// Per-connection request state, from dispatch to response completion.
pub struct Request {
    pub(crate) environ: Environ,
    pub(crate) head: ResponseHead,
    pub(crate) payload: Option<Payload>,
    pub(crate) curiter: Option<Value>,
    /// Rendered header bytes not yet written.
    pub(crate) header_buf: Option<Bytes>,
    pub(crate) bytes_sent: u64,
    pub(crate) done: bool,
    /// Set once a send turn has failed; the request cannot be resumed.
    pub(crate) failed: bool,
}

impl Request {
    pub fn new(environ: Environ) -> Self {
        Self {
            environ,
            head: ResponseHead::default(),
            payload: None,
            curiter: None,
            header_buf: None,
            bytes_sent: 0,
            done: false,
            failed: false,
        }
    }

    pub fn environ(&self) -> &Environ {
        &self.environ
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn status(&self) -> Option<&Bytes> {
        self.head.status()
    }

    pub fn response_headers(&self) -> Option<&HeaderList> {
        self.head.headers()
    }

    pub fn state(&self) -> RequestState {
        self.head.state
    }

    pub fn headers_sent(&self) -> bool {
        self.head.headers_sent()
    }

    /// Bytes written to the peer so far, headers included.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Whether the response has been written completely.
    pub fn is_complete(&self) -> bool {
        self.done
    }

    /// Whether a send turn has failed. A failed request is never complete.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// How a failure at this point must be handled.
    pub fn failure_policy(&self) -> FailurePolicy {
        if self.bytes_sent == 0 {
            FailurePolicy::ErrorResponse
        } else {
            FailurePolicy::Abort
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("state", &self.head.state)
            .field("status", &self.head.status)
            .field("bytes_sent", &self.bytes_sent)
            .field("done", &self.done)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_flags_combine() {
        let mut state = RequestState::empty();
        assert!(!state.contains(RequestState::HEADERS_SENT));

        state.insert(RequestState::RESPONSE_FROM_APPLICATION);
        state |= RequestState::ITER_RESPONSE;
        assert!(state.contains(RequestState::RESPONSE_FROM_APPLICATION));
        assert!(state.contains(RequestState::ITER_RESPONSE));
        assert!(!state.contains(RequestState::STRING_RESPONSE));
        assert_eq!(
            state.bits(),
            (RequestState::RESPONSE_FROM_APPLICATION | RequestState::ITER_RESPONSE).bits()
        );
    }

    #[test]
    fn state_debug_lists_flags() {
        let state = RequestState::HEADERS_SENT | RequestState::FILE_RESPONSE;
        assert_eq!(format!("{state:?}"), "{HEADERS_SENT, FILE_RESPONSE}");
    }

    #[test]
    fn new_request_is_blank() {
        let req = Request::new(Environ::new());
        assert!(req.status().is_none());
        assert!(req.response_headers().is_none());
        assert!(!req.headers_sent());
        assert!(!req.is_complete());
        assert_eq!(req.state(), RequestState::empty());
        assert_eq!(req.failure_policy(), FailurePolicy::ErrorResponse);
    }

    #[test]
    fn failure_policy_aborts_after_first_byte() {
        let mut req = Request::new(Environ::new());
        req.bytes_sent = 1;
        assert_eq!(req.failure_policy(), FailurePolicy::Abort);
    }
}
