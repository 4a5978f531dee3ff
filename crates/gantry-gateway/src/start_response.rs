//! The status callback handed to the application.

use bytes::Bytes;
use tracing::debug;

use crate::error::{AppError, ExcInfo};
use crate::header::HeaderList;
use crate::request::ResponseHead;

/// Per-request capability through which the application reports its
/// status line and headers.
///
/// Borrows the request's [`ResponseHead`] for the duration of a single
/// application call, or of a single pull from a lazy body, so it can never
/// outlive the request it reports for.
pub struct StartResponse<'r> {
    head: &'r mut ResponseHead,
}

impl<'r> StartResponse<'r> {
    pub(crate) fn new(head: &'r mut ResponseHead) -> Self {
        Self { head }
    }

    /// Report the response status and headers.
    ///
    /// The first call captures `status` and `headers`. Later calls are only
    /// allowed with `exc_info` set: they replace the captured values and
    /// then raise `exc_info` back into the application. Any call after the
    /// headers went out fails.
    pub fn call(
        &mut self,
        status: impl Into<Bytes>,
        headers: HeaderList,
        exc_info: Option<ExcInfo>,
    ) -> Result<(), AppError> {
        if self.head.headers_sent() {
            return Err(AppError::contract(
                "start_response called but headers already sent",
            ));
        }

        let first_call = self.head.headers.is_none();
        if !first_call && exc_info.is_none() {
            return Err(AppError::contract(
                "start_response called a second time without exc_info",
            ));
        }

        let status = status.into();
        debug!(
            status = %String::from_utf8_lossy(&status),
            headers = headers.len(),
            first_call,
            "start_response"
        );
        self.head.status = Some(status);
        self.head.headers = Some(headers);

        match exc_info {
            Some(info) if !first_call => Err(AppError::Exception(info)),
            _ => Ok(()),
        }
    }

    /// Whether a status has already been reported for this request.
    pub fn is_started(&self) -> bool {
        self.head.headers.is_some()
    }
}
