//! The partial-write seam between the gateway and a connection.

use std::io::{self, Write};
use std::net::TcpStream;

/// A non-blocking, best-effort writer.
///
/// `write_partial` writes as much of `buf` as the connection accepts right
/// now and returns how much that was, possibly zero. Backpressure is not an
/// error; only a broken connection is.
pub trait PartialWrite {
    fn write_partial(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<W: PartialWrite + ?Sized> PartialWrite for &mut W {
    fn write_partial(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write_partial(buf)
    }
}

/// A non-blocking `std` socket. The stream must have been put into
/// non-blocking mode by the caller.
impl PartialWrite for TcpStream {
    fn write_partial(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_nonblocking(self, buf)
    }
}

fn write_nonblocking<W: Write>(writer: &mut W, buf: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) if written > 0 => break,
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) if written > 0 => break,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}

/// Write as much of `buf` as `conn` takes, calling it until it takes
/// everything or accepts nothing.
///
/// An error after some bytes were accepted reports those bytes instead;
/// the error surfaces on the next call.
pub(crate) fn send_some<W: PartialWrite + ?Sized>(conn: &mut W, buf: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match conn.write_partial(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(_) if written > 0 => break,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}
