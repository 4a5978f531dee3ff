//! Values exchanged with the application.
//!
//! The application is a foreign collaborator that may hand back a string
//! buffer, a file, an in-memory sequence or a lazy cursor, and its lazy
//! cursors may in turn yield anything. [`Value`] is the tagged union the
//! gateway classifies once, at invocation time.
//!
//! # Lazy bodies
//!
//! [`Chunks`] is a pull-based cursor. Every pull receives the request's
//! [`StartResponse`] so a generator-style body can report its status on
//! the first pull, which happens while the gateway primes the body.

use std::fmt;
use std::io::Read;

use bytes::Bytes;

use crate::error::AppError;
use crate::start_response::StartResponse;

/// A value returned by the application, or yielded by one of its bodies.
pub enum Value {
    /// A string buffer.
    Bytes(Bytes),
    /// An in-memory sequence of values.
    List(Vec<Value>),
    /// A file-like object.
    File(FileBody),
    /// A lazily produced sequence of values.
    Iter(Box<dyn Chunks>),
    Int(i64),
    None,
}

impl Value {
    /// Wrap a plain iterator as a lazy body.
    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::Iter(Box::new(IterChunks(iter.into_iter())))
    }

    /// Wrap a fallible iterator as a lazy body.
    pub fn try_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<Value, AppError>>,
        I::IntoIter: Send + 'static,
    {
        Self::Iter(Box::new(TryIterChunks(iter.into_iter())))
    }

    /// Wrap a generator-style closure as a lazy body.
    ///
    /// The closure is called once per pull with the status callback and
    /// returns `None` when exhausted.
    pub fn generator<F>(f: F) -> Self
    where
        F: FnMut(&mut StartResponse<'_>) -> Option<Result<Value, AppError>> + Send + 'static,
    {
        Self::Iter(Box::new(FnChunks(f)))
    }

    /// Wrap a readable handle as a file body.
    pub fn file(reader: impl Read + Send + 'static) -> Self {
        Self::File(FileBody::new(reader))
    }

    /// Name of the variant, used in type error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "str",
            Self::List(_) => "list",
            Self::File(_) => "file",
            Self::Iter(_) => "iterator",
            Self::Int(_) => "int",
            Self::None => "NoneType",
        }
    }

    /// Obtain a cursor over this value, if it is iterable.
    ///
    /// A string buffer iterates as a single chunk; files are not iterable
    /// here since the gateway streams them separately.
    pub fn into_chunks(self) -> Result<Box<dyn Chunks>, Value> {
        match self {
            Self::Iter(chunks) => Ok(chunks),
            Self::List(items) => Ok(Box::new(IterChunks(items.into_iter()))),
            Self::Bytes(buf) => Ok(Box::new(IterChunks(std::iter::once(Value::Bytes(buf))))),
            other => Err(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::File(_) => f.write_str("File(..)"),
            Self::Iter(_) => f.write_str("Iter(..)"),
            Self::None => f.write_str("None"),
        }
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<std::fs::File> for Value {
    fn from(file: std::fs::File) -> Self {
        Self::file(file)
    }
}

/// A file-like response body.
pub struct FileBody {
    reader: Box<dyn Read + Send>,
}

impl FileBody {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.reader.read(buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

/// A pull-based cursor over lazily produced body chunks.
pub trait Chunks: Send {
    /// Produce the next chunk, `None` once exhausted.
    fn next_chunk(&mut self, start_response: &mut StartResponse<'_>)
    -> Option<Result<Value, AppError>>;
}

struct IterChunks<I>(I);

impl<I> Chunks for IterChunks<I>
where
    I: Iterator<Item = Value> + Send,
{
    fn next_chunk(&mut self, _: &mut StartResponse<'_>) -> Option<Result<Value, AppError>> {
        self.0.next().map(Ok)
    }
}

struct TryIterChunks<I>(I);

impl<I> Chunks for TryIterChunks<I>
where
    I: Iterator<Item = Result<Value, AppError>> + Send,
{
    fn next_chunk(&mut self, _: &mut StartResponse<'_>) -> Option<Result<Value, AppError>> {
        self.0.next()
    }
}

struct FnChunks<F>(F);

impl<F> Chunks for FnChunks<F>
where
    F: FnMut(&mut StartResponse<'_>) -> Option<Result<Value, AppError>> + Send,
{
    fn next_chunk(
        &mut self,
        start_response: &mut StartResponse<'_>,
    ) -> Option<Result<Value, AppError>> {
        (self.0)(start_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ResponseHead;

    fn drain(value: Value) -> Vec<Value> {
        let mut head = ResponseHead::default();
        let mut chunks = value.into_chunks().expect("value should be iterable");
        let mut out = Vec::new();
        let mut start_response = StartResponse::new(&mut head);
        while let Some(item) = chunks.next_chunk(&mut start_response) {
            out.push(item.expect("chunk should be Ok"));
        }
        out
    }

    #[test]
    fn list_iterates_items_in_order() {
        let items = drain(Value::List(vec!["a".into(), "b".into(), Value::Int(3)]));
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], Value::Bytes(b) if b == "a"));
        assert!(matches!(&items[1], Value::Bytes(b) if b == "b"));
        assert!(matches!(items[2], Value::Int(3)));
    }

    #[test]
    fn bytes_iterate_as_one_chunk() {
        let items = drain(Value::from("whole"));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn int_and_none_are_not_iterable() {
        assert!(matches!(Value::Int(1).into_chunks(), Err(Value::Int(1))));
        assert!(matches!(Value::None.into_chunks(), Err(Value::None)));
    }

    #[test]
    fn file_is_not_iterable_as_chunks() {
        let value = Value::file(std::io::Cursor::new(b"data".to_vec()));
        assert!(matches!(value.into_chunks(), Err(Value::File(_))));
    }

    #[test]
    fn try_iter_surfaces_errors() {
        let value = Value::try_iter(vec![
            Ok(Value::from("ok")),
            Err(AppError::raise("ValueError", "bad")),
        ]);
        let mut head = ResponseHead::default();
        let mut chunks = value.into_chunks().unwrap();
        let mut start_response = StartResponse::new(&mut head);
        assert!(matches!(chunks.next_chunk(&mut start_response), Some(Ok(_))));
        assert!(matches!(chunks.next_chunk(&mut start_response), Some(Err(_))));
        assert!(chunks.next_chunk(&mut start_response).is_none());
    }

    #[test]
    fn generator_receives_status_callback() {
        let mut started = false;
        let value = Value::generator(move |start_response| {
            if !started {
                started = true;
                if let Err(e) = start_response.call("200 OK", Default::default(), None) {
                    return Some(Err(e));
                }
                return Some(Ok("first".into()));
            }
            None
        });

        let mut head = ResponseHead::default();
        let mut chunks = value.into_chunks().unwrap();
        {
            let mut start_response = StartResponse::new(&mut head);
            assert!(matches!(chunks.next_chunk(&mut start_response), Some(Ok(_))));
            assert!(chunks.next_chunk(&mut start_response).is_none());
        }
        assert_eq!(head.status().map(|s| s.as_ref()), Some(&b"200 OK"[..]));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::from("x").type_name(), "str");
        assert_eq!(Value::Int(0).type_name(), "int");
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::List(vec![]).type_name(), "list");
        assert_eq!(Value::iter(Vec::new()).type_name(), "iterator");
    }

    #[test]
    fn file_body_reads() {
        let mut body = FileBody::new(std::io::Cursor::new(b"abc".to_vec()));
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(body.read(&mut buf).unwrap(), 0);
    }
}
