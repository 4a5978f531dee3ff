use bytes::Bytes;

/// One response header entry as reported by the application.
///
/// Normally a `(name, value)` pair. The arity is not checked when the
/// application reports it; the serializer rejects entries with fewer than
/// two items and ignores items past the second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTuple {
    items: Vec<Bytes>,
}

impl HeaderTuple {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            items: vec![name.into(), value.into()],
        }
    }

    /// Build an entry of arbitrary arity.
    pub fn from_items<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn name(&self) -> Option<&Bytes> {
        self.items.first()
    }

    pub fn value(&self) -> Option<&Bytes> {
        self.items.get(1)
    }
}

impl<N: Into<Bytes>, V: Into<Bytes>> From<(N, V)> for HeaderTuple {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// An ordered list of response headers.
///
/// Preserves insertion order and supports duplicate header names
/// (e.g., multiple `Set-Cookie` headers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<HeaderTuple>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.entries.push(HeaderTuple::new(name, value));
    }

    pub fn push(&mut self, entry: HeaderTuple) {
        self.entries.push(entry);
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|h| h.name().is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes())))
            .and_then(|h| h.value())
            .map(|v| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderTuple> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Into<HeaderTuple>> FromIterator<T> for HeaderList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_tuple_new() {
        let h = HeaderTuple::new("Content-Type", "application/json");
        assert_eq!(h.len(), 2);
        assert_eq!(h.name().unwrap().as_ref(), b"Content-Type");
        assert_eq!(h.value().unwrap().as_ref(), b"application/json");
    }

    #[test]
    fn header_tuple_short() {
        let h = HeaderTuple::from_items(["X-Only-Name"]);
        assert_eq!(h.len(), 1);
        assert!(h.value().is_none());
    }

    #[test]
    fn header_list_insert_and_get() {
        let mut list = HeaderList::new();
        list.insert("Content-Type", "text/html");
        assert_eq!(list.get("content-type"), Some(&b"text/html"[..]));
        assert_eq!(list.get("X-Missing"), None);
    }

    #[test]
    fn header_list_keeps_duplicates_in_order() {
        let mut list = HeaderList::new();
        list.insert("Set-Cookie", "a=1");
        list.insert("Set-Cookie", "b=2");

        assert_eq!(list.get("set-cookie"), Some(&b"a=1"[..]));
        let values: Vec<&[u8]> = list
            .iter()
            .filter_map(|h| h.value())
            .map(|v| v.as_ref())
            .collect();
        assert_eq!(values, vec![&b"a=1"[..], &b"b=2"[..]]);
    }

    #[test]
    fn header_list_from_pairs() {
        let list: HeaderList = [("Host", "example.com"), ("Accept", "*/*")]
            .into_iter()
            .collect();

        assert_eq!(list.len(), 2);
        assert!(!list.is_empty());
        assert_eq!(list.get("host"), Some(&b"example.com"[..]));
    }
}
