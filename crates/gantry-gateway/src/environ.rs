use std::collections::BTreeMap;

/// Request metadata handed to the application.
///
/// Keys follow the CGI convention: `REQUEST_METHOD`, `PATH_INFO`,
/// `QUERY_STRING`, `SERVER_PROTOCOL`, `REMOTE_ADDR`, and one
/// `HTTP_<NAME>` entry per request header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environ {
    vars: BTreeMap<String, String>,
}

impl Environ {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Add a request header under its CGI key.
    ///
    /// Repeated headers are joined with `,`.
    pub fn insert_header(&mut self, name: &str, value: &str) {
        let key = cgi_key(name);
        match self.vars.get_mut(&key) {
            Some(existing) => {
                existing.push(',');
                existing.push_str(value);
            }
            None => {
                self.vars.insert(key, value.to_string());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn cgi_key(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase().replace('-', "_");
    match upper.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => upper,
        _ => format!("HTTP_{upper}"),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environ {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
