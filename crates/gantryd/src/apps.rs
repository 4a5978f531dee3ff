//! Built-in demo applications, one per body shape.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use gantry_gateway::{AppError, Application, Environ, HeaderList, StartResponse, Value, app_fn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AppKind {
    /// A fixed greeting, returned as a list holding one string.
    Hello,
    /// A generator that reports its status on the first pull.
    Stream,
    /// Files under `--root`, returned as file handles.
    File,
    /// The request environ, one line per variable.
    Environ,
}

/// Build the selected application.
pub fn build(kind: AppKind, root: &Path) -> Arc<dyn Application> {
    match kind {
        AppKind::Hello => Arc::new(hello()),
        AppKind::Stream => Arc::new(stream(64)),
        AppKind::File => Arc::new(FileApp {
            root: root.to_path_buf(),
        }),
        AppKind::Environ => Arc::new(environ()),
    }
}

fn text_headers(len: usize) -> HeaderList {
    let mut headers = HeaderList::new();
    headers.insert("Content-Type", "text/plain; charset=utf-8");
    headers.insert("Content-Length", len.to_string());
    headers.insert("Connection", "close");
    headers
}

pub fn hello() -> impl Application {
    app_fn(|_, start_response| {
        let body = "Hello, World!\n";
        start_response.call("200 OK", text_headers(body.len()), None)?;
        Ok(Value::List(vec![body.into()]))
    })
}

/// Streams `lines` numbered lines, reporting the status lazily.
pub fn stream(lines: usize) -> impl Application {
    app_fn(move |_, _| {
        let mut next = 0;
        Ok(Value::generator(move |start_response| {
            if next == 0 {
                let mut headers = HeaderList::new();
                headers.insert("Content-Type", "text/plain; charset=utf-8");
                headers.insert("Connection", "close");
                if let Err(e) = start_response.call("200 OK", headers, None) {
                    return Some(Err(e));
                }
            }
            if next == lines {
                return None;
            }
            next += 1;
            Some(Ok(Value::from(format!("line {next} of {lines}\n"))))
        }))
    })
}

pub fn environ() -> impl Application {
    app_fn(|environ, start_response| {
        let lines: Vec<Value> = environ
            .iter()
            .map(|(k, v)| Value::from(format!("{k}={v}\n")))
            .collect();
        let mut headers = HeaderList::new();
        headers.insert("Content-Type", "text/plain; charset=utf-8");
        headers.insert("Connection", "close");
        start_response.call("200 OK", headers, None)?;
        Ok(Value::iter(lines))
    })
}

/// Serves files below a root directory.
pub struct FileApp {
    root: PathBuf,
}

impl FileApp {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path_info: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(path_info.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }
}

impl Application for FileApp {
    fn call(
        &self,
        environ: &Environ,
        start_response: &mut StartResponse<'_>,
    ) -> Result<Value, AppError> {
        let path_info = environ.get("PATH_INFO").unwrap_or("/");
        let file = self
            .resolve(path_info)
            .filter(|p| p.is_file())
            .and_then(|p| std::fs::File::open(p).ok());

        let Some(file) = file else {
            let body = "Not Found\n";
            start_response.call("404 Not Found", text_headers(body.len()), None)?;
            return Ok(body.into());
        };

        let len = file.metadata()?.len();
        let mut headers = HeaderList::new();
        headers.insert("Content-Type", "application/octet-stream");
        headers.insert("Content-Length", len.to_string());
        headers.insert("Connection", "close");
        start_response.call("200 OK", headers, None)?;
        Ok(Value::from(file))
    }
}
