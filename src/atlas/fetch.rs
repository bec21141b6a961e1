//! Asset retrieval behind a small async trait

use futures::future::LocalBoxFuture;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Error when an asset cannot be retrieved.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// Nothing exists at this location
    #[error("asset not found: {0}")]
    NotFound(String),
    /// Local read failed
    #[error("failed to read '{url}': {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    /// Remote request failed
    #[error("request for '{url}' failed: {message}")]
    Http { url: String, message: String },
}

/// Retrieves raw asset bytes by URL.
///
/// Implementations must not block; the returned future is polled on the host's
/// single thread.
pub trait AssetFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// In-memory asset store, mostly for tests and embedding pre-bundled assets.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    files: RefCell<HashMap<String, Vec<u8>>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(url.into(), bytes.into());
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            self.requests.borrow_mut().push(url.to_string());
            self.files.borrow().get(url).cloned().ok_or_else(|| FetchError::NotFound(url.to_string()))
        })
    }
}

/// Reads assets from the local filesystem.
///
/// Accepts plain paths and `file://` URLs; relative paths resolve against `root`.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        }
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let path = self.resolve(url);
            trace!("reading {}", path.display());
            smol::fs::read(&path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FetchError::NotFound(url.to_string()),
                _ => FetchError::Io { url: url.to_string(), source: e },
            })
        })
    }
}

/// Fetches assets over HTTP(S). Requires a tokio reactor.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "http")]
impl AssetFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let http_err = |e: reqwest::Error| FetchError::Http { url: url.to_string(), message: e.to_string() };
            let response = self.client.get(url).send().await.map_err(http_err)?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound(url.to_string()));
            }
            let response = response.error_for_status().map_err(http_err)?;
            let bytes = response.bytes().await.map_err(http_err)?;
            Ok(bytes.to_vec())
        })
    }
}

/// Resolve `relative` against `base` (a directory URL or path).
///
/// Absolute URLs pass through; root-relative paths keep the base's origin.
pub fn join_url(base: &str, relative: &str) -> String {
    if relative.contains("://") {
        return relative.to_string();
    }
    if let Some(rest) = relative.strip_prefix('/') {
        return match origin(base) {
            Some(origin) => format!("{}/{}", origin, rest),
            None => relative.to_string(),
        };
    }
    let relative = relative.trim_start_matches("./");
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", base, relative)
    }
}

/// Directory part of a URL or path (everything before the last `/`).
pub fn parent_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rfind('/') {
        // keep "scheme://host" intact
        Some(i) if path[..i].ends_with(":/") => path,
        Some(i) => &path[..i],
        None => "",
    }
}

/// `scheme://host[:port]` of a URL.
fn origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..].find('/').map(|i| scheme_end + i).unwrap_or(url.len());
    Some(&url[..host_end])
}
