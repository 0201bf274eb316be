//! Archive fetchers.
//!
//! A fetcher turns a shape's resource locator into raw archive bytes. The
//! loader never looks at transport details beyond [`FetchError`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Boxed future usable behind `dyn ArchiveFetcher`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status(u16),
    Transport(reqwest::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status(status) => write!(f, "HTTP status {status}"),
            FetchError::Transport(err) => write!(f, "transport error: {err}"),
            FetchError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Status(_) => None,
            FetchError::Transport(err) => Some(err),
            FetchError::Io(err) => Some(err),
        }
    }
}

pub trait ArchiveFetcher: Send + Sync {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// Reads archives from a local directory tree.
#[derive(Debug, Clone)]
pub struct FilesystemFetcher {
    root: PathBuf,
}

impl FilesystemFetcher {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, resource: &str) -> PathBuf {
        self.root.join(resource.trim_start_matches('/'))
    }
}

impl ArchiveFetcher for FilesystemFetcher {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        let path = self.path_for(resource);
        Box::pin(async move { tokio::fs::read(&path).await.map_err(FetchError::Io) })
    }
}

/// Fetches archives relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url_for(&self, resource: &str) -> String {
        if resource.starts_with("http://") || resource.starts_with("https://") {
            return resource.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let resource = resource.trim_start_matches('/');
        if base.is_empty() {
            format!("/{resource}")
        } else {
            format!("{base}/{resource}")
        }
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        let url = self.url_for(resource);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(FetchError::Transport)?;
            if !resp.status().is_success() {
                return Err(FetchError::Status(resp.status().as_u16()));
            }
            let bytes = resp.bytes().await.map_err(FetchError::Transport)?;
            Ok(bytes.to_vec())
        })
    }
}

/// Picks the fetcher from the data root: URLs go over HTTP, anything else is
/// a local directory.
pub fn fetcher_for_root(root: &str) -> Box<dyn ArchiveFetcher> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Box::new(HttpFetcher::new(root))
    } else {
        Box::new(FilesystemFetcher::new(root))
    }
}
