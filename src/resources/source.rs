//! Where asset bytes come from.
//!
//! The loader only ever speaks to an [`AssetSource`]. Native builds read from
//! the file system with `tokio::fs`, the web build fetches relative to the
//! page origin with `reqwest`.

use std::{future::Future, pin::Pin};

use crate::resources::loader::{AssetLoadError, Progress};

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, AssetLoadError>> + 'a>>;

pub trait AssetSource {
    /// Fetch the whole file at `path`, reporting bytes received so far.
    fn fetch<'a>(&'a self, path: &'a str, on_progress: &'a mut dyn FnMut(Progress)) -> FetchFuture<'a>;
}

/// Resolve a URI found inside an asset against the asset's base path.
///
/// Relative URIs are joined onto `base` and `%XX` escapes are decoded.
/// Embedded `data:` URIs are not supported.
pub fn resolve(base: &str, uri: &str) -> Result<String, AssetLoadError> {
    if uri.starts_with("data:") {
        return Err(AssetLoadError::UnsupportedUri {
            uri: uri.chars().take(32).collect(),
        });
    }
    let decoded = percent_decode(uri);
    if decoded.contains("://") || decoded.starts_with('/') || base.is_empty() {
        return Ok(decoded);
    }
    if base.ends_with('/') {
        Ok(format!("{base}{decoded}"))
    } else {
        Ok(format!("{base}/{decoded}"))
    }
}

fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::FileSource;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use tokio::io::AsyncReadExt;

    use super::{AssetSource, FetchFuture};
    use crate::resources::loader::{AssetLoadError, Progress};

    const CHUNK_SIZE: usize = 64 * 1024;

    /// Reads assets from the local file system.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct FileSource;

    impl AssetSource for FileSource {
        fn fetch<'a>(&'a self, path: &'a str, on_progress: &'a mut dyn FnMut(Progress)) -> FetchFuture<'a> {
            Box::pin(async move {
                let io_err = |source: std::io::Error| {
                    if source.kind() == std::io::ErrorKind::NotFound {
                        AssetLoadError::NotFound { path: path.to_string() }
                    } else {
                        AssetLoadError::Io {
                            path: path.to_string(),
                            source,
                        }
                    }
                };
                let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
                let total = file.metadata().await.map_err(io_err)?.len();
                let mut data = Vec::with_capacity(total as usize);
                let mut chunk = vec![0u8; CHUNK_SIZE];
                on_progress(Progress::new(0, Some(total)));
                loop {
                    let read = file.read(&mut chunk).await.map_err(io_err)?;
                    if read == 0 {
                        break;
                    }
                    data.extend_from_slice(&chunk[..read]);
                    on_progress(Progress::new(data.len() as u64, Some(total)));
                }
                Ok::<_, AssetLoadError>(data)
            })
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::HttpSource;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::{AssetSource, FetchFuture};
    use crate::resources::loader::{AssetLoadError, Progress};

    /// Fetches assets over HTTP, relative to the page origin.
    #[derive(Clone, Debug, Default)]
    pub struct HttpSource;

    fn format_url(path: &str) -> Result<reqwest::Url, AssetLoadError> {
        let fetch_err = |reason: String| AssetLoadError::Fetch {
            path: path.to_string(),
            reason,
        };
        let origin = web_sys::window()
            .ok_or_else(|| fetch_err("no window".to_string()))?
            .location()
            .origin()
            .map_err(|_| fetch_err("no page origin".to_string()))?;
        let base = reqwest::Url::parse(&format!("{origin}/")).map_err(|e| fetch_err(e.to_string()))?;
        base.join(path).map_err(|e| fetch_err(e.to_string()))
    }

    impl AssetSource for HttpSource {
        fn fetch<'a>(&'a self, path: &'a str, on_progress: &'a mut dyn FnMut(Progress)) -> FetchFuture<'a> {
            Box::pin(async move {
                let fetch_err = |e: reqwest::Error| AssetLoadError::Fetch {
                    path: path.to_string(),
                    reason: e.to_string(),
                };
                let url = format_url(path)?;
                let response = reqwest::get(url).await.map_err(fetch_err)?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(AssetLoadError::NotFound { path: path.to_string() });
                }
                let response = response.error_for_status().map_err(fetch_err)?;
                let total = response.content_length();
                on_progress(Progress::new(0, total));
                let data = response.bytes().await.map_err(fetch_err)?.to_vec();
                on_progress(Progress::new(data.len() as u64, total));
                Ok::<_, AssetLoadError>(data)
            })
        }
    }
}
