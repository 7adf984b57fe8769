use futures::StreamExt;
use reqwest::{Client, ClientBuilder};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{FetchError, MirrorError};
use crate::progress::{FileProgress, ProgressSink};

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    /// `None` leaves the client's own default in place.
    pub timeout: Option<Duration>,
    pub chunk_size: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: "PageMirror/1.0".to_string(),
            timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Plain and streaming HTTP GETs.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    chunk_size: usize,
}

impl PageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, MirrorError> {
        let mut builder = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(MirrorError::Client)?;

        Ok(Self {
            client,
            chunk_size: settings.chunk_size.max(1),
        })
    }

    /// Fetches a page or stylesheet body as text.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// Streams `url` into `destination`, reporting after every chunk.
    ///
    /// Returns `false` on any failure or when `cancel` fires. A cancelled or
    /// failed download leaves whatever was already written on disk.
    pub async fn download(
        &self,
        url: &Url,
        destination: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> bool {
        match self.try_download(url, destination, sink, cancel).await {
            Ok(bytes) => {
                log::info!("downloaded {} ({} bytes)", url, bytes);
                true
            }
            Err(FetchError::Cancelled { .. }) => {
                log::info!("download of {} cancelled", url);
                false
            }
            Err(e) => {
                log::warn!("error downloading {}: {}", url, e);
                false
            }
        }
    }

    async fn try_download(
        &self,
        url: &Url,
        destination: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().unwrap_or(0);
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let io_error = |source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = File::create(destination).await.map_err(io_error)?;
        let mut downloaded: u64 = 0;
        sink.on_file_progress(FileProgress {
            downloaded_bytes: downloaded,
            total_bytes,
            name: name.clone(),
        });

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

            for piece in chunk.chunks(self.chunk_size) {
                if cancel.is_cancelled() {
                    file.flush().await.map_err(io_error)?;
                    return Err(FetchError::Cancelled {
                        url: url.to_string(),
                    });
                }
                file.write_all(piece).await.map_err(io_error)?;
                downloaded += piece.len() as u64;
                sink.on_file_progress(FileProgress {
                    downloaded_bytes: downloaded,
                    total_bytes,
                    name: name.clone(),
                });
            }
        }

        file.flush().await.map_err(io_error)?;
        Ok(downloaded)
    }
}
