//! Streaming download of checkpoint files from the image servlet.

use super::progress::DownloadProgress;
use super::progress_stream::ProgressStream;
use crate::utils::FetchError;
use futures_util::StreamExt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::Duration;
use tracing::{debug, warn};

/// Characters of an error page kept for diagnostics
const MAX_BODY_EXCERPT: usize = 4096;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Downloads one URL to one local file. No retries.
pub struct Fetcher {
    client: reqwest::Client,
    chunk_size: usize,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// GET `url` and stream the body into `destination`, returning the byte count.
    ///
    /// The destination is only created once the server answered 2xx, and is
    /// removed again if the body stream breaks off.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            // NameNode error pages usually explain the rejection
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::RemoteRejected {
                status: status.as_u16(),
                body_excerpt: excerpt(&body),
            });
        }

        let mut progress = DownloadProgress::new(response.content_length());
        let label = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut stream = ProgressStream::new(
            Box::pin(response.bytes_stream()),
            PROGRESS_INTERVAL,
            Box::new(move |n| {
                progress.update(n);
                debug!("{}: {}", label, progress.describe());
            }),
        );

        let write_err = |source| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        };

        let file = File::create(destination).await.map_err(write_err)?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);

        let result: Result<u64, FetchError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                writer.write_all(&chunk).await.map_err(write_err)?;
            }
            writer.flush().await.map_err(write_err)?;
            writer.get_ref().sync_all().await.map_err(write_err)?;
            Ok(stream.bytes_transferred())
        }
        .await;

        if result.is_err() {
            drop(writer);
            if let Err(e) = tokio::fs::remove_file(destination).await {
                warn!("Failed to remove partial download {}: {}", destination.display(), e);
            }
        }

        result
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(MAX_BODY_EXCERPT).collect()
}
