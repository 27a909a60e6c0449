//! Remote fetching: URL probe and streamed, size-capped download.
//!
//! ## Why probe before download?
//!
//! The dialogue shows the user a filename and size and asks for explicit
//! confirmation before committing to a potentially multi-gigabyte
//! transfer. A metadata-only request answers three questions cheaply:
//! is the URL reachable, does it look like a PDF, and is the advertised
//! size within the download ceiling.
//!
//! ## Why re-check the size while streaming?
//!
//! Content-Length is advisory. A server can omit it or under-report it,
//! so [`Fetcher::download`] counts the bytes it actually writes and aborts
//! with [`SnipError::DownloadTooLarge`] the moment the next chunk would
//! cross the ceiling. The header check alone is never trusted.

use crate::config::ServiceConfig;
use crate::error::SnipError;
use crate::progress::ProgressCallback;
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Fallback name when neither the headers nor the URL path yield one.
const DEFAULT_FILENAME: &str = "document.pdf";

/// `filename=` parameter of a Content-Disposition header, quoted or bare.
static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="?([^";]+)"?"#).expect("static regex"));

/// What a metadata probe learned about a remote file.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub url: String,
    /// Lower-cased Content-Type, if the server sent one.
    pub content_type: Option<String>,
    /// Advertised size; `None` when the server omits Content-Length.
    pub size_bytes: Option<u64>,
    /// Derived filename, always carrying a `.pdf` suffix.
    pub suggested_filename: String,
}

impl RemoteFile {
    /// Whether either the Content-Type or the URL path suggests a PDF.
    ///
    /// A missing Content-Type is given the benefit of the doubt; a present
    /// one must contain "pdf" unless the path itself ends in `.pdf`.
    pub fn looks_like_pdf(&self) -> bool {
        let path_is_pdf = url_path(&self.url)
            .map(|p| p.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        match &self.content_type {
            Some(ct) => ct.contains("pdf") || path_is_pdf,
            None => true,
        }
    }
}

/// Check whether the input string is a well-formed http/https URL.
pub fn is_http_url(input: &str) -> bool {
    (input.starts_with("http://") || input.starts_with("https://"))
        && reqwest::Url::parse(input).is_ok()
}

/// Derive a filename from a Content-Disposition header or the URL path,
/// falling back to [`DEFAULT_FILENAME`]. A `.pdf` suffix is forced in all
/// cases so the stored name matches what the file claims to be.
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let mut name = content_disposition
        .and_then(|cd| FILENAME_RE.captures(cd))
        .map(|c| c[1].trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| {
            url_path(url).and_then(|p| {
                p.rsplit('/')
                    .next()
                    .filter(|seg| !seg.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    if !name.to_ascii_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

fn url_path(url: &str) -> Option<String> {
    reqwest::Url::parse(url).ok().map(|u| u.path().to_string())
}

/// HTTP client wrapper enforcing the service's timeouts and ceilings.
pub struct Fetcher {
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl Fetcher {
    pub fn new(config: &ServiceConfig) -> Result<Self, SnipError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()
            .map_err(|e| SnipError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }

    /// Issue a metadata-only request against `url`.
    ///
    /// # Errors
    /// [`SnipError::UnreachableUrl`] on a non-2xx response or network error.
    pub async fn probe(&self, url: &str) -> Result<RemoteFile, SnipError> {
        debug!("Probing URL: {url}");
        let response = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| SnipError::UnreachableUrl {
                url: url.to_string(),
                reason: if e.is_timeout() {
                    "probe timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        if !response.status().is_success() {
            return Err(SnipError::UnreachableUrl {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let header_str = |name: header::HeaderName| -> Option<String> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let content_type = header_str(header::CONTENT_TYPE).map(|ct| ct.to_ascii_lowercase());
        let size_bytes =
            header_str(header::CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok());
        let suggested_filename =
            derive_filename(url, header_str(header::CONTENT_DISPOSITION).as_deref());

        Ok(RemoteFile {
            url: url.to_string(),
            content_type,
            size_bytes,
            suggested_filename,
        })
    }

    /// Stream `url` to `dest`, enforcing `max_bytes` against written bytes.
    ///
    /// Progress checkpoints fire through `progress` at most every 5 % of
    /// the advertised total or every 10 seconds, whichever comes first,
    /// plus one final checkpoint at completion.
    ///
    /// # Errors
    /// * [`SnipError::DownloadTooLarge`] the moment written bytes would
    ///   exceed `max_bytes`; the partial file is left for the caller to
    ///   discard.
    /// * [`SnipError::TransferError`] on any network or disk fault,
    ///   likewise leaving a partial file behind.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        max_bytes: u64,
        progress: &dyn ProgressCallback,
    ) -> Result<u64, SnipError> {
        info!("Downloading {url} -> {}", dest.display());

        let transfer_err = |reason: String| SnipError::TransferError {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transfer_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SnipError::UnreachableUrl {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let total = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| transfer_err(format!("create {}: {e}", dest.display())))?;

        let mut written: u64 = 0;
        let mut throttle = ProgressThrottle::new(total);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transfer_err(e.to_string()))?;
            if written + chunk.len() as u64 > max_bytes {
                warn!("Aborting download of {url}: ceiling of {max_bytes} bytes reached");
                return Err(SnipError::DownloadTooLarge {
                    url: url.to_string(),
                    limit_bytes: max_bytes,
                });
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| transfer_err(format!("write {}: {e}", dest.display())))?;
            written += chunk.len() as u64;

            if throttle.checkpoint(written) {
                progress.on_download_progress(written, total);
            }
        }

        file.flush()
            .await
            .map_err(|e| transfer_err(format!("flush {}: {e}", dest.display())))?;
        progress.on_download_progress(written, total);
        info!("Downloaded {written} bytes from {url}");
        Ok(written)
    }
}

/// Rate limiter for download checkpoints: pass at every 5 % of the known
/// total, or every 10 seconds when the total is unknown or progress is
/// slow, whichever comes first.
struct ProgressThrottle {
    total: Option<u64>,
    last_bytes: u64,
    last_at: Instant,
    min_interval: Duration,
}

impl ProgressThrottle {
    fn new(total: Option<u64>) -> Self {
        Self {
            total,
            last_bytes: 0,
            last_at: Instant::now(),
            min_interval: Duration::from_secs(10),
        }
    }

    fn checkpoint(&mut self, written: u64) -> bool {
        let percent_step = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (written - self.last_bytes) as f64 / t as f64 >= 0.05)
            .unwrap_or(false);
        let time_step = self.last_at.elapsed() >= self.min_interval;

        if percent_step || time_step {
            self.last_bytes = written;
            self.last_at = Instant::now();
            true
        } else {
            false
        }
    }
}
