//! Archive downloads over HTTP.
//!
//! [`Fetch`] is the seam the install orchestrator downloads through, so the
//! mirror fallback can be exercised without a network. [`HttpFetcher`] is the
//! real implementation:
//!
//! - Streaming downloads, progress reported through `tracing`
//! - Automatic retry with exponential backoff (3 attempts per URL)
//! - Downloads to a temporary file, then renames on success
//! - Optional proxy and TLS verification bypass from [`Settings`]

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::config::Settings;

/// Downloads one URL to a local file.
pub trait Fetch {
    /// Fetches `url` into `dest`, replacing any existing file.
    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<()>>;
}

/// Maximum number of download retry attempts.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Minimum interval between progress log lines in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 2000;

/// [`Fetch`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds the HTTP client from the user's proxy and TLS settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the client cannot be
    /// built.
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .with_context(|| format!("Invalid proxy URL: {proxy}"))?;
            builder = builder.proxy(proxy);
        }
        if settings.insecure_skip_verify {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let temp_path = dest.with_extension("tmp");

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = calculate_retry_delay(attempt);
                debug!("retrying {url} (attempt {}/{MAX_RETRIES})", attempt + 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.download_once(url, &temp_path).await {
                Ok(()) => {
                    tokio::fs::rename(&temp_path, dest).await.with_context(|| {
                        format!(
                            "Failed to rename {} to {}",
                            temp_path.display(),
                            dest.display()
                        )
                    })?;
                    return Ok(());
                }
                Err(e) => {
                    debug!("download attempt failed: {e:#}");
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    let permanent = is_permanent(&e);
                    last_error = Some(e);
                    if permanent {
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Download failed after {MAX_RETRIES} attempts")))
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpStatus(status.as_u16())).with_context(|| format!("GET {url}"));
        }

        let total_size = response.content_length().unwrap_or(0);
        info!("downloading {url} ({})", format_bytes(total_size));

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start_time = Instant::now();
        let mut last_update = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Failed to read chunk from {url}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write to {}", dest.display()))?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
                debug!(
                    "{}/{} at {}",
                    format_bytes(downloaded),
                    format_bytes(total_size),
                    format_speed(downloaded, start_time.elapsed().as_secs_f64())
                );
                last_update = now;
            }
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", dest.display()))?;

        debug!(
            "downloaded {} in {:.1}s",
            format_bytes(downloaded),
            start_time.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.download(url, dest))
    }
}

/// Non-success HTTP status.
#[derive(Debug, thiserror::Error)]
#[error("HTTP error {0}")]
struct HttpStatus(u16);

/// Client errors other than throttling will not change on retry.
fn is_permanent(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<HttpStatus>()
        .is_some_and(|HttpStatus(code)| (400..500).contains(code) && *code != 429)
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_speed(downloaded: u64, elapsed_secs: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

/// Calculates the retry delay with exponential backoff and jitter.
///
/// The delay doubles with each attempt (1s, 2s, 4s) with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::config::ConfigFile;

    fn settings(file: ConfigFile) -> Settings {
        Settings::resolve(file, Path::new("/home/u"), None).unwrap()
    }

    #[test]
    fn retry_delay_increases_exponentially() {
        let delay_0 = calculate_retry_delay(0);
        let delay_1 = calculate_retry_delay(1);
        let delay_2 = calculate_retry_delay(2);

        assert!((750..=1250).contains(&delay_0));
        assert!((1500..=2500).contains(&delay_1));
        assert!((3000..=5000).contains(&delay_2));
    }

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn format_speed_handles_zero_elapsed() {
        assert_eq!(format_speed(1000, 0.0), "0 B/s");
        assert_eq!(format_speed(2048, 1.0), "2.00 KB/s");
    }

    #[test]
    fn not_found_is_permanent() {
        let err = anyhow::Error::new(HttpStatus(404)).context("GET x");
        assert!(is_permanent(&err));
    }

    #[test]
    fn server_errors_and_throttling_are_retried() {
        assert!(!is_permanent(&anyhow::Error::new(HttpStatus(503))));
        assert!(!is_permanent(&anyhow::Error::new(HttpStatus(429))));
        assert!(!is_permanent(&anyhow::anyhow!("connection reset")));
    }

    #[test]
    fn fetcher_builds_with_proxy_and_insecure_tls() {
        let fetcher = HttpFetcher::new(&settings(ConfigFile {
            proxy: Some("http://127.0.0.1:3128".into()),
            insecure_skip_verify: Some(true),
            ..ConfigFile::default()
        }));
        assert!(fetcher.is_ok());
    }

    #[test]
    fn fetcher_rejects_invalid_proxy() {
        let fetcher = HttpFetcher::new(&settings(ConfigFile {
            proxy: Some("http://[::1".into()),
            ..ConfigFile::default()
        }));
        assert!(fetcher.is_err());
    }
}
