//! Payload sources with exponential backoff retry logic.
//!
//! The CMS payload comes either from the external webhook or from a JSON
//! file saved earlier. Both implement [`PayloadSource`]; [`RetrySource`]
//! decorates any source with retries, and [`load_payload`] keeps a copy of
//! the last good payload so a flaky webhook does not break a build.
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use rand::{Rng, rng};
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, Instant};
use tokio::fs;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::utils::{looks_truncated, truncate_for_log};

/// Something that yields the raw CMS payload.
pub trait PayloadSource {
    /// Fetch and parse the payload.
    async fn fetch(&self) -> Result<Value, Box<dyn Error>>;
}

/// Reads the payload from a JSON file.
#[derive(Debug)]
pub struct FileSource {
    pub path: PathBuf,
}

impl PayloadSource for FileSource {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn fetch(&self) -> Result<Value, Box<dyn Error>> {
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("cannot read {}: {e}", self.path.display()))?;
        let value = serde_json::from_str(&raw)?;
        info!(bytes = raw.len(), "Read payload file");
        Ok(value)
    }
}

/// GETs the payload from the CMS webhook.
#[derive(Debug)]
pub struct WebhookSource {
    url: Url,
    client: reqwest::Client,
}

impl WebhookSource {
    /// Build a webhook source.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the CMS webhook
    /// * `timeout` - Per-request timeout, covering connect and body read
    ///
    /// # Returns
    ///
    /// An error if `url` does not parse or the HTTP client cannot be built.
    pub fn new(url: &str, timeout: StdDuration) -> Result<Self, Box<dyn Error>> {
        let url = Url::parse(url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { url, client })
    }
}

impl PayloadSource for WebhookSource {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<Value, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let dt = t0.elapsed();

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => {
                info!(elapsed_ms = dt.as_millis(), bytes = body.len(), "Fetched webhook payload");
                Ok(value)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    truncated = looks_truncated(&e),
                    body_preview = %truncate_for_log(&body, 300),
                    "Webhook returned invalid JSON"
                );
                Err(e.into())
            }
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PayloadSource`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetrySource<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetrySource<T>
where
    T: PayloadSource,
{
    /// Wrap `inner` with retries. The delay cap is fixed at 30 seconds.
    ///
    /// # Arguments
    ///
    /// * `inner` - The source to retry
    /// * `max_retries` - Retries after the first attempt (0 disables retrying)
    /// * `base_delay` - Delay before the first retry
    ///
    /// # Example
    ///
    /// ```ignore
    /// let webhook = WebhookSource::new(url, Duration::from_secs(30))?;
    /// let source = RetrySource::new(webhook, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetrySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySource")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PayloadSource for RetrySource<T>
where
    T: PayloadSource,
{
    #[instrument(level = "info", skip_all)]
    async fn fetch(&self) -> Result<Value, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Fetch the payload, keeping the cache file in sync.
///
/// On success the payload is written to `cache` (a failed cache write only
/// logs). On failure the cached payload is used if there is one.
///
/// # Arguments
///
/// * `source` - Where the payload comes from, usually a [`RetrySource`]
/// * `cache` - Path of the payload cache file, or `None` to skip caching
///
/// # Returns
///
/// The fresh payload, the cached one when the source fails, or the source's
/// error when there is no readable cache.
///
/// # Example
///
/// ```ignore
/// let source = FileSource { path: "posts.json".into() };
/// let payload = load_payload(&source, Some(Path::new(".cache/payload.json"))).await?;
/// ```
#[instrument(level = "info", skip_all, fields(cache = ?cache))]
pub async fn load_payload<S: PayloadSource>(
    source: &S,
    cache: Option<&Path>,
) -> Result<Value, Box<dyn Error>> {
    match source.fetch().await {
        Ok(value) => {
            if let Some(cache) = cache {
                if let Err(e) = write_cache(cache, &value).await {
                    warn!(path = %cache.display(), error = %e, "Failed to update payload cache");
                }
            }
            Ok(value)
        }
        Err(e) => {
            let Some(cache) = cache.filter(|p| p.exists()) else {
                return Err(e);
            };
            warn!(error = %e, path = %cache.display(), "Source failed; using cached payload");
            FileSource {
                path: cache.to_path_buf(),
            }
            .fetch()
            .await
        }
    }
}

async fn write_cache(path: &Path, value: &Value) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?).await?;
    info!(path = %path.display(), "Updated payload cache");
    Ok(())
}
