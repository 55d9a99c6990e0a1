//! # Curioso SSG
//!
//! Static site generator for the Curioso multilingual blog (pt/en/es). Posts
//! come from an external no-code CMS webhook whose payload shape is loose and
//! inconsistently keyed; this binary normalizes it into canonical posts and
//! pre-renders every localized route, the SPA data files and the sitemap.
//!
//! ## Usage
//!
//! ```sh
//! curioso_ssg -o ./dist --webhook-url https://hooks.example.com/posts
//! curioso_ssg -o ./dist -c site.yaml -i payload.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Source**: Fetch the payload from the webhook (with retries and a
//!    cached fallback) or read it from a file
//! 2. **Normalize**: Map heterogeneous records into [`models::Post`]s and
//!    resolve their translations
//! 3. **Routes**: Generate every localized page with its hreflang alternates
//! 4. **Output**: Write HTML pages, JSON data files, sitemap and robots.txt

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod models;
mod normalize;
mod outputs;
mod routes;
mod source;
mod utils;

use cli::Cli;
use config::Config;
use normalize::normalize_posts;
use outputs::html::{self, PageContext};
use outputs::{json, sitemap};
use routes::generate_routes;
use source::{FileSource, RetrySource, WebhookSource, load_payload};
use utils::ensure_writable_dir;

/// Delay before the first webhook retry; doubles on each attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("curioso_ssg starting up");

    // Parse CLI and merge config
    let args = Cli::parse();
    debug!(?args.output_dir, ?args.config, ?args.input, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_cli(&args);
    config.validate()?;
    info!(
        base_url = %config.site.base_url,
        default_language = %config.site.default_language,
        languages = ?config.site.languages,
        include_drafts = config.site.include_drafts,
        "Configuration ready"
    );

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Payload ----
    let payload = match (&args.input, &config.source.webhook_url) {
        (Some(path), _) => load_payload(&FileSource { path: path.clone() }, None).await?,
        (None, Some(url)) => {
            let webhook = WebhookSource::new(url, config.source.timeout())?;
            let source = RetrySource::new(webhook, config.source.max_retries, RETRY_BASE_DELAY);
            load_payload(&source, config.source.cache_file.as_deref()).await?
        }
        (None, None) => {
            error!("No payload source configured");
            return Err("pass --input or set a webhook URL (--webhook-url, CURIOSO_WEBHOOK_URL or source.webhook_url)".into());
        }
    };

    // ---- Normalize ----
    let posts = normalize_posts(&payload, &config.site.normalize_options());
    if posts.is_empty() {
        warn!("Payload produced no posts; generating an empty site");
    }

    // ---- Routes and pages ----
    let routes = generate_routes(&posts, &config.site);
    let ctx = PageContext::new(&config, &posts);
    let pages = html::write_pages(&routes, &ctx, &args.output_dir).await?;

    let data_files = match json::write_data_files(&posts, &config.site, &args.output_dir).await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "Failed to write JSON data files");
            0
        }
    };

    let sitemap_urls = sitemap::write_sitemap(&routes, &config.site, &args.output_dir).await?;
    if let Err(e) = sitemap::write_robots(&config.site, &args.output_dir).await {
        error!(error = %e, "Failed to write robots.txt");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        posts = posts.len(),
        pages,
        data_files,
        sitemap_urls,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
