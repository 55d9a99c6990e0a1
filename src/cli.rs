//! Command-line interface definitions for the Curioso site generator.
//!
//! Every option except the output directory can also come from the YAML
//! config file; values given here win.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Build from the live webhook
/// curioso_ssg -o ./dist --webhook-url https://hooks.example.com/posts
///
/// # Build from a saved payload with a config file
/// curioso_ssg -o ./dist -c site.yaml -i payload.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the generated site
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read the CMS payload from a JSON file instead of the webhook
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Webhook URL returning the CMS posts payload
    #[arg(long, env = "CURIOSO_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Public base URL of the site, used for canonical links and the sitemap
    #[arg(long, env = "SITE_URL")]
    pub base_url: Option<String>,

    /// Also publish posts marked as drafts
    #[arg(long)]
    pub include_drafts: bool,
}
