//! Site configuration.
//!
//! Loaded from an optional YAML file, then overridden by CLI flags. Every key
//! has a default, so an empty file (or no file) yields a working config for
//! the production site.
//!
//! ```yaml
//! site:
//!   name: Curioso
//!   base_url: https://seommerce.shop
//!   default_language: pt
//!   languages: [pt, en, es]
//!   posts_per_page: 12
//! source:
//!   webhook_url: https://hooks.example.com/posts
//!   max_retries: 4
//! assets:
//!   script: /assets/index.js
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::cli::Cli;
use crate::models::Lang;
use crate::normalize::NormalizeOptions;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub source: SourceConfig,
    pub assets: AssetsConfig,
}

/// `site:` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Public origin, without trailing slash once validated.
    pub base_url: String,
    pub default_language: Lang,
    pub languages: Vec<Lang>,
    /// Serve the default language under `/{code}` too.
    pub prefix_default_language: bool,
    pub posts_per_page: usize,
    pub include_drafts: bool,
    /// Home page meta description per language.
    pub descriptions: BTreeMap<Lang, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let descriptions = BTreeMap::from([
            (Lang::Pt, "Curiosidades, ciência e cultura explicadas sem complicação.".to_string()),
            (Lang::En, "Curiosities, science and culture explained simply.".to_string()),
            (Lang::Es, "Curiosidades, ciencia y cultura explicadas sin complicaciones.".to_string()),
        ]);
        Self {
            name: "Curioso".to_string(),
            base_url: "https://seommerce.shop".to_string(),
            default_language: Lang::Pt,
            languages: Lang::ALL.to_vec(),
            prefix_default_language: false,
            posts_per_page: 12,
            include_drafts: false,
            descriptions,
        }
    }
}

impl SiteConfig {
    /// Absolute URL for a site path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Home meta description for `lang`, falling back to the default language.
    pub fn description(&self, lang: Lang) -> Option<&str> {
        self.descriptions
            .get(&lang)
            .or_else(|| self.descriptions.get(&self.default_language))
            .map(String::as_str)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            default_lang: self.default_language,
            languages: self.languages.clone(),
        }
    }
}

/// `source:` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    /// Where the last good payload is kept, relative to the working
    /// directory. Keep it outside the output directory so it is not deployed.
    pub cache_file: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 20,
            max_retries: 4,
            cache_file: Some(PathBuf::from(".cache/payload.json")),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `assets:` section: the SPA bundle the pre-rendered pages load.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub script: String,
    pub stylesheet: Option<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            script: "/assets/index.js".to_string(),
            stylesheet: Some("/assets/index.css".to_string()),
        }
    }
}

impl Config {
    /// Load the config file, or defaults when no path is given.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        info!("Loaded configuration");
        Ok(config)
    }

    /// Apply CLI overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.webhook_url {
            self.source.webhook_url = Some(url.clone());
        }
        if let Some(base) = &cli.base_url {
            self.site.base_url = base.clone();
        }
        if cli.include_drafts {
            self.site.include_drafts = true;
        }
    }

    /// Check invariants and tidy values: base URL without trailing slash,
    /// languages deduplicated in [`Lang`] order.
    pub fn validate(&mut self) -> Result<(), Box<dyn Error>> {
        let base = Url::parse(&self.site.base_url)
            .map_err(|e| format!("site.base_url {:?} is not a URL: {e}", self.site.base_url))?;
        if !matches!(base.scheme(), "http" | "https") || base.host().is_none() {
            return Err(format!("site.base_url {:?} must be an http(s) URL", self.site.base_url).into());
        }
        self.site.base_url = self.site.base_url.trim_end_matches('/').to_string();

        self.site.languages.sort();
        self.site.languages.dedup();
        if self.site.languages.is_empty() {
            return Err("site.languages must list at least one language".into());
        }
        if !self.site.languages.contains(&self.site.default_language) {
            return Err(format!(
                "site.default_language {} is not among site.languages",
                self.site.default_language
            )
            .into());
        }
        if self.site.posts_per_page == 0 {
            return Err("site.posts_per_page must be at least 1".into());
        }
        if let Some(url) = &self.source.webhook_url {
            Url::parse(url).map_err(|e| format!("source.webhook_url {url:?} is not a URL: {e}"))?;
        }
        Ok(())
    }
}
