//! JSON data files for the SPA and the admin UI.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/api/
//! ├── posts.json              # every visible post, all languages
//! ├── index.json              # editor listing, one row per post
//! └── {lang}/
//!     ├── posts.json          # summaries, newest first
//!     └── posts/{slug}.json   # one localized post
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::config::SiteConfig;
use crate::models::{Lang, Post, PostContent, PostSummary, Taxonomy};

/// A post as seen from one language, with the slugs of its other versions.
#[derive(Debug, Serialize)]
pub struct LocalizedPost<'a> {
    pub id: &'a str,
    pub lang: Lang,
    #[serde(flatten)]
    pub content: &'a PostContent,
    pub category: Option<&'a Taxonomy>,
    pub tags: &'a [Taxonomy],
    pub cover_image: Option<&'a str>,
    pub author: Option<&'a str>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub featured: bool,
    /// Slug per language the post is available in.
    pub alternates: BTreeMap<Lang, &'a str>,
}

impl<'a> LocalizedPost<'a> {
    pub fn new(post: &'a Post, lang: Lang) -> Option<Self> {
        let content = post.content(lang)?;
        Some(Self {
            id: &post.id,
            lang,
            content,
            category: post.category.as_ref(),
            tags: &post.tags,
            cover_image: post.cover_image.as_deref(),
            author: post.author.as_deref(),
            published_at: post.published_at,
            updated_at: post.updated_at,
            featured: post.featured,
            alternates: post
                .translations
                .iter()
                .map(|(l, c)| (*l, c.slug.as_str()))
                .collect(),
        })
    }
}

/// Row of the editor listing.
#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    id: &'a str,
    title: &'a str,
    languages: Vec<Lang>,
    missing: Vec<Lang>,
    published: bool,
    published_at: Option<DateTime<Utc>>,
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_json::to_vec(value)?).await?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Write all data files under `{output_dir}/api`, returning how many were
/// written. Drafts are left out unless `site.include_drafts`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_data_files(
    posts: &[Post],
    site: &SiteConfig,
    output_dir: &Path,
) -> Result<usize, Box<dyn Error>> {
    let api = output_dir.join("api");
    let visible: Vec<&Post> = posts
        .iter()
        .filter(|p| p.published || site.include_drafts)
        .collect();
    let mut written = 0usize;

    write_json(&api.join("posts.json"), &visible).await?;
    written += 1;

    let index: Vec<IndexEntry> = visible
        .iter()
        .filter_map(|post| {
            let content = post.content_or_fallback(site.default_language, site.default_language)?;
            Some(IndexEntry {
                id: &post.id,
                title: &content.title,
                languages: post.languages(),
                missing: site
                    .languages
                    .iter()
                    .copied()
                    .filter(|l| post.content(*l).is_none())
                    .collect(),
                published: post.published,
                published_at: post.published_at,
            })
        })
        .collect();
    write_json(&api.join("index.json"), &index).await?;
    written += 1;

    for &lang in &site.languages {
        let dir = api.join(lang.code());
        let summaries: Vec<PostSummary> = visible.iter().filter_map(|p| p.summary(lang)).collect();
        write_json(&dir.join("posts.json"), &summaries).await?;
        written += 1;

        for post in &visible {
            let Some(localized) = LocalizedPost::new(post, lang) else {
                continue;
            };
            let path = dir.join("posts").join(format!("{}.json", localized.content.slug));
            write_json(&path, &localized).await?;
            written += 1;
        }
        info!(lang = %lang, posts = summaries.len(), "Wrote language data files");
    }

    info!(files = written, "Wrote JSON data files");
    Ok(written)
}
