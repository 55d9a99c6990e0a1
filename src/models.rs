//! Data models for normalized posts and their localized content.
//!
//! This module defines the canonical shapes every CMS payload is mapped into:
//! - [`Lang`]: the site languages (pt, en, es)
//! - [`Post`]: a normalized post with one [`PostContent`] per language
//! - [`Taxonomy`]: a category or tag with its URL slug
//! - [`PostSummary`]: the list entry written to the per-language JSON data files

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::{fold_diacritics, slugify};

/// A site language.
///
/// Ordering follows declaration order, which is also the order languages are
/// listed in alternates and data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Lang {
    Pt,
    En,
    Es,
}

impl Lang {
    pub const ALL: [Lang; 3] = [Lang::Pt, Lang::En, Lang::Es];

    /// Parse a language tag or language name.
    ///
    /// Accepts ISO codes with or without region (`pt-BR`, `en_us`) and the
    /// language names editors tend to type in the CMS (`Português`, `English`,
    /// `Español`, `inglês`, `espanhol`).
    pub fn parse(s: &str) -> Option<Lang> {
        let folded = fold_diacritics(s.trim()).to_lowercase();
        let primary = folded
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or_default();
        match primary {
            "pt" | "br" | "portugues" | "portuguese" | "portugues brasileiro" => Some(Lang::Pt),
            "en" | "english" | "ingles" => Some(Lang::En),
            "es" | "espanol" | "spanish" | "espanhol" | "castellano" => Some(Lang::Es),
            _ => None,
        }
    }

    /// Short code used in URLs and data file paths.
    pub fn code(self) -> &'static str {
        match self {
            Lang::Pt => "pt",
            Lang::En => "en",
            Lang::Es => "es",
        }
    }

    /// Value for `<html lang>` and `hreflang`.
    pub fn html_lang(self) -> &'static str {
        match self {
            Lang::Pt => "pt-BR",
            Lang::En => "en",
            Lang::Es => "es",
        }
    }

    /// Open Graph locale.
    pub fn og_locale(self) -> &'static str {
        match self {
            Lang::Pt => "pt_BR",
            Lang::En => "en_US",
            Lang::Es => "es_ES",
        }
    }
}

impl TryFrom<String> for Lang {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Lang::parse(&value).ok_or_else(|| format!("unsupported language: {value:?}"))
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The text of a post in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostContent {
    pub title: String,
    /// URL slug, unique among posts of the same language.
    pub slug: String,
    /// Plain-text summary, explicit or derived from the body.
    pub excerpt: Option<String>,
    /// Body as HTML.
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    pub reading_minutes: u32,
}

impl PostContent {
    /// Title used in `<title>` and Open Graph tags.
    pub fn seo_title(&self) -> &str {
        self.meta_title.as_deref().unwrap_or(&self.title)
    }

    /// Description used in meta tags.
    pub fn seo_description(&self) -> Option<&str> {
        self.meta_description
            .as_deref()
            .or(self.excerpt.as_deref())
    }
}

/// A category or tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub slug: String,
}

impl Taxonomy {
    /// Build a taxonomy entry, or `None` if the name has no sluggable characters.
    pub fn new(name: &str) -> Option<Self> {
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            None
        } else {
            Some(Self {
                name: name.to_string(),
                slug,
            })
        }
    }
}

/// A normalized post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    /// Explicit translations keyed by language. Never empty.
    pub translations: BTreeMap<Lang, PostContent>,
    pub category: Option<Taxonomy>,
    pub tags: Vec<Taxonomy>,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub published: bool,
    pub featured: bool,
}

impl Post {
    /// The explicit translation for `lang`, if the post has one.
    pub fn content(&self, lang: Lang) -> Option<&PostContent> {
        self.translations.get(&lang)
    }

    /// The translation for `lang`, falling back to `default`, then to any
    /// translation.
    pub fn content_or_fallback(&self, lang: Lang, default: Lang) -> Option<&PostContent> {
        self.translations
            .get(&lang)
            .or_else(|| self.translations.get(&default))
            .or_else(|| self.translations.values().next())
    }

    /// Languages with an explicit translation, in [`Lang`] order.
    pub fn languages(&self) -> Vec<Lang> {
        self.translations.keys().copied().collect()
    }

    /// Last modification time used for sitemaps.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.published_at)
    }

    /// Summary entry for `lang`, if the post has that translation.
    pub fn summary(&self, lang: Lang) -> Option<PostSummary> {
        let content = self.content(lang)?;
        Some(PostSummary {
            id: self.id.clone(),
            lang,
            slug: content.slug.clone(),
            title: content.title.clone(),
            excerpt: content.excerpt.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            cover_image: self.cover_image.clone(),
            author: self.author.clone(),
            published_at: self.published_at,
            reading_minutes: content.reading_minutes,
            featured: self.featured,
        })
    }
}

/// List entry for a post in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub lang: Lang,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub category: Option<Taxonomy>,
    pub tags: Vec<Taxonomy>,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_minutes: u32,
    pub featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn content(title: &str, slug: &str) -> PostContent {
        PostContent {
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: Some("Excerpt".to_string()),
            body: "<p>Body</p>".to_string(),
            meta_title: None,
            meta_description: None,
            reading_minutes: 1,
        }
    }

    fn post() -> Post {
        let mut translations = BTreeMap::new();
        translations.insert(Lang::En, content("Hello", "hello"));
        translations.insert(Lang::Es, content("Hola", "hola"));
        Post {
            id: "42".to_string(),
            translations,
            category: Taxonomy::new("Ciência"),
            tags: vec![],
            cover_image: None,
            author: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            updated_at: None,
            published: true,
            featured: false,
        }
    }

    #[test]
    fn test_lang_parse() {
        assert_eq!(Lang::parse("pt-BR"), Some(Lang::Pt));
        assert_eq!(Lang::parse("PT_br"), Some(Lang::Pt));
        assert_eq!(Lang::parse("Português"), Some(Lang::Pt));
        assert_eq!(Lang::parse("en-US"), Some(Lang::En));
        assert_eq!(Lang::parse("Inglês"), Some(Lang::En));
        assert_eq!(Lang::parse("Español"), Some(Lang::Es));
        assert_eq!(Lang::parse("espanhol"), Some(Lang::Es));
        assert_eq!(Lang::parse("fr"), None);
        assert_eq!(Lang::parse(""), None);
    }

    #[test]
    fn test_lang_codes() {
        assert_eq!(Lang::Pt.code(), "pt");
        assert_eq!(Lang::Pt.html_lang(), "pt-BR");
        assert_eq!(Lang::Es.og_locale(), "es_ES");
        assert_eq!(serde_json::to_string(&Lang::En).unwrap(), "\"en\"");
        assert_eq!(serde_json::from_str::<Lang>("\"pt-BR\"").unwrap(), Lang::Pt);
        assert!(serde_json::from_str::<Lang>("\"fr\"").is_err());
    }

    #[test]
    fn test_content_fallback() {
        let p = post();
        assert!(p.content(Lang::Pt).is_none());
        assert_eq!(p.content_or_fallback(Lang::Pt, Lang::Es).unwrap().title, "Hola");
        assert_eq!(p.content_or_fallback(Lang::Pt, Lang::Pt).unwrap().title, "Hello");
        assert_eq!(p.languages(), vec![Lang::En, Lang::Es]);
    }

    #[test]
    fn test_last_modified_prefers_updated() {
        let mut p = post();
        assert_eq!(p.last_modified(), p.published_at);
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        p.updated_at = Some(later);
        assert_eq!(p.last_modified(), Some(later));
    }

    #[test]
    fn test_taxonomy_new() {
        let t = Taxonomy::new("  Ciência & Tecnologia ").unwrap();
        assert_eq!(t.name, "Ciência & Tecnologia");
        assert_eq!(t.slug, "ciencia-tecnologia");
        assert!(Taxonomy::new("!!!").is_none());
    }

    #[test]
    fn test_summary_and_seo_fields() {
        let p = post();
        let s = p.summary(Lang::En).unwrap();
        assert_eq!(s.slug, "hello");
        assert_eq!(s.category.unwrap().slug, "ciencia");
        assert!(p.summary(Lang::Pt).is_none());

        let mut c = content("Title", "title");
        assert_eq!(c.seo_title(), "Title");
        assert_eq!(c.seo_description(), Some("Excerpt"));
        c.meta_description = Some("Meta".to_string());
        assert_eq!(c.seo_description(), Some("Meta"));
    }
}
