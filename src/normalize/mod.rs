//! Best-effort normalization of CMS webhook payloads into [`Post`]s.
//!
//! The external no-code backend returns loosely-structured JSON whose shape
//! changes with whoever last edited the table: envelopes vary, keys come in
//! three languages and several casings, and translations live in suffixed
//! keys, nested maps, or separate rows. [`normalize_posts`] maps all of that
//! into the canonical [`Post`] shape.
//!
//! Normalization never fails. Records that cannot become a post are logged
//! and skipped; fields that cannot be coerced are treated as absent.
//!
//! # Submodules
//!
//! - [`fields`]: alias tables and value coercions
//! - [`locale`]: per-language field resolution

pub mod fields;
pub mod locale;

use itertools::Itertools;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::models::{Lang, Post, PostContent, Taxonomy};
use crate::utils::{
    excerpt_from_body, looks_like_html, paragraphs_to_html, reading_minutes, slugify, strip_html,
};
use fields::{
    Record, aliases, as_bool, as_datetime, as_id, as_image, as_name, as_status, as_tags, as_text,
    find, find_map, has_any,
};
use locale::{record_lang, resolve_localized};

/// Maximum envelope nesting searched for the record list.
const MAX_ENVELOPE_DEPTH: usize = 4;

/// Maximum length of a derived excerpt, in characters.
pub const EXCERPT_LEN: usize = 160;

/// Which languages to resolve and which one bare fields default to.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub default_lang: Lang,
    pub languages: Vec<Lang>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_lang: Lang::Pt,
            languages: Lang::ALL.to_vec(),
        }
    }
}

/// Why a record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    NoTitle,
    NoIdentity,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAnObject => write!(f, "record is not a JSON object"),
            SkipReason::NoTitle => write!(f, "no title in any enabled language"),
            SkipReason::NoIdentity => write!(f, "no id and no sluggable title"),
        }
    }
}

/// Normalize a raw webhook payload into posts.
///
/// Output is sorted newest first (undated posts last, ties by id). Slugs
/// are unique per language. Records sharing an id or translation group are
/// merged into one post, the first record winning on conflicts.
#[instrument(level = "info", skip_all)]
pub fn normalize_posts(payload: &Value, opts: &NormalizeOptions) -> Vec<Post> {
    let records = extract_records(payload);
    let mut posts: Vec<Post> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for (index, raw) in records.iter().enumerate() {
        let Some(object) = raw.as_object() else {
            warn!(index, reason = %SkipReason::NotAnObject, "Skipping record");
            continue;
        };
        let record = flatten_record(object);
        let (key, post) = match normalize_record(&record, opts) {
            Ok(ok) => ok,
            Err(reason) => {
                warn!(index, reason = %reason, "Skipping record");
                continue;
            }
        };

        match index_by_key.get(&key) {
            Some(&existing) => merge_into(&mut posts[existing], post, index),
            None => {
                index_by_key.insert(key, posts.len());
                posts.push(post);
            }
        }
    }

    dedupe_ids(&mut posts);
    dedupe_slugs(&mut posts);
    posts.sort_by(|a, b| {
        b.published_at
            .is_some()
            .cmp(&a.published_at.is_some())
            .then_with(|| b.published_at.cmp(&a.published_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    info!(records = records.len(), posts = posts.len(), "Normalized posts");
    posts
}

/// Locate the list of post records inside a payload.
///
/// Handles bare arrays, envelope objects (`{"data": [...]}`, nested up to
/// [`MAX_ENVELOPE_DEPTH`]), JSON-encoded strings, single records, and maps
/// of id to record (the key becomes the id when the record has none).
pub fn extract_records(payload: &Value) -> Vec<Value> {
    extract_at(payload, 0)
}

fn extract_at(value: &Value, depth: usize) -> Vec<Value> {
    if depth > MAX_ENVELOPE_DEPTH {
        return Vec::new();
    }
    match value {
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    Value::Object(map) if !looks_like_record(map) && has_any(map, aliases::ENVELOPE) => {
                        out.extend(extract_at(item, depth + 1));
                    }
                    Value::String(s) => {
                        if let Ok(decoded) = serde_json::from_str::<Value>(s) {
                            out.extend(extract_at(&decoded, depth + 1));
                        }
                    }
                    other => out.push(other.clone()),
                }
            }
            out
        }
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded) => extract_at(&decoded, depth + 1),
            Err(_) => Vec::new(),
        },
        Value::Object(map) => {
            // A record's own body blocks are content, never a record list.
            let is_record = looks_like_record(map);
            let wrapped: Vec<&Value> = aliases::ENVELOPE
                .iter()
                .filter(|alias| !(is_record && aliases::BODY.contains(*alias)))
                .filter_map(|alias| find(map, &[*alias]))
                .collect();
            if is_record && wrapped.is_empty() {
                return vec![value.clone()];
            }
            let (lists, objects): (Vec<&Value>, Vec<&Value>) =
                wrapped.into_iter().partition(|v| v.is_array());
            for inner in lists.into_iter().chain(objects) {
                let found = extract_at(inner, depth + 1);
                if any_record(&found) {
                    return found;
                }
            }
            if is_record {
                return vec![value.clone()];
            }
            keyed_records(map)
        }
        _ => Vec::new(),
    }
}

fn any_record(values: &[Value]) -> bool {
    values
        .iter()
        .any(|v| v.as_object().is_some_and(looks_like_record))
}

/// `{"-Nx1": {...}, "-Nx2": {...}}` style collections.
fn keyed_records(map: &Record) -> Vec<Value> {
    let all_records = !map.is_empty()
        && map
            .values()
            .all(|v| v.as_object().is_some_and(looks_like_record));
    if !all_records {
        return Vec::new();
    }
    map.iter()
        .filter_map(|(key, v)| {
            let mut record = v.as_object()?.clone();
            if find(&flatten_record(&record), aliases::ID).is_none() {
                record.insert("id".to_string(), Value::String(key.clone()));
            }
            Some(Value::Object(record))
        })
        .collect()
}

/// Whether an object carries a title in any shape.
fn looks_like_record(map: &Record) -> bool {
    let record = flatten_record(map);
    record.keys().any(|k| {
        let normalized = crate::utils::normalize_key(k);
        aliases::TITLE.iter().any(|alias| normalized.starts_with(alias))
            || aliases::TRANSLATIONS.contains(&normalized.as_str())
    })
}

/// Lift `fields` (Airtable) and `attributes` (Strapi) into the record.
///
/// Top-level keys win over lifted ones.
pub(crate) fn flatten_record(object: &Record) -> Record {
    let mut record = Record::new();
    let mut lifted = Vec::new();
    for (key, value) in object {
        let normalized = crate::utils::normalize_key(key);
        match value {
            Value::Object(inner) if aliases::FLATTEN.contains(&normalized.as_str()) => {
                lifted.push(inner)
            }
            _ => {
                record.insert(key.clone(), value.clone());
            }
        }
    }
    for inner in lifted {
        for (key, value) in inner {
            record.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    record
}

/// Normalize one flattened record into a merge key and a post.
pub fn normalize_record(record: &Record, opts: &NormalizeOptions) -> Result<(String, Post), SkipReason> {
    let bare_lang = record_lang(record).unwrap_or(opts.default_lang);

    let titles: Vec<(Lang, String)> = opts
        .languages
        .iter()
        .filter_map(|&lang| {
            resolve_localized(record, aliases::TITLE, lang, bare_lang, as_text).map(|t| (lang, t))
        })
        .collect();
    if titles.is_empty() {
        return Err(SkipReason::NoTitle);
    }

    let explicit_slugs: HashMap<Lang, String> = titles
        .iter()
        .filter_map(|(lang, _)| {
            resolve_localized(record, aliases::SLUG, *lang, bare_lang, slug_from_value)
                .map(|s| (*lang, s))
        })
        .collect();
    let slug_candidate = |lang: Lang, title: &str| {
        explicit_slugs
            .get(&lang)
            .cloned()
            .or_else(|| Some(slugify(title)).filter(|s| !s.is_empty()))
    };

    let id = find_map(record, aliases::ID, as_id)
        .or_else(|| {
            titles
                .iter()
                .find(|(lang, _)| *lang == opts.default_lang)
                .or_else(|| titles.first())
                .and_then(|(lang, title)| slug_candidate(*lang, title))
        })
        .ok_or(SkipReason::NoIdentity)?;
    let id_slug = slugify(&id);

    let mut translations = BTreeMap::new();
    for (lang, title) in &titles {
        let Some(slug) = slug_candidate(*lang, title)
            .or_else(|| Some(id_slug.clone()).filter(|s| !s.is_empty()))
        else {
            debug!(%id, %lang, "No usable slug; dropping translation");
            continue;
        };
        let body = resolve_localized(record, aliases::BODY, *lang, bare_lang, as_text)
            .map(|b| if looks_like_html(&b) { b } else { paragraphs_to_html(&b) })
            .unwrap_or_default();
        let excerpt = resolve_localized(record, aliases::EXCERPT, *lang, bare_lang, as_text)
            .map(|e| strip_html(&e))
            .filter(|e| !e.is_empty())
            .or_else(|| excerpt_from_body(&body, EXCERPT_LEN));
        let meta_title = resolve_localized(record, aliases::META_TITLE, *lang, bare_lang, as_text);
        let meta_description =
            resolve_localized(record, aliases::META_DESCRIPTION, *lang, bare_lang, as_text)
                .map(|d| strip_html(&d));

        translations.insert(
            *lang,
            PostContent {
                title: title.clone(),
                slug,
                excerpt,
                reading_minutes: reading_minutes(&body),
                body,
                meta_title,
                meta_description,
            },
        );
    }
    if translations.is_empty() {
        return Err(SkipReason::NoIdentity);
    }

    // The category is named by the default language so its slug is stable
    // across translations.
    let category_langs = std::iter::once(opts.default_lang).chain(opts.languages.iter().copied());
    let category = category_langs
        .filter_map(|lang| resolve_localized(record, aliases::CATEGORY, lang, bare_lang, as_name))
        .find_map(|name| Taxonomy::new(&name));

    let tags = find(record, aliases::TAGS)
        .map(as_tags)
        .unwrap_or_default()
        .iter()
        .filter_map(|t| Taxonomy::new(t))
        .unique_by(|t| t.slug.clone())
        .collect();

    let key = find_map(record, aliases::GROUP, as_id).unwrap_or_else(|| id.clone());

    let post = Post {
        id,
        translations,
        category,
        tags,
        cover_image: find_map(record, aliases::IMAGE, as_image),
        author: find_map(record, aliases::AUTHOR, as_name),
        published_at: find_map(record, aliases::PUBLISHED_AT, as_datetime),
        updated_at: find_map(record, aliases::UPDATED_AT, as_datetime),
        published: published_state(record),
        featured: find_map(record, aliases::FEATURED, as_bool).unwrap_or(false),
    };
    Ok((key, post))
}

/// Slug from an explicit value; URLs and paths contribute their last segment.
fn slug_from_value(value: &Value) -> Option<String> {
    let raw = as_text(value)?;
    let path = raw.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    Some(slugify(segment)).filter(|s| !s.is_empty())
}

/// Publication state: status words, then `published` flags, then `draft`
/// flags. Posts are published unless something says otherwise.
fn published_state(record: &Record) -> bool {
    find_map(record, aliases::STATUS, as_status)
        .or_else(|| find_map(record, aliases::PUBLISHED, as_bool))
        .or_else(|| find_map(record, aliases::DRAFT, as_bool).map(|draft| !draft))
        .unwrap_or(true)
}

/// Fold a later record into an earlier post with the same key.
///
/// Translations the post lacks are added; scalar fields the post lacks are
/// filled in. Everything already present is kept.
fn merge_into(existing: &mut Post, incoming: Post, index: usize) {
    let mut conflicts = Vec::new();
    for (lang, content) in incoming.translations {
        if existing.translations.contains_key(&lang) {
            conflicts.push(lang);
        } else {
            existing.translations.insert(lang, content);
        }
    }
    if !conflicts.is_empty() {
        warn!(index, id = %existing.id, languages = ?conflicts, "Duplicate translation; keeping first");
    }
    existing.category = existing.category.take().or(incoming.category);
    existing.cover_image = existing.cover_image.take().or(incoming.cover_image);
    existing.author = existing.author.take().or(incoming.author);
    existing.published_at = existing.published_at.or(incoming.published_at);
    existing.updated_at = existing.updated_at.max(incoming.updated_at);
    existing.featured |= incoming.featured;
    let mut tags = std::mem::take(&mut existing.tags);
    tags.extend(incoming.tags);
    existing.tags = tags.into_iter().unique_by(|t| t.slug.clone()).collect();
}

/// Make post ids unique by appending `-2`, `-3`, ...
///
/// Records sharing an id but not a merge key stay separate posts, and
/// pages look posts up by id.
fn dedupe_ids(posts: &mut [Post]) {
    let mut taken: HashSet<String> = HashSet::new();
    for post in posts.iter_mut() {
        if taken.contains(&post.id) {
            let base = post.id.clone();
            let mut n = 2;
            while taken.contains(&format!("{base}-{n}")) {
                n += 1;
            }
            post.id = format!("{base}-{n}");
            warn!(from = %base, to = %post.id, "Renamed duplicate post id");
        }
        taken.insert(post.id.clone());
    }
}

/// Make slugs unique per language by appending `-2`, `-3`, ...
///
/// Earlier posts keep their slug.
fn dedupe_slugs(posts: &mut [Post]) {
    let mut used: HashMap<Lang, HashSet<String>> = HashMap::new();
    for post in posts.iter_mut() {
        for (lang, content) in post.translations.iter_mut() {
            let taken = used.entry(*lang).or_default();
            if taken.contains(&content.slug) {
                let base = content.slug.clone();
                let mut n = 2;
                while taken.contains(&format!("{base}-{n}")) {
                    n += 1;
                }
                content.slug = format!("{base}-{n}");
                warn!(id = %post.id, %lang, from = %base, to = %content.slug, "Renamed duplicate slug");
            }
            taken.insert(content.slug.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn normalize(v: Value) -> Vec<Post> {
        normalize_posts(&v, &NormalizeOptions::default())
    }

    #[test]
    fn test_extract_records_envelopes() {
        let rec = json!({"title": "A"});
        assert_eq!(extract_records(&json!([rec.clone()])).len(), 1);
        assert_eq!(extract_records(&json!({"data": [rec.clone(), rec.clone()]})).len(), 2);
        let wrapped = extract_records(&json!({"result": {"items": [rec.clone()]}, "name": "Blog"}));
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0]["title"], "A");
        assert_eq!(extract_records(&json!([{"json": {"posts": [rec.clone()]}}])).len(), 1);
        assert_eq!(extract_records(&rec).len(), 1);
        assert_eq!(extract_records(&json!("[{\"title\": \"A\"}]")).len(), 1);
        assert!(extract_records(&json!(42)).is_empty());
        assert!(extract_records(&json!({"ok": true})).is_empty());
    }

    #[test]
    fn test_extract_records_keyed_map() {
        let records = extract_records(&json!({
            "-Nabc": {"title": "A"},
            "-Ndef": {"title": "B", "id": "b"}
        }));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "-Nabc");
        assert_eq!(records[1]["id"], "b");
    }

    #[test]
    fn test_extract_records_depth_limit() {
        let deep = json!({"data": {"data": {"data": {"data": {"data": [{"title": "A"}]}}}}});
        assert!(extract_records(&deep).is_empty());
    }

    #[test]
    fn test_rich_text_blocks_do_not_replace_the_record() {
        let records = extract_records(&json!({
            "title": "A",
            "body": [{"type": "paragraph", "text": "Hello"}]
        }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "A");
    }

    #[test]
    fn test_titled_body_blocks_stay_inside_the_record() {
        let posts = normalize(json!({
            "id": "post-1",
            "title": "Guia do café",
            "content": [
                {"title": "Origem", "text": "Etiópia"},
                {"title": "Torra", "text": "Média"}
            ]
        }));
        let titles: Vec<_> = posts
            .iter()
            .map(|p| p.content(Lang::Pt).unwrap().title.as_str())
            .collect();
        assert_eq!(titles, vec!["Guia do café"]);
        assert_eq!(posts[0].id, "post-1");
    }

    #[test]
    fn test_flatten_record_top_level_wins() {
        let rec = json!({"id": "rec1", "title": "Top", "fields": {"title": "Inner", "slug": "s"}});
        let flat = flatten_record(rec.as_object().unwrap());
        assert_eq!(flat["title"], "Top");
        assert_eq!(flat["slug"], "s");
        assert!(!flat.contains_key("fields"));
    }

    #[test]
    fn test_airtable_record() {
        let posts = normalize(json!({
            "records": [{
                "id": "recA1",
                "createdTime": "2024-01-02T00:00:00.000Z",
                "fields": {
                    "Título": "Como funciona o café",
                    "Título EN": "How coffee works",
                    "Conteúdo": "Primeiro parágrafo.\n\nSegundo.",
                    "Categoria": ["Ciência"],
                    "Tags": "café, ciência, Café",
                    "Status": "Publicado",
                    "Imagem": [{"url": "https://dl.airtable.com/x.jpg"}],
                    "Data": "05/03/2024"
                }
            }]
        }));
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.id, "recA1");
        assert!(post.published);
        assert_eq!(post.category.as_ref().unwrap().slug, "ciencia");
        assert_eq!(post.tags.len(), 2);
        assert_eq!(post.cover_image.as_deref(), Some("https://dl.airtable.com/x.jpg"));
        assert_eq!(
            post.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );

        let pt = post.content(Lang::Pt).unwrap();
        assert_eq!(pt.slug, "como-funciona-o-cafe");
        assert_eq!(pt.body, "<p>Primeiro parágrafo.</p>\n<p>Segundo.</p>");
        assert_eq!(pt.excerpt.as_deref(), Some("Primeiro parágrafo. Segundo."));

        let en = post.content(Lang::En).unwrap();
        assert_eq!(en.title, "How coffee works");
        assert_eq!(en.slug, "how-coffee-works");
        assert_eq!(en.body, "");
        assert!(post.content(Lang::Es).is_none());
    }

    #[test]
    fn test_language_map_fields() {
        let posts = normalize(json!([{
            "_id": 7,
            "title": {"pt": "Olá", "es": "Hola"},
            "slug": {"pt": "/blog/ola-mundo", "es": "https://x.com/es/blog/hola-mundo?ref=1"},
            "body": {"pt": "<p>Oi</p>", "es": "<p>Hola</p>"},
            "excerpt": {"pt": "<em>Resumo</em>"}
        }]));
        let post = &posts[0];
        assert_eq!(post.id, "7");
        assert_eq!(post.languages(), vec![Lang::Pt, Lang::Es]);
        assert_eq!(post.content(Lang::Pt).unwrap().slug, "ola-mundo");
        assert_eq!(post.content(Lang::Es).unwrap().slug, "hola-mundo");
        assert_eq!(post.content(Lang::Pt).unwrap().excerpt.as_deref(), Some("Resumo"));
        assert_eq!(post.content(Lang::Es).unwrap().excerpt.as_deref(), Some("Hola"));
    }

    #[test]
    fn test_records_without_title_are_skipped() {
        let posts = normalize(json!([
            {"id": 1, "body": "no title"},
            "not an object",
            {"id": 2, "title": "Kept"}
        ]));
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "2");
    }

    #[test]
    fn test_id_falls_back_to_default_language_slug() {
        let posts = normalize(json!([{"title_en": "Hello", "titulo": "Olá Mundo"}]));
        assert_eq!(posts[0].id, "ola-mundo");
    }

    #[test]
    fn test_unsluggable_title_falls_back_to_id() {
        let posts = normalize(json!([{"id": "abc-1", "title": "???"}]));
        assert_eq!(posts[0].content(Lang::Pt).unwrap().slug, "abc-1");
    }

    #[test]
    fn test_rows_per_language_are_merged() {
        let posts = normalize(json!([
            {"id": "1", "group_id": "g", "lang": "pt", "title": "Olá", "tags": ["a"]},
            {"id": "2", "group_id": "g", "lang": "en", "title": "Hello", "tags": ["b"], "cover": "/c.png"},
            {"id": "3", "group_id": "g", "lang": "pt", "title": "Duplicado"}
        ]));
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.id, "1");
        assert_eq!(post.content(Lang::Pt).unwrap().title, "Olá");
        assert_eq!(post.content(Lang::En).unwrap().title, "Hello");
        assert_eq!(post.tags.iter().map(|t| t.slug.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(post.cover_image.as_deref(), Some("/c.png"));
    }

    #[test]
    fn test_merge_fills_missing_fields_from_later_rows() {
        let posts = normalize(json!([
            {"id": "1", "group_id": "g", "lang": "pt", "title": "Olá"},
            {"id": "2", "group_id": "g", "lang": "en", "title": "Hello",
             "publishedAt": "2024-02-01", "author": "Ana", "featured": true}
        ]));
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert!(post.featured);
        assert_eq!(post.author.as_deref(), Some("Ana"));
        assert_eq!(
            post.published_at,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_featured_is_kept_when_a_later_row_is_not() {
        let posts = normalize(json!([
            {"id": "1", "group_id": "g", "lang": "pt", "title": "Olá", "featured": true},
            {"id": "2", "group_id": "g", "lang": "en", "title": "Hello", "featured": false}
        ]));
        assert!(posts[0].featured);
    }

    #[test]
    fn test_localized_category_is_named_by_default_language() {
        let posts = normalize(json!([{
            "id": 1,
            "title": "T",
            "title_en": "T en",
            "category": {"pt": "Ciência", "en": "Science"}
        }]));
        let category = posts[0].category.as_ref().unwrap();
        assert_eq!(category.slug, "ciencia");
        assert_eq!(category.name, "Ciência");

        let english_first = NormalizeOptions {
            default_lang: Lang::En,
            languages: Lang::ALL.to_vec(),
        };
        let posts = normalize_posts(
            &json!([{"id": 1, "title": {"pt": "T", "en": "T en"}, "category": {"pt": "Ciência", "en": "Science"}}]),
            &english_first,
        );
        assert_eq!(posts[0].category.as_ref().unwrap().slug, "science");
    }

    #[test]
    fn test_unmerged_records_with_same_id_get_suffixes() {
        let posts = normalize(json!([
            {"id": "1", "title": "A"},
            {"id": "1", "group_id": "g", "title": "B"}
        ]));
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1-2"]);
        let titles: Vec<_> = posts
            .iter()
            .map(|p| p.content(Lang::Pt).unwrap().title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_slugs_get_suffixes() {
        let posts = normalize(json!([
            {"id": "a", "title": "Same", "date": "2024-01-03"},
            {"id": "b", "title": "Same", "date": "2024-01-02"},
            {"id": "c", "title": "Same", "date": "2024-01-01"}
        ]));
        let slugs: Vec<_> = posts
            .iter()
            .map(|p| p.content(Lang::Pt).unwrap().slug.clone())
            .collect();
        assert_eq!(slugs, vec!["same", "same-2", "same-3"]);
    }

    #[test]
    fn test_sort_newest_first_undated_last() {
        let posts = normalize(json!([
            {"id": "undated", "title": "U"},
            {"id": "old", "title": "O", "publishedAt": "2023-01-01"},
            {"id": "new", "title": "N", "publishedAt": 1709596800}
        ]));
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_publication_state() {
        let posts = normalize(json!([
            {"id": "1", "title": "A", "status": "rascunho"},
            {"id": "2", "title": "B", "published": "false"},
            {"id": "3", "title": "C", "draft": true},
            {"id": "4", "title": "D"},
            {"id": "5", "title": "E", "status": "live", "draft": true},
            {"id": "6", "title": "F", "featured": "sim"}
        ]));
        let state: HashMap<_, _> = posts.iter().map(|p| (p.id.as_str(), p.published)).collect();
        assert!(!state["1"]);
        assert!(!state["2"]);
        assert!(!state["3"]);
        assert!(state["4"]);
        assert!(state["5"]);
        assert!(posts.iter().find(|p| p.id == "6").unwrap().featured);
    }

    #[test]
    fn test_languages_option_restricts_resolution() {
        let opts = NormalizeOptions {
            default_lang: Lang::En,
            languages: vec![Lang::En],
        };
        let posts = normalize_posts(
            &json!([{"id": 1, "title": "Hello", "title_pt": "Olá"}, {"id": 2, "title_pt": "Só pt"}]),
            &opts,
        );
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].languages(), vec![Lang::En]);
    }

    #[test]
    fn test_long_body_excerpt_is_truncated() {
        let body = format!("<p>{}</p>", "palavra ".repeat(100));
        let posts = normalize(json!([{"id": 1, "title": "T", "html": body}]));
        let excerpt = posts[0].content(Lang::Pt).unwrap().excerpt.clone().unwrap();
        assert!(excerpt.ends_with('…'));
        assert!(excerpt.chars().count() <= EXCERPT_LEN + 1);
    }
}
