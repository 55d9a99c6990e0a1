//! Field lookup by alias and value coercion.
//!
//! CMS payloads name the same field a dozen ways (`title`, `Título`,
//! `post_title`, `headline`) and store values in whatever shape the no-code
//! tool produced. Keys are compared after [`normalize_key`]; values go through
//! the `as_*` coercions below, each returning `None` when nothing usable is
//! found so callers can move on to the next candidate.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use url::Url;

use crate::utils::{fold_diacritics, normalize_key};

pub type Record = Map<String, Value>;

/// Alias tables, already in [`normalize_key`] form.
pub mod aliases {
    pub const ID: &[&str] = &["id", "uuid", "postid", "recordid", "key"];
    pub const TITLE: &[&str] = &["title", "titulo", "headline", "posttitle", "name", "nome", "nombre"];
    pub const SLUG: &[&str] = &["slug", "permalink", "handle", "urlslug", "path", "url"];
    pub const EXCERPT: &[&str] = &[
        "excerpt", "summary", "resumo", "resumen", "subtitle", "subtitulo", "lead", "description",
        "descricao", "descripcion",
    ];
    pub const BODY: &[&str] = &[
        "content", "body", "html", "conteudo", "contenido", "text", "texto", "postcontent",
        "article", "artigo", "articulo",
    ];
    pub const META_TITLE: &[&str] = &["metatitle", "seotitle", "ogtitle"];
    pub const META_DESCRIPTION: &[&str] = &["metadescription", "seodescription", "ogdescription"];
    pub const CATEGORY: &[&str] = &["category", "categoria", "categories", "categorias", "section", "secao", "seccion"];
    pub const TAGS: &[&str] = &["tags", "tag", "keywords", "palavraschave", "etiquetas", "labels"];
    pub const IMAGE: &[&str] = &[
        "coverimage", "cover", "featuredimage", "image", "imagem", "imagen", "thumbnail", "banner",
        "ogimage", "img", "photo", "foto",
    ];
    pub const AUTHOR: &[&str] = &["author", "autor", "writer", "by", "createdby"];
    pub const PUBLISHED_AT: &[&str] = &[
        "publishedat", "publishdate", "publicationdate", "datepublished", "date", "data", "fecha",
        "publicadoem", "createdat", "created", "published",
    ];
    pub const UPDATED_AT: &[&str] = &[
        "updatedat", "updated", "modifiedat", "modified", "lastmodified", "datemodified",
        "atualizadoem",
    ];
    pub const STATUS: &[&str] = &["status", "state", "estado", "situacao", "poststatus"];
    pub const PUBLISHED: &[&str] = &["published", "ispublished", "publicado", "publish", "live", "visible", "active"];
    pub const DRAFT: &[&str] = &["draft", "isdraft", "rascunho", "borrador"];
    pub const FEATURED: &[&str] = &["featured", "isfeatured", "destaque", "destacado", "highlight", "pinned"];
    pub const LANG: &[&str] = &["lang", "language", "locale", "idioma", "lingua"];
    pub const GROUP: &[&str] = &[
        "translationgroup", "translationof", "translationkey", "groupid", "originalid", "parentid",
    ];
    pub const TRANSLATIONS: &[&str] = &[
        "translations", "translation", "i18n", "locales", "localized", "localizations", "traducoes",
        "traducciones",
    ];
    /// Sub-objects whose keys are lifted into the record (Airtable, Strapi).
    pub const FLATTEN: &[&str] = &["fields", "attributes"];
    /// Keys that wrap the record list in webhook responses.
    pub const ENVELOPE: &[&str] = &[
        "posts", "data", "items", "records", "results", "result", "rows", "entries", "body",
        "content", "json", "payload",
    ];
    pub const RICH_TEXT: &[&str] = &["text", "value", "html", "content", "plain", "rendered", "raw"];
    pub const NAME: &[&str] = &["name", "title", "label", "value", "text", "nome", "nombre"];
    pub const URL: &[&str] = &["url", "src", "href", "secureurl", "original", "large", "full"];
}

const PUBLISHED_WORDS: &[&str] = &[
    "published", "publicado", "publicada", "publish", "live", "active", "ativo", "activo", "public",
    "publico", "visible", "online",
];
const DRAFT_WORDS: &[&str] = &[
    "draft", "rascunho", "borrador", "archived", "arquivado", "archivado", "hidden", "oculto",
    "private", "privado", "inactive", "inativo", "pending", "pendente", "pendiente", "scheduled",
    "agendado",
];

/// Smallest plausible Unix timestamp in seconds (2001-09-09). Keeps bare
/// years such as `"2024"` from reading as 1970 timestamps.
const MIN_UNIX_SECONDS: f64 = 1e9;
/// Above this, a timestamp is read as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e11;

/// First non-null value whose key matches one of `aliases`, in alias order.
pub fn find<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        record
            .iter()
            .find(|(k, v)| !v.is_null() && normalize_key(k) == *alias)
            .map(|(_, v)| v)
    })
}

/// First alias hit that survives `coerce`.
pub fn find_map<T>(
    record: &Record,
    aliases: &[&str],
    coerce: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    aliases.iter().find_map(|alias| {
        record
            .iter()
            .filter(|(k, v)| !v.is_null() && normalize_key(k) == *alias)
            .find_map(|(_, v)| coerce(v))
    })
}

/// Whether the record has any key matching `aliases`.
pub fn has_any(record: &Record, aliases: &[&str]) -> bool {
    record
        .keys()
        .map(|k| normalize_key(k))
        .any(|k| aliases.contains(&k.as_str()))
}

/// Coerce a value to trimmed, non-empty text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.iter().find_map(as_text),
        Value::Object(map) => find_map(map, aliases::RICH_TEXT, as_text),
        Value::Null => None,
    }
}

/// Coerce an identifier: strings and integers only.
pub fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a taxonomy or person name: strings, `{name|title|label..}` objects,
/// Strapi `{data: {attributes: ..}}` relations, or the first array element.
pub fn as_name(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) => as_text(value),
        Value::Array(items) => items.iter().find_map(as_name),
        Value::Object(map) => find_map(map, aliases::NAME, as_name)
            .or_else(|| find_map(map, &["data", "attributes", "fields"], as_name)),
        _ => None,
    }
}

/// Coerce a tag list: arrays of strings/objects or a delimited string.
///
/// Strips `#` prefixes and drops empty entries. Order is preserved;
/// deduplication is left to the caller.
pub fn as_tags(value: &Value) -> Vec<String> {
    let clean = |s: &str| {
        let t = s.trim().trim_start_matches('#').trim();
        (!t.is_empty()).then(|| t.to_string())
    };
    match value {
        Value::String(s) => s.split([',', ';', '|']).filter_map(clean).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => clean(s),
                other => as_name(other).and_then(|s| clean(&s)),
            })
            .collect(),
        Value::Object(map) => find_map(map, &["data"], |v| Some(as_tags(v)))
            .or_else(|| as_name(value).map(|s| clean(&s).into_iter().collect()))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Coerce an image reference to a usable URL.
///
/// Protocol-relative URLs get `https:`; absolute http(s) URLs and
/// root-relative paths are kept; anything else is dropped.
pub fn as_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_url(s),
        Value::Array(items) => items.iter().find_map(as_image),
        Value::Object(map) => find_map(map, aliases::URL, as_image)
            .or_else(|| find_map(map, &["data", "attributes", "formats"], as_image)),
        _ => None,
    }
}

fn clean_url(raw: &str) -> Option<String> {
    let s = raw.trim();
    if let Some(rest) = s.strip_prefix("//") {
        return clean_url(&format!("https://{rest}"));
    }
    if s.starts_with('/') && s.len() > 1 {
        return Some(s.to_string());
    }
    match Url::parse(s) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Some(url.to_string())
        }
        _ => None,
    }
}

/// Coerce a boolean-ish value (`true`, `1`, `"sim"`, `"x"`, `"no"` ...).
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => {
            let folded = fold_diacritics(s.trim()).to_lowercase();
            match folded.as_str() {
                "true" | "1" | "yes" | "y" | "sim" | "si" | "x" | "on" | "checked" => Some(true),
                "false" | "0" | "no" | "n" | "nao" | "off" | "" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Coerce a publication status word; booleans pass through.
pub fn as_status(value: &Value) -> Option<bool> {
    match value {
        Value::String(s) => {
            let folded = fold_diacritics(s.trim()).to_lowercase();
            if PUBLISHED_WORDS.contains(&folded.as_str()) {
                Some(true)
            } else if DRAFT_WORDS.contains(&folded.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        Value::Object(map) => find_map(map, aliases::NAME, as_status),
        other => as_bool(other),
    }
}

/// Coerce a date or timestamp to UTC.
///
/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`,
/// `YYYY-MM-DDTHH:MM:SS` without offset, `DD/MM/YYYY`, and Unix seconds or
/// milliseconds as numbers or numeric strings.
pub fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_unix),
        Value::String(s) => parse_date_str(s.trim()),
        Value::Object(map) => find_map(map, &["$date", "date", "value", "start", "iso"], as_datetime),
        _ => None,
    }
}

fn from_unix(ts: f64) -> Option<DateTime<Utc>> {
    if !ts.is_finite() || ts.abs() < MIN_UNIX_SECONDS {
        return None;
    }
    let millis = if ts.abs() >= MILLIS_THRESHOLD {
        ts as i64
    } else {
        (ts * 1000.0) as i64
    };
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = s.parse::<f64>() {
        return from_unix(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
