//! Localization resolution for per-language fields.
//!
//! A localized field can arrive in any of four shapes, tried in this order
//! for each language:
//!
//! 1. a language map on the field itself: `{"title": {"pt": "..", "en": ".."}}`
//! 2. language-suffixed keys: `title_en`, `titleEn`, `title-PT-BR`
//! 3. a translation container: `{"translations": {"en": {"title": ..}}}` or
//!    `{"translations": [{"lang": "en", "title": ..}]}`
//! 4. the bare field, attributed to the record's declared language

use serde_json::Value;

use super::fields::{Record, aliases, as_text, find, find_map};
use crate::models::Lang;
use crate::utils::normalize_key;

/// Map a normalized key suffix to a language.
fn suffix_lang(suffix: &str) -> Option<Lang> {
    match suffix {
        "pt" | "ptbr" | "ptpt" | "br" => Some(Lang::Pt),
        "en" | "enus" | "engb" => Some(Lang::En),
        "es" | "eses" | "esmx" | "esar" => Some(Lang::Es),
        _ => None,
    }
}

/// Whether an object is keyed by languages (`{"pt": .., "en": ..}`).
fn is_language_map(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty() && map.keys().all(|k| Lang::parse(k).is_some()),
        _ => false,
    }
}

/// The language a record declares for its bare fields.
pub fn record_lang(record: &Record) -> Option<Lang> {
    find_map(record, aliases::LANG, |v| as_text(v).and_then(|s| Lang::parse(&s)))
}

/// Resolve a localized field for `lang`.
///
/// `bare_lang` is the language bare (unsuffixed, non-map) values belong to.
/// Each candidate goes through `coerce`; candidates that coerce to `None`
/// are skipped, so an empty `title_en` does not shadow a translation
/// container entry.
pub fn resolve_localized<T>(
    record: &Record,
    field_aliases: &[&str],
    lang: Lang,
    bare_lang: Lang,
    coerce: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    from_language_map(record, field_aliases, lang, &coerce)
        .or_else(|| from_suffixed_keys(record, field_aliases, lang, &coerce))
        .or_else(|| from_translations(record, field_aliases, lang, &coerce))
        .or_else(|| {
            if lang != bare_lang {
                return None;
            }
            find_map(record, field_aliases, |v| {
                if is_language_map(v) { None } else { coerce(v) }
            })
        })
}

fn from_language_map<T>(
    record: &Record,
    field_aliases: &[&str],
    lang: Lang,
    coerce: &impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    find_map(record, field_aliases, |v| {
        if !is_language_map(v) {
            return None;
        }
        v.as_object()?
            .iter()
            .filter(|(k, _)| Lang::parse(k) == Some(lang))
            .find_map(|(_, inner)| coerce(inner))
    })
}

fn from_suffixed_keys<T>(
    record: &Record,
    field_aliases: &[&str],
    lang: Lang,
    coerce: &impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    field_aliases.iter().find_map(|alias| {
        record.iter().find_map(|(key, value)| {
            let normalized = normalize_key(key);
            let suffix = normalized.strip_prefix(*alias)?;
            if suffix_lang(suffix) == Some(lang) && !value.is_null() {
                coerce(value)
            } else {
                None
            }
        })
    })
}

fn from_translations<T>(
    record: &Record,
    field_aliases: &[&str],
    lang: Lang,
    coerce: &impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    find_map(record, aliases::TRANSLATIONS, |container| {
        translation_entries(container)
            .into_iter()
            .filter(|(entry_lang, _)| *entry_lang == lang)
            .find_map(|(_, entry)| find_map(&entry, field_aliases, |v| coerce(v)))
    })
}

/// Flatten a translation container into `(language, record)` pairs.
fn translation_entries(container: &Value) -> Vec<(Lang, Record)> {
    match container {
        Value::Object(map) => {
            if let Some(inner) = find(map, &["data"]) {
                return translation_entries(inner);
            }
            map.iter()
                .filter_map(|(k, v)| Some((Lang::parse(k)?, super::flatten_record(v.as_object()?))))
                .collect()
        }
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let entry = super::flatten_record(item.as_object()?);
                let lang = record_lang(&entry)?;
                Some((lang, entry))
            })
            .collect(),
        _ => Vec::new(),
    }
}
