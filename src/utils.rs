//! Text helpers shared by the normalizer, the route generator, and the writers.
//!
//! - Diacritic folding and slug generation for URLs
//! - Key normalization for matching heterogeneous CMS field names
//! - HTML stripping and excerpt derivation for post summaries
//! - HTML escaping for pre-rendered pages
//! - Output directory validation

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Words per minute used for reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Map accented Latin characters (the ones pt/es text actually uses) to ASCII.
///
/// Characters without a mapping pass through unchanged.
pub fn fold_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ý' | 'ÿ' => 'y',
            'Ý' => 'Y',
            other => other,
        })
        .collect()
}

/// Convert arbitrary text to a URL slug.
///
/// Folds diacritics, lowercases, collapses every run of non-alphanumeric
/// characters into a single `-`, and trims leading/trailing dashes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Olá, Mundo!"), "ola-mundo");
/// assert_eq!(slugify("  Ciência & Tecnologia "), "ciencia-tecnologia");
/// ```
pub fn slugify(text: &str) -> String {
    let folded = fold_diacritics(text).to_lowercase();
    NON_SLUG
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Normalize a JSON key for alias matching.
///
/// `"Título"`, `"titulo"` and `"TITULO"` all become `"titulo"`;
/// `"cover_image"` and `"coverImage"` both become `"coverimage"`.
pub fn normalize_key(key: &str) -> String {
    fold_diacritics(key)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Collapse all whitespace runs into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Whether a string looks like it carries HTML markup.
pub fn looks_like_html(s: &str) -> bool {
    let t = s.trim_start();
    t.starts_with('<') || (s.contains("</") && s.contains('>')) || s.contains("<br")
}

/// Extract the visible text of an HTML fragment.
///
/// Text nodes are joined with spaces and whitespace is collapsed. Input that
/// does not look like HTML is only whitespace-collapsed, so a literal `<` in
/// plain text survives.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<p>Olá <b>mundo</b></p>"), "Olá mundo");
/// assert_eq!(strip_html("2 < 3"), "2 < 3");
/// ```
pub fn strip_html(html: &str) -> String {
    if !looks_like_html(html) {
        return collapse_whitespace(html);
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Cut text to at most `max` characters at a word boundary, adding `…`.
///
/// # Arguments
///
/// * `text` - Plain text to shorten
/// * `max` - Character budget before the ellipsis
///
/// # Returns
///
/// `text` unchanged when it fits, otherwise the longest word-aligned prefix
/// with trailing punctuation dropped and `…` appended.
pub fn truncate_words(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => &head[..pos],
        _ => head.as_str(),
    };
    format!("{}…", cut.trim_end_matches([',', ';', ':', '.', ' ', '-']))
}

/// Derive a plain-text excerpt from an HTML (or plain) body.
pub fn excerpt_from_body(body: &str, max: usize) -> Option<String> {
    let text = strip_html(body);
    if text.is_empty() {
        None
    } else {
        Some(truncate_words(&text, max))
    }
}

/// Estimated reading time in whole minutes, never below one.
pub fn reading_minutes(body: &str) -> u32 {
    let words = strip_html(body).split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// HTML-escape a string for text and attribute positions.
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn plain text into escaped `<p>` paragraphs split on blank lines.
pub fn paragraphs_to_html(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", html_escape(p).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate a string for logging purposes.
///
/// Webhook bodies can be large; only the head goes into log events.
///
/// # Arguments
///
/// * `s` - Text to log
/// * `max` - Characters to keep
///
/// # Returns
///
/// `s` itself when it has at most `max` characters, otherwise its first
/// `max` characters followed by `…(+N bytes)`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("curto", 100), "curto");
/// assert_eq!(truncate_for_log(&"x".repeat(50), 10), "xxxxxxxxxx…(+40 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON, as
/// when a webhook response is cut off mid-body.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
/// Run before fetching so a read-only output fails the build early.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the probe file
/// cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Olá, Mundo!"), "ola-mundo");
        assert_eq!(slugify("  Ciência & Tecnologia "), "ciencia-tecnologia");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("¿Qué pasó en 2024?"), "que-paso-en-2024");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Título"), "titulo");
        assert_eq!(normalize_key("cover_image"), "coverimage");
        assert_eq!(normalize_key("coverImage"), "coverimage");
        assert_eq!(normalize_key("Published At"), "publishedat");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p><p>again</p>"),
            "Hello world again"
        );
        assert_eq!(strip_html("plain   text\n here"), "plain text here");
        assert_eq!(strip_html("<p>Olá <b>mundo</b></p>"), "Olá mundo");
        assert_eq!(strip_html("2 < 3"), "2 < 3");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("short", 160), "short");
        assert_eq!(truncate_words("one two three four", 10), "one two…");
        assert_eq!(truncate_words("abcdefghijkl", 5), "abcde…");
    }

    #[test]
    fn test_reading_minutes() {
        assert_eq!(reading_minutes(""), 1);
        let body = "word ".repeat(401);
        assert_eq!(reading_minutes(&body), 3);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_paragraphs_to_html() {
        assert_eq!(
            paragraphs_to_html("First line\nstill first\n\nSecond <p>"),
            "<p>First line<br>still first</p>\n<p>Second &lt;p&gt;</p>"
        );
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_looks_truncated() {
        let eof = serde_json::from_str::<serde_json::Value>(r#"{"posts": [1, 2"#).unwrap_err();
        assert!(looks_truncated(&eof));
        let syntax = serde_json::from_str::<serde_json::Value>("{]").unwrap_err();
        assert!(!looks_truncated(&syntax));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
