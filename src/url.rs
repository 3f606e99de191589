//! URL extraction from raw post text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\[\](){}]+"#).expect("valid regex"));

/// Extracts `http(s)` URLs from raw input text, in order of first
/// appearance, deduplicated.
///
/// Extraction is deliberately host-agnostic; deciding which URLs are
/// actionable is the registry's job.
///
/// # Panics
///
/// Panics if the internal URL regex fails to compile (this is a
/// compile-time constant and will not happen in practice).
#[must_use]
pub fn extract_urls(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result: Vec<String> = Vec::new();

    for m in URL_RE.find_iter(input) {
        let url = m.as_str().to_string();
        if seen.insert(url.clone()) {
            result.push(url);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_single_url() {
        let urls = extract_urls("https://drive.google.com/drive/folders/abc123");
        assert_eq!(urls, vec!["https://drive.google.com/drive/folders/abc123"]);
    }

    #[test]
    fn extract_multiple_space_separated_urls() {
        let input = "https://drive.google.com/a https://example.com/b";
        let urls = extract_urls(input);
        assert_eq!(
            urls,
            vec!["https://drive.google.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn extract_multiple_newline_separated_urls() {
        let input = "https://h.com/a\nhttps://h.com/b\nhttps://h.com/c";
        let urls = extract_urls(input);
        assert_eq!(
            urls,
            vec!["https://h.com/a", "https://h.com/b", "https://h.com/c"]
        );
    }

    #[test]
    fn extract_deduplicates_urls() {
        let input = "https://h.com/a https://h.com/a";
        let urls = extract_urls(input);
        assert_eq!(urls, vec!["https://h.com/a"]);
    }

    #[test]
    fn extract_http_url() {
        let urls = extract_urls("http://h.com/a");
        assert_eq!(urls, vec!["http://h.com/a"]);
    }

    #[test]
    fn extract_url_embedded_in_text() {
        let input = "sheet music here: https://drive.google.com/file/d/xyz?usp=sharing enjoy!";
        let urls = extract_urls(input);
        assert_eq!(urls, vec!["https://drive.google.com/file/d/xyz?usp=sharing"]);
    }

    #[test]
    fn extract_empty_input() {
        assert!(extract_urls("").is_empty());
    }

    #[test]
    fn extract_whitespace_only() {
        assert!(extract_urls("   \n\t  ").is_empty());
    }

    #[test]
    fn extract_garbage_returns_nothing() {
        assert!(extract_urls("not a url at all").is_empty());
    }

    #[test]
    fn extract_url_with_trailing_punctuation() {
        // \S+ style matching keeps the trailing dot; the fetch layer deals
        // with it when the host rejects the identifier.
        let urls = extract_urls("See https://h.com/file/abc.");
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("https://h.com/file/abc"));
    }

    #[test]
    fn extract_preserves_first_appearance_order() {
        let input = "https://h.com/b https://h.com/a https://h.com/b";
        let urls = extract_urls(input);
        assert_eq!(urls, vec!["https://h.com/b", "https://h.com/a"]);
    }
}
