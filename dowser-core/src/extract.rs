//! Link extraction from document text.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Matches http/https URLs in prose. The final character class is narrower
/// than the body class so a URL never ends in sentence punctuation
/// (`?`, `!`, `:`, `,`, `.`, `;`).
const LINK_PATTERN: &str = r"(?i)\bhttps?://[-A-Z0-9+&@#/%?=~_|!:,.;]*[-A-Z0-9+&@#/%=~_|]";

fn link_regex() -> &'static Regex {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE.get_or_init(|| Regex::new(LINK_PATTERN).expect("link pattern compiles"))
}

/// Extract all http/https URLs from `text`, deduplicated by exact string
/// equality, in order of first appearance.
///
/// Matching is case-insensitive but the extracted strings keep their
/// original casing, so `http://EXAMPLE.com` and `http://example.com` count
/// as two distinct links.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for m in link_regex().find_iter(text) {
        let url = m.as_str();
        if seen.insert(url) {
            links.push(url.to_string());
        }
    }

    debug!(count = links.len(), "extracted links");
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_dedups_in_order() {
        let text = "Check https://example.com/a and https://example.com/a, \
                    also http://other.example/b?q=1 please.";
        assert_eq!(
            extract_links(text),
            vec!["https://example.com/a", "http://other.example/b?q=1"]
        );
    }

    #[test]
    fn test_extract_strips_trailing_punctuation() {
        assert_eq!(extract_links("Read https://a.test/post."), vec!["https://a.test/post"]);
        assert_eq!(extract_links("Read https://a.test/post, then"), vec!["https://a.test/post"]);
        assert_eq!(extract_links("Really? https://a.test/post!"), vec!["https://a.test/post"]);
        assert_eq!(extract_links("https://a.test/post; and"), vec!["https://a.test/post"]);
        assert_eq!(extract_links("https://a.test/post:"), vec!["https://a.test/post"]);
        assert_eq!(extract_links("Is it https://a.test/post?"), vec!["https://a.test/post"]);
    }

    #[test]
    fn test_extract_keeps_query_strings() {
        assert_eq!(
            extract_links("https://a.test/search?q=rust&page=2 is useful"),
            vec!["https://a.test/search?q=rust&page=2"]
        );
    }

    #[test]
    fn test_extract_scheme_case_insensitive() {
        assert_eq!(
            extract_links("Shouting: HTTPS://A.TEST/LOUD end"),
            vec!["HTTPS://A.TEST/LOUD"]
        );
    }

    #[test]
    fn test_extract_dedup_is_case_sensitive() {
        let text = "http://a.test/x and http://a.test/X";
        assert_eq!(extract_links(text), vec!["http://a.test/x", "http://a.test/X"]);
    }

    #[test]
    fn test_extract_adjacent_urls_split_by_brackets() {
        let text = "(https://a.test/one)(https://b.test/two)";
        assert_eq!(extract_links(text), vec!["https://a.test/one", "https://b.test/two"]);
    }

    #[test]
    fn test_extract_requires_word_boundary() {
        // Scheme glued to a preceding word is not a link.
        assert!(extract_links("foohttps://a.test/x").is_empty());
    }

    #[test]
    fn test_extract_requires_content_after_scheme() {
        assert!(extract_links("broken https:// link").is_empty());
    }

    #[test]
    fn test_extract_empty_and_linkless() {
        assert!(extract_links("").is_empty());
        assert!(extract_links("no links here at all").is_empty());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "See https://a.test/x and http://b.test/y.";
        assert_eq!(extract_links(text), extract_links(text));
    }
}
