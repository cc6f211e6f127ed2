//! Parsing of HTML directory listings into file names
//!
//! The listing page links each file in the directory, usually by absolute
//! path (`/pub/time.series/pr/pr.series`). Only direct children are kept:
//! directories, navigation links, query/fragment links and nested paths are
//! dropped. The result is sorted and deduplicated, with the primary file
//! (if listed) moved to the front so it is refreshed first.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{DEFAULT_LISTING_FRAGMENT, DEFAULT_PRIMARY_FILE};

/// Anchor href with a double-quoted, single-quoted or bare value
static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s+href\s*=\s*(?:"([^"]+)"|'([^']+)'|([^\s>]+))"#)
        .expect("href pattern is valid")
});

/// Names that are never files even without a trailing slash
const NAVIGATION_NAMES: &[&str] = &["../", "./", "index.html"];

/// How a listing is filtered and ordered
#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Path fragment of the listed directory; links containing it are cut after it
    pub fragment: String,
    /// File moved to the head of the result when present
    pub primary_file: Option<String>,
    /// Maximum number of names returned (0 = unlimited)
    pub max_files: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            fragment: DEFAULT_LISTING_FRAGMENT.to_string(),
            primary_file: Some(DEFAULT_PRIMARY_FILE.to_string()),
            max_files: 0,
        }
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences instead of replacing them
pub fn decode_lossy_ignore(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    None => return out,
                }
            }
        }
    }
}

/// Extract every anchor href value, trimmed, in document order
pub fn extract_links(html: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(html)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|link| !link.is_empty())
        .collect()
}

/// Reduce a link to a candidate file name relative to the listed directory
fn candidate_name<'a>(link: &'a str, fragment: &str) -> &'a str {
    let name = if fragment.is_empty() {
        link
    } else {
        match link.rfind(fragment) {
            Some(pos) => &link[pos + fragment.len()..],
            None => link,
        }
    };
    name.trim()
}

/// Whether a candidate names a direct child file
pub fn is_direct_child_file(name: &str) -> bool {
    if name.is_empty() || name.ends_with('/') {
        return false;
    }
    if NAVIGATION_NAMES.contains(&name) {
        return false;
    }
    if name.starts_with('?') || name.starts_with('#') || name.starts_with('/') {
        return false;
    }
    !name.contains('/')
}

/// Filter, deduplicate and order raw links
pub fn select_files<I, S>(links: I, options: &ListingOptions) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = links
        .into_iter()
        .map(|link| candidate_name(link.as_ref(), &options.fragment).to_string())
        .filter(|name| is_direct_child_file(name))
        .collect();

    let mut files: Vec<String> = unique.into_iter().collect();

    if let Some(primary) = options.primary_file.as_deref() {
        if let Some(pos) = files.iter().position(|f| f == primary) {
            let primary = files.remove(pos);
            files.insert(0, primary);
        }
    }

    if options.max_files > 0 && files.len() > options.max_files {
        files.truncate(options.max_files);
    }

    files
}

/// Parse a listing document into the ordered list of file names
pub fn parse_listing(document: &[u8], options: &ListingOptions) -> Vec<String> {
    let html = decode_lossy_ignore(document);
    select_files(extract_links(&html), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ListingOptions {
        ListingOptions::default()
    }

    #[test]
    fn test_extract_quoted_and_bare_links() {
        let html = r#"<A HREF="/pub/time.series/pr/a.txt">a</A>
            <a href='b.txt'>b</a>
            <a   href = c.txt>c</a>"#;
        assert_eq!(extract_links(html), vec!["/pub/time.series/pr/a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_primary_pinned_first() {
        let links = ["b.txt", "a.txt", "pr.data.0.Current", "index.html", "sub/c.txt"];
        assert_eq!(
            select_files(links, &opts()),
            vec!["pr.data.0.Current", "a.txt", "b.txt"]
        );
    }

    #[test]
    fn test_fragment_stripped_from_absolute_links() {
        let links = [
            "/pub/time.series/pr/pr.series",
            "https://download.bls.gov/pub/time.series/pr/pr.period",
            "/pub/time.series/",
        ];
        assert_eq!(select_files(links, &opts()), vec!["pr.period", "pr.series"]);
    }

    #[test]
    fn test_navigation_and_query_links_dropped() {
        let links = ["../", "./", "?C=N;O=D", "#top", "/pub/", "dir/", "ok.txt"];
        assert_eq!(select_files(links, &opts()), vec!["ok.txt"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let links = ["a.txt", "/pub/time.series/pr/a.txt", "a.txt "];
        assert_eq!(select_files(links, &opts()), vec!["a.txt"]);
    }

    #[test]
    fn test_max_files_applied_after_pinning() {
        let options = ListingOptions {
            max_files: 2,
            ..opts()
        };
        let links = ["c", "b", "a", "pr.data.0.Current"];
        assert_eq!(select_files(links, &options), vec!["pr.data.0.Current", "a"]);
    }

    #[test]
    fn test_no_links_yields_empty() {
        assert!(parse_listing(b"<html><body>nothing</body></html>", &opts()).is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_ignored() {
        let mut doc = b"<a href=\"x".to_vec();
        doc.push(0xFF);
        doc.extend_from_slice(b"y.txt\">x</a>");
        assert_eq!(parse_listing(&doc, &opts()), vec!["xy.txt"]);
    }

    #[test]
    fn test_no_primary_configured() {
        let options = ListingOptions {
            primary_file: None,
            ..opts()
        };
        let links = ["b", "pr.data.0.Current", "a"];
        assert_eq!(select_files(links, &options), vec!["a", "b", "pr.data.0.Current"]);
    }
}
