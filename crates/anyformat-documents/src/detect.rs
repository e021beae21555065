use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

/// Structural markers counted by [`is_likely_html`].
static HTML_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<[a-z]+(\s+[^>]*)?>",                          // opening tags
        r"(?i)</[a-z]+>",                                    // closing tags
        r"(?i)&[a-z]+;",                                     // entities
        r"(?i)<br\s*/?>",                                    // line breaks
        r"(?i)<img\s+[^>]*src\s*=",                          // images
        r"(?i)<a\s+[^>]*href\s*=",                           // links
        r"(?i)<(h[1-6]|strong|em|code|pre)>",                // text formatting
        r"(?i)<(ul|ol|li)>",                                 // lists
        r"(?i)<(table|tr|td|th)>",                           // tables
        r"(?i)<(article|section|header|footer|main|nav)>",   // semantic sections
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Open tag, text without markup, then a close tag; names are compared afterwards.
static TAG_PAIR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<([a-z]+)(\s+[^>]*)?>[^<]*</([a-z]+)>").ok());

static TAG_OPEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)<[a-z]+").ok());

/// Whether `s` parses as an absolute URL.
pub fn is_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

/// Whether `s` parses as JSON.
pub fn is_json(s: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(s).is_ok()
}

/// Heuristic: does this string look like HTML markup?
///
/// Two or more distinct structural patterns are enough. A single pattern
/// counts only when backed by a matching open/close tag pair or at least two
/// tag openings.
pub fn is_likely_html(s: &str) -> bool {
    if s.len() < 3 {
        return false;
    }
    if !s.contains('<') && !s.contains('&') {
        return false;
    }

    let matches = HTML_PATTERNS.iter().filter(|re| re.is_match(s)).count();
    match matches {
        0 => false,
        1 => has_tag_pair(s) || tag_openings(s) >= 2,
        _ => true,
    }
}

fn has_tag_pair(s: &str) -> bool {
    let Some(re) = TAG_PAIR.as_ref() else {
        return false;
    };
    re.captures_iter(s)
        .any(|caps| caps[1].eq_ignore_ascii_case(&caps[3]))
}

fn tag_openings(s: &str) -> usize {
    TAG_OPEN.as_ref().map_or(0, |re| re.find_iter(s).count())
}
