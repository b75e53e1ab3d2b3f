use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Cleans editor HTML (blog content, conference "about", committees) down to
/// a safe subset. Scripts, event handlers and inline styles are removed.
pub fn sanitize_rich_text(input: &str) -> String {
    let tags_to_allow = [
        "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "b", "strong", "i", "em", "u", "s",
        "a", "ul", "ol", "li", "blockquote", "code", "pre", "img", "table", "thead", "tbody", "tr",
        "th", "td", "span", "div",
    ];
    let safe_tags = tags_to_allow.iter().cloned().collect::<HashSet<_>>();
    let generic_attributes = ["title", "class"].iter().cloned().collect::<HashSet<_>>();

    ammonia::Builder::new()
        .tags(safe_tags)
        .generic_attributes(generic_attributes)
        .link_rel(Some("noopener noreferrer nofollow"))
        .clean(input)
        .to_string()
}

/// Strips all HTML from input (titles, names, excerpts). Entities are
/// decoded again so the stored value is plain text.
pub fn strip_all_html(input: &str) -> String {
    let cleaned = ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&cleaned).trim().to_string()
}

fn non_slug_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"))
}

/// `"Machine Learning & AI"` -> `"machine-learning-ai"`.
pub fn slugify(input: &str) -> String {
    let lowered = strip_all_html(input).to_lowercase();
    non_slug_chars()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Splits a comma separated list, dropping blanks and case-insensitive repeats.
pub fn split_list(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(strip_all_html)
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rich_text_keeps_formatting_but_not_scripts() {
        let dirty = r#"<p onclick="steal()">Call for <strong>papers</strong></p><script>alert(1)</script>"#;
        assert_eq!(sanitize_rich_text(dirty), "<p>Call for <strong>papers</strong></p>");
    }

    #[test]
    fn links_get_a_safe_rel() {
        let cleaned = sanitize_rich_text(r#"<a href="https://example.org">site</a>"#);
        assert!(cleaned.contains(r#"rel="noopener noreferrer nofollow""#));
    }

    #[test]
    fn plain_text_fields_lose_all_tags() {
        assert_eq!(strip_all_html("  <b>Welcome</b> &amp; hello "), "Welcome & hello");
    }

    #[test]
    fn slugs_are_lowercase_and_hyphenated() {
        assert_eq!(slugify("Machine Learning & AI"), "machine-learning-ai");
        assert_eq!(slugify("  --Data Science--  "), "data-science");
    }

    #[test]
    fn lists_drop_blanks_and_repeats() {
        assert_eq!(split_list("AI, , ai, Ethics"), vec!["AI".to_string(), "Ethics".to_string()]);
    }
}
