// Cell text comes from uploaded files and ends up in HTML reports, so it is
// cleaned twice: once on ingestion (strip markup) and once on the way out
// (entity-escape whatever is left).
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static JS_SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript:").unwrap());
static EVENT_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)on\w+\s*=").unwrap());

/// Ingestion sanitizer applied to every cell value.
///
/// Removes HTML tags, `javascript:` prefixes and inline event-handler
/// patterns such as `onclick=`, then trims surrounding whitespace.
pub fn sanitize_cell(raw: &str) -> String {
    let s = TAG_RE.replace_all(raw, "");
    let s = JS_SCHEME_RE.replace_all(&s, "");
    let s = EVENT_ATTR_RE.replace_all(&s, "");
    s.trim().to_string()
}

/// Entity-escape `&`, `<`, `>`, `"` and `'` for HTML output.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_scripts() {
        assert_eq!(sanitize_cell("<b>Example</b> Motors"), "Example Motors");
        assert_eq!(sanitize_cell("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_cell("x onmouseover = y"), "x  y");
        assert_eq!(sanitize_cell("  Form  "), "Form");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(sanitize_cell("Cars.com - New"), "Cars.com - New");
        assert_eq!(sanitize_cell("01/15/2025 10:42 AM"), "01/15/2025 10:42 AM");
    }

    #[test]
    fn escapes_all_five_characters() {
        let out = escape_html(r#"A&B <Motors> "Best" O'Neil"#);
        assert!(out.contains("A&amp;B"));
        assert!(out.contains("&lt;Motors&gt;"));
        assert!(out.contains("&quot;Best&quot;"));
        assert!(!out.contains('\''));
        assert!(!out.contains('<'));
    }
}
