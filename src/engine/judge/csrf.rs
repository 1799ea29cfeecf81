use crate::error::{Error, Kind, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static META: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="X-Csrf-Token"]"#).expect("invalid csrf meta selector"));
static INPUT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name="csrf_token"]"#).expect("invalid csrf input selector"));
static SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"csrf\s*=\s*['"]([0-9A-Za-z]+)['"]"#).expect("invalid csrf regex"));

/// Looks for the token in a meta tag, then a hidden form input, then an inline
/// script assignment. Empty values do not count as found.
pub fn extract_csrf(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let attr = |selector: &Selector, name: &str| {
        document
            .select(selector)
            .filter_map(|e| e.value().attr(name))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_owned)
    };
    attr(&META, "content")
        .or_else(|| attr(&INPUT, "value"))
        .or_else(|| {
            SCRIPT
                .captures(html)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_owned())
        })
        .ok_or_else(|| Error::with_kind(Kind::Csrf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Category;

    #[test]
    fn meta_tag() {
        let html = r#"<html><head><meta name="X-Csrf-Token" content="a1b2c3"/></head><body></body></html>"#;
        assert_eq!(extract_csrf(html).unwrap(), "a1b2c3");
    }

    #[test]
    fn hidden_input() {
        let html = r#"<form method="post"><input type="hidden" name="csrf_token" value="d4e5f6"/></form>"#;
        assert_eq!(extract_csrf(html).unwrap(), "d4e5f6");
    }

    #[test]
    fn inline_script() {
        let html = r#"<script type="text/javascript">var x = 1; Codeforces.csrf='0f9e8d';</script>"#;
        assert_eq!(extract_csrf(html).unwrap(), "0f9e8d");
    }

    #[test]
    fn meta_wins_over_later_forms() {
        let html = r#"<meta name="X-Csrf-Token" content="first"/><input name="csrf_token" value="second"/>"#;
        assert_eq!(extract_csrf(html).unwrap(), "first");
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = extract_csrf("<html><body><p>nothing here</p></body></html>").unwrap_err();
        assert!(matches!(err.kind(), Kind::Csrf));
        assert_eq!(err.category(), Category::Auth);
        let err = extract_csrf(r#"<meta name="X-Csrf-Token" content=""/>"#).unwrap_err();
        assert!(matches!(err.kind(), Kind::Csrf));
    }
}
