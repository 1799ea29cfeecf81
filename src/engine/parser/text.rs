//! Text helpers shared by the problem parser and the submission pages.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

static TITLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][0-9]*\.\s+").expect("invalid title regex"));

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "br" | "li" | "ul" | "ol" | "table" | "tr" | "td" | "th" | "center"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre"
    )
}

/// `A. Watermelon` -> `Watermelon`, `B1. Foo` -> `Foo`.
pub fn clean_title(title: &str) -> String {
    TITLE_PREFIX.replace(title.trim(), "").into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn gather(element: ElementRef<'_>, skip: &[&str], out: &mut String) {
    for child in element.children() {
        if let Some(child) = ElementRef::wrap(child) {
            if child.value().classes().any(|c| skip.contains(&c)) {
                continue;
            }
            let block = is_block(child.value().name());
            if block {
                out.push(' ');
            }
            gather(child, skip, out);
            if block {
                out.push(' ');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Text of `element` with whitespace collapsed, leaving out every subtree
/// whose element carries one of the `skip` classes.
pub fn element_text(element: ElementRef<'_>, skip: &[&str]) -> String {
    let mut out = String::new();
    gather(element, skip, &mut out);
    collapse_whitespace(&out)
}

fn gather_pre(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child) = ElementRef::wrap(child) {
            match child.value().name() {
                "br" => out.push('\n'),
                "div" | "p" => {
                    gather_pre(child, out);
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                _ => gather_pre(child, out),
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Content of a `<pre>` sample block. Line breaks may come as `<br>` or as
/// one `<div>` per line.
pub fn pre_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    gather_pre(element, &mut raw);
    normalize_pre(&raw)
}

/// Trims trailing horizontal whitespace per line and drops blank lines at
/// either end. Leading whitespace on a line is data and stays.
pub fn normalize_pre(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .split('\n')
        .map(|l| l.trim_end_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\u{a0}')))
        .collect();
    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

fn quantity(text: &str) -> Option<(f64, String)> {
    let text = text.trim().replace(',', "");
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let value = text[..end].parse::<f64>().ok()?;
    Some((value, text[end..].trim().to_lowercase()))
}

/// `46 ms` -> 46, `1.5 s` -> 1500. Zero when unreadable.
pub fn parse_time_ms(text: &str) -> u64 {
    match quantity(text) {
        Some((v, unit)) if unit.is_empty() || unit.starts_with("ms") => v as u64,
        Some((v, unit)) if unit.starts_with('s') => (v * 1000.0) as u64,
        _ => 0,
    }
}

/// `256 KB` -> 262144, `1 MB` -> 1048576. Zero when unreadable.
pub fn parse_memory_bytes(text: &str) -> u64 {
    let (v, unit) = match quantity(text) {
        Some(q) => q,
        None => return 0,
    };
    let scale = match unit.as_str() {
        "" | "b" | "bytes" => 1.0,
        u if u.starts_with("kb") || u.starts_with("kilobyte") => 1024.0,
        u if u.starts_with("mb") || u.starts_with("megabyte") => 1024.0 * 1024.0,
        u if u.starts_with("gb") => 1024.0 * 1024.0 * 1024.0,
        _ => return 0,
    };
    (v * scale) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn titles() {
        assert_eq!(clean_title("A. Watermelon"), "Watermelon");
        assert_eq!(clean_title(" C2. Pieces (hard) "), "Pieces (hard)");
        assert_eq!(clean_title("Watermelon"), "Watermelon");
    }

    #[test]
    fn pre_with_line_breaks() {
        let doc = Html::parse_fragment("<pre>  1 2   <br>3 4 \t<br></pre>");
        assert_eq!(pre_text(first(&doc, "pre")), "  1 2\n3 4");
    }

    #[test]
    fn pre_with_line_divs() {
        let doc = Html::parse_fragment(
            r#"<pre><div class="test-example-line">3</div><div class="test-example-line"> 1 2 3</div></pre>"#,
        );
        assert_eq!(pre_text(first(&doc, "pre")), "3\n 1 2 3");
    }

    #[test]
    fn skips_structural_children() {
        let doc = Html::parse_fragment(
            r#"<div id="s"><div class="header">A. X</div><div><p>Hello
            world.</p><p>Bye.</p></div><div class="note">n</div></div>"#,
        );
        assert_eq!(element_text(first(&doc, "#s"), &["header", "note"]), "Hello world. Bye.");
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_time_ms("46 ms"), 46);
        assert_eq!(parse_time_ms("46\u{a0}ms"), 46);
        assert_eq!(parse_time_ms("2 s"), 2000);
        assert_eq!(parse_memory_bytes("256 KB"), 262_144);
        assert_eq!(parse_memory_bytes("1 MB"), 1_048_576);
        assert_eq!(parse_memory_bytes("1,024 KB"), 1_048_576);
        assert_eq!(parse_memory_bytes(""), 0);
        assert_eq!(parse_time_ms("—"), 0);
    }
}
