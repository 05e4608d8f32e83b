use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::{ErrorKind, Excludes, Result};

/// `href="..."` and `href='...'` attribute values
static HTML_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href=(?:"([^"]*)"|'([^']*)')"#).expect("valid href regex"));

/// Quoted string literals starting with `http://` or `https://`
static CODE_URL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(https?://[^"\r\n]*)"|'(https?://[^'\r\n]*)'|`(https?://[^`]*)`"#)
        .expect("valid string literal regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    /// Markup, links live in `href` attributes
    Html,
    /// Script sources (ts, tsx, js, jsx), links live in string literals
    Code,
}

impl<P: AsRef<Path>> From<P> for FileType {
    /// Detect if the given path points to an HTML file or a script source.
    fn from(p: P) -> FileType {
        match p.as_ref().extension() {
            Some(ext) if ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm") => {
                FileType::Html
            }
            _ => FileType::Code,
        }
    }
}

/// Extract unparsed URL strings from HTML markup.
fn extract_links_from_html(input: &str) -> Vec<&str> {
    HTML_HREF
        .captures_iter(input)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .filter(|href| href.starts_with("http"))
        .collect()
}

/// Extract unparsed URL strings from script sources.
fn extract_links_from_code(input: &str) -> Vec<&str> {
    CODE_URL_LITERAL
        .captures_iter(input)
        .filter_map(|caps| caps.iter().skip(1).flatten().next())
        .map(|m| m.as_str())
        .collect()
}

/// Extract external links from a piece of source text.
///
/// URLs are returned verbatim, in document order. Nothing is validated or
/// normalized.
pub fn extract_links(input: &str, file_type: FileType, excludes: &Excludes) -> Vec<String> {
    let links = match file_type {
        FileType::Html => extract_links_from_html(input),
        FileType::Code => extract_links_from_code(input),
    };
    links
        .into_iter()
        .filter(|url| !excludes.is_excluded(url))
        .map(String::from)
        .collect()
}

/// Read a source file and extract its external links based on its extension
pub fn extract_links_from_file(path: &Path, excludes: &Excludes) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| ErrorKind::io(path, e))?;
    Ok(extract_links(&content, FileType::from(path), excludes))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn links(input: &str, file_type: FileType) -> Vec<String> {
        extract_links(input, file_type, &Excludes::default())
    }

    #[test]
    fn test_file_type() {
        assert_eq!(FileType::from(Path::new("index.html")), FileType::Html);
        assert_eq!(FileType::from(Path::new("INDEX.HTML")), FileType::Html);
        assert_eq!(FileType::from(Path::new("Page.tsx")), FileType::Code);
        assert_eq!(FileType::from(Path::new("util.js")), FileType::Code);
        assert_eq!(FileType::from(Path::new("noextension")), FileType::Code);
    }

    #[test]
    fn test_extract_html_links() {
        let input = r#"<html>
                <a href="https://sharepoint.example.com/x">intranet</a>
                <a href="https://example.com/y">external</a>
                <a href='http://example.org/single'>single quotes</a>
                <a href="/internal/route">internal</a>
                <a href="mailto:someone@example.com">mail</a>
            </html>"#;
        assert_eq!(
            links(input, FileType::Html),
            vec!["https://example.com/y", "http://example.org/single"]
        );
    }

    #[test]
    fn test_html_ignores_links_outside_href() {
        let input = r#"<p>See https://example.com/text</p><img src="https://example.com/a.png">"#;
        assert!(links(input, FileType::Html).is_empty());
    }

    #[test]
    fn test_extract_code_links() {
        let input = r#"
            const css = "https://fonts.googleapis.com/css";
            const api = "https://example.com/api";
            const other = 'http://example.org/path?query=1#hash';
            const tpl = `https://example.net/${id}`;
            const relative = "/applications";
        "#;
        assert_eq!(
            links(input, FileType::Code),
            vec![
                "https://example.com/api",
                "http://example.org/path?query=1#hash",
                "https://example.net/${id}",
            ]
        );
    }

    #[test]
    fn test_code_requires_literal_to_start_with_scheme() {
        let input = r#"const text = "visit https://example.com today";"#;
        assert!(links(input, FileType::Code).is_empty());
    }

    #[test]
    fn test_jsx_attributes_are_string_literals() {
        let input = r#"<Link href="https://example.com/jsx">label</Link>"#;
        assert_eq!(links(input, FileType::Code), vec!["https://example.com/jsx"]);
    }

    #[test]
    fn test_extract_links_from_missing_file() {
        let res = extract_links_from_file(Path::new("does/not/exist.tsx"), &Excludes::default());
        assert!(matches!(res, Err(ErrorKind::IoError(_, _))));
    }
}
