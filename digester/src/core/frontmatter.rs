//! Header (YAML frontmatter) handling for digest documents.
//!
//! A digest is `---<header>---<body>`. These helpers split, locate and edit
//! the header as text so the body is never reformatted.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// Header delimiter that opens and closes the frontmatter block.
pub const DELIMITER: &str = "---";

/// Delimiter as it appears at the start of a document line.
const DELIMITER_LINE: &str = "---\n";

static DRAFT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^draft:").expect("draft line regex should be valid"));

/// Split a document into `(header, rest)`.
///
/// Returns `None` when the document does not start with the delimiter or no
/// closing delimiter follows.
pub fn split_header(document: &str) -> Option<(&str, &str)> {
    if !document.starts_with(DELIMITER) {
        return None;
    }
    let mut parts = document.splitn(3, DELIMITER);
    let _leading = parts.next()?;
    let header = parts.next()?;
    let rest = parts.next()?;
    Some((header, rest))
}

/// Drop any commentary the model wrote before the header.
///
/// Returns the trimmed document and the number of characters dropped. Text
/// without a delimiter line is returned unchanged so validation can report it.
pub fn strip_preamble(raw: &str) -> (&str, usize) {
    match raw.find(DELIMITER_LINE) {
        Some(start) if start > 0 => (&raw[start..], raw[..start].chars().count()),
        _ => (raw, 0),
    }
}

/// Insert `image: <path>` into the header, before `draft:` when present.
pub fn inject_image(document: &str, image_path: &str) -> String {
    let Some((header, rest)) = split_header(document) else {
        return document.to_string();
    };

    let header = if DRAFT_LINE_RE.is_match(header) {
        let line = format!("image: {image_path}\ndraft:");
        DRAFT_LINE_RE
            .replacen(header, 1, NoExpand(&line))
            .into_owned()
    } else {
        format!("{}\nimage: {image_path}\n", header.trim_end())
    };

    format!("{DELIMITER}{header}{DELIMITER}{rest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_header_returns_header_and_body() {
        let doc = "---\ntitle: x\n---\nbody\n";
        let (header, rest) = split_header(doc).expect("header");
        assert_eq!(header, "\ntitle: x\n");
        assert_eq!(rest, "\nbody\n");
    }

    #[test]
    fn split_header_requires_closing_delimiter() {
        assert!(split_header("---\ntitle: x\n").is_none());
        assert!(split_header("title: x\n---\n").is_none());
    }

    #[test]
    fn strip_preamble_drops_commentary_and_counts_chars() {
        let raw = "Here is the digest:\n\n---\ntitle: x\n---\n";
        let (doc, dropped) = strip_preamble(raw);
        assert_eq!(doc, "---\ntitle: x\n---\n");
        assert_eq!(dropped, 21);
    }

    #[test]
    fn strip_preamble_keeps_text_without_delimiter() {
        let (doc, dropped) = strip_preamble("no header here");
        assert_eq!(doc, "no header here");
        assert_eq!(dropped, 0);

        let (doc, dropped) = strip_preamble("---\ntitle: x\n---\n");
        assert_eq!(doc, "---\ntitle: x\n---\n");
        assert_eq!(dropped, 0);
    }

    #[test]
    fn inject_image_goes_before_draft() {
        let doc = "---\ntitle: x\ndraft: false\n---\n\nBody\n";
        let updated = inject_image(doc, "/images/digests/a.svg");
        assert_eq!(
            updated,
            "---\ntitle: x\nimage: /images/digests/a.svg\ndraft: false\n---\n\nBody\n"
        );
    }

    #[test]
    fn inject_image_appends_when_no_draft() {
        let doc = "---\ntitle: x\n\n---\nBody\n";
        let updated = inject_image(doc, "/images/digests/a.svg");
        assert_eq!(updated, "---\ntitle: x\nimage: /images/digests/a.svg\n---\nBody\n");
    }

    #[test]
    fn inject_image_leaves_headerless_documents_alone() {
        assert_eq!(inject_image("plain text", "/x.svg"), "plain text");
    }
}
