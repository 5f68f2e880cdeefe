//! Parser for the `experiences.txt` block format.
//!
//! ```text
//! [KEYWORDS: career-rejection, firing]
//! [SOURCE: https://example.com/article]
//! Narrative text, possibly over
//! several lines.
//!
//! ---
//!
//! Next block...
//! ```
//!
//! Blocks are separated by a line holding exactly `---`. Bracket lines never contribute to
//! the text. Blocks without text are dropped: upstream extraction is imperfect and a bad
//! block must not sink the whole file.

use std::path::Path;

use tracing::debug;

use crate::{
    error::{Error, Result},
    schema::Experience,
};

pub const BLOCK_SEPARATOR: &str = "---";
const KEYWORDS_TAG: &str = "[KEYWORDS:";
const SOURCE_TAG: &str = "[SOURCE:";

/// Read and parse an experiences file. Only an unreadable file is an error.
pub async fn parse_experiences_file(path: &Path) -> Result<Vec<Experience>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_experiences(&raw))
}

pub fn parse_experiences(raw: &str) -> Vec<Experience> {
    split_blocks(raw)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, block)| {
            let parsed = parse_block(&block);
            if parsed.is_none() {
                debug!(block = idx, "dropping experience block without text");
            }
            parsed
        })
        .collect()
}

fn split_blocks(raw: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in raw.lines() {
        if line.trim_end_matches('\r') == BLOCK_SEPARATOR {
            blocks.push(std::mem::take(&mut current));
        } else {
            current.push(line.trim_end_matches('\r'));
        }
    }
    blocks.push(current);
    blocks.retain(|lines| lines.iter().any(|l| !l.trim().is_empty()));
    blocks
}

/// Inner content of a `[TAG: ...]` line.
fn tagged<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    line.trim()
        .strip_prefix(tag)
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

fn parse_block(lines: &[&str]) -> Option<Experience> {
    let keywords = lines
        .iter()
        .find_map(|l| tagged(l, KEYWORDS_TAG))
        .map(|inner| {
            inner
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let source_url = lines
        .iter()
        .find_map(|l| tagged(l, SOURCE_TAG))
        .filter(|url| !url.is_empty())
        .map(String::from);

    let text = lines
        .iter()
        .filter(|l| !l.trim_start().starts_with('['))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if text.is_empty() {
        return None;
    }

    Some(Experience {
        text,
        keywords,
        source_url,
    })
}

/// Render experiences back into the block format accepted by [`parse_experiences`].
pub fn render_experiences(experiences: &[Experience]) -> String {
    experiences
        .iter()
        .map(|exp| {
            let mut block = String::new();
            if !exp.keywords.is_empty() {
                block.push_str(&format!("{KEYWORDS_TAG} {}]\n", exp.keywords.join(", ")));
            }
            if let Some(url) = &exp.source_url {
                block.push_str(&format!("{SOURCE_TAG} {url}]\n"));
            }
            block.push_str(exp.text.trim());
            block.push('\n');
            block
        })
        .collect::<Vec<_>>()
        .join(&format!("\n{BLOCK_SEPARATOR}\n\n"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_and_plain_blocks() {
        let raw = "[KEYWORDS: a, b]\n[SOURCE: http://x]\nSome text\n---\nNo brackets just text";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0].keywords, vec!["a", "b"]);
        assert_eq!(parsed[0].source_url.as_deref(), Some("http://x"));
        assert_eq!(parsed[0].text, "Some text");

        assert!(parsed[1].keywords.is_empty());
        assert_eq!(parsed[1].source_url, None);
        assert_eq!(parsed[1].text, "No brackets just text");
    }

    #[test]
    fn tags_may_appear_anywhere_in_block() {
        let raw = "First line\n[SOURCE: https://bio.example/jobs]\nSecond line\n[KEYWORDS: firing]\n";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "First line\nSecond line");
        assert_eq!(parsed[0].keywords, vec!["firing"]);
        assert_eq!(
            parsed[0].source_url.as_deref(),
            Some("https://bio.example/jobs")
        );
    }

    #[test]
    fn first_tag_line_wins() {
        let raw = "[KEYWORDS: one]\n[KEYWORDS: two]\n[SOURCE: http://a]\n[SOURCE: http://b]\nbody";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed[0].keywords, vec!["one"]);
        assert_eq!(parsed[0].source_url.as_deref(), Some("http://a"));
    }

    #[test]
    fn empty_tags_yield_absent_values() {
        let raw = "[KEYWORDS:]\n[SOURCE:   ]\nbody";
        let parsed = parse_experiences(raw);
        assert!(parsed[0].keywords.is_empty());
        assert_eq!(parsed[0].source_url, None);
    }

    #[test]
    fn keywords_keep_order_and_duplicates() {
        let raw = "[KEYWORDS: loss, grief , loss,, resilience]\nbody";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed[0].keywords, vec!["loss", "grief", "loss", "resilience"]);
    }

    #[test]
    fn blocks_without_text_are_dropped() {
        let raw = "[KEYWORDS: orphan]\n[SOURCE: http://x]\n\n---\n\n   \n---\nkept\n---\n[note to self]\n";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "kept");
    }

    #[test]
    fn unknown_bracket_lines_are_not_text() {
        let raw = "[IMPORTANT]\nReal text\n[KEYWORDS: unclosed\nmore";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed[0].text, "Real text\nmore");
        assert!(parsed[0].keywords.is_empty());
    }

    #[test]
    fn separator_must_be_the_whole_line() {
        let raw = "dash --- inside\n----\nstill same block\r\n---\r\nnext";
        let parsed = parse_experiences(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text, "dash --- inside\n----\nstill same block");
        assert_eq!(parsed[1].text, "next");
    }

    #[test]
    fn render_then_parse_preserves_records() {
        let original = vec![
            Experience::new("Fired from his own company\nat thirty.")
                .with_keywords(["career-rejection", "firing"])
                .with_source("https://example.com/jobs"),
            Experience::new("Rejected by 12 publishers"),
            Experience::new("Grew up in poverty").with_keywords(["poverty"]),
        ];
        let rendered = render_experiences(&original);
        assert_eq!(parse_experiences(&rendered), original);
    }

    #[test]
    fn empty_input_parses_to_nothing() {
        assert!(parse_experiences("").is_empty());
        assert!(parse_experiences("\n\n---\n\n").is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_a_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = parse_experiences_file(&tmp.path().join("experiences.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("experiences.txt");
        std::fs::write(&path, "[KEYWORDS: a]\nfrom disk\n").unwrap();
        let parsed = parse_experiences_file(&path).await.unwrap();
        assert_eq!(parsed, vec![Experience::new("from disk").with_keywords(["a"])]);
    }
}
