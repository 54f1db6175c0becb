//! Splits a note file into front matter and body, derives a display title,
//! and repairs notes whose body opens with an attachment instead of text.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::ConvertConfig;
use crate::error::Result;

/// One input note, read once at the start of per-note processing.
#[derive(Debug, Clone)]
pub struct Note {
    /// Path of the source file.
    pub path: PathBuf,
    /// Key/value pairs from the leading `---` block (empty if absent).
    pub front_matter: HashMap<String, String>,
    /// Body text with front matter stripped and title inserted if needed.
    pub body: String,
    /// Display title: validated front-matter title, else the file stem.
    pub title: String,
}

impl Note {
    /// Read and parse a note file.
    pub fn parse(path: &Path, config: &ConvertConfig) -> Result<Note> {
        let raw = fs::read_to_string(path)?;
        let (front_matter, body) = extract_front_matter(&raw);
        let title = determine_title(&front_matter, path, config);
        let body = insert_title_if_needed(&body, &title);

        Ok(Note {
            path: path.to_path_buf(),
            front_matter,
            body,
            title,
        })
    }

    /// HTML-source notes skip markdown rendering downstream.
    pub fn is_html(&self) -> bool {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase() == "html")
            .unwrap_or(false)
    }

    /// Filename without extension; names the output package.
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Extract the leading `---`-delimited front matter block.
///
/// Only the first two `---` delimiters are considered, and only `key: value`
/// lines inside them are recognized. Without the block the mapping is empty
/// and the content is returned untouched.
pub fn extract_front_matter(content: &str) -> (HashMap<String, String>, String) {
    let mut front_matter = HashMap::new();

    if !content.starts_with("---") {
        return (front_matter, content.to_string());
    }

    let mut parts = content.splitn(3, "---");
    parts.next(); // leading empty segment before the first delimiter
    let block = match parts.next() {
        Some(block) => block,
        None => return (front_matter, content.to_string()),
    };
    let body = parts.next().unwrap_or("").to_string();

    for line in block.lines() {
        if let Some((key, value)) = line.split_once(": ") {
            front_matter.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    (front_matter, body)
}

/// Whether a front-matter title is usable as a display title.
pub fn is_valid_title(title: &str, max_length: usize) -> bool {
    let stripped = title.trim();
    if stripped.is_empty() {
        return false;
    }

    // YAML scalar markers that survive the line-based front matter split
    if matches!(stripped, "-" | ">" | ">-") {
        return false;
    }

    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    if tag_re.is_match(stripped) {
        return false;
    }

    let media_ext_re = Regex::new(r"(?i)\.(jpg|jpeg|png|gif|pdf|html?)$").unwrap();
    if media_ext_re.is_match(stripped) {
        return false;
    }

    let url_re = Regex::new(r"^https?://").unwrap();
    if url_re.is_match(stripped) {
        return false;
    }

    if stripped.chars().count() > max_length {
        return false;
    }

    true
}

/// Front-matter title when valid, else the file's base name.
fn determine_title(
    front_matter: &HashMap<String, String>,
    path: &Path,
    config: &ConvertConfig,
) -> String {
    let extracted = front_matter
        .get("title")
        .map(|t| t.trim())
        .unwrap_or_default();

    if is_valid_title(extracted, config.max_title_length) {
        extracted.to_string()
    } else {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Prepend `<title>\n\n` when the body opens with an attachment.
///
/// Heuristic prefix match over the start of the body only, after stripping
/// leading whitespace and `&nbsp;` markers: an image tag, an image span, a
/// PDF link, or an image span wrapped in a link all trigger the insertion so
/// the rendered note opens with a visible heading line.
pub fn insert_title_if_needed(body: &str, title: &str) -> String {
    let leading_re = Regex::new(r"(?i)^(\s|&nbsp;)+").unwrap();
    let stripped = leading_re.replace(body, "");

    let attachment_start_re = Regex::new(
        r"(?i)^(<img[^>]*?>|!\[.*?\]\(.*?\)|\[[^\]]*\]\(.*?\.pdf\)|\[\s*!\[.*?\]\(.*?\)\]\(.*?\))",
    )
    .unwrap();

    if attachment_start_re.is_match(&stripped) {
        log::info!("Inserting title '{}' before leading attachment", title);
        format!("{}\n\n{}", title, body)
    } else {
        body.to_string()
    }
}
