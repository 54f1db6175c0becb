//! Wrapped HTML to rich-text model conversion.
//!
//! An event walk over the markup, tracking a style stack derived from the
//! note style sheet. This tolerates the tag soup real notes contain
//! (unclosed `<img>`, stray end tags) but hard syntax errors propagate as
//! the note's processing error.

use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;

use crate::document::{EmbeddedObject, RichDocument, SpanStyle};
use crate::error::{ConvertError, Result};

/// Elements with no content and no end tag; treated the same whether the
/// source writes `<img ...>` or `<img ... />`.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose entire subtree carries no note text.
const SKIPPED_TAGS: &[&str] = &["head", "style", "script", "title"];

/// Convert a wrapped HTML document into a `RichDocument`, resolving
/// relative image sources against the attachment directory.
pub fn html_to_document(markup: &str, base_dir: &Path) -> Result<RichDocument> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut doc = RichDocument::default();
    let mut styles: Vec<SpanStyle> = vec![SpanStyle::default()];
    let mut list_stack: Vec<Option<usize>> = Vec::new();
    let mut skip_depth: usize = 0;
    let mut pre_depth: usize = 0;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => {
                return Err(ConvertError::Markup(format!(
                    "HTML parse error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                if VOID_TAGS.contains(&name.as_str()) {
                    if skip_depth == 0 {
                        handle_void_tag(&mut doc, &styles, &name, &e, base_dir);
                    }
                } else if skip_depth > 0 {
                    skip_depth += 1;
                } else if SKIPPED_TAGS.contains(&name.as_str()) {
                    skip_depth = 1;
                } else {
                    open_tag(&mut doc, &mut styles, &mut list_stack, &mut pre_depth, &name);
                }
            }
            Ok(Event::Empty(e)) => {
                if skip_depth == 0 {
                    let name = tag_name(&e);
                    handle_void_tag(&mut doc, &styles, &name, &e, base_dir);
                }
            }
            Ok(Event::End(e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else {
                    let name = end_tag_name(&e);
                    close_tag(&mut doc, &mut styles, &mut list_stack, &mut pre_depth, &name);
                }
            }
            Ok(Event::Text(e)) => {
                if skip_depth == 0 {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    let decoded = html_escape::decode_html_entities(raw.as_ref()).into_owned();
                    push_body_text(&mut doc, &styles, &decoded, pre_depth > 0);
                }
            }
            Ok(Event::CData(e)) => {
                if skip_depth == 0 {
                    let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_body_text(&mut doc, &styles, &raw, pre_depth > 0);
                }
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    Ok(doc)
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn end_tag_name(e: &BytesEnd) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn handle_void_tag(
    doc: &mut RichDocument,
    styles: &[SpanStyle],
    name: &str,
    e: &BytesStart,
    base_dir: &Path,
) {
    match name {
        "img" => handle_img(doc, e, base_dir),
        // Every <br> is a break of its own; block boundaries dedupe instead
        "br" => doc.push_text("\n", *styles.last().unwrap()),
        "hr" => ensure_block_break(doc, *styles.last().unwrap()),
        _ => {}
    }
}

/// An image element becomes an embedded-object run. The filename binding
/// happens later, by position; here only the source path is recorded.
fn handle_img(doc: &mut RichDocument, e: &BytesStart, base_dir: &Path) {
    let mut src = None;
    for attr in e.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() == b"src" {
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            src = Some(html_escape::decode_html_entities(&raw).into_owned());
        }
    }

    let Some(src) = src else { return };
    if src.starts_with("http://") || src.starts_with("https://") {
        // Remote images should have been localized by the fetch pass;
        // anything left has no file to embed.
        log::warn!("Skipping remote image left in markup: {}", src);
        return;
    }

    let decoded = urlencoding::decode(&src)
        .map(|d| d.into_owned())
        .unwrap_or(src);
    let path = Path::new(&decoded);
    let source = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    doc.push_object(EmbeddedObject {
        source,
        preferred_name: None,
    });
}

fn open_tag(
    doc: &mut RichDocument,
    styles: &mut Vec<SpanStyle>,
    list_stack: &mut Vec<Option<usize>>,
    pre_depth: &mut usize,
    name: &str,
) {
    let mut style = *styles.last().unwrap();

    match name {
        "b" | "strong" => style.bold = true,
        "i" | "em" => style.italic = true,
        "code" | "tt" => style.monospace = true,
        "pre" => {
            style.monospace = true;
            *pre_depth += 1;
            ensure_block_break(doc, style);
        }
        "h1" => heading(doc, &mut style, 24),
        "h2" => heading(doc, &mut style, 18),
        "h3" => heading(doc, &mut style, 16),
        "h4" => heading(doc, &mut style, 14),
        "h5" | "h6" => heading(doc, &mut style, 12),
        "blockquote" => {
            style.italic = true;
            ensure_block_break(doc, style);
        }
        "p" | "div" | "table" | "tr" => ensure_block_break(doc, style),
        "ul" => {
            ensure_block_break(doc, style);
            list_stack.push(None);
        }
        "ol" => {
            ensure_block_break(doc, style);
            list_stack.push(Some(0));
        }
        "li" => {
            ensure_block_break(doc, style);
            let marker = match list_stack.last_mut() {
                Some(Some(counter)) => {
                    *counter += 1;
                    format!("{}. ", counter)
                }
                _ => "\u{2022} ".to_string(),
            };
            doc.push_text(&marker, style);
        }
        _ => {}
    }

    styles.push(style);
}

fn heading(doc: &mut RichDocument, style: &mut SpanStyle, size: u32) {
    style.bold = true;
    style.font_size = size;
    ensure_block_break(doc, *style);
}

fn close_tag(
    doc: &mut RichDocument,
    styles: &mut Vec<SpanStyle>,
    list_stack: &mut Vec<Option<usize>>,
    pre_depth: &mut usize,
    name: &str,
) {
    if styles.len() > 1 {
        styles.pop();
    }
    let style = *styles.last().unwrap();

    match name {
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "li" | "div" | "tr"
        | "table" => ensure_block_break(doc, style),
        "pre" => {
            *pre_depth = pre_depth.saturating_sub(1);
            ensure_block_break(doc, style);
        }
        "ul" | "ol" => {
            list_stack.pop();
            ensure_block_break(doc, style);
        }
        "td" | "th" => doc.push_text("\t", style),
        _ => {}
    }
}

/// Separate block elements with a single newline, never stacking them.
fn ensure_block_break(doc: &mut RichDocument, style: SpanStyle) {
    match doc.last_char() {
        None | Some('\n') => {}
        _ => doc.push_text("\n", style),
    }
}

/// Append text with HTML whitespace collapsing (runs of whitespace become
/// one space), except inside `<pre>` where layout is preserved.
fn push_body_text(doc: &mut RichDocument, styles: &[SpanStyle], text: &str, preserve: bool) {
    let style = *styles.last().unwrap();
    if preserve {
        doc.push_text(text, style);
        return;
    }

    let mut collapsed = String::with_capacity(text.len());
    let mut prev_space = matches!(doc.last_char(), None | Some('\n') | Some(' '));
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                collapsed.push(' ');
                prev_space = true;
            }
        } else {
            collapsed.push(ch);
            prev_space = false;
        }
    }

    doc.push_text(&collapsed, style);
}
