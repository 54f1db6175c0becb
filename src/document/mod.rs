//! Rich-text document model and the renderer seam.
//!
//! The model is a flat run sequence: styled text interleaved with embedded
//! objects. `DocumentRenderer` abstracts the platform capability the
//! pipeline needs — markup to model, model to on-disk package — so the
//! resolution logic stays independent of the packaging format.

mod convert;
mod html;
mod package;
mod rtf;

use std::path::{Path, PathBuf};

pub use html::render_note_html;
pub use package::unique_package_path;

use crate::config::pdf_placeholder;
use crate::error::Result;
use crate::issues::{IssueCategory, IssueTracker};

/// Character-level formatting of a text run, derived from the note
/// style sheet during markup conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
    /// Point size.
    pub font_size: u32,
}

impl Default for SpanStyle {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            monospace: false,
            font_size: 12,
        }
    }
}

/// A position in the document holding a bound external resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedObject {
    /// File to embed when the package is written.
    pub source: PathBuf,
    /// Display filename inside the package; unbound runs have none.
    pub preferred_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Span {
    Text { text: String, style: SpanStyle },
    Object(EmbeddedObject),
}

/// An editable rich-text document: ordered spans of styled text and
/// embedded-object runs.
#[derive(Debug, Clone, Default)]
pub struct RichDocument {
    pub spans: Vec<Span>,
}

impl RichDocument {
    /// Append text, merging into the previous span when the style matches.
    pub fn push_text(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(Span::Text {
            text: last,
            style: last_style,
        }) = self.spans.last_mut()
        {
            if *last_style == style {
                last.push_str(text);
                return;
            }
        }
        self.spans.push(Span::Text {
            text: text.to_string(),
            style,
        });
    }

    pub fn push_object(&mut self, object: EmbeddedObject) {
        self.spans.push(Span::Object(object));
    }

    /// Last character of the document's text, objects counting as a
    /// non-newline position.
    pub fn last_char(&self) -> Option<char> {
        match self.spans.last()? {
            Span::Text { text, .. } => text.chars().last(),
            Span::Object(_) => Some('\u{FFFC}'),
        }
    }

    /// Plain text view; embedded objects appear as U+FFFC.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                Span::Text { text, .. } => out.push_str(text),
                Span::Object(_) => out.push('\u{FFFC}'),
            }
        }
        out
    }

    pub fn objects(&self) -> impl Iterator<Item = &EmbeddedObject> {
        self.spans.iter().filter_map(|span| match span {
            Span::Object(object) => Some(object),
            Span::Text { .. } => None,
        })
    }

    /// Bind embedded-object runs to image filenames by position: the Nth
    /// run gets the Nth name. Runs beyond the name list stay unbound.
    /// Returns how many runs were bound.
    pub fn assign_image_names(&mut self, names: &[String]) -> usize {
        let mut index = 0;
        for span in &mut self.spans {
            if let Span::Object(object) = span {
                if index >= names.len() {
                    break;
                }
                object.preferred_name = Some(names[index].clone());
                index += 1;
            }
        }
        index
    }

    /// Replace the first occurrence of a literal token with an embedded
    /// object, splitting the containing text span. Returns false when the
    /// token is not present.
    pub fn replace_placeholder(&mut self, token: &str, object: EmbeddedObject) -> bool {
        for i in 0..self.spans.len() {
            let (before, after, style) = match &self.spans[i] {
                Span::Text { text, style } => match text.find(token) {
                    Some(pos) => (
                        text[..pos].to_string(),
                        text[pos + token.len()..].to_string(),
                        *style,
                    ),
                    None => continue,
                },
                Span::Object(_) => continue,
            };

            let mut replacement = Vec::with_capacity(3);
            if !before.is_empty() {
                replacement.push(Span::Text {
                    text: before,
                    style,
                });
            }
            replacement.push(Span::Object(object));
            if !after.is_empty() {
                replacement.push(Span::Text { text: after, style });
            }
            self.spans.splice(i..=i, replacement);
            return true;
        }
        false
    }
}

/// The platform capability the pipeline is generic over: turn styled markup
/// into a document model, and serialize a model to an on-disk package.
pub trait DocumentRenderer {
    /// Convert wrapped HTML into a document model, resolving relative image
    /// sources against the attachment directory.
    fn render(&self, markup: &str, base_dir: &Path) -> Result<RichDocument>;

    /// Serialize the model to a package at the given (already unique) path.
    fn write_package(&self, document: &RichDocument, dest: &Path) -> Result<()>;
}

/// Shipped renderer: RTFD-style package directories with an RTF body.
#[derive(Debug, Default)]
pub struct RtfdRenderer;

impl DocumentRenderer for RtfdRenderer {
    fn render(&self, markup: &str, base_dir: &Path) -> Result<RichDocument> {
        convert::html_to_document(markup, base_dir)
    }

    fn write_package(&self, document: &RichDocument, dest: &Path) -> Result<()> {
        package::write_rtfd_package(document, dest)
    }
}

/// Replace each PDF placeholder token, in original index order, with an
/// embedded-PDF object whose preferred filename is the URL-decoded basename.
///
/// A missing PDF file or an unfindable token is recorded and skipped — the
/// token then stays as visible text in the output, a reported defect rather
/// than a hard failure.
pub fn embed_pdf_attachments(
    document: &mut RichDocument,
    pdfs: &[String],
    resources_dir: &Path,
    issues: &mut IssueTracker,
) {
    for (index, file_name) in pdfs.iter().enumerate() {
        let decoded = urlencoding::decode(file_name)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| file_name.clone());
        let pdf_path = resources_dir.join(&decoded);

        if !pdf_path.exists() {
            log::error!("Invalid PDF attachment in {}", pdf_path.display());
            issues.record(
                IssueCategory::InvalidAttachment,
                format!("Invalid PDF attachment in {}", pdf_path.display()),
            );
            continue;
        }

        let token = pdf_placeholder(index);
        let object = EmbeddedObject {
            source: pdf_path,
            preferred_name: Some(decoded),
        };
        if !document.replace_placeholder(&token, object) {
            log::error!("Placeholder {} not found in document", token);
            issues.record(
                IssueCategory::Attachment,
                format!("Missing placeholder {} in document", token),
            );
        }
    }
}
