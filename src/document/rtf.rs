//! RTF serialization of the rich-text model.
//!
//! The body file of an RTFD package. Embedded objects are written as
//! `\NeXTGraphic` groups naming the attachment file that sits next to the
//! body inside the package.

use crate::document::{EmbeddedObject, RichDocument, Span, SpanStyle};

pub fn document_to_rtf(document: &RichDocument) -> String {
    let mut out = String::new();
    out.push_str("{\\rtf1\\ansi\\ansicpg1252\\uc1\n");
    out.push_str(
        "{\\fonttbl{\\f0\\fnil\\fcharset0 .AppleSystemUIFont;}{\\f1\\fnil\\fcharset0 Menlo-Regular;}}\n",
    );

    for span in &document.spans {
        match span {
            Span::Text { text, style } => emit_text(&mut out, text, *style),
            Span::Object(object) => emit_attachment(&mut out, object),
        }
    }

    out.push_str("}\n");
    out
}

fn emit_text(out: &mut String, text: &str, style: SpanStyle) {
    out.push('{');
    out.push_str(if style.monospace { "\\f1" } else { "\\f0" });
    out.push_str(&format!("\\fs{}", style.font_size * 2));
    if style.bold {
        out.push_str("\\b");
    }
    if style.italic {
        out.push_str("\\i");
    }
    out.push(' ');
    escape_rtf(text, out);
    out.push_str("}\n");
}

fn emit_attachment(out: &mut String, object: &EmbeddedObject) {
    let name = attachment_display_name(object);
    out.push_str("{{\\NeXTGraphic ");
    escape_rtf(&name, out);
    out.push_str(" \\width0 \\height0}\\'ac}\n");
}

/// Name of the attachment file referenced from the body: the bound
/// preferred name when present, else the source file's own name.
pub fn attachment_display_name(object: &EmbeddedObject) -> String {
    object
        .preferred_name
        .clone()
        .or_else(|| {
            object
                .source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "Attachment".to_string())
}

/// Escape text for an RTF stream: control characters quoted, newlines as
/// paragraph breaks, non-ASCII as signed 16-bit `\u` escapes.
fn escape_rtf(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\par\n"),
            '\t' => out.push_str("\\tab "),
            c if (c as u32) < 0x80 => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
}
