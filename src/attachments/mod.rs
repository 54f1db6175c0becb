//! Inline attachment resolution: classifies `[label](target)` spans in a
//! note body and rewrites each into a form the document renderer can bind
//! to a real embedded object.
//!
//! This is a heuristic text scan, not a markup parse — nested or malformed
//! spans may be misclassified. The single left-to-right pass is load-bearing:
//! the index of each list entry must match the order its marker is later
//! encountered in the rendered output.

use std::path::Path;

use regex::{Captures, Regex};

use crate::config::{pdf_placeholder, ConvertConfig};

/// Ordered attachment filenames collected while rewriting one note body.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAttachments {
    /// Image basenames, in order of appearance.
    pub images: Vec<String>,
    /// PDF basenames; index N corresponds to the `[[PDF_ATTACHMENT_N]]` token.
    pub pdfs: Vec<String>,
}

/// Rewrite every attachment reference in a body, collecting the ordered
/// image and PDF lists.
///
/// PDF targets become ordinal placeholder tokens, image targets become
/// `<img>` tags rooted at the attachment directory, and everything else is
/// left untouched.
pub fn resolve_attachments(
    body: &str,
    resources_dir: &Path,
    config: &ConvertConfig,
) -> (String, ResolvedAttachments) {
    let attachment_re = Regex::new(r"\[.*?\]\((.*?)\)").unwrap();
    let mut resolved = ResolvedAttachments::default();

    let rewritten = attachment_re.replace_all(body, |caps: &Captures| {
        let target = &caps[1];
        let file_name = match Path::new(target).file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => return caps[0].to_string(),
        };
        let lower = file_name.to_lowercase();

        if lower.ends_with(".pdf") {
            resolved.pdfs.push(file_name);
            pdf_placeholder(resolved.pdfs.len() - 1)
        } else if has_image_extension(&lower, config) {
            let absolute = resources_dir.join(&file_name);
            resolved.images.push(file_name.clone());
            format!(
                r#"<img src="{}" alt="{}" title="{}">"#,
                absolute.display(),
                file_name,
                file_name
            )
        } else {
            caps[0].to_string()
        }
    });

    (rewritten.into_owned(), resolved)
}

fn has_image_extension(lower_name: &str, config: &ConvertConfig) -> bool {
    lower_name
        .rsplit_once('.')
        .map(|(_, ext)| config.is_image_extension(ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(body: &str) -> (String, ResolvedAttachments) {
        resolve_attachments(body, Path::new("/vault/_resources"), &ConvertConfig::default())
    }

    #[test]
    fn test_image_reference_becomes_img_tag() {
        let (out, resolved) = resolve("![img](../_resources/pic.png)");

        assert_eq!(resolved.images, vec!["pic.png"]);
        assert!(resolved.pdfs.is_empty());
        assert!(out.contains(r#"<img src="/vault/_resources/pic.png" alt="pic.png" title="pic.png">"#));
    }

    #[test]
    fn test_pdf_reference_becomes_placeholder() {
        let (out, resolved) = resolve("see [manual](../_resources/manual.pdf) here");

        assert_eq!(resolved.pdfs, vec!["manual.pdf"]);
        assert_eq!(out, "see [[PDF_ATTACHMENT_0]] here");
    }

    #[test]
    fn test_other_targets_untouched() {
        let body = "[site](https://example.com/page) and [doc](notes.txt)";
        let (out, resolved) = resolve(body);

        assert_eq!(out, body);
        assert!(resolved.images.is_empty());
        assert!(resolved.pdfs.is_empty());
    }

    #[test]
    fn test_mixed_order_preserved() {
        let body = "![a](A.png)\n[x](X.pdf)\n![b](B.png)\n[y](Y.pdf)";
        let (out, resolved) = resolve(body);

        assert_eq!(resolved.images, vec!["A.png", "B.png"]);
        assert_eq!(resolved.pdfs, vec!["X.pdf", "Y.pdf"]);
        assert!(out.contains("[[PDF_ATTACHMENT_0]]"));
        assert!(out.contains("[[PDF_ATTACHMENT_1]]"));
        let first_img = out.find("A.png").unwrap();
        let second_img = out.find("B.png").unwrap();
        assert!(first_img < second_img);
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let (_, resolved) = resolve("![a](PIC.PNG) [m](MANUAL.PDF)");
        assert_eq!(resolved.images, vec!["PIC.PNG"]);
        assert_eq!(resolved.pdfs, vec!["MANUAL.PDF"]);
    }
}
