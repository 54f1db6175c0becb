//! Fixed configuration for the conversion pipeline.
//!
//! These are deliberate constants, not CLI flags — the values mirror the
//! defaults of the Apple Notes import workflow this tool targets.

use std::time::Duration;

/// Name of the attachment subdirectory inside the input tree.
pub const RESOURCES_DIR_NAME: &str = "_resources";

/// Name of the output directory created next to the input tree.
pub const OUTPUT_DIR_NAME: &str = "rtfd_files";

/// Package extension of one converted note.
pub const PACKAGE_EXTENSION: &str = "rtfd";

/// Filename Apple's HTML importer drops into a package when it cannot
/// resolve an attachment. Its presence marks a broken conversion.
pub const PLACEHOLDER_ARTIFACT: &str = "Attachment.png";

/// Ordinal placeholder token substituted for a PDF reference during body
/// rewriting, later replaced by the embedded PDF object.
pub fn pdf_placeholder(index: usize) -> String {
    format!("[[PDF_ATTACHMENT_{}]]", index)
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Titles longer than this fall back to the note's filename.
    pub max_title_length: usize,
    /// Attempts per remote image download.
    pub retry_attempts: u32,
    /// Fixed delay between download attempts.
    pub retry_delay: Duration,
    /// Attachment extensions treated as embeddable images (lowercase, no dot).
    pub image_extensions: &'static [&'static str],
    /// Per-request download timeout.
    pub download_timeout: Duration,
    /// Downloads with a declared length above this are refused.
    pub max_download_size: u64,
    /// Embedded files above this size are flagged in the post-pass.
    pub large_attachment_threshold: u64,
    /// Style sheet wrapped around every rendered note body, matching the
    /// target application's default note typography.
    pub stylesheet: &'static str,
}

pub const NOTE_STYLESHEET: &str = r#"
body { font-family: '-apple-system'; font-size: 12pt; }
h1 { font-size: 24pt; font-weight: bold; }
h2 { font-size: 18pt; font-weight: bold; }
h3 { font-size: 16pt; font-weight: bold; }
h4 { font-size: 14pt; font-weight: bold; }
h5 { font-size: 12pt; font-weight: bold; }
h6 { font-size: 12pt; font-weight: bold; }
p { margin: 0 0 12pt 0; }
strong, b { font-weight: bold; }
em, i { font-style: italic; }
ul, ol { margin: 0 0 12pt 24pt; }
li { margin: 0 0 6pt 0; }
blockquote { margin: 0 0 12pt 24pt; font-style: italic; color: #555; }
code { font-family: Menlo; background-color: #f4f4f4; padding: 2px 4px; }
pre { font-family: Menlo; background-color: #f4f4f4; padding: 6px; }
"#;

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_title_length: 100,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            image_extensions: &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp"],
            download_timeout: Duration::from_secs(30),
            max_download_size: 100 * 1024 * 1024,
            large_attachment_threshold: 10 * 1024 * 1024,
            stylesheet: NOTE_STYLESHEET,
        }
    }
}

impl ConvertConfig {
    /// Whether a lowercase extension (without dot) counts as an image.
    pub fn is_image_extension(&self, ext: &str) -> bool {
        self.image_extensions.contains(&ext)
    }
}
