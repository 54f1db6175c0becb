//! End-to-end conversion: input tree preparation, per-note processing, and
//! the post-pass integrity checks over the produced output.
//!
//! Everything is sequential and synchronous. The normalize and fetch phases
//! finish over the whole tree before any note is parsed, so per-note
//! processing never races a body rewrite. A failed note aborts only that
//! note's remaining steps.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::attachments::resolve_attachments;
use crate::config::{
    ConvertConfig, OUTPUT_DIR_NAME, PACKAGE_EXTENSION, PLACEHOLDER_ARTIFACT, RESOURCES_DIR_NAME,
};
use crate::document::{
    embed_pdf_attachments, render_note_html, unique_package_path, DocumentRenderer, RtfdRenderer,
};
use crate::error::{ConvertError, Result};
use crate::issues::{IssueCategory, IssueTracker};
use crate::metadata;
use crate::note::Note;
use crate::resources::{fix_missing_extensions, RemoteFetcher};

/// Drives a whole conversion run. The renderer seam is swappable; the
/// default writes RTFD packages.
pub struct Converter {
    config: ConvertConfig,
    renderer: Box<dyn DocumentRenderer>,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self::with_renderer(config, Box::new(RtfdRenderer))
    }

    pub fn with_renderer(config: ConvertConfig, renderer: Box<dyn DocumentRenderer>) -> Self {
        Self { config, renderer }
    }

    /// Convert every note under `input_dir`, returning the package paths
    /// that were written. Problems that do not abort the run are collected
    /// in `issues`.
    pub fn run(&self, input_dir: &Path, issues: &mut IssueTracker) -> Result<Vec<PathBuf>> {
        let (output_dir, resources_dir) = setup_directories(input_dir)?;
        fs::create_dir_all(&output_dir)?;

        // Both preparation passes mutate note bodies in place and must
        // complete before any note is parsed.
        fix_missing_extensions(&resources_dir, input_dir, issues)?;
        RemoteFetcher::new(&self.config)?.fetch_all(input_dir, &resources_dir, issues)?;

        let mut written = Vec::new();
        for note_path in discover_notes(input_dir) {
            match self.process_note(&note_path, &resources_dir, &output_dir, issues) {
                Ok(package) => written.push(package),
                Err(e) => {
                    log::error!("Error processing {}: {}", note_path.display(), e);
                    issues.record(
                        IssueCategory::General,
                        format!("Error processing {}: {}", note_path.display(), e),
                    );
                }
            }
        }

        check_large_attachments(&output_dir, self.config.large_attachment_threshold, issues)?;
        check_placeholder_artifacts(&output_dir, issues)?;

        Ok(written)
    }

    /// Parse, resolve, assemble, and write one note.
    fn process_note(
        &self,
        note_path: &Path,
        resources_dir: &Path,
        output_dir: &Path,
        issues: &mut IssueTracker,
    ) -> Result<PathBuf> {
        let note = Note::parse(note_path, &self.config)?;
        let (body, resolved) = resolve_attachments(&note.body, resources_dir, &self.config);
        let markup = render_note_html(&body, note.is_html(), self.config.stylesheet);

        let mut document = self.renderer.render(&markup, resources_dir)?;

        let bound = document.assign_image_names(&resolved.images);
        let object_count = document.objects().count();
        if bound < object_count {
            // More embedded runs than resolved references; the tail stays
            // unbound rather than guessing a binding.
            log::warn!(
                "{}: {} embedded objects left unbound",
                note.path.display(),
                object_count - bound
            );
        }

        embed_pdf_attachments(&mut document, &resolved.pdfs, resources_dir, issues);

        let package_path = unique_package_path(output_dir, &note.file_stem());
        self.renderer.write_package(&document, &package_path)?;
        log::info!("Package saved to {}", package_path.display());

        metadata::apply_note_dates(&package_path, &note.front_matter, &note.path, issues);

        Ok(package_path)
    }
}

/// Validate the input tree and derive the output and attachment paths:
/// `<input>/../rtfd_files` and `<input>/_resources`.
pub fn setup_directories(input_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    if !input_dir.is_dir() {
        return Err(ConvertError::InputDirNotFound(input_dir.to_path_buf()));
    }
    if discover_notes(input_dir).is_empty() {
        return Err(ConvertError::NoNotesFound(input_dir.to_path_buf()));
    }

    let parent = input_dir.parent().unwrap_or(input_dir);
    Ok((
        parent.join(OUTPUT_DIR_NAME),
        input_dir.join(RESOURCES_DIR_NAME),
    ))
}

/// All note files under the input tree, in deterministic walk order.
pub fn discover_notes(input_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_note_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}

fn is_note_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref(),
        Some("md") | Some("html")
    )
}

fn packages_in(output_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(output_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_dir()
                && e.path()
                    .extension()
                    .map(|x| x.to_string_lossy() == PACKAGE_EXTENSION)
                    .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}

/// Flag any embedded file above the size threshold.
fn check_large_attachments(
    output_dir: &Path,
    threshold: u64,
    issues: &mut IssueTracker,
) -> Result<()> {
    for package in packages_in(output_dir) {
        for entry in fs::read_dir(&package)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() && meta.len() > threshold {
                issues.record(
                    IssueCategory::LargeAttachment,
                    format!(
                        "{} contains a large attachment: {}",
                        package.display(),
                        entry.file_name().to_string_lossy()
                    ),
                );
            }
        }
    }
    Ok(())
}

/// Flag packages carrying the unresolved-attachment placeholder artifact.
fn check_placeholder_artifacts(output_dir: &Path, issues: &mut IssueTracker) -> Result<()> {
    for package in packages_in(output_dir) {
        if package.join(PLACEHOLDER_ARTIFACT).exists() {
            issues.record(
                IssueCategory::BrokenPlaceholder,
                format!("{} contains {}", package.display(), PLACEHOLDER_ARTIFACT),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Lay out `<root>/notes` with a `_resources` subdirectory.
    fn make_vault(root: &Path) -> (PathBuf, PathBuf) {
        let input = root.join("notes");
        let resources = input.join(RESOURCES_DIR_NAME);
        fs::create_dir_all(&resources).unwrap();
        (input, resources)
    }

    fn run(input: &Path) -> (Vec<PathBuf>, IssueTracker) {
        let mut issues = IssueTracker::new();
        let written = Converter::new(ConvertConfig::default())
            .run(input, &mut issues)
            .unwrap();
        (written, issues)
    }

    #[test]
    fn test_end_to_end_recipe_note() {
        let dir = TempDir::new().unwrap();
        let (input, resources) = make_vault(dir.path());
        fs::write(resources.join("pic.png"), PNG_HEADER).unwrap();
        fs::write(
            input.join("Recipe.md"),
            "---\ntitle: Pasta\ncreated: 2023-01-01 10:00:00Z\nupdated: 2023-01-02 10:00:00Z\n---\n\n![img](../_resources/pic.png)\n",
        )
        .unwrap();

        let (written, issues) = run(&input);

        assert!(issues.is_empty());
        assert_eq!(written, vec![dir.path().join("rtfd_files/Recipe.rtfd")]);

        let package = &written[0];
        assert!(package.join("pic.png").is_file());

        let rtf = fs::read_to_string(package.join("TXT.rtf")).unwrap();
        // Leading-attachment fix puts the title first
        assert!(rtf.contains("Pasta"));
        assert!(rtf.contains("\\NeXTGraphic pic.png"));

        let modified: DateTime<Utc> =
            fs::metadata(package).unwrap().modified().unwrap().into();
        assert_eq!(modified, Utc.with_ymd_and_hms(2023, 1, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_colliding_stems_get_numeric_suffix() {
        let dir = TempDir::new().unwrap();
        let (input, _) = make_vault(dir.path());
        fs::create_dir_all(input.join("a")).unwrap();
        fs::create_dir_all(input.join("b")).unwrap();
        fs::write(input.join("a/Note.md"), "first").unwrap();
        fs::write(input.join("b/Note.md"), "second").unwrap();

        let (written, _) = run(&input);

        let mut names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Note.rtfd", "Note_1.rtfd"]);
    }

    #[test]
    fn test_missing_pdf_leaves_visible_token() {
        let dir = TempDir::new().unwrap();
        let (input, _) = make_vault(dir.path());
        fs::write(
            input.join("Doc.md"),
            "intro\n\n[manual](../_resources/missing.pdf)\n",
        )
        .unwrap();

        let (written, issues) = run(&input);

        let rtf = fs::read_to_string(written[0].join("TXT.rtf")).unwrap();
        assert!(rtf.contains("[[PDF_ATTACHMENT_0]]"));

        let messages = issues.messages(IssueCategory::InvalidAttachment);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("missing.pdf"));
    }

    #[test]
    fn test_attachment_order_binds_in_lockstep() {
        let dir = TempDir::new().unwrap();
        let (input, resources) = make_vault(dir.path());
        fs::write(resources.join("A.png"), PNG_HEADER).unwrap();
        fs::write(resources.join("B.png"), PNG_HEADER).unwrap();
        fs::write(resources.join("X.pdf"), b"%PDF-1.4").unwrap();
        fs::write(
            input.join("Mixed.md"),
            "---\ntitle: Mixed\ncreated: 2023-01-01 10:00:00Z\nupdated: 2023-01-01 10:00:00Z\n---\n\nopening line\n\n![a](../_resources/A.png)\n\n[x](../_resources/X.pdf)\n\n![b](../_resources/B.png)\n",
        )
        .unwrap();

        let (written, issues) = run(&input);
        assert!(issues.is_empty());

        let package = &written[0];
        assert!(package.join("A.png").is_file());
        assert!(package.join("B.png").is_file());
        assert!(package.join("X.pdf").is_file());

        let rtf = fs::read_to_string(package.join("TXT.rtf")).unwrap();
        let a = rtf.find("\\NeXTGraphic A.png").unwrap();
        let x = rtf.find("\\NeXTGraphic X.pdf").unwrap();
        let b = rtf.find("\\NeXTGraphic B.png").unwrap();
        assert!(a < x && x < b);
    }

    #[test]
    fn test_failed_note_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let (input, _) = make_vault(dir.path());
        // Unterminated comment: a hard markup error for this note
        fs::write(input.join("bad.html"), "<!-- never closed").unwrap();
        fs::write(input.join("good.md"), "fine note").unwrap();

        let (written, issues) = run(&input);

        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("good.rtfd"));

        let messages = issues.messages(IssueCategory::General);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("bad.html"));
    }

    #[test]
    fn test_setup_rejects_empty_input() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();

        assert!(matches!(
            setup_directories(&empty),
            Err(ConvertError::NoNotesFound(_))
        ));
        assert!(matches!(
            setup_directories(&dir.path().join("missing")),
            Err(ConvertError::InputDirNotFound(_))
        ));
    }

    #[test]
    fn test_large_attachment_post_pass() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("Big.rtfd");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("TXT.rtf"), "{\\rtf1}").unwrap();
        fs::write(package.join("huge.bin"), vec![0u8; 64]).unwrap();

        let mut issues = IssueTracker::new();
        check_large_attachments(dir.path(), 32, &mut issues).unwrap();

        let messages = issues.messages(IssueCategory::LargeAttachment);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("huge.bin"));
    }

    #[test]
    fn test_placeholder_artifact_post_pass() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("Broken.rtfd");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(PLACEHOLDER_ARTIFACT), b"png").unwrap();
        let fine = dir.path().join("Fine.rtfd");
        fs::create_dir_all(&fine).unwrap();

        let mut issues = IssueTracker::new();
        check_placeholder_artifacts(dir.path(), &mut issues).unwrap();

        let messages = issues.messages(IssueCategory::BrokenPlaceholder);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Broken.rtfd"));
    }
}
