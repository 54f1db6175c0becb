//! On-disk RTFD package writing.
//!
//! A package is a directory named `<stem>.rtfd` holding the RTF body as
//! `TXT.rtf` plus one file per embedded attachment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PACKAGE_EXTENSION;
use crate::document::{rtf, RichDocument};
use crate::error::{ConvertError, Result};

/// First free package path for a note stem: `<stem>.rtfd`, then
/// `<stem>_1.rtfd`, `<stem>_2.rtfd`, … — a pure function of the existing
/// directory listing; existing packages are never overwritten.
pub fn unique_package_path(output_dir: &Path, stem: &str) -> PathBuf {
    let mut candidate = output_dir.join(format!("{}.{}", stem, PACKAGE_EXTENSION));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = output_dir.join(format!("{}_{}.{}", stem, suffix, PACKAGE_EXTENSION));
        suffix += 1;
    }
    candidate
}

/// Serialize a document to a package directory at `dest`.
pub fn write_rtfd_package(document: &RichDocument, dest: &Path) -> Result<()> {
    write_contents(document, dest).map_err(|source| ConvertError::PackageWrite {
        path: dest.to_path_buf(),
        source,
    })
}

fn write_contents(document: &RichDocument, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    fs::write(dest.join("TXT.rtf"), rtf::document_to_rtf(document))?;

    // Attachment files get their display name inside the package; repeated
    // references to the same file share one copy, distinct files with the
    // same name get numbered apart.
    let mut copied: HashMap<String, PathBuf> = HashMap::new();
    for object in document.objects() {
        if !object.source.is_file() {
            log::warn!(
                "Embedded file missing on disk, not copied: {}",
                object.source.display()
            );
            continue;
        }

        let name = rtf::attachment_display_name(object);
        let target_name = match copied.get(&name) {
            Some(existing) if *existing == object.source => continue,
            Some(_) => disambiguate(&copied, &name),
            None => name,
        };

        fs::copy(&object.source, dest.join(&target_name))?;
        copied.insert(target_name, object.source.clone());
    }

    Ok(())
}

fn disambiguate(copied: &HashMap<String, PathBuf>, name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
        None => (name.to_string(), String::new()),
    };

    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, counter, ext);
        if !copied.contains_key(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EmbeddedObject, SpanStyle};
    use tempfile::TempDir;

    #[test]
    fn test_unique_path_suffixes_on_collision() {
        let dir = TempDir::new().unwrap();

        let first = unique_package_path(dir.path(), "Recipe");
        assert_eq!(first, dir.path().join("Recipe.rtfd"));
        fs::create_dir(&first).unwrap();

        let second = unique_package_path(dir.path(), "Recipe");
        assert_eq!(second, dir.path().join("Recipe_1.rtfd"));
        fs::create_dir(&second).unwrap();

        let third = unique_package_path(dir.path(), "Recipe");
        assert_eq!(third, dir.path().join("Recipe_2.rtfd"));
    }

    #[test]
    fn test_write_package_with_attachment() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("pic.png");
        fs::write(&source, b"\x89PNG data").unwrap();

        let mut doc = RichDocument::default();
        doc.push_text("hello", SpanStyle::default());
        doc.push_object(EmbeddedObject {
            source: source.clone(),
            preferred_name: Some("pic.png".to_string()),
        });

        let dest = dir.path().join("Note.rtfd");
        write_rtfd_package(&doc, &dest).unwrap();

        assert!(dest.join("TXT.rtf").is_file());
        assert!(dest.join("pic.png").is_file());
        let body = fs::read_to_string(dest.join("TXT.rtf")).unwrap();
        assert!(body.contains("hello"));
        assert!(body.contains("\\NeXTGraphic pic.png"));
    }

    #[test]
    fn test_missing_attachment_source_is_skipped() {
        let dir = TempDir::new().unwrap();

        let mut doc = RichDocument::default();
        doc.push_object(EmbeddedObject {
            source: dir.path().join("gone.png"),
            preferred_name: Some("gone.png".to_string()),
        });

        let dest = dir.path().join("Note.rtfd");
        write_rtfd_package(&doc, &dest).unwrap();

        assert!(dest.join("TXT.rtf").is_file());
        assert!(!dest.join("gone.png").exists());
    }

    #[test]
    fn test_same_name_different_sources_numbered_apart() {
        let dir = TempDir::new().unwrap();
        let a_dir = dir.path().join("a");
        let b_dir = dir.path().join("b");
        fs::create_dir_all(&a_dir).unwrap();
        fs::create_dir_all(&b_dir).unwrap();
        fs::write(a_dir.join("pic.png"), b"one").unwrap();
        fs::write(b_dir.join("pic.png"), b"two").unwrap();

        let mut doc = RichDocument::default();
        for base in [&a_dir, &b_dir] {
            doc.push_object(EmbeddedObject {
                source: base.join("pic.png"),
                preferred_name: Some("pic.png".to_string()),
            });
        }

        let dest = dir.path().join("Note.rtfd");
        write_rtfd_package(&doc, &dest).unwrap();

        assert!(dest.join("pic.png").is_file());
        assert!(dest.join("pic_1.png").is_file());
    }
}
