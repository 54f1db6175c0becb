//! Repairs attachment files exported without a file-type extension.
//!
//! Joplin resources are stored under opaque hex names; the export usually
//! restores extensions but not always. Extensionless files are sniffed by
//! their binary signature, renamed, and every note referencing the old
//! relative path is rewritten to the new one.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::config::RESOURCES_DIR_NAME;
use crate::error::Result;
use crate::issues::{IssueCategory, IssueTracker};

/// Determine an image extension from leading magic bytes.
pub fn sniff_image_extension(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    match &data[0..4] {
        [0x89, b'P', b'N', b'G'] => Some("png"),
        [0xFF, 0xD8, 0xFF, _] => Some("jpg"),
        [b'G', b'I', b'F', b'8'] => Some("gif"),
        [b'B', b'M', _, _] => Some("bmp"),
        [b'I', b'I', 0x2A, 0x00] | [b'M', b'M', 0x00, 0x2A] => Some("tiff"),
        [b'R', b'I', b'F', b'F'] if data.len() >= 12 && &data[8..12] == b"WEBP" => Some("webp"),
        _ => None,
    }
}

/// Rename every extensionless file in the attachment directory to carry its
/// sniffed image extension, rewriting note references as files move.
/// Unidentifiable files are recorded and left untouched.
pub fn fix_missing_extensions(
    resources_dir: &Path,
    input_dir: &Path,
    issues: &mut IssueTracker,
) -> Result<()> {
    if !resources_dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(resources_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_some() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let data = fs::read(&path)?;

        match sniff_image_extension(&data) {
            Some(ext) => {
                let new_name = format!("{}.{}", file_name, ext);
                fs::rename(&path, resources_dir.join(&new_name))?;
                log::info!("Renamed {} to {}", file_name, new_name);
                update_note_references(input_dir, &file_name, &new_name)?;
            }
            None => {
                log::warn!("Could not identify {}, skipping", file_name);
                issues.record(
                    IssueCategory::InvalidAttachment,
                    format!(
                        "Invalid image file in {}: {}",
                        RESOURCES_DIR_NAME, file_name
                    ),
                );
            }
        }
    }

    Ok(())
}

/// Rewrite `../_resources/<old>` to `../_resources/<new>` in every markdown
/// note under the input tree. Files are only written back when a reference
/// actually changed.
fn update_note_references(input_dir: &Path, old_name: &str, new_name: &str) -> Result<()> {
    let old_ref = format!("../{}/{}", RESOURCES_DIR_NAME, old_name);
    let new_ref = format!("../{}/{}", RESOURCES_DIR_NAME, new_name);

    for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file()
            || path.extension().map(|e| e.to_string_lossy().to_lowercase()) != Some("md".into())
        {
            continue;
        }

        let content = fs::read_to_string(path)?;
        let updated = content.replace(&old_ref, &new_ref);
        if updated != content {
            fs::write(path, updated)?;
            log::info!("Updated references in {}", path.display());
        }
    }

    Ok(())
}
