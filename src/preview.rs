//! Non-mutating preview of an export directory, for inspection before a
//! conversion run.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::attachments::resolve_attachments;
use crate::config::{ConvertConfig, RESOURCES_DIR_NAME};
use crate::error::{ConvertError, Result};
use crate::note::Note;
use crate::pipeline::discover_notes;

/// Preview metadata for an export directory
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPreview {
    /// Number of note files found
    pub note_count: usize,
    /// Number of files in the attachment directory
    pub resource_count: usize,
    /// Number of remote image references that a run would download
    pub remote_image_count: usize,
    /// Sample notes for preview (first 10)
    pub notes: Vec<NotePreview>,
    /// Suggested name, from the export folder
    pub suggested_name: String,
    /// Warnings during preview
    pub warnings: Vec<String>,
}

/// Preview info for a single note
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePreview {
    /// Derived display title
    pub title: String,
    /// Path relative to the export root
    pub relative_path: String,
    /// Whether the body references images or PDFs
    pub has_attachments: bool,
}

/// Scan an export directory without touching it.
pub fn preview_export(input_dir: &Path, config: &ConvertConfig) -> Result<ExportPreview> {
    if !input_dir.is_dir() {
        return Err(ConvertError::InputDirNotFound(input_dir.to_path_buf()));
    }

    let remote_image_re =
        Regex::new(r#"!\[[^\]]*\]\((https?://[^\s)]+)(?:\s+"[^"]*")?\)"#).unwrap();
    let resources_dir = input_dir.join(RESOURCES_DIR_NAME);

    let note_paths = discover_notes(input_dir);
    let mut warnings = Vec::new();
    let mut remote_image_count = 0;
    let mut notes = Vec::new();

    for path in &note_paths {
        let note = match Note::parse(path, config) {
            Ok(note) => note,
            Err(e) => {
                warnings.push(format!("Could not read {}: {}", path.display(), e));
                continue;
            }
        };

        remote_image_count += remote_image_re.find_iter(&note.body).count();

        if notes.len() < 10 {
            let (_, resolved) = resolve_attachments(&note.body, &resources_dir, config);
            notes.push(NotePreview {
                title: note.title.clone(),
                relative_path: path
                    .strip_prefix(input_dir)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .to_string(),
                has_attachments: !resolved.images.is_empty() || !resolved.pdfs.is_empty(),
            });
        }
    }

    let resource_count = match fs::read_dir(&resources_dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).count(),
        Err(_) => {
            warnings.push(format!("No {} directory found", RESOURCES_DIR_NAME));
            0
        }
    };

    if note_paths.is_empty() {
        warnings.push("No Markdown or HTML files found".to_string());
    }

    let suggested_name = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Imported notes".to_string());

    Ok(ExportPreview {
        note_count: note_paths.len(),
        resource_count,
        remote_image_count,
        notes,
        suggested_name,
        warnings,
    })
}
