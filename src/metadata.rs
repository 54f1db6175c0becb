//! Applies note-level timestamps from front matter to a finished package.

use std::collections::HashMap;
use std::fs::{File, FileTimes};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::issues::{IssueCategory, IssueTracker};

/// Front matter date format: `2023-01-01 10:00:00Z`.
const FRONT_MATTER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Parse a front matter timestamp as UTC.
pub fn parse_front_matter_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), FRONT_MATTER_DATE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Copy `created`/`updated` front matter timestamps onto the package.
///
/// Both fields must be present and parsable; any failure is recorded and
/// never blocks the package that was already produced. Creation time is
/// applied where the platform supports setting it; modification time always.
pub fn apply_note_dates(
    package_path: &Path,
    front_matter: &HashMap<String, String>,
    note_path: &Path,
    issues: &mut IssueTracker,
) {
    let (created, updated) = match (front_matter.get("created"), front_matter.get("updated")) {
        (Some(created), Some(updated)) => (created, updated),
        _ => {
            issues.record(
                IssueCategory::InvalidFrontMatter,
                format!("{}: Missing date in front matter", note_path.display()),
            );
            return;
        }
    };

    let (created, updated) = match (
        parse_front_matter_date(created),
        parse_front_matter_date(updated),
    ) {
        (Some(created), Some(updated)) => (created, updated),
        _ => {
            issues.record(
                IssueCategory::General,
                format!("{}: Error setting file dates: unparsable timestamp", note_path.display()),
            );
            return;
        }
    };

    if let Err(e) = set_package_times(package_path, created, updated) {
        issues.record(
            IssueCategory::General,
            format!("{}: Failed to set file dates: {}", note_path.display(), e),
        );
    }
}

fn set_package_times(
    package_path: &Path,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
) -> std::io::Result<()> {
    let times = FileTimes::new()
        .set_accessed(updated.into())
        .set_modified(updated.into());

    #[cfg(windows)]
    let times = {
        use std::os::windows::fs::FileTimesExt;
        times.set_created(created.into())
    };
    #[cfg(not(windows))]
    let _ = created;

    File::open(package_path)?.set_times(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_front_matter_date() {
        let parsed = parse_front_matter_date("2023-01-01 10:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap());

        assert!(parse_front_matter_date("2023-01-01T10:00:00Z").is_none());
        assert!(parse_front_matter_date("yesterday").is_none());
    }

    fn front_matter(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_field_records_invalid_front_matter() {
        let dir = TempDir::new().unwrap();
        let mut issues = IssueTracker::new();

        apply_note_dates(
            dir.path(),
            &front_matter(&[("created", "2023-01-01 10:00:00Z")]),
            Path::new("note.md"),
            &mut issues,
        );

        let messages = issues.messages(IssueCategory::InvalidFrontMatter);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("note.md"));
    }

    #[test]
    fn test_unparsable_date_records_general_issue() {
        let dir = TempDir::new().unwrap();
        let mut issues = IssueTracker::new();

        apply_note_dates(
            dir.path(),
            &front_matter(&[("created", "nope"), ("updated", "2023-01-02 10:00:00Z")]),
            Path::new("note.md"),
            &mut issues,
        );

        assert_eq!(issues.messages(IssueCategory::General).len(), 1);
    }

    #[test]
    fn test_modification_time_applied() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("Note.rtfd");
        fs::create_dir(&package).unwrap();

        let mut issues = IssueTracker::new();
        apply_note_dates(
            &package,
            &front_matter(&[
                ("created", "2023-01-01 10:00:00Z"),
                ("updated", "2023-01-02 10:00:00Z"),
            ]),
            Path::new("note.md"),
            &mut issues,
        );

        assert!(issues.is_empty());
        let modified: DateTime<Utc> = fs::metadata(&package).unwrap().modified().unwrap().into();
        assert_eq!(
            modified,
            Utc.with_ymd_and_hms(2023, 1, 2, 10, 0, 0).unwrap()
        );
    }
}
