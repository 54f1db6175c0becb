//! Process-wide accumulator for problems found during a conversion run.
//!
//! The tracker is an explicit value passed `&mut` into every pipeline stage,
//! never a global. The caller creates it, hands it through the run, and reads
//! the summary once at the end.

use serde::Serialize;

/// Fixed set of issue categories, in summary display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueCategory {
    /// Whole-note failures and metadata apply errors.
    General,
    /// Remote image downloads that did not succeed.
    Download,
    /// Attachment bindings that could not be completed.
    Attachment,
    /// Missing or unparsable front matter fields.
    InvalidFrontMatter,
    /// Attachment files that could not be identified or found.
    InvalidAttachment,
    /// Packages containing the unresolved-attachment placeholder artifact.
    BrokenPlaceholder,
    /// Packages containing an embedded file above the size threshold.
    LargeAttachment,
}

impl IssueCategory {
    /// All categories, in the order the summary prints them.
    pub const ALL: [IssueCategory; 7] = [
        IssueCategory::General,
        IssueCategory::Download,
        IssueCategory::Attachment,
        IssueCategory::InvalidFrontMatter,
        IssueCategory::InvalidAttachment,
        IssueCategory::BrokenPlaceholder,
        IssueCategory::LargeAttachment,
    ];

    /// Human-readable heading for the summary report.
    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::General => "Files With Issues",
            IssueCategory::Download => "Files With Download Issues",
            IssueCategory::Attachment => "Files With Attachment Issues",
            IssueCategory::InvalidFrontMatter => "Files With Invalid Front Matter",
            IssueCategory::InvalidAttachment => "Files With Invalid Attachments",
            IssueCategory::BrokenPlaceholder => "Packages With Placeholder Artifacts",
            IssueCategory::LargeAttachment => "Packages With Large Attachments",
        }
    }
}

/// One recorded problem: what kind, and a message naming the affected file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub category: IssueCategory,
    pub message: String,
}

/// Append-only issue accumulator for a single conversion run.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTracker {
    issues: Vec<Issue>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: IssueCategory, message: impl Into<String>) {
        self.issues.push(Issue {
            category,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    /// Messages recorded under one category, in insertion order.
    pub fn messages(&self, category: IssueCategory) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.message.as_str())
            .collect()
    }

    /// Grouped view for the end-of-run report. Categories with no issues
    /// are omitted; the remaining ones keep declaration order.
    pub fn summary(&self) -> Vec<(IssueCategory, Vec<&str>)> {
        IssueCategory::ALL
            .iter()
            .filter_map(|&category| {
                let messages = self.messages(category);
                if messages.is_empty() {
                    None
                } else {
                    Some((category, messages))
                }
            })
            .collect()
    }
}
