//! papyrus — converts a tree of exported Markdown/HTML notes (front matter
//! plus linked images and PDFs) into self-contained RTFD packages that a
//! desktop note application imports as rich documents.
//!
//! The pipeline runs two preparation passes over the whole input tree
//! (attachment extension repair, remote image localization), then converts
//! each note independently: parse front matter and title, resolve inline
//! attachment references, render and assemble the rich document, write the
//! package, and apply the note's timestamps. Problems are collected in an
//! [`issues::IssueTracker`] and reported once at the end of the run.

pub mod attachments;
pub mod config;
pub mod document;
pub mod error;
pub mod issues;
pub mod metadata;
pub mod note;
pub mod pipeline;
pub mod preview;
pub mod resources;

pub use config::ConvertConfig;
pub use error::{ConvertError, Result};
pub use issues::{Issue, IssueCategory, IssueTracker};
pub use pipeline::Converter;
