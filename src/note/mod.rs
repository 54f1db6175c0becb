//! Note file parsing: front matter, title derivation, body fixes.

mod parser;

pub use parser::{extract_front_matter, insert_title_if_needed, is_valid_title, Note};
