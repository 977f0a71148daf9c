//! Document intake: uploaded delimited files and typed text.

pub mod delimited;
pub mod document;

pub use delimited::{Table, load_delimited, parse_delimited, sniff_delimiter};
pub use document::{Document, DocumentSource};
