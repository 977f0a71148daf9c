//! Documents handed to the prompt builder.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::analysis::core::errors::AnalysisResult;
use crate::analysis::input::delimited::{Table, load_delimited};

/// Where a document's text came from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentSource {
    /// An uploaded delimited file.
    Upload {
        /// Original file name.
        file_name: String,
        /// Data rows, excluding the header.
        rows: usize,
        /// Columns in the header.
        columns: usize,
    },
    /// Free text typed by the user.
    Text,
}

/// Opaque document text plus its provenance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text embedded verbatim in the prompt.
    pub text: String,
    /// Provenance.
    pub source: DocumentSource,
}

impl Document {
    /// Wrap typed text as-is.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: DocumentSource::Text,
        }
    }

    /// An empty typed document.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_text(String::new())
    }

    /// Parse an uploaded delimited file and keep its comma-separated form.
    ///
    /// Returns the parsed table alongside the document so callers can preview it.
    ///
    /// # Errors
    /// Returns an error if the upload cannot be parsed.
    pub fn from_upload<R: Read>(file_name: &str, reader: R) -> AnalysisResult<(Self, Table)> {
        let table = load_delimited(reader)?;
        let text = table.to_csv_string()?;
        tracing::info!(
            file_name,
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded upload"
        );
        let document = Self {
            text,
            source: DocumentSource::Upload {
                file_name: file_name.to_string(),
                rows: table.row_count(),
                columns: table.column_count(),
            },
        };
        Ok((document, table))
    }

    /// True when the text is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_kept_verbatim() {
        let document = Document::from_text("  매출 증가\n");
        assert_eq!(document.text, "  매출 증가\n");
        assert_eq!(document.source, DocumentSource::Text);
        assert!(!document.is_blank());
    }

    #[test]
    fn test_whitespace_only_is_blank() {
        assert!(Document::empty().is_blank());
        assert!(Document::from_text(" \n\t").is_blank());
    }

    #[test]
    fn test_upload_records_shape() {
        let (document, table) =
            Document::from_upload("q1.csv", "week|visits\n1|10\n2|12\n".as_bytes()).unwrap();

        assert_eq!(document.text, "week,visits\n1,10\n2,12\n");
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            document.source,
            DocumentSource::Upload {
                file_name: "q1.csv".to_string(),
                rows: 2,
                columns: 2,
            }
        );
    }

    #[test]
    fn test_malformed_upload_is_an_error() {
        assert!(Document::from_upload("bad.csv", "a,b\n1\n".as_bytes()).is_err());
    }
}
