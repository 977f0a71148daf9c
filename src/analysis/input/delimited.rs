//! Delimited-file intake.
//!
//! Uploaded files are parsed into a [`Table`] and serialized back to comma-separated text
//! (header row included, rows in file order) before they are embedded in a prompt.

use std::fmt::Write as _;
use std::io::Read;

use crate::analysis::core::errors::{AnalysisError, AnalysisResult};

/// Delimiters tried when sniffing, in priority order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];
/// Lines sampled when sniffing.
const SNIFF_LINES: usize = 10;

/// A parsed delimited file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    /// Header row.
    pub headers: Vec<String>,
    /// Data rows, each as wide as the header.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Serialize as comma-separated text with a header row.
    ///
    /// # Errors
    /// Returns an error if the writer fails.
    pub fn to_csv_string(&self) -> AnalysisResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AnalysisError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| AnalysisError::MalformedTable(e.to_string()))
    }

    /// Render the header and the first `limit` rows as an aligned text grid.
    #[must_use]
    pub fn preview(&self, limit: usize) -> String {
        let shown = &self.rows[..self.rows.len().min(limit)];
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in shown {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        render_row(&mut out, &self.headers, &widths);
        for row in shown {
            render_row(&mut out, row, &widths);
        }
        if self.rows.len() > shown.len() {
            let _ = writeln!(out, "... ({} more rows)", self.rows.len() - shown.len());
        }
        out
    }
}

fn render_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Parse a delimited file, sniffing the delimiter from its first lines.
///
/// # Errors
/// Returns an error if the content is not UTF-8, has no header row, or has a row wider
/// than the header.
pub fn load_delimited<R: Read>(mut reader: R) -> AnalysisResult<Table> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    parse_delimited(content, sniff_delimiter(content))
}

/// Parse delimited text with a known delimiter.
///
/// Rows shorter than the header are padded with empty cells.
///
/// # Errors
/// Returns an error if there is no header row or a row is wider than the header.
pub fn parse_delimited(content: &str, delimiter: u8) -> AnalysisResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AnalysisError::MalformedTable("missing header row".to_string()));
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(AnalysisError::MalformedTable(format!(
                "row {} has {} fields, header has {}",
                index + 1,
                record.len(),
                headers.len()
            )));
        }
        let mut row: Vec<String> = record.iter().map(ToString::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        delimiter = %char::from(delimiter),
        "parsed delimited upload"
    );
    Ok(Table { headers, rows })
}

/// Pick the delimiter that yields the most consistent multi-field split.
///
/// The score of a candidate is the number of sampled lines sharing the first line's field
/// count multiplied by that count. Comma wins when nothing splits.
#[must_use]
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(SNIFF_LINES).collect();
    let mut best = b',';
    let mut best_score = 0_usize;

    for delimiter in CANDIDATE_DELIMITERS {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| field_count(line, delimiter))
            .collect();

        let Some(&target) = counts.first() else {
            break;
        };
        if target <= 1 {
            continue;
        }

        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
        assert_eq!(sniff_delimiter("single column\nvalue\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_semicolon_upload_is_reserialized_with_commas() {
        let input = "channel;clicks\nsearch;120\nsocial;80\n";
        let table = load_delimited(input.as_bytes()).unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.to_csv_string().unwrap(),
            "channel,clicks\nsearch,120\nsocial,80\n"
        );
    }

    #[test]
    fn test_quoted_fields_survive_round_trip() {
        let input = "name,note\nspring,\"sale, 20% off\"\n";
        let table = load_delimited(input.as_bytes()).unwrap();
        assert_eq!(table.rows[0][1], "sale, 20% off");
        assert_eq!(table.to_csv_string().unwrap(), input);
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let table = load_delimited("\u{feff}a,b\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_wide_rows_are_rejected() {
        let result = load_delimited("a,b\n1,2\n1,2,3\n".as_bytes());
        assert!(matches!(result, Err(AnalysisError::MalformedTable(message)) if message.contains("row 2")));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = load_delimited("a,b,c\n1\n4,5,6\n7,8\n".as_bytes()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[0], vec!["1".to_string(), String::new(), String::new()]);
        assert_eq!(table.to_csv_string().unwrap(), "a,b,c\n1,,\n4,5,6\n7,8,\n");
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let result = load_delimited("".as_bytes());
        assert!(matches!(result, Err(AnalysisError::MalformedTable(_))));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let bytes: &[u8] = &[0xff, 0xfe, b',', b'a'];
        assert!(load_delimited(bytes).is_err());
    }

    #[test]
    fn test_preview_truncates() {
        let table = Table {
            headers: vec!["month".to_string(), "sales".to_string()],
            rows: (1..=5)
                .map(|m| vec![format!("2024-0{m}"), (m * 100).to_string()])
                .collect(),
        };
        let preview = table.preview(2);
        assert!(preview.starts_with("month   | sales\n"));
        assert!(preview.contains("2024-01 | 100\n"));
        assert!(!preview.contains("2024-03"));
        assert!(preview.ends_with("... (3 more rows)\n"));
    }
}
