// Batch intake: turns an uploaded or local file into question strings.
//
// .csv: the "question" column if there is one, otherwise the first column.
// .txt: one question per non-blank line.
// .xlsx / .xls: first worksheet, same column rule as CSV.
// .docx: one question per non-blank paragraph.
// Anything else is rejected before it reaches the pipeline.

pub(crate) mod document;
pub(crate) mod spreadsheet;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::UnsupportedFormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Csv,
    Text,
    Spreadsheet,
    Document,
}

impl BatchFormat {
    /// Pick a format from the file name's extension.
    pub fn from_filename(filename: &str) -> Result<Self, UnsupportedFormatError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(UnsupportedFormatError::MissingExtension)?;

        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(BatchFormat::Csv),
            "txt" => Ok(BatchFormat::Text),
            "xlsx" | "xls" => Ok(BatchFormat::Spreadsheet),
            "docx" => Ok(BatchFormat::Document),
            other => Err(UnsupportedFormatError::Extension(other.to_string())),
        }
    }
}

/// Parse file contents into questions. Blank entries are dropped.
pub fn read_questions(filename: &str, bytes: &[u8]) -> Result<Vec<String>, UnsupportedFormatError> {
    let format = BatchFormat::from_filename(filename)?;

    let questions = match format {
        BatchFormat::Csv => questions_from_csv(decode_text(bytes)?)?,
        BatchFormat::Text => decode_text(bytes)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        BatchFormat::Spreadsheet => spreadsheet::questions_from_workbook(bytes)?,
        BatchFormat::Document => document::questions_from_docx(bytes)?,
    };

    debug!(filename, ?format, count = questions.len(), "Read batch file");
    Ok(questions)
}

/// Read a batch file from disk.
pub fn read_questions_from_path(path: &Path) -> Result<Vec<String>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Ok(read_questions(filename, &bytes)?)
}

/// UTF-8 text with any byte-order mark removed.
fn decode_text(bytes: &[u8]) -> Result<&str, UnsupportedFormatError> {
    let text = std::str::from_utf8(bytes).map_err(|_| UnsupportedFormatError::NotText)?;
    Ok(text.trim_start_matches('\u{feff}'))
}

fn questions_from_csv(text: &str) -> Result<Vec<String>, UnsupportedFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("question"))
        .unwrap_or(0);

    let mut questions = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(cell) = record.get(column).map(str::trim) {
            if !cell.is_empty() {
                questions.push(cell.to_string());
            }
        }
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_uses_question_column() {
        let csv = "id,Question,topic\n1,What is 2+2?,Math\n2,  ,Math\n3,Define osmosis,Biology\n";
        let questions = read_questions("batch.csv", csv.as_bytes()).unwrap();
        assert_eq!(questions, vec!["What is 2+2?", "Define osmosis"]);
    }

    #[test]
    fn test_csv_without_question_column_uses_first() {
        let csv = "text,notes\n\"Explain Newton's first law, briefly\",x\nState Ohm's law,y\n";
        let questions = read_questions("upload.CSV", csv.as_bytes()).unwrap();
        assert_eq!(
            questions,
            vec!["Explain Newton's first law, briefly", "State Ohm's law"]
        );
    }

    #[test]
    fn test_text_lines() {
        let txt = "\u{feff}What is 2+2?\r\n\n   \nDefine osmosis\n";
        let questions = read_questions("questions.txt", txt.as_bytes()).unwrap();
        assert_eq!(questions, vec!["What is 2+2?", "Define osmosis"]);
    }

    #[test]
    fn test_format_from_extension() {
        for (name, format) in [
            ("bank.csv", BatchFormat::Csv),
            ("bank.TXT", BatchFormat::Text),
            ("bank.xlsx", BatchFormat::Spreadsheet),
            ("bank.xls", BatchFormat::Spreadsheet),
            ("bank.docx", BatchFormat::Document),
        ] {
            assert_eq!(BatchFormat::from_filename(name).unwrap(), format, "{name}");
        }
    }

    #[test]
    fn test_other_formats_are_rejected() {
        for name in ["bank.pdf", "bank.doc", "bank.odt"] {
            let err = read_questions(name, b"irrelevant").unwrap_err();
            assert!(matches!(err, UnsupportedFormatError::Extension(_)), "{name}");
            assert!(!err.is_malformed());
        }
    }

    #[test]
    fn test_spreadsheet_upload() {
        let bytes = spreadsheet::tests::xlsx(&[
            &["Question", "Topic"],
            &["What is 2+2?", "Math"],
            &["Define osmosis", "Biology"],
        ]);
        let questions = read_questions("Bank.XLSX", &bytes).unwrap();
        assert_eq!(questions, vec!["What is 2+2?", "Define osmosis"]);
    }

    #[test]
    fn test_document_upload() {
        let bytes = document::tests::docx(
            "<w:p><w:r><w:t>What is 2+2?</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Define osmosis</w:t></w:r></w:p>",
        );
        let questions = read_questions("questions.docx", &bytes).unwrap();
        assert_eq!(questions, vec!["What is 2+2?", "Define osmosis"]);
    }

    #[test]
    fn test_corrupt_office_files_are_malformed() {
        for name in ["bank.xlsx", "bank.docx"] {
            let err = read_questions(name, b"not an office file").unwrap_err();
            assert!(err.is_malformed(), "{name}: {err}");
        }
    }

    #[test]
    fn test_missing_extension() {
        assert!(matches!(
            read_questions("questions", b"q"),
            Err(UnsupportedFormatError::MissingExtension)
        ));
    }

    #[test]
    fn test_binary_content_is_not_text() {
        assert!(matches!(
            read_questions("questions.txt", &[0xff, 0xfe, 0x00, 0xd8]),
            Err(UnsupportedFormatError::NotText)
        ));
    }

    #[test]
    fn test_read_from_path() {
        let path = std::env::temp_dir().join(format!("quizmatch_intake_{}.txt", std::process::id()));
        std::fs::write(&path, "one\ntwo\n").unwrap();
        let questions = read_questions_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(questions, vec!["one", "two"]);
    }
}
