// Error taxonomy for the matching and prediction pipeline.
//
// Startup errors (corpus, embedding model) are fatal and surface through
// ContextError. PredictionError is local to a single field of a single
// question. UnsupportedFormatError is raised by batch intake before any
// text reaches the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// The embedding model is unavailable or rejected its input.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),
}

/// The reference dataset could not be loaded.
#[derive(Debug, Error)]
pub enum CorpusLoadError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("failed to embed reference questions: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// A fitted model could not score the given embedding.
#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("embedding has {actual} dimensions, model was fit on {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A batch file was not in a format the intake layer can read.
#[derive(Debug, Error)]
pub enum UnsupportedFormatError {
    #[error("unsupported batch file format '{0}' (expected .csv, .txt, .xlsx, .xls or .docx)")]
    Extension(String),

    #[error("batch file has no extension; expected .csv, .txt, .xlsx, .xls or .docx")]
    MissingExtension,

    #[error("batch file is not valid UTF-8 text")]
    NotText,

    #[error("failed to parse batch CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error("failed to open document archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to parse document: {0}")]
    Document(String),
}

impl UnsupportedFormatError {
    /// The file type was accepted but its contents could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            UnsupportedFormatError::Csv(_)
                | UnsupportedFormatError::Spreadsheet(_)
                | UnsupportedFormatError::EmptyWorkbook
                | UnsupportedFormatError::Archive(_)
                | UnsupportedFormatError::Document(_)
        )
    }
}

/// Failure while building or querying the inference context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Corpus(#[from] CorpusLoadError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("embedding model '{query}' does not match the corpus model '{corpus}'")]
    ModelMismatch { corpus: String, query: String },
}
