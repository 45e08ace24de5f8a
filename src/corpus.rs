// Reference corpus: the static question bank, embedded once at startup.
//
// Rows come from a CSV with columns question, topic, marks, weightage.
// Rows without question text are dropped. A row with a blank topic or an
// unparseable number still takes part in matching, but is left out of
// distinct_topics() and of the training data for the missing attribute.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::{Embedder, Embedding};
use crate::error::{CorpusLoadError, EmbeddingError};

/// One parsed dataset row, before embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub question: String,
    pub topic: Option<String>,
    pub marks: Option<f64>,
    pub weightage: Option<f64>,
}

impl DatasetRow {
    pub fn new(question: &str, topic: &str, marks: f64, weightage: f64) -> Self {
        Self {
            question: question.to_string(),
            topic: Some(topic.to_string()),
            marks: Some(marks),
            weightage: Some(weightage),
        }
    }
}

/// A catalogued question with its embedding. Never mutated after load.
#[derive(Debug, Clone)]
pub struct ReferenceQuestion {
    pub text: String,
    pub topic: Option<String>,
    pub marks: Option<f64>,
    pub weightage: Option<f64>,
    pub embedding: Embedding,
}

/// The embedded question bank. Index order is the dataset's row order,
/// which decides which duplicate is reported first.
#[derive(Debug, Clone)]
pub struct ReferenceCorpus {
    questions: Vec<ReferenceQuestion>,
    model_id: String,
}

impl ReferenceCorpus {
    /// Embed `rows` with `embedder` in a single batch.
    ///
    /// Rows whose question is blank after trimming are excluded. Topics are
    /// trimmed; a blank topic becomes `None`.
    pub fn build(rows: Vec<DatasetRow>, embedder: &dyn Embedder) -> Result<Self, CorpusLoadError> {
        let total = rows.len();
        let rows: Vec<DatasetRow> = rows
            .into_iter()
            .filter_map(normalize_row)
            .collect();

        if rows.len() < total {
            warn!(
                dropped = total - rows.len(),
                "Skipped dataset rows with blank question text"
            );
        }

        let texts: Vec<String> = rows.iter().map(|r| r.question.clone()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::Inference(format!(
                "embedder returned {} vectors for {} reference questions",
                embeddings.len(),
                texts.len()
            ))
            .into());
        }

        let questions = rows
            .into_iter()
            .zip(embeddings)
            .map(|(row, embedding)| ReferenceQuestion {
                text: row.question,
                topic: row.topic,
                marks: row.marks,
                weightage: row.weightage,
                embedding,
            })
            .collect::<Vec<_>>();

        info!(
            questions = questions.len(),
            model = embedder.model_id(),
            "Embedded reference corpus"
        );

        Ok(Self {
            questions,
            model_id: embedder.model_id().to_string(),
        })
    }

    /// A corpus with no questions, tagged with the given model id.
    pub fn empty(model_id: &str) -> Self {
        Self {
            questions: Vec::new(),
            model_id: model_id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The embedder model id every reference embedding was computed with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn questions(&self) -> &[ReferenceQuestion] {
        &self.questions
    }

    pub fn all_embeddings(&self) -> Vec<&[f64]> {
        self.questions.iter().map(|q| q.embedding.as_slice()).collect()
    }

    pub fn all_questions(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.text.as_str()).collect()
    }

    pub fn all_topics(&self) -> Vec<Option<&str>> {
        self.questions.iter().map(|q| q.topic.as_deref()).collect()
    }

    pub fn all_marks_weightage(&self) -> Vec<(Option<f64>, Option<f64>)> {
        self.questions
            .iter()
            .map(|q| (q.marks, q.weightage))
            .collect()
    }

    /// Distinct non-blank topics, sorted.
    pub fn distinct_topics(&self) -> BTreeSet<String> {
        self.questions
            .iter()
            .filter_map(|q| q.topic.clone())
            .collect()
    }
}

fn normalize_row(row: DatasetRow) -> Option<DatasetRow> {
    let question = row.question.trim();
    if question.is_empty() {
        return None;
    }
    let topic = row
        .topic
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    Some(DatasetRow {
        question: question.to_string(),
        topic,
        marks: row.marks.filter(|v| v.is_finite()),
        weightage: row.weightage.filter(|v| v.is_finite()),
    })
}

/// Read dataset rows from a CSV file.
///
/// Header names are matched case-insensitively. Extra columns are ignored.
/// Blank or non-numeric marks/weightage cells load as `None`.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRow>, CorpusLoadError> {
    if !path.exists() {
        return Err(CorpusLoadError::NotFound(path.to_path_buf()));
    }

    let read_err = |source: csv::Error| CorpusLoadError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let headers = reader.headers().map_err(read_err)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
            .ok_or(CorpusLoadError::MissingColumn(name))
    };

    let question_col = column("question")?;
    let topic_col = column("topic")?;
    let marks_col = column("marks")?;
    let weightage_col = column("weightage")?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(read_err)?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let marks = parse_number(cell(marks_col));
        let weightage = parse_number(cell(weightage_col));
        if marks.is_none() || weightage.is_none() {
            warn!(row = i + 2, "Dataset row has missing or non-numeric marks/weightage");
        }

        rows.push(DatasetRow {
            question: cell(question_col).to_string(),
            topic: Some(cell(topic_col).to_string()),
            marks,
            weightage,
        });
    }

    info!(rows = rows.len(), path = %path.display(), "Loaded dataset");
    Ok(rows)
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
