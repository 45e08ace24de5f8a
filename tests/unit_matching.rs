// Unit tests for near-duplicate matching and topic resolution.
//
// Uses the feature-hashing embedder so no model download is needed.
// Covers cosine symmetry, the inclusive 0.6 threshold, the empty corpus,
// verbatim self-matches, topic listing and both topic-checking modes.

use quizmatch::context::{ContextSettings, InferenceContext, TopicResolution};
use quizmatch::corpus::{DatasetRow, ReferenceCorpus};
use quizmatch::embedding::hashing::HashEmbedder;
use quizmatch::embedding::Embedder;
use quizmatch::matcher::{cosine_similarity, SimilarityMatcher, DEFAULT_SIMILARITY_THRESHOLD};

fn bank() -> Vec<DatasetRow> {
    vec![
        DatasetRow::new("What is 2+2?", "Math", 1.0, 1.0),
        DatasetRow::new("Solve the quadratic equation x^2 - 5x + 6 = 0", "Math", 4.0, 2.0),
        DatasetRow::new("Define photosynthesis in green plants", "Biology", 5.0, 2.0),
        DatasetRow::new("Explain the structure of the cell membrane", "Biology", 5.0, 3.0),
        DatasetRow::new("State Newton's second law of motion", "Physics", 3.0, 2.0),
        DatasetRow::new("Derive the equation for kinetic energy", "Physics", 6.0, 3.0),
    ]
}

fn context(rows: Vec<DatasetRow>) -> InferenceContext {
    InferenceContext::build(
        Box::new(HashEmbedder::default()),
        rows,
        &ContextSettings::default(),
    )
    .unwrap()
}

// ============================================================
// Cosine similarity and the threshold
// ============================================================

#[test]
fn cosine_is_symmetric_for_real_embeddings() {
    let embedder = HashEmbedder::default();
    let texts = [
        "What is 2+2?",
        "What is 3+3?",
        "Define photosynthesis in green plants",
        "",
    ];
    for a in &texts {
        for b in &texts {
            let ea = embedder.embed(a).unwrap();
            let eb = embedder.embed(b).unwrap();
            assert_eq!(cosine_similarity(&ea, &eb), cosine_similarity(&eb, &ea));
        }
    }
}

#[test]
fn default_threshold_is_point_six() {
    assert_eq!(DEFAULT_SIMILARITY_THRESHOLD, 0.6);
    assert_eq!(SimilarityMatcher::default().threshold(), 0.6);
}

#[test]
fn pair_scoring_exactly_point_six_matches() {
    // cos((3,4), (1,0)) = 3/5
    let score = cosine_similarity(&[3.0, 4.0], &[1.0, 0.0]);
    assert!(SimilarityMatcher::default().is_similar(score));
}

#[test]
fn pair_scoring_just_below_point_six_does_not_match() {
    assert!(!SimilarityMatcher::default().is_similar(0.599999));
}

// ============================================================
// Empty corpus
// ============================================================

#[test]
fn empty_corpus_never_matches() {
    let ctx = context(Vec::new());
    for query in ["What is 2+2?", "", "anything at all"] {
        let check = ctx.check_question(query, None).unwrap();
        assert!(!check.similarity.similar_exists);
        assert!(!check.similarity.same_topic);
        assert_eq!(check.similarity.matched_question, None);
    }
}

#[test]
fn blank_rows_only_is_an_empty_corpus() {
    let ctx = context(vec![
        DatasetRow::new("", "Math", 1.0, 1.0),
        DatasetRow::new("   ", "Physics", 2.0, 1.0),
    ]);
    assert!(ctx.corpus().is_empty());
    assert!(ctx.list_topics().is_empty());
    assert!(!ctx.check_question("   ", None).unwrap().similarity.similar_exists);
}

// ============================================================
// Verbatim questions match themselves
// ============================================================

#[test]
fn every_corpus_question_matches_itself() {
    let ctx = context(bank());
    let questions = ctx.corpus().questions();

    for (own_index, q) in questions.iter().enumerate() {
        let check = ctx.check_question(&q.text, None).unwrap();
        assert!(check.similarity.similar_exists, "{} did not match", q.text);

        let matched = check.similarity.matched_question.as_deref().unwrap();
        let matched_index = questions.iter().position(|r| r.text == matched).unwrap();
        assert!(
            matched_index <= own_index,
            "{} matched a later entry {}",
            q.text,
            matched
        );
    }
}

#[test]
fn first_match_in_corpus_order_is_reported() {
    let ctx = context(vec![
        DatasetRow::new("solve the quadratic equation for x today", "Algebra", 2.0, 1.0),
        DatasetRow::new("solve the quadratic equation for x", "Algebra", 2.0, 1.0),
    ]);
    let check = ctx.check_question("solve the quadratic equation for x", None).unwrap();
    assert_eq!(
        check.similarity.matched_question.as_deref(),
        Some("solve the quadratic equation for x today")
    );
}

// ============================================================
// listTopics
// ============================================================

#[test]
fn list_topics_is_distinct_and_skips_missing() {
    let mut rows = bank();
    rows.push(DatasetRow::new("What is 5+5?", "Math", 1.0, 1.0));
    rows.push(DatasetRow {
        question: "Untagged question about rivers".to_string(),
        topic: None,
        marks: Some(2.0),
        weightage: None,
    });
    rows.push(DatasetRow::new("Blank-topic question", "  ", 1.0, 1.0));

    let ctx = context(rows);
    let topics: Vec<String> = ctx.list_topics().into_iter().collect();
    assert_eq!(topics, vec!["Biology", "Math", "Physics"]);
}

// ============================================================
// Topic resolution: both calling modes
// ============================================================

#[test]
fn single_row_math_example() {
    let ctx = context(vec![DatasetRow::new("What is 2+2?", "Math", 1.0, 1.0)]);

    let predicted = ctx.check_question("What is 2+2?", None).unwrap();
    assert!(predicted.similarity.similar_exists);
    assert_eq!(predicted.similarity.matched_question.as_deref(), Some("What is 2+2?"));
    assert_eq!(predicted.similarity.predicted_topic, "Math");
    assert!(predicted.similarity.same_topic);

    let given_math = ctx.check_question("What is 2+2?", Some("Math")).unwrap();
    assert!(given_math.similarity.same_topic);
    assert_eq!(given_math.topic.mismatch(), Some(false));

    let given_other = ctx.check_question("What is 2+2?", Some("History")).unwrap();
    assert!(given_other.similarity.similar_exists);
    assert!(!given_other.similarity.same_topic);
    assert_eq!(given_other.topic.mismatch(), Some(true));
}

#[test]
fn expected_topic_equal_to_prediction_is_not_flagged() {
    let ctx = context(bank());
    let query = "Explain the structure of the cell membrane";

    let unchecked = ctx.check_question(query, None).unwrap();
    let predicted = unchecked.topic.predicted().topic.clone();
    assert_eq!(unchecked.topic.mismatch(), None);

    let agreeing = ctx.check_question(query, Some(predicted.as_str())).unwrap();
    assert_eq!(agreeing.topic.mismatch(), Some(false));

    let wrong = ctx.check_question(query, Some("Ancient History")).unwrap();
    assert_eq!(wrong.topic.mismatch(), Some(true));
    match wrong.topic {
        TopicResolution::Checked {
            expected,
            predicted: p,
            ..
        } => {
            assert_eq!(expected, "Ancient History");
            assert_eq!(p.topic, predicted);
        }
        other => panic!("expected a checked resolution, got {other:?}"),
    }
}

#[test]
fn same_topic_follows_given_topic_not_prediction() {
    let ctx = context(bank());
    let query = "What is 2+2?";

    assert!(ctx.check_question(query, Some("Math")).unwrap().similarity.same_topic);
    assert!(!ctx.check_question(query, Some("Biology")).unwrap().similarity.same_topic);
}

#[test]
fn corpus_and_query_models_must_agree() {
    let corpus = ReferenceCorpus::build(bank(), &HashEmbedder::new(128)).unwrap();
    assert!(InferenceContext::from_corpus(
        Box::new(HashEmbedder::new(256)),
        corpus,
        &ContextSettings::default()
    )
    .is_err());
}
