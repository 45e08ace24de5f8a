// Colored terminal output for question checks, batch tables and metrics.
//
// This module handles all terminal-specific formatting. The main.rs command
// handlers delegate here.

use std::collections::{BTreeMap, BTreeSet};

use colored::Colorize;

use super::{format_value, truncate_chars};
use crate::analyzer::AnalysisRecord;
use crate::context::{QuestionCheck, TopicResolution};

/// Display the result of checking a single question.
pub fn display_check(check: &QuestionCheck) {
    println!(
        "\n{}",
        format!("=== {} ===", truncate_chars(&check.question, 70)).bold()
    );

    let similarity = &check.similarity;
    if similarity.similar_exists {
        println!("  Duplicate: {}", "yes".red().bold());
        if let Some(matched) = &similarity.matched_question {
            println!("  Matches: {}", truncate_chars(matched, 100).dimmed());
        }
        let same_topic = if similarity.same_topic {
            "yes".red().to_string()
        } else {
            "no".green().to_string()
        };
        println!("  Same topic: {same_topic}");
    } else {
        println!("  Duplicate: {}", "no".green());
    }

    match &check.topic {
        TopicResolution::Predicted { predicted } => {
            println!(
                "  Predicted topic: {} ({:.2})",
                colorize_topic(&predicted.topic),
                predicted.confidence
            );
        }
        TopicResolution::Checked {
            expected,
            predicted,
            mismatch,
        } => {
            let verdict = if *mismatch {
                "mismatch".yellow().bold()
            } else {
                "ok".green()
            };
            println!(
                "  Topic: {expected} (predicted {}, {verdict})",
                colorize_topic(&predicted.topic)
            );
        }
    }

    println!(
        "  Marks: {}  |  Weightage: {}",
        format_value(check.attributes.marks),
        format_value(check.attributes.weightage)
    );

    if let Some(err) = &check.prediction_error {
        println!("  {} {}", "!".yellow(), format!("Prediction degraded: {err}").dimmed());
    }
}

/// Display batch results as a table.
pub fn display_batch(records: &[AnalysisRecord]) {
    if records.is_empty() {
        println!("No questions found in the batch file.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Batch Results ({} questions) ===", records.len()).bold()
    );
    println!();

    println!(
        "  {:>4}  {:<48} {:<5}  {:<18} {:>5}  {:>6}",
        "#".dimmed(),
        "Question".dimmed(),
        "Dup".dimmed(),
        "Topic".dimmed(),
        "Marks".dimmed(),
        "Weight".dimmed(),
    );
    println!("  {}", "-".repeat(94).dimmed());

    for (i, record) in records.iter().enumerate() {
        let dup = if record.similarity.similar_exists {
            "yes".red().to_string()
        } else {
            "no".green().to_string()
        };
        println!(
            "  {:>4}. {:<48} {:<5}  {:<18} {:>5}  {:>6}",
            i + 1,
            truncate_chars(&record.question, 45),
            dup,
            truncate_chars(&record.similarity.predicted_topic, 15),
            format_value(record.attributes.marks),
            format_value(record.attributes.weightage),
        );
        if let Some(matched) = &record.similarity.matched_question {
            println!("        {} {}", "~".dimmed(), truncate_chars(matched, 80).dimmed());
        }
        if let Some(err) = &record.error {
            println!("        {} {}", "!".yellow(), err.dimmed());
        }
    }

    println!();

    let duplicates = records.iter().filter(|r| r.similarity.similar_exists).count();
    let degraded = records.iter().filter(|r| r.is_degraded()).count();
    if duplicates > 0 {
        println!("  {} {} possible duplicates", "!!".red().bold(), duplicates);
    }
    if degraded > 0 {
        println!("  {} {} questions with degraded predictions", "!".yellow(), degraded);
    }
    if duplicates == 0 && degraded == 0 {
        println!("  {}", "No duplicates found.".green());
    }
}

/// Display the topics known to the question bank.
pub fn display_topics(topics: &BTreeSet<String>) {
    if topics.is_empty() {
        println!("No topics in the question bank.");
        return;
    }
    println!("\n{}", format!("=== Topics ({}) ===", topics.len()).bold());
    for topic in topics {
        println!("  {topic}");
    }
}

/// Display model diagnostics.
pub fn display_metrics(metrics: &BTreeMap<String, f64>) {
    println!("\n{}", "=== Model Metrics ===".bold());
    for (name, value) in metrics {
        if name.ends_with("_accuracy") {
            println!("  {:<20} {}", name, colorize_accuracy(*value));
        } else {
            println!("  {:<20} {}", name, format_value(*value));
        }
    }
    if !metrics.keys().any(|k| k.ends_with("_accuracy")) {
        println!(
            "  {}",
            "No hold-out accuracies (too few rows, or QUIZMATCH_HOLDOUT_METRICS=false)".dimmed()
        );
    }
}

fn colorize_topic(topic: &str) -> colored::ColoredString {
    if topic == crate::predict::UNKNOWN_TOPIC {
        topic.dimmed()
    } else {
        topic.cyan()
    }
}

fn colorize_accuracy(value: f64) -> colored::ColoredString {
    let text = format!("{:.1}%", value * 100.0);
    if value >= 0.8 {
        text.green()
    } else if value >= 0.5 {
        text.yellow()
    } else {
        text.red()
    }
}
