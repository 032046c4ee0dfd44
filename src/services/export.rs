//! CSV reports derived from the current store contents.
//!
//! Three files are written into the data directory per export:
//! `guesses_export_{ts}.csv`, `results_export_{ts}.csv` and
//! `detailed_analysis_{ts}.csv`. Exports only read the store.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing::{error, info};

use crate::models::{course_name, parse_guesses, parse_results, Collection, GuessTable, ResultTable};
use crate::storage;
use crate::store::JsonStore;

use super::scoring::leaderboard;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Paths written by one export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub guesses: PathBuf,
    pub results: PathBuf,
    pub analysis: PathBuf,
}

/// Writes CSV reports for the store's current state.
pub struct CsvExporter {
    store: Arc<JsonStore>,
    out_dir: PathBuf,
    winner_threshold: f64,
}

impl CsvExporter {
    pub fn new(store: Arc<JsonStore>, winner_threshold: f64) -> Self {
        let out_dir = store.data_dir().to_path_buf();
        Self {
            store,
            out_dir,
            winner_threshold,
        }
    }

    /// Export all three reports.
    pub async fn export(&self) -> Result<ExportReport, ExportError> {
        let guesses = parse_guesses(&self.store.load(Collection::Guesses).await);
        let results = parse_results(&self.store.load(Collection::Results).await);
        let timestamp = Local::now().format("%Y-%m-%d_%H%M%S").to_string();

        let report = ExportReport {
            guesses: self
                .out_dir
                .join(format!("guesses_export_{}.csv", timestamp)),
            results: self
                .out_dir
                .join(format!("results_export_{}.csv", timestamp)),
            analysis: self
                .out_dir
                .join(format!("detailed_analysis_{}.csv", timestamp)),
        };

        write_report(&report.guesses, &guesses_csv(&guesses)).await?;
        info!("Guesses exported to: {}", report.guesses.display());
        write_report(&report.results, &results_csv(&results)).await?;
        info!("Results exported to: {}", report.results.display());
        write_report(
            &report.analysis,
            &analysis_csv(&guesses, &results, self.winner_threshold),
        )
        .await?;
        info!("Detailed analysis exported to: {}", report.analysis.display());

        Ok(report)
    }

    /// Like `export`, but only logs the outcome.
    pub async fn export_logged(&self) -> Option<ExportReport> {
        match self.export().await {
            Ok(report) => {
                info!("CSV export completed successfully");
                Some(report)
            }
            Err(e) => {
                error!("CSV export failed: {}", e);
                None
            }
        }
    }
}

async fn write_report(path: &Path, contents: &str) -> Result<(), ExportError> {
    storage::write_atomic(path, contents.as_bytes())
        .await
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Quote a field and double any embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn push_row(out: &mut String, fields: &[String]) {
    let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
    let _ = writeln!(out, "{}", row.join(","));
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per (user, course) guess.
pub fn guesses_csv(guesses: &GuessTable) -> String {
    let mut out = String::from("Username,Course,Course Name,Midsem Guess,Compre Guess,Timestamp\n");
    for (username, courses) in guesses {
        for (course, guess) in courses {
            push_row(
                &mut out,
                &[
                    username.clone(),
                    course.clone(),
                    course_name(course).to_string(),
                    number(guess.midsem),
                    number(guess.compre),
                    guess.timestamp.clone().unwrap_or_default(),
                ],
            );
        }
    }
    out
}

/// One row per recorded (course, exam) average.
pub fn results_csv(results: &ResultTable) -> String {
    let mut out = String::from("Course,Course Name,Exam Type,Average\n");
    for (course, exams) in results {
        for (exam, average) in exams {
            push_row(
                &mut out,
                &[
                    course.clone(),
                    course_name(course).to_string(),
                    exam.to_string(),
                    average.to_string(),
                ],
            );
        }
    }
    out
}

/// Guesses joined with results, ranked per (course, exam).
///
/// Guesses with no matching result, and results nobody guessed, produce no
/// rows.
pub fn analysis_csv(guesses: &GuessTable, results: &ResultTable, threshold: f64) -> String {
    let mut out = String::from(
        "Course,Course Name,Exam Type,Username,User Guess,Actual Average,Difference,Is Winner\n",
    );
    for standing in leaderboard(guesses, results, threshold) {
        for participant in &standing.participants {
            let difference = (participant.difference * 100.0).round() / 100.0;
            push_row(
                &mut out,
                &[
                    standing.course.clone(),
                    standing.course_name.clone(),
                    standing.exam_type.to_string(),
                    participant.username.clone(),
                    participant.guess.to_string(),
                    standing.actual_average.to_string(),
                    difference.to_string(),
                    if participant.is_winner { "Yes" } else { "No" }.to_string(),
                ],
            );
        }
    }
    out
}
