//! Guess records, exam types and typed views over the raw collections.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::JsonMap;

/// The two exams a course average can be guessed for.
///
/// `compre` is the canonical literal for the second exam. `comprehensive`
/// is accepted when parsing and normalised to `compre`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Midsem,
    #[serde(alias = "comprehensive")]
    Compre,
}

impl ExamType {
    pub const ALL: [ExamType; 2] = [ExamType::Midsem, ExamType::Compre];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Midsem => "midsem",
            ExamType::Compre => "compre",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "midsem" => Ok(ExamType::Midsem),
            "compre" | "comprehensive" => Ok(ExamType::Compre),
            other => Err(format!("unknown exam type: {}", other)),
        }
    }
}

/// A participant's guess for one course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    #[serde(default)]
    pub midsem: Option<f64>,
    #[serde(default, alias = "comprehensive")]
    pub compre: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Guess {
    pub fn value(&self, exam: ExamType) -> Option<f64> {
        match exam {
            ExamType::Midsem => self.midsem,
            ExamType::Compre => self.compre,
        }
    }

    /// Number of exams this record guesses.
    pub fn prediction_count(&self) -> usize {
        ExamType::ALL
            .iter()
            .filter(|e| self.value(**e).is_some())
            .count()
    }
}

/// username -> course -> guess
pub type GuessTable = BTreeMap<String, BTreeMap<String, Guess>>;

/// course -> exam -> actual average
pub type ResultTable = BTreeMap<String, BTreeMap<ExamType, f64>>;

/// Typed view of the guesses collection.
///
/// Entries that do not have the expected shape are skipped, never reported.
pub fn parse_guesses(raw: &JsonMap) -> GuessTable {
    let mut table = GuessTable::new();
    for (username, courses) in raw {
        let Some(courses) = courses.as_object() else {
            continue;
        };
        let parsed: BTreeMap<String, Guess> = courses
            .iter()
            .filter_map(|(course, value)| {
                serde_json::from_value::<Guess>(value.clone())
                    .ok()
                    .map(|g| (course.clone(), g))
            })
            .collect();
        table.insert(username.clone(), parsed);
    }
    table
}

/// Typed view of the results collection.
///
/// Unknown exam keys and non-numeric averages are skipped.
pub fn parse_results(raw: &JsonMap) -> ResultTable {
    let mut table = ResultTable::new();
    for (course, exams) in raw {
        let Some(exams) = exams.as_object() else {
            continue;
        };
        let parsed: BTreeMap<ExamType, f64> = exams
            .iter()
            .filter_map(|(exam, value)| {
                let exam = exam.parse::<ExamType>().ok()?;
                Some((exam, value.as_f64()?))
            })
            .collect();
        if !parsed.is_empty() {
            table.insert(course.clone(), parsed);
        }
    }
    table
}
