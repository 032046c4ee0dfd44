//! Aggregate counts over the three collections.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{parse_guesses, parse_results, Collection, GuessTable, JsonMap, ResultTable, COURSES};
use crate::store::JsonStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitionStats {
    pub total_users: usize,
    /// Non-null midsem and compre guesses across all users.
    pub total_predictions: usize,
    /// Recorded (course, exam) averages.
    pub results_set: usize,
    pub unique_courses_predicted: usize,
    pub total_courses_available: usize,
}

impl CompetitionStats {
    pub fn compute(users: &JsonMap, guesses: &GuessTable, results: &ResultTable) -> Self {
        let total_predictions = guesses
            .values()
            .flat_map(|courses| courses.values())
            .map(|g| g.prediction_count())
            .sum();
        let unique_courses: BTreeSet<&str> = guesses
            .values()
            .flat_map(|courses| courses.keys())
            .map(String::as_str)
            .collect();

        Self {
            total_users: users.len(),
            total_predictions,
            results_set: results.values().map(|exams| exams.len()).sum(),
            unique_courses_predicted: unique_courses.len(),
            total_courses_available: COURSES.len(),
        }
    }

    pub async fn load(store: &JsonStore) -> Self {
        let users = store.load(Collection::Users).await;
        let guesses = parse_guesses(&store.load(Collection::Guesses).await);
        let results = parse_results(&store.load(Collection::Results).await);
        Self::compute(&users, &guesses, &results)
    }
}
