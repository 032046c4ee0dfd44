//! Result scoring: absolute-difference ranking of guesses.

use serde::Serialize;

use crate::models::{course_name, ExamType, GuessTable, ResultTable};

/// Default winning margin, in marks.
pub const DEFAULT_WINNER_THRESHOLD: f64 = 1.0;

/// One participant's standing for a single (course, exam).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub rank: usize,
    pub username: String,
    pub guess: f64,
    pub difference: f64,
    pub is_winner: bool,
}

/// Ranked participants for one (course, exam) that has an actual average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamStanding {
    pub course: String,
    pub course_name: String,
    pub exam_type: ExamType,
    pub actual_average: f64,
    pub participants: Vec<Participant>,
    pub winners: Vec<String>,
    pub total_participants: usize,
}

/// Rank guesses against an actual average, closest first.
///
/// Equal differences are ordered by username. A participant wins when the
/// difference is at most `threshold`.
pub fn rank_guesses<I>(actual: f64, guesses: I, threshold: f64) -> Vec<Participant>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut scored: Vec<(String, f64, f64)> = guesses
        .into_iter()
        .map(|(username, guess)| {
            let difference = (actual - guess).abs();
            (username, guess, difference)
        })
        .collect();

    scored.sort_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(&b.0)));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (username, guess, difference))| Participant {
            rank: i + 1,
            username,
            guess,
            difference,
            is_winner: difference <= threshold,
        })
        .collect()
}

/// Standings for every (course, exam) with a recorded result.
///
/// Guesses with no value for the exam are skipped. Results that nobody
/// guessed are included with no participants.
pub fn leaderboard(guesses: &GuessTable, results: &ResultTable, threshold: f64) -> Vec<ExamStanding> {
    let mut standings = Vec::new();

    for (course, exams) in results {
        for (exam, actual) in exams {
            let entries = guesses.iter().filter_map(|(username, courses)| {
                courses
                    .get(course)
                    .and_then(|g| g.value(*exam))
                    .map(|value| (username.clone(), value))
            });
            let participants = rank_guesses(*actual, entries, threshold);
            let winners = participants
                .iter()
                .filter(|p| p.is_winner)
                .map(|p| p.username.clone())
                .collect();

            standings.push(ExamStanding {
                course: course.clone(),
                course_name: course_name(course).to_string(),
                exam_type: *exam,
                actual_average: *actual,
                total_participants: participants.len(),
                participants,
                winners,
            });
        }
    }

    standings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Guess;
    use std::collections::BTreeMap;

    fn entries(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(u, g)| (u.to_string(), *g)).collect()
    }

    #[test]
    fn test_rank_by_absolute_difference() {
        let ranked = rank_guesses(
            75.0,
            entries(&[("C", 73.0), ("B", 76.5), ("A", 74.0)]),
            DEFAULT_WINNER_THRESHOLD,
        );

        let order: Vec<_> = ranked.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(ranked[0].difference, 1.0);
        assert_eq!(ranked[1].difference, 1.5);
        assert_eq!(ranked[2].rank, 3);

        // Margin is inclusive: exactly one mark off still wins.
        assert!(ranked[0].is_winner);
        assert!(!ranked[1].is_winner);
        assert!(!ranked[2].is_winner);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let ranked = rank_guesses(75.0, entries(&[("A", 74.0), ("B", 76.5), ("C", 73.0)]), 1.5);
        let winners: Vec<_> = ranked
            .iter()
            .filter(|p| p.is_winner)
            .map(|p| p.username.as_str())
            .collect();
        assert_eq!(winners, vec!["A", "B"]);
    }

    #[test]
    fn test_ties_break_by_username() {
        let ranked = rank_guesses(50.0, entries(&[("zoe", 49.0), ("amy", 51.0)]), 1.0);
        assert_eq!(ranked[0].username, "amy");
        assert_eq!(ranked[1].username, "zoe");
    }

    #[test]
    fn test_leaderboard_joins_course_and_exam() {
        let mut guesses = GuessTable::new();
        let mut alice = BTreeMap::new();
        alice.insert(
            "cs-f111".to_string(),
            Guess {
                midsem: Some(70.0),
                compre: None,
                timestamp: None,
            },
        );
        guesses.insert("alice".to_string(), alice);
        let mut bob = BTreeMap::new();
        bob.insert(
            "cs-f111".to_string(),
            Guess {
                midsem: Some(60.0),
                compre: Some(80.0),
                timestamp: None,
            },
        );
        guesses.insert("bob".to_string(), bob);

        let mut results = ResultTable::new();
        let mut cs = BTreeMap::new();
        cs.insert(ExamType::Midsem, 69.5);
        cs.insert(ExamType::Compre, 81.0);
        results.insert("cs-f111".to_string(), cs);

        let board = leaderboard(&guesses, &results, 1.0);
        assert_eq!(board.len(), 2);

        let midsem = &board[0];
        assert_eq!(midsem.exam_type, ExamType::Midsem);
        assert_eq!(midsem.course_name, "CS F111 - Computer Programming");
        assert_eq!(midsem.total_participants, 2);
        assert_eq!(midsem.winners, vec!["alice".to_string()]);

        let compre = &board[1];
        assert_eq!(compre.exam_type, ExamType::Compre);
        assert_eq!(compre.total_participants, 1);
        assert_eq!(compre.winners, vec!["bob".to_string()]);
    }
}
