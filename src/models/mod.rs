//! Data models for BitBets.

mod collection;
mod course;
mod guess;

pub use collection::{Collection, JsonMap};
pub use course::{course_name, find_course, Course, COURSES};
pub use guess::{parse_guesses, parse_results, ExamType, Guess, GuessTable, ResultTable};
