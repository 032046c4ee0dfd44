//! Static course catalog.
//!
//! Guesses and results reference courses by slug code. The store does not
//! enforce that a code exists here; the catalog only supplies display names
//! for exports and the leaderboard.

use serde::Serialize;

/// A course that can be predicted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Course {
    pub code: &'static str,
    pub name: &'static str,
}

pub const COURSES: &[Course] = &[
    Course { code: "bio-f111", name: "BIO F111 - General Biology" },
    Course { code: "chem-f111", name: "CHEM F111 - General Chemistry" },
    Course { code: "math-f111", name: "MATH F111 - Mathematics I" },
    Course { code: "phy-f111", name: "PHY F111 - Mechanics, Oscillations & Waves" },
    Course { code: "bits-f110", name: "BITS F110 - Engineering Graphics" },
    Course { code: "math-f112", name: "MATH F112 - Mathematics II" },
    Course { code: "me-f112", name: "ME F112 - Workshop Practice" },
    Course { code: "cs-f111", name: "CS F111 - Computer Programming" },
    Course { code: "eee-f111", name: "EEE F111 - Electrical Sciences" },
    Course { code: "bits-f112", name: "BITS F112 - Technical Report Writing" },
    Course { code: "math-f113", name: "MATH F113 - Probability and Statistics" },
    Course { code: "bits-f111", name: "BITS F111 - Thermodynamics" },
];

pub fn find_course(code: &str) -> Option<&'static Course> {
    COURSES.iter().find(|c| c.code == code)
}

/// Display name for a course code, falling back to the code itself.
pub fn course_name(code: &str) -> &str {
    find_course(code).map(|c| c.name).unwrap_or(code)
}
