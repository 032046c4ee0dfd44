//! Service layer for BitBets business logic.
//!
//! Backups, CSV exports, scoring and the destructive admin operations.
//! Services can be used by the CLI or the web server.

pub mod backup;
pub mod competition;
pub mod export;
pub mod scoring;
pub mod stats;

pub use backup::{read_snapshot, BackupError, BackupManager, RestoreSet, Snapshot};
pub use competition::CompetitionError;
pub use export::{CsvExporter, ExportError, ExportReport};
pub use scoring::{leaderboard, rank_guesses, ExamStanding, Participant};
pub use stats::CompetitionStats;
