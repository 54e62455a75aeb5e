//! Quiz result model: the append-only grading log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One graded review of a flashcard. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    /// Result ID (also used as document ID)
    pub id: String,
    /// User who answered
    pub user_id: String,
    /// Flashcard that was reviewed
    pub flashcard_id: String,
    /// Whether the recall was correct
    pub was_correct: bool,
    /// How long the answer took, if the client measured it
    pub response_time_seconds: Option<f64>,
    /// When the answer was recorded
    pub created_at: DateTime<Utc>,
}
