//! User profile and pre-computed learning aggregates.
//!
//! The aggregates are folded in when plants are created and quizzes are
//! graded, reducing profile reads from O(events) to O(1). They stay
//! derivable from the append-only quiz-result log and the plant records, so
//! a full recompute can repair any drift.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::QuizResult;

/// User profile stored in Firestore (display fields only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// User ID from the identity provider (also used as document ID)
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub full_name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
    /// Last profile update
    pub updated_at: DateTime<Utc>,
}

/// Pre-computed learning statistics for a user.
///
/// Stored in the `profile_stats` collection, keyed by user ID, and updated
/// in the same Firestore transaction as the plant/quiz write that caused the
/// change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileStats {
    // ─── Plant Stats ─────────────────────────────────────────────
    /// Total plants in the user's collection
    #[serde(default)]
    pub total_plants: u32,

    // ─── Quiz Stats ──────────────────────────────────────────────
    /// Total graded reviews
    #[serde(default)]
    pub quizzes_total: u32,
    /// Reviews answered correctly
    #[serde(default)]
    pub quizzes_correct: u32,

    // ─── Streak ──────────────────────────────────────────────────
    /// Consecutive UTC days with at least one review
    #[serde(default)]
    pub streak_count: u32,
    /// UTC date of the most recent review
    #[serde(default)]
    pub last_review_date: Option<NaiveDate>,

    // ─── Idempotency ─────────────────────────────────────────────
    /// Plant IDs already counted (for duplicate detection)
    #[serde(default)]
    pub counted_plant_ids: HashSet<String>,
    /// Quiz result IDs already folded in (for duplicate detection)
    #[serde(default)]
    pub processed_result_ids: HashSet<String>,

    // ─── Metadata ────────────────────────────────────────────────
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ProfileStats {
    fn default() -> Self {
        Self {
            total_plants: 0,
            quizzes_total: 0,
            quizzes_correct: 0,
            streak_count: 0,
            last_review_date: None,
            counted_plant_ids: HashSet::new(),
            processed_result_ids: HashSet::new(),
            updated_at: None,
        }
    }
}

impl ProfileStats {
    /// Quiz accuracy as a whole percentage (0 when nothing graded yet).
    pub fn quiz_accuracy(&self) -> u32 {
        if self.quizzes_total == 0 {
            return 0;
        }
        ((self.quizzes_correct as f64 / self.quizzes_total as f64) * 100.0).round() as u32
    }

    /// Count a newly created plant.
    ///
    /// Returns `true` if the plant was counted, `false` if it was already
    /// known (idempotent duplicate).
    pub fn update_from_plant(&mut self, plant_id: &str, now: DateTime<Utc>) -> bool {
        if !self.counted_plant_ids.insert(plant_id.to_string()) {
            return false;
        }
        self.total_plants += 1;
        self.updated_at = Some(now);
        true
    }

    /// Fold a graded review into the aggregates.
    ///
    /// Returns `true` if the result was processed (new), `false` if it was
    /// already folded in (idempotent duplicate). Assumes results arrive in
    /// chronological order, matching the grading flow.
    pub fn update_from_review(&mut self, result: &QuizResult) -> bool {
        if !self.processed_result_ids.insert(result.id.clone()) {
            return false;
        }

        self.quizzes_total += 1;
        if result.was_correct {
            self.quizzes_correct += 1;
        }

        let review_date = crate::time_utils::utc_date(result.created_at);
        self.streak_count = match self.last_review_date {
            // Several reviews on the same day extend nothing.
            Some(last) if last == review_date => self.streak_count,
            Some(last) if last.succ_opt() == Some(review_date) => self.streak_count + 1,
            _ => 1,
        };
        self.last_review_date = Some(review_date);
        self.updated_at = Some(result.created_at);

        true
    }

    /// Rebuild the aggregates from scratch out of the underlying logs.
    ///
    /// Results are sorted by creation time first so the streak walk sees
    /// them in order regardless of query ordering.
    pub fn recompute<I>(plant_ids: I, results: &[QuizResult], now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut stats = Self::default();

        for plant_id in plant_ids {
            stats.update_from_plant(&plant_id, now);
        }

        let mut ordered: Vec<&QuizResult> = results.iter().collect();
        ordered.sort_by_key(|r| r.created_at);
        for result in ordered {
            stats.update_from_review(result);
        }

        stats.updated_at = Some(now);
        stats
    }
}
