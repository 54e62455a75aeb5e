// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Flashcard model with its spaced-repetition scheduling tuple.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::{ScheduledReview, SchedulingState};

/// Stored flashcard record in Firestore.
///
/// The four scheduling fields are written exclusively from a
/// [`ScheduledReview`] produced by the scheduler; nothing else mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    /// Flashcard ID (also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Plant this card quizzes
    pub plant_id: String,
    /// Image shown on the front of the card
    pub front_image_url: String,
    /// Answer text shown on the back
    pub back_text: String,
    /// Interval growth multiplier (>= 1.3)
    pub ease_factor: f64,
    /// Days between the last review and `due_at`
    pub interval_days: u32,
    /// Consecutive correct recalls since the last reset
    pub repetitions: u32,
    /// When the card next becomes eligible for review
    pub due_at: DateTime<Utc>,
    /// When the card was created
    pub created_at: DateTime<Utc>,
    /// Last scheduling update
    pub updated_at: DateTime<Utc>,
}

impl Flashcard {
    /// Create a card for a freshly classified plant, due immediately.
    pub fn new(
        id: String,
        user_id: String,
        plant_id: String,
        front_image_url: String,
        back_text: String,
        now: DateTime<Utc>,
    ) -> Self {
        let state = SchedulingState::new_card();
        Self {
            id,
            user_id,
            plant_id,
            front_image_url,
            back_text,
            ease_factor: state.ease_factor,
            interval_days: state.interval_days,
            repetitions: state.repetitions,
            due_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// The card's current scheduling state as scheduler input.
    pub fn scheduling_state(&self) -> SchedulingState {
        SchedulingState {
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            repetitions: self.repetitions,
        }
    }

    /// Replace the scheduling tuple with a scheduler result.
    pub fn apply_review(&mut self, review: &ScheduledReview, now: DateTime<Utc>) {
        self.ease_factor = review.ease_factor;
        self.interval_days = review.interval_days;
        self.repetitions = review.repetitions;
        self.due_at = review.due_at;
        self.updated_at = now;
    }
}
