// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spaced-repetition review scheduler.
//!
//! Pure computation over a flashcard's scheduling state: given the current
//! `(ease_factor, interval_days, repetitions)` tuple, a binary recall grade,
//! and an injected "now", produce the replacement tuple and the next due
//! date. No I/O, no wall-clock reads, no hidden state.
//!
//! Policy (SM-2 style):
//! - Incorrect: repetitions reset to 0, interval resets to 1 day, ease factor
//!   drops by 0.2 (floored at 1.3).
//! - Correct: repetitions increment; the first two correct recalls use fixed
//!   intervals (1 day, then 6 days), after that the previous interval is
//!   multiplied by the ease factor and rounded to whole days. Ease factor is
//!   unchanged on correct recall.

use chrono::{DateTime, Duration, Utc};

/// Minimum ease factor allowed. Prevents runaway interval shrinkage.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor penalty applied on incorrect recall.
pub const EASE_PENALTY: f64 = 0.2;

/// Interval (days) a card resets to after incorrect recall.
pub const RESET_INTERVAL_DAYS: u32 = 1;

/// Interval (days) after the first correct recall.
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval (days) after the second consecutive correct recall.
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Binary recall grade, matching the persisted `was_correct` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewGrade {
    Correct,
    Incorrect,
}

impl ReviewGrade {
    /// Build a grade from the stored quiz outcome.
    pub fn from_outcome(was_correct: bool) -> Self {
        if was_correct {
            ReviewGrade::Correct
        } else {
            ReviewGrade::Incorrect
        }
    }
}

/// A flashcard's current scheduling state, as read from the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingState {
    /// Multiplier controlling interval growth (>= 1.3).
    pub ease_factor: f64,
    /// Days until the next review at the time of the last scheduling.
    pub interval_days: u32,
    /// Consecutive correct recalls since the last reset.
    pub repetitions: u32,
}

impl SchedulingState {
    /// State for a freshly created card: due immediately, nothing recalled yet.
    pub fn new_card() -> Self {
        Self {
            ease_factor: 2.5,
            interval_days: 0,
            repetitions: 0,
        }
    }
}

/// Replacement scheduling tuple produced by a review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledReview {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub due_at: DateTime<Utc>,
}

/// Validation errors for malformed scheduling state.
///
/// Rejected before any scheduling computation runs; the caller decides
/// whether to retry with corrected input or drop the grading event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("ease factor {0} is not a finite number")]
    NonFiniteEaseFactor(f64),

    #[error("ease factor {0} is below the minimum of {MIN_EASE_FACTOR}")]
    EaseFactorBelowFloor(f64),
}

/// Check that a scheduling state is well-formed.
///
/// Negative intervals and repetition counts are unrepresentable by type, so
/// only the ease factor needs a runtime check.
pub fn validate_state(state: &SchedulingState) -> Result<(), ScheduleError> {
    if !state.ease_factor.is_finite() {
        return Err(ScheduleError::NonFiniteEaseFactor(state.ease_factor));
    }
    if state.ease_factor < MIN_EASE_FACTOR {
        return Err(ScheduleError::EaseFactorBelowFloor(state.ease_factor));
    }
    Ok(())
}

/// Compute the next scheduling state for a graded review.
///
/// Deterministic: identical inputs (including `now`) yield identical output.
pub fn schedule_review(
    state: &SchedulingState,
    grade: ReviewGrade,
    now: DateTime<Utc>,
) -> Result<ScheduledReview, ScheduleError> {
    validate_state(state)?;

    let (ease_factor, interval_days, repetitions) = match grade {
        ReviewGrade::Incorrect => {
            let ease = (state.ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR);
            (ease, RESET_INTERVAL_DAYS, 0)
        }
        ReviewGrade::Correct => {
            let repetitions = state.repetitions + 1;
            let interval = match repetitions {
                1 => FIRST_INTERVAL_DAYS,
                2 => SECOND_INTERVAL_DAYS,
                _ => (state.interval_days as f64 * state.ease_factor).round() as u32,
            };
            (state.ease_factor, interval, repetitions)
        }
    };

    Ok(ScheduledReview {
        ease_factor,
        interval_days,
        repetitions,
        due_at: now + Duration::days(interval_days as i64),
    })
}

/// The intervals each grade would produce from a given state.
///
/// Shown next to the answer buttons so users can see what is at stake.
#[derive(Debug, Clone, Copy)]
pub struct IntervalPreview {
    pub if_correct_days: u32,
    pub if_incorrect_days: u32,
}

/// Preview the would-be intervals for both grades without committing either.
pub fn preview_intervals(state: &SchedulingState) -> Result<IntervalPreview, ScheduleError> {
    // Epoch placeholder: only the interval is read, the due date is discarded.
    let reference = DateTime::<Utc>::UNIX_EPOCH;
    Ok(IntervalPreview {
        if_correct_days: schedule_review(state, ReviewGrade::Correct, reference)?.interval_days,
        if_incorrect_days: schedule_review(state, ReviewGrade::Incorrect, reference)?.interval_days,
    })
}
