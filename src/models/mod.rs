// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod flashcard;
pub mod plant;
pub mod profile;
pub mod quiz;

pub use flashcard::Flashcard;
pub use plant::{Plant, PlantPhoto, PlantStatus};
pub use profile::{Profile, ProfileStats};
pub use quiz::QuizResult;
