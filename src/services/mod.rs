// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod classification;
pub mod classifier;

pub use classification::{ClassificationOutcome, ClassificationProcessor};
pub use classifier::{ClassifierService, PlantIdentification};
