// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plant classification service.
//!
//! Handles the core workflow:
//! 1. Load the pending plant
//! 2. Ask the classifier to identify its representative photo
//! 3. Apply the identification (pending -> classified)
//! 4. Bootstrap the plant's flashcard so it enters the quiz rotation

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Flashcard, Plant, PlantStatus};
use crate::services::classifier::{ClassifierService, PlantIdentification};

/// Identifications below this confidence are not applied; the plant stays
/// pending so a later attempt can retry.
const MIN_CONFIDENCE: f64 = 0.5;

/// Drives a plant from `pending` to `classified`.
pub struct ClassificationProcessor {
    classifier: ClassifierService,
    db: FirestoreDb,
}

/// Result of a classification attempt.
#[derive(Debug)]
pub enum ClassificationOutcome {
    /// The identification was applied and a flashcard created.
    Classified { flashcard_id: String },
    /// The classifier was unsure; the plant stays pending.
    LowConfidence { confidence: f64 },
    /// The plant was classified in the meantime (idempotent skip).
    AlreadyClassified,
    /// Another task is classifying this plant right now.
    InFlight,
}

impl ClassificationProcessor {
    pub fn new(classifier: ClassifierService, db: FirestoreDb) -> Self {
        Self { classifier, db }
    }

    /// Classify a pending plant by ID.
    pub async fn classify_plant(&self, plant_id: &str) -> Result<ClassificationOutcome> {
        let Some(guard) = self.classifier.try_begin(plant_id) else {
            tracing::debug!(plant_id, "Classification already in flight");
            return Ok(ClassificationOutcome::InFlight);
        };
        // Hold the slot until the plant and flashcard writes are done.
        let _guard = guard;

        let mut plant = self
            .db
            .get_plant(plant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plant {} not found", plant_id)))?;

        if plant.status == PlantStatus::Classified {
            tracing::debug!(plant_id, "Plant already classified (idempotent skip)");
            return Ok(ClassificationOutcome::AlreadyClassified);
        }

        let photo_url = plant
            .first_photo_url
            .clone()
            .ok_or_else(|| AppError::BadRequest("Plant has no photo to classify".to_string()))?;

        let identification = self.classifier.identify(&photo_url).await?;

        tracing::info!(
            plant_id,
            scientific_name = %identification.scientific_name,
            confidence = identification.confidence,
            "Classifier responded"
        );

        if identification.confidence < MIN_CONFIDENCE {
            tracing::warn!(
                plant_id,
                confidence = identification.confidence,
                "Identification below confidence threshold, keeping plant pending"
            );
            return Ok(ClassificationOutcome::LowConfidence {
                confidence: identification.confidence,
            });
        }

        let now = chrono::Utc::now();
        apply_identification(&mut plant, &identification, now);
        self.db.set_plant(&plant).await?;

        let flashcard = Flashcard::new(
            uuid::Uuid::new_v4().to_string(),
            plant.user_id.clone(),
            plant.id.clone(),
            photo_url,
            build_back_text(&identification),
            now,
        );
        self.db.set_flashcard(&flashcard).await?;

        tracing::info!(
            plant_id,
            flashcard_id = %flashcard.id,
            "Plant classified and flashcard created"
        );

        Ok(ClassificationOutcome::Classified {
            flashcard_id: flashcard.id,
        })
    }
}

/// Copy an identification onto the plant record.
fn apply_identification(
    plant: &mut Plant,
    identification: &PlantIdentification,
    now: chrono::DateTime<chrono::Utc>,
) {
    plant.scientific_name = identification.scientific_name.clone();
    plant.common_name = identification.common_name.clone();
    plant.family = identification.family.clone();
    // Keep any description the user already wrote.
    if plant.description.is_none() {
        plant.description = identification.description.clone();
    }
    plant.status = PlantStatus::Classified;
    plant.updated_at = now;
}

/// Answer text for the flashcard back: scientific name, with the common
/// name in parentheses when known.
fn build_back_text(identification: &PlantIdentification) -> String {
    match &identification.common_name {
        Some(common) if !common.is_empty() => {
            format!("{} ({})", identification.scientific_name, common)
        }
        _ => identification.scientific_name.clone(),
    }
}
