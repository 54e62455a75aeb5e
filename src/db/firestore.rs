// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (display fields) and profile stats (learning aggregates)
//! - Plants and plant photos
//! - Flashcards (scheduling state)
//! - Quiz results (append-only grading log)

use chrono::{DateTime, Utc};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Flashcard, Plant, PlantPhoto, Profile, ProfileStats, QuizResult};

/// Position in the plant listing for cursor pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantQueryCursor {
    pub created_at: DateTime<Utc>,
    pub plant_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a profile by user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a profile.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Profile Stats Operations ────────────────────────────────

    /// Get the learning-stats aggregate document for a user.
    pub async fn get_profile_stats(&self, user_id: &str) -> Result<Option<ProfileStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILE_STATS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the learning-stats aggregate document for a user.
    pub async fn set_profile_stats(
        &self,
        user_id: &str,
        stats: &ProfileStats,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILE_STATS)
            .document_id(user_id)
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Plant Operations ────────────────────────────────────────

    /// Get a plant by ID.
    pub async fn get_plant(&self, plant_id: &str) -> Result<Option<Plant>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PLANTS)
            .obj()
            .one(plant_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a plant record (create or replace).
    pub async fn set_plant(&self, plant: &Plant) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLANTS)
            .document_id(&plant.id)
            .object(plant)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a user's plants, newest first, with cursor pagination.
    ///
    /// `before` is the creation timestamp of the last plant on the previous
    /// page; only strictly older plants are returned.
    pub async fn get_plants_for_user(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Plant>, AppError> {
        let user_id = user_id.to_string();
        let query = self.get_client()?.fluent().select().from(collections::PLANTS);

        let query = if let Some(before) = before {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("created_at").less_than(before),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id.clone()))
        };

        query
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Plant Photo Operations ──────────────────────────────────

    /// Store a photo record.
    pub async fn set_photo(&self, photo: &PlantPhoto) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLANT_PHOTOS)
            .document_id(&photo.id)
            .object(photo)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all photos for a plant, oldest first.
    pub async fn get_photos_for_plant(&self, plant_id: &str) -> Result<Vec<PlantPhoto>, AppError> {
        let plant_id = plant_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLANT_PHOTOS)
            .filter(move |q| q.field("plant_id").eq(plant_id.clone()))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Flashcard Operations ────────────────────────────────────

    /// Get a flashcard by ID.
    pub async fn get_flashcard(&self, flashcard_id: &str) -> Result<Option<Flashcard>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FLASHCARDS)
            .obj()
            .one(flashcard_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a flashcard record (create or replace).
    pub async fn set_flashcard(&self, flashcard: &Flashcard) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FLASHCARDS)
            .document_id(&flashcard.id)
            .object(flashcard)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a user's flashcards that are due for review, most overdue first.
    pub async fn get_due_flashcards(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Flashcard>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FLASHCARDS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("due_at").less_than_or_equal(now),
                ])
            })
            .order_by([("due_at", firestore::FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Plant Creation ───────────────────────────────────

    /// Atomically create a plant with its first photo and count it in the
    /// user's stats.
    ///
    /// A Firestore transaction keeps the three writes together; if another
    /// request modifies the stats concurrently, Firestore retries with fresh
    /// data, preventing lost updates.
    ///
    /// Returns `true` if the plant was newly counted, `false` if it was
    /// already known (idempotent duplicate).
    pub async fn create_plant_atomic(
        &self,
        plant: &Plant,
        photo: &PlantPhoto,
    ) -> Result<bool, AppError> {
        let user_id = plant.user_id.clone();
        let now = Utc::now();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read current stats within the transaction so the document is
        // registered for conflict detection.
        let current_stats: Option<ProfileStats> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILE_STATS)
            .obj()
            .one(&user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read stats in transaction: {}", e))
            })?;

        let mut stats = current_stats.unwrap_or_default();

        if !stats.update_from_plant(&plant.id, now) {
            tracing::debug!(
                user_id = %user_id,
                plant_id = %plant.id,
                "Plant already counted (idempotent skip)"
            );
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PLANTS)
            .document_id(&plant.id)
            .object(plant)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add plant to transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PLANT_PHOTOS)
            .document_id(&photo.id)
            .object(photo)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add photo to transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILE_STATS)
            .document_id(&user_id)
            .object(&stats)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add stats to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %user_id,
            plant_id = %plant.id,
            "Plant created atomically"
        );

        Ok(true)
    }

    // ─── Atomic Quiz Grading ─────────────────────────────────────

    /// Atomically persist a graded review: replace the flashcard's
    /// scheduling tuple, append the quiz result, and fold it into the
    /// user's stats.
    ///
    /// The flashcard tuple is last-write-wins by design; the transaction
    /// guarantees each committed grade saw a consistent stats document and
    /// that no quiz result is appended without its stats update.
    ///
    /// Returns `true` if the result was newly processed, `false` if it was
    /// already folded in (idempotent duplicate).
    pub async fn grade_flashcard_atomic(
        &self,
        flashcard: &Flashcard,
        result: &QuizResult,
    ) -> Result<bool, AppError> {
        let user_id = result.user_id.clone();

        // Safety check: make sure the card still exists before writing.
        if self.get_flashcard(&flashcard.id).await?.is_none() {
            tracing::warn!(
                user_id = %user_id,
                flashcard_id = %flashcard.id,
                "Flashcard not found, aborting atomic grade"
            );
            return Ok(false);
        }

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current_stats: Option<ProfileStats> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILE_STATS)
            .obj()
            .one(&user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read stats in transaction: {}", e))
            })?;

        let mut stats = current_stats.unwrap_or_default();

        if !stats.update_from_review(result) {
            tracing::debug!(
                user_id = %user_id,
                result_id = %result.id,
                "Quiz result already processed (idempotent skip)"
            );
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::FLASHCARDS)
            .document_id(&flashcard.id)
            .object(flashcard)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add flashcard to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::QUIZ_RESULTS)
            .document_id(&result.id)
            .object(result)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add quiz result to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILE_STATS)
            .document_id(&user_id)
            .object(&stats)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add stats to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %user_id,
            flashcard_id = %flashcard.id,
            was_correct = result.was_correct,
            next_due = %flashcard.due_at,
            "Review graded atomically"
        );

        Ok(true)
    }

    // ─── Stats Recompute ─────────────────────────────────────────

    /// Rebuild a user's stats aggregate from the plant and quiz-result logs.
    ///
    /// Expensive but infrequent; used to repair drift in the denormalized
    /// aggregates.
    pub async fn recompute_profile_stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProfileStats, AppError> {
        let owner = user_id.to_string();
        let plants_query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PLANTS)
            .filter(move |q| q.field("user_id").eq(owner.clone()))
            .obj::<Plant>()
            .query();

        let owner = user_id.to_string();
        let results_query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::QUIZ_RESULTS)
            .filter(move |q| q.field("user_id").eq(owner.clone()))
            .obj::<QuizResult>()
            .query();

        let (plants, results) = futures_util::try_join!(plants_query, results_query)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stats = ProfileStats::recompute(plants.into_iter().map(|p| p.id), &results, now);
        self.set_profile_stats(user_id, &stats).await?;

        tracing::info!(
            user_id,
            total_plants = stats.total_plants,
            quizzes_total = stats.quizzes_total,
            "Profile stats recomputed from logs"
        );

        Ok(stats)
    }
}
