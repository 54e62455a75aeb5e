// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::firestore::PlantQueryCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Plant, PlantPhoto, PlantStatus, QuizResult};
use crate::scheduler::{self, ReviewGrade};
use crate::services::ClassificationProcessor;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/plants", get(get_plants).post(create_plant))
        .route("/api/plants/{id}", get(get_plant).patch(update_plant))
        .route("/api/plants/{id}/photos", post(add_photo))
        .route("/api/quiz/due", get(get_due_cards))
        .route("/api/quiz/{flashcard_id}/grade", post(grade_flashcard))
        .route("/api/stats/recompute", post(recompute_stats))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response: display fields plus derived learning aggregates.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub total_plants: u32,
    pub streak_count: u32,
    /// Whole percentage of correct answers (0 when nothing graded yet)
    pub quiz_accuracy: u32,
}

/// Get current user profile with learning aggregates.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_profile(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user.user_id)))?;

    let stats = state
        .db
        .get_profile_stats(&user.user_id)
        .await?
        .unwrap_or_default();

    Ok(Json(ProfileResponse {
        id: profile.id,
        email: profile.email,
        full_name: profile.full_name,
        avatar_url: profile.avatar_url,
        total_plants: stats.total_plants,
        streak_count: stats.streak_count,
        quiz_accuracy: stats.quiz_accuracy(),
    }))
}

// ─── Stats Recompute ─────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecomputeStatsResponse {
    pub total_plants: u32,
    pub streak_count: u32,
    pub quiz_accuracy: u32,
}

/// Rebuild the user's aggregates from the plant and quiz-result logs.
///
/// Expensive but infrequent; intended as the drift-repair path for the
/// denormalized profile stats.
async fn recompute_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RecomputeStatsResponse>> {
    let stats = state
        .db
        .recompute_profile_stats(&user.user_id, chrono::Utc::now())
        .await?;

    Ok(Json(RecomputeStatsResponse {
        total_plants: stats.total_plants,
        streak_count: stats.streak_count,
        quiz_accuracy: stats.quiz_accuracy(),
    }))
}

// ─── Plants ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct PlantsQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 100;
const CURSOR_PARTS: usize = 3;

fn parse_cursor(cursor: Option<&str>) -> Result<Option<PlantQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.split(':').collect();
            if parts.len() != CURSOR_PARTS {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            if parts[2].is_empty() {
                return Err(invalid_cursor());
            }
            let created_at =
                chrono::DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(PlantQueryCursor {
                created_at,
                plant_id: parts[2].to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(cursor: &PlantQueryCursor) -> String {
    let payload = format!(
        "{}:{}:{}",
        cursor.created_at.timestamp(),
        cursor.created_at.timestamp_subsec_nanos(),
        cursor.plant_id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlantSummary {
    pub id: String,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub family: Option<String>,
    pub first_photo_url: Option<String>,
    pub status: PlantStatus,
    pub created_at: String,
}

impl PlantSummary {
    fn from_plant(plant: &Plant) -> Self {
        Self {
            id: plant.id.clone(),
            scientific_name: plant.scientific_name.clone(),
            common_name: plant.common_name.clone(),
            family: plant.family.clone(),
            first_photo_url: plant.first_photo_url.clone(),
            status: plant.status,
            created_at: format_utc_rfc3339(plant.created_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlantsResponse {
    pub plants: Vec<PlantSummary>,
    pub per_page: u32,
    pub next_cursor: Option<String>,
}

/// Get the user's plants, newest first, cursor-paginated.
async fn get_plants(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PlantsQuery>,
) -> Result<Json<PlantsResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        cursor = ?params.cursor,
        per_page = params.per_page,
        "Fetching plants"
    );

    let limit = params.per_page.min(MAX_PER_PAGE);
    let cursor = parse_cursor(params.cursor.as_deref())?;

    // Fetch one extra item to determine if another page is available.
    let fetch_limit = limit.saturating_add(1);
    let mut plants = state
        .db
        .get_plants_for_user(&user.user_id, cursor.map(|c| c.created_at), fetch_limit)
        .await?;

    let has_more = plants.len() > limit as usize;
    if has_more {
        plants.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        plants.last().map(|p| {
            encode_cursor(&PlantQueryCursor {
                created_at: p.created_at,
                plant_id: p.id.clone(),
            })
        })
    } else {
        None
    };

    let summaries = plants.iter().map(PlantSummary::from_plant).collect();

    Ok(Json(PlantsResponse {
        plants: summaries,
        per_page: limit,
        next_cursor,
    }))
}

/// Request to register a freshly uploaded photo as a new plant.
#[derive(Deserialize, Validate)]
pub struct CreatePlantRequest {
    /// Object-store URL the client uploaded the photo to
    #[validate(url(message = "photo_url must be a valid URL"))]
    pub photo_url: String,
    /// Optional notes attached to the photo
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Register an uploaded photo as a new (pending) plant.
///
/// The plant, its photo record, and the stats increment are written in one
/// transaction; classification then runs in the background and flips the
/// plant to `classified` when the classifier answers.
async fn create_plant(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreatePlantRequest>,
) -> Result<Json<PlantSummary>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = chrono::Utc::now();
    let plant = Plant {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        scientific_name: String::new(),
        common_name: None,
        family: None,
        description: None,
        first_photo_url: Some(payload.photo_url.clone()),
        status: PlantStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    let photo = PlantPhoto {
        id: uuid::Uuid::new_v4().to_string(),
        plant_id: plant.id.clone(),
        photo_url: payload.photo_url,
        notes: payload.notes,
        created_at: now,
    };

    state.db.create_plant_atomic(&plant, &photo).await?;

    tracing::info!(
        user_id = %user.user_id,
        plant_id = %plant.id,
        "Plant registered, queueing classification"
    );

    // Classification is best-effort in the background: on failure the plant
    // stays pending and a later request can retry.
    let processor = ClassificationProcessor::new(state.classifier.clone(), state.db.clone());
    let plant_id = plant.id.clone();
    tokio::spawn(async move {
        if let Err(e) = processor.classify_plant(&plant_id).await {
            if e.is_classifier_rate_limit() {
                tracing::info!(plant_id = %plant_id, "Classifier rate limited, plant stays pending");
            } else {
                tracing::warn!(plant_id = %plant_id, error = %e, "Background classification failed");
            }
        }
    });

    Ok(Json(PlantSummary::from_plant(&plant)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PhotoSummary {
    pub id: String,
    pub photo_url: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlantDetailResponse {
    pub id: String,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub family: Option<String>,
    pub description: Option<String>,
    pub first_photo_url: Option<String>,
    pub status: PlantStatus,
    pub created_at: String,
    pub updated_at: String,
    pub photos: Vec<PhotoSummary>,
}

/// Load a plant owned by the requesting user, or 404.
///
/// Foreign plants also answer 404 so ownership cannot be probed.
async fn load_owned_plant(state: &AppState, user: &AuthUser, plant_id: &str) -> Result<Plant> {
    let plant = state
        .db
        .get_plant(plant_id)
        .await?
        .filter(|p| p.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Plant {} not found", plant_id)))?;
    Ok(plant)
}

/// Get a plant with all of its photos.
async fn get_plant(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PlantDetailResponse>> {
    let plant = load_owned_plant(&state, &user, &id).await?;
    let photos = state.db.get_photos_for_plant(&plant.id).await?;

    Ok(Json(PlantDetailResponse {
        id: plant.id,
        scientific_name: plant.scientific_name,
        common_name: plant.common_name,
        family: plant.family,
        description: plant.description,
        first_photo_url: plant.first_photo_url,
        status: plant.status,
        created_at: format_utc_rfc3339(plant.created_at),
        updated_at: format_utc_rfc3339(plant.updated_at),
        photos: photos
            .into_iter()
            .map(|p| PhotoSummary {
                id: p.id,
                photo_url: p.photo_url,
                notes: p.notes,
                created_at: format_utc_rfc3339(p.created_at),
            })
            .collect(),
    }))
}

/// User-editable plant metadata.
#[derive(Deserialize, Validate)]
pub struct UpdatePlantRequest {
    #[validate(length(max = 200))]
    pub common_name: Option<String>,
    #[validate(length(max = 200))]
    pub family: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Edit a plant's metadata. Only provided fields are changed.
async fn update_plant(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePlantRequest>,
) -> Result<Json<PlantSummary>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut plant = load_owned_plant(&state, &user, &id).await?;

    if let Some(common_name) = payload.common_name {
        plant.common_name = Some(common_name);
    }
    if let Some(family) = payload.family {
        plant.family = Some(family);
    }
    if let Some(description) = payload.description {
        plant.description = Some(description);
    }
    plant.updated_at = chrono::Utc::now();

    state.db.set_plant(&plant).await?;

    Ok(Json(PlantSummary::from_plant(&plant)))
}

/// Request to register an additional photo for a plant.
#[derive(Deserialize, Validate)]
pub struct AddPhotoRequest {
    #[validate(url(message = "photo_url must be a valid URL"))]
    pub photo_url: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Register another photo of an existing plant.
async fn add_photo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AddPhotoRequest>,
) -> Result<Json<PhotoSummary>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut plant = load_owned_plant(&state, &user, &id).await?;

    let now = chrono::Utc::now();
    let photo = PlantPhoto {
        id: uuid::Uuid::new_v4().to_string(),
        plant_id: plant.id.clone(),
        photo_url: payload.photo_url,
        notes: payload.notes,
        created_at: now,
    };
    state.db.set_photo(&photo).await?;

    // The first registered photo becomes the representative one.
    if plant.first_photo_url.is_none() {
        plant.first_photo_url = Some(photo.photo_url.clone());
        plant.updated_at = now;
        state.db.set_plant(&plant).await?;
    }

    Ok(Json(PhotoSummary {
        id: photo.id,
        photo_url: photo.photo_url,
        notes: photo.notes,
        created_at: format_utc_rfc3339(photo.created_at),
    }))
}

// ─── Quiz ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DueQuery {
    /// Maximum cards to return
    #[serde(default = "default_due_limit")]
    limit: u32,
}

fn default_due_limit() -> u32 {
    20
}

const MAX_DUE_LIMIT: u32 = 50;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DueCard {
    pub id: String,
    pub plant_id: String,
    pub front_image_url: String,
    pub back_text: String,
    pub due_at: String,
    /// Days until the next review if answered correctly
    pub if_correct_days: u32,
    /// Days until the next review if answered incorrectly
    pub if_incorrect_days: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DueCardsResponse {
    pub cards: Vec<DueCard>,
}

/// Get flashcards that are due for review, most overdue first.
async fn get_due_cards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DueQuery>,
) -> Result<Json<DueCardsResponse>> {
    let limit = params.limit.min(MAX_DUE_LIMIT);
    let now = chrono::Utc::now();

    let flashcards = state
        .db
        .get_due_flashcards(&user.user_id, now, limit)
        .await?;

    tracing::debug!(
        user_id = %user.user_id,
        due = flashcards.len(),
        "Fetched due flashcards"
    );

    let mut cards = Vec::with_capacity(flashcards.len());
    for card in flashcards {
        let preview = scheduler::preview_intervals(&card.scheduling_state())?;
        cards.push(DueCard {
            id: card.id,
            plant_id: card.plant_id,
            front_image_url: card.front_image_url,
            back_text: card.back_text,
            due_at: format_utc_rfc3339(card.due_at),
            if_correct_days: preview.if_correct_days,
            if_incorrect_days: preview.if_incorrect_days,
        });
    }

    Ok(Json(DueCardsResponse { cards }))
}

/// A graded answer from the quiz UI.
#[derive(Deserialize, Validate)]
pub struct GradeRequest {
    pub was_correct: bool,
    #[validate(range(min = 0.0, message = "response_time_seconds must be non-negative"))]
    pub response_time_seconds: Option<f64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GradeResponse {
    pub flashcard_id: String,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub due_at: String,
}

/// Grade a flashcard review.
///
/// Runs the scheduler over the card's current state, then persists the
/// replacement tuple, the quiz result, and the stats update atomically.
async fn grade_flashcard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(flashcard_id): Path<String>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut card = state
        .db
        .get_flashcard(&flashcard_id)
        .await?
        .filter(|c| c.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Flashcard {} not found", flashcard_id)))?;

    let now = chrono::Utc::now();
    let grade = ReviewGrade::from_outcome(payload.was_correct);
    let review = scheduler::schedule_review(&card.scheduling_state(), grade, now)?;
    card.apply_review(&review, now);

    let result = QuizResult {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        flashcard_id: card.id.clone(),
        was_correct: payload.was_correct,
        response_time_seconds: payload.response_time_seconds,
        created_at: now,
    };

    state.db.grade_flashcard_atomic(&card, &result).await?;

    Ok(Json(GradeResponse {
        flashcard_id: card.id,
        ease_factor: card.ease_factor,
        interval_days: card.interval_days,
        repetitions: card.repetitions,
        due_at: format_utc_rfc3339(card.due_at),
    }))
}
