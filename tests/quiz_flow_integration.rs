// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests for the quiz flow.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Each test uses a unique user ID for
//! isolation.

use chrono::{Duration, Utc};
use plantflash::models::{Flashcard, Plant, PlantPhoto, PlantStatus, Profile, QuizResult};
use plantflash::scheduler::{schedule_review, ReviewGrade};

mod common;
use common::test_db;

/// Generate a unique user ID for test isolation.
fn unique_user_id() -> String {
    format!("test-user-{}", uuid::Uuid::new_v4())
}

fn test_profile(user_id: &str) -> Profile {
    let now = Utc::now();
    Profile {
        id: user_id.to_string(),
        email: "test@example.com".to_string(),
        full_name: Some("Test Botanist".to_string()),
        avatar_url: None,
        created_at: now,
        updated_at: now,
    }
}

fn test_plant(user_id: &str) -> Plant {
    let now = Utc::now();
    Plant {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        scientific_name: "Quercus agrifolia".to_string(),
        common_name: Some("Coast live oak".to_string()),
        family: Some("Fagaceae".to_string()),
        description: None,
        first_photo_url: Some("https://storage.example.com/oak.jpg".to_string()),
        status: PlantStatus::Classified,
        created_at: now,
        updated_at: now,
    }
}

fn test_photo(plant: &Plant) -> PlantPhoto {
    PlantPhoto {
        id: uuid::Uuid::new_v4().to_string(),
        plant_id: plant.id.clone(),
        photo_url: plant.first_photo_url.clone().unwrap(),
        notes: None,
        created_at: plant.created_at,
    }
}

fn test_flashcard(user_id: &str, plant: &Plant) -> Flashcard {
    Flashcard::new(
        uuid::Uuid::new_v4().to_string(),
        user_id.to_string(),
        plant.id.clone(),
        plant.first_photo_url.clone().unwrap(),
        "Quercus agrifolia (Coast live oak)".to_string(),
        Utc::now(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// PROFILE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_profile_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    let before = db.get_profile(&user_id).await.unwrap();
    assert!(before.is_none(), "Profile should not exist before creation");

    db.upsert_profile(&test_profile(&user_id)).await.unwrap();

    let fetched = db.get_profile(&user_id).await.unwrap().unwrap();
    assert_eq!(fetched.id, user_id);
    assert_eq!(fetched.email, "test@example.com");
    assert_eq!(fetched.full_name, Some("Test Botanist".to_string()));
}

// ═══════════════════════════════════════════════════════════════════════════
// PLANT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_plant_counts_stats_once() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let plant = test_plant(&user_id);
    let photo = test_photo(&plant);

    let was_new = db.create_plant_atomic(&plant, &photo).await.unwrap();
    assert!(was_new, "First creation should count");

    // Replaying the same plant must be an idempotent skip.
    let was_new = db.create_plant_atomic(&plant, &photo).await.unwrap();
    assert!(!was_new, "Duplicate creation should be skipped");

    let stats = db.get_profile_stats(&user_id).await.unwrap().unwrap();
    assert_eq!(stats.total_plants, 1);

    let fetched = db.get_plant(&plant.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, PlantStatus::Classified);
    assert_eq!(fetched.user_id, user_id);

    let photos = db.get_photos_for_plant(&plant.id).await.unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].photo_url, photo.photo_url);
}

#[tokio::test]
async fn test_plant_listing_newest_first() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    for _ in 0..3 {
        let plant = test_plant(&user_id);
        let photo = test_photo(&plant);
        db.create_plant_atomic(&plant, &photo).await.unwrap();
        // Distinct creation timestamps for a stable ordering.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let plants = db.get_plants_for_user(&user_id, None, 10).await.unwrap();
    assert_eq!(plants.len(), 3);
    assert!(plants.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    // Paginate: two pages of at most 2.
    let page1 = db.get_plants_for_user(&user_id, None, 2).await.unwrap();
    assert_eq!(page1.len(), 2);
    let page2 = db
        .get_plants_for_user(&user_id, Some(page1[1].created_at), 2)
        .await
        .unwrap();
    assert_eq!(page2.len(), 1);
    assert!(page2[0].created_at < page1[1].created_at);
}

// ═══════════════════════════════════════════════════════════════════════════
// QUIZ FLOW TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_due_flashcards_query() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let plant = test_plant(&user_id);

    // One card due now, one due in a week.
    let due_card = test_flashcard(&user_id, &plant);
    db.set_flashcard(&due_card).await.unwrap();

    let mut future_card = test_flashcard(&user_id, &plant);
    future_card.due_at = Utc::now() + Duration::days(7);
    db.set_flashcard(&future_card).await.unwrap();

    let due = db
        .get_due_flashcards(&user_id, Utc::now(), 10)
        .await
        .unwrap();

    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, due_card.id);
}

#[tokio::test]
async fn test_grade_flow_updates_card_and_stats() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let plant = test_plant(&user_id);
    let mut card = test_flashcard(&user_id, &plant);
    db.set_flashcard(&card).await.unwrap();

    // Grade the card correct, the way the handler does.
    let now = Utc::now();
    let review = schedule_review(&card.scheduling_state(), ReviewGrade::Correct, now).unwrap();
    card.apply_review(&review, now);

    let result = QuizResult {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.clone(),
        flashcard_id: card.id.clone(),
        was_correct: true,
        response_time_seconds: Some(4.2),
        created_at: now,
    };

    let was_new = db.grade_flashcard_atomic(&card, &result).await.unwrap();
    assert!(was_new);

    // The scheduling tuple was replaced.
    let fetched = db.get_flashcard(&card.id).await.unwrap().unwrap();
    assert_eq!(fetched.repetitions, 1);
    assert_eq!(fetched.interval_days, 1);
    assert_eq!(fetched.due_at, review.due_at);

    // The stats were folded in atomically.
    let stats = db.get_profile_stats(&user_id).await.unwrap().unwrap();
    assert_eq!(stats.quizzes_total, 1);
    assert_eq!(stats.quizzes_correct, 1);
    assert_eq!(stats.streak_count, 1);
    assert_eq!(stats.quiz_accuracy(), 100);

    // Replaying the same result must change nothing.
    let was_new = db.grade_flashcard_atomic(&card, &result).await.unwrap();
    assert!(!was_new);
    let stats = db.get_profile_stats(&user_id).await.unwrap().unwrap();
    assert_eq!(stats.quizzes_total, 1);
}

#[tokio::test]
async fn test_grade_missing_card_is_noop() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let plant = test_plant(&user_id);
    let card = test_flashcard(&user_id, &plant);
    // Card is never stored.

    let result = QuizResult {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.clone(),
        flashcard_id: card.id.clone(),
        was_correct: false,
        response_time_seconds: None,
        created_at: Utc::now(),
    };

    let was_new = db.grade_flashcard_atomic(&card, &result).await.unwrap();
    assert!(!was_new, "Grading a missing card should abort");

    let stats = db.get_profile_stats(&user_id).await.unwrap();
    assert!(stats.is_none() || stats.unwrap().quizzes_total == 0);
}

#[tokio::test]
async fn test_recompute_matches_incremental_stats() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let plant = test_plant(&user_id);
    let photo = test_photo(&plant);
    db.create_plant_atomic(&plant, &photo).await.unwrap();

    let mut card = test_flashcard(&user_id, &plant);
    db.set_flashcard(&card).await.unwrap();

    for was_correct in [true, true, false] {
        let now = Utc::now();
        let review = schedule_review(
            &card.scheduling_state(),
            ReviewGrade::from_outcome(was_correct),
            now,
        )
        .unwrap();
        card.apply_review(&review, now);

        let result = QuizResult {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            flashcard_id: card.id.clone(),
            was_correct,
            response_time_seconds: None,
            created_at: now,
        };
        db.grade_flashcard_atomic(&card, &result).await.unwrap();
    }

    let incremental = db.get_profile_stats(&user_id).await.unwrap().unwrap();
    let recomputed = db
        .recompute_profile_stats(&user_id, Utc::now())
        .await
        .unwrap();

    assert_eq!(recomputed.total_plants, incremental.total_plants);
    assert_eq!(recomputed.quizzes_total, incremental.quizzes_total);
    assert_eq!(recomputed.quizzes_correct, incremental.quizzes_correct);
    assert_eq!(recomputed.streak_count, incremental.streak_count);
    assert_eq!(recomputed.quiz_accuracy(), 67);
}
