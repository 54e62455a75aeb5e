// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use plantflash::error::AppError;

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(status_of(AppError::InvalidToken), StatusCode::UNAUTHORIZED);
    assert_eq!(
        status_of(AppError::NotFound("plant".to_string())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(AppError::BadRequest("bad cursor".to_string())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(AppError::Validation("ease factor".to_string())),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        status_of(AppError::ClassifierApi("timeout".to_string())),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(AppError::Database("offline".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_is_classifier_rate_limit() {
    let err = AppError::ClassifierApi(AppError::CLASSIFIER_RATE_LIMIT.to_string());
    assert!(err.is_classifier_rate_limit());

    let err = AppError::ClassifierApi("HTTP 500: boom".to_string());
    assert!(!err.is_classifier_rate_limit());

    let err = AppError::BadRequest("Bad Request".to_string());
    assert!(!err.is_classifier_rate_limit());
}

#[test]
fn test_schedule_error_maps_to_validation() {
    let err: AppError = plantflash::scheduler::ScheduleError::EaseFactorBelowFloor(1.0).into();
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
}
