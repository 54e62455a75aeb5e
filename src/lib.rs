// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! PlantFlash: learn the plants you photograph
//!
//! This crate provides the backend API for registering plant photos,
//! classifying them via an external AI service, and quizzing users with
//! spaced-repetition flashcards.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::ClassifierService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub classifier: ClassifierService,
}
