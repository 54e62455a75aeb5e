// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plant classifier API client.
//!
//! Handles:
//! - Image identification requests against the external classifier
//! - Rate limit detection (429, retryable later)
//! - API key rejection (401)
//! - Per-plant in-flight guards so a plant is never classified twice
//!   concurrently

use crate::error::AppError;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;

/// Classifier API client with a shared in-flight guard.
#[derive(Clone)]
pub struct ClassifierService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    in_flight: Arc<DashMap<String, ()>>,
}

impl ClassifierService {
    /// Create a new classifier client.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Identify the plant shown in an image.
    pub async fn identify(&self, photo_url: &str) -> Result<PlantIdentification, AppError> {
        let url = format!("{}/v1/identify", self.base_url);

        let body = serde_json::json!({
            "image_url": photo_url,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ClassifierApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Mark a plant's classification as in flight.
    ///
    /// Returns `None` if another task is already classifying the plant; the
    /// returned guard releases the slot when dropped.
    pub fn try_begin(&self, plant_id: &str) -> Option<InFlightGuard> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(plant_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(());
                Some(InFlightGuard {
                    map: self.in_flight.clone(),
                    plant_id: plant_id.to_string(),
                })
            }
        }
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Classifier rate limit hit (429)");
                return Err(AppError::ClassifierApi(
                    AppError::CLASSIFIER_RATE_LIMIT.to_string(),
                ));
            }

            if status.as_u16() == 401 {
                return Err(AppError::ClassifierApi(
                    AppError::CLASSIFIER_KEY_ERROR.to_string(),
                ));
            }

            return Err(AppError::ClassifierApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ClassifierApi(format!("JSON parse error: {}", e)))
    }
}

/// Releases the per-plant classification slot on drop.
pub struct InFlightGuard {
    map: Arc<DashMap<String, ()>>,
    plant_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.plant_id);
    }
}

/// Identification returned by the classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct PlantIdentification {
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub family: Option<String>,
    pub description: Option<String>,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}
