// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Plant and plant photo models for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Classification lifecycle of a plant record.
///
/// A plant is created `Pending` as soon as its first photo is registered,
/// before the classifier has answered. It becomes `Classified` once an
/// identification has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum PlantStatus {
    Pending,
    Classified,
}

/// Stored plant record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    /// Plant ID (also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Scientific name (placeholder until classified)
    pub scientific_name: String,
    /// Common name, if known
    pub common_name: Option<String>,
    /// Taxonomic family, if known
    pub family: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Representative photo URL (first registered photo)
    pub first_photo_url: Option<String>,
    /// Classification lifecycle state
    pub status: PlantStatus,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// Last modification (classification or user edit)
    pub updated_at: DateTime<Utc>,
}

impl Plant {
    /// Name shown to the user: common name when known, scientific otherwise.
    pub fn display_name(&self) -> &str {
        self.common_name.as_deref().unwrap_or(&self.scientific_name)
    }
}

/// A photo belonging to a plant. One plant may own several.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantPhoto {
    /// Photo ID (also used as document ID)
    pub id: String,
    /// Owning plant ID
    pub plant_id: String,
    /// Object-store URL of the image
    pub photo_url: String,
    /// Optional user notes
    pub notes: Option<String>,
    /// When the photo was registered
    pub created_at: DateTime<Utc>,
}
