//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const PLANTS: &str = "plants";
    pub const PLANT_PHOTOS: &str = "plant_photos";
    pub const FLASHCARDS: &str = "flashcards";
    pub const QUIZ_RESULTS: &str = "quiz_results";
    /// Learning-stats aggregates (keyed by user ID)
    pub const PROFILE_STATS: &str = "profile_stats";
}
