//! Rakth Match - blood donor matching service
//!
//! Ranks registered donors for a blood request by compatibility, proximity and
//! availability, using a pair of trained classifiers when they are available
//! and a weighted heuristic otherwise. Ranked donors are recorded as matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{blood_compatible, haversine_distance, Matcher, ModelProvider, ScoringMode};
pub use crate::models::{BloodGroup, BloodRequest, Donor, RankResponse, RankedDonor, ScoringWeights, Urgency};
pub use crate::services::{MatchStore, RankError, RankingService};
