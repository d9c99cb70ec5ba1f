use serde::{Deserialize, Serialize};

use crate::core::scoring::ScoringMode;
use crate::models::domain::{MatchRecord, RankedDonor};

/// Response for the ranking endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankResponse {
    pub request_id: i64,
    pub blood_group_needed: String,
    pub city: Option<String>,
    pub urgency: Option<String>,
    pub radius_used_km: f64,
    /// True when no donor was within the radius and the whole pool was ranked
    pub radius_fallback: bool,
    pub scoring_mode: ScoringMode,
    pub total_candidates: usize,
    pub top_donors: Vec<RankedDonor>,
    /// Donor ids whose match rows were written by this call
    pub new_matches: Vec<i64>,
}

/// Stored matches for a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListResponse {
    pub request_id: i64,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDonorResponse {
    pub donor_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestResponse {
    pub request_id: i64,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub scoring_mode: ScoringMode,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
