use std::sync::Arc;
use thiserror::Error;

use crate::core::{Matcher, ModelProvider};
use crate::models::{RankResponse, RankedDonor};
use crate::services::store::{MatchStore, StoreError};

/// Default search radius when neither the call nor the request carries one
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Errors returned by a ranking call
#[derive(Debug, Error)]
pub enum RankError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Ranks donors for stored requests and records the resulting matches
#[derive(Clone)]
pub struct RankingService {
    store: Arc<dyn MatchStore>,
    matcher: Matcher,
    default_radius_km: f64,
}

impl RankingService {
    pub fn new(store: Arc<dyn MatchStore>, matcher: Matcher, default_radius_km: f64) -> Self {
        let default_radius_km = usable_radius(Some(default_radius_km)).unwrap_or(DEFAULT_RADIUS_KM);
        Self {
            store,
            matcher,
            default_radius_km,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn default_radius_km(&self) -> f64 {
        self.default_radius_km
    }

    /// Rank the donor pool for one request
    ///
    /// Persistence of the ranked matches is best effort: the first store error
    /// ends the pass and is logged, the ranking is still returned.
    pub async fn rank(
        &self,
        request_id: i64,
        radius_km: Option<f64>,
        models: &ModelProvider,
    ) -> Result<RankResponse, RankError> {
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| RankError::NotFound(format!("Request {} not found", request_id)))?;

        let donors = self.store.list_donors().await?;
        if donors.is_empty() {
            return Err(RankError::NotFound("No donors registered".to_string()));
        }

        let radius = usable_radius(radius_km)
            .or_else(|| usable_radius(request.radius_km))
            .unwrap_or(self.default_radius_km);

        let result = self.matcher.rank(&request, &donors, radius, models);

        tracing::info!(
            request_id,
            candidates = result.total_candidates,
            within_radius = result.within_radius,
            radius_km = radius,
            radius_fallback = result.radius_fallback,
            mode = ?result.mode,
            "Ranked donors"
        );

        let new_matches = self.persist(request_id, &result.ranked).await;

        Ok(RankResponse {
            request_id,
            blood_group_needed: request.blood_group_needed,
            city: request.city,
            urgency: request.urgency,
            radius_used_km: radius,
            radius_fallback: result.radius_fallback,
            scoring_mode: result.mode,
            total_candidates: result.total_candidates,
            top_donors: result.ranked,
            new_matches,
        })
    }

    /// Insert-if-absent for every ranked donor, returning the newly written ids
    async fn persist(&self, request_id: i64, ranked: &[RankedDonor]) -> Vec<i64> {
        let mut inserted = Vec::new();

        for donor in ranked {
            match self.persist_one(request_id, donor).await {
                Ok(true) => inserted.push(donor.donor_id),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        request_id,
                        donor_id = donor.donor_id,
                        "Stopped persisting matches: {}",
                        e
                    );
                    break;
                }
            }
        }

        tracing::debug!(request_id, new_matches = inserted.len(), "Persisted matches");
        inserted
    }

    async fn persist_one(&self, request_id: i64, donor: &RankedDonor) -> Result<bool, StoreError> {
        if self.store.match_exists(request_id, donor.donor_id).await? {
            return Ok(false);
        }
        self.store
            .insert_match(request_id, donor.donor_id, donor.score)
            .await
    }
}

fn usable_radius(radius_km: Option<f64>) -> Option<f64> {
    radius_km.filter(|r| r.is_finite() && *r >= 0.0)
}
