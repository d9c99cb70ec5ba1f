use std::sync::Arc;

use crate::core::{
    cities::CityDirectory,
    features::{extract_features, FeatureVector, RequestContext},
    model::ModelProvider,
    scoring::{score_candidates, ScoringMode},
};
use crate::models::{BloodRequest, Donor, RankedDonor, ScoringWeights};

/// Upper bound on the ranked list length
pub const MAX_RANKED_DONORS: usize = 10;

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub ranked: Vec<RankedDonor>,
    pub total_candidates: usize,
    pub within_radius: usize,
    /// True when no donor was inside the radius and the unfiltered set was ranked
    pub radius_fallback: bool,
    pub mode: ScoringMode,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Feature extraction per donor
/// 2. Scoring (classifier ensemble or heuristic)
/// 3. Radius filter, ignored when it would leave nothing
/// 4. Sort by (blood_match, score) and truncate
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    cities: Arc<CityDirectory>,
    max_results: usize,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, cities: CityDirectory, max_results: usize) -> Self {
        Self {
            weights,
            cities: Arc::new(cities),
            max_results: max_results.clamp(1, MAX_RANKED_DONORS),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoringWeights::default(), CityDirectory::builtin(), MAX_RANKED_DONORS)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn cities(&self) -> &CityDirectory {
        &self.cities
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Feature vectors for every donor against the request, in donor order
    pub fn extract(&self, request: &BloodRequest, donors: &[Donor]) -> Vec<FeatureVector> {
        let context = RequestContext::new(request, &self.cities);
        donors
            .iter()
            .map(|donor| extract_features(donor, &context, &self.cities))
            .collect()
    }

    /// Rank donors for a request
    ///
    /// # Arguments
    /// * `request` - The blood request being served
    /// * `donors` - The full donor pool
    /// * `radius_km` - Advisory search radius
    /// * `models` - Classifiers to score with, `Absent` for the heuristic
    ///
    /// # Returns
    /// MatchResult with at most `max_results` donors, compatible donors first
    pub fn rank(
        &self,
        request: &BloodRequest,
        donors: &[Donor],
        radius_km: f64,
        models: &ModelProvider,
    ) -> MatchResult {
        let total_candidates = donors.len();
        let features = self.extract(request, donors);
        let batch = score_candidates(&features, models, &self.weights);

        let candidates: Vec<RankedDonor> = donors
            .iter()
            .zip(features.iter())
            .zip(batch.scores.iter())
            .map(|((donor, features), score)| ranked_entry(donor, features, *score))
            .collect();

        let within_radius = candidates
            .iter()
            .filter(|c| c.distance_km <= radius_km)
            .count();
        let radius_fallback = within_radius == 0;

        let mut pool: Vec<RankedDonor> = if radius_fallback {
            candidates
        } else {
            candidates
                .into_iter()
                .filter(|c| c.distance_km <= radius_km)
                .collect()
        };

        // Compatible donors always outrank incompatible ones; score breaks ties.
        // Stable, so equal keys keep donor pool order.
        pool.sort_by(|a, b| {
            b.blood_match
                .cmp(&a.blood_match)
                .then_with(|| b.score.total_cmp(&a.score))
        });

        pool.truncate(self.max_results);

        MatchResult {
            ranked: pool,
            total_candidates,
            within_radius,
            radius_fallback,
            mode: batch.mode,
        }
    }
}

fn ranked_entry(donor: &Donor, features: &FeatureVector, score: f64) -> RankedDonor {
    RankedDonor {
        donor_id: donor.donor_id,
        name: donor.name.clone(),
        city: donor.city.clone(),
        state: donor.state.clone(),
        blood_group: donor.blood_group.clone(),
        availability: donor.availability.clone(),
        score,
        distance_km: features.distance_km,
        blood_match: features.blood_match,
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
