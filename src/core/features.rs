use serde::Serialize;

use crate::core::{cities::CityDirectory, compatibility::blood_compatible, distance::distance_km};
use crate::models::{BloodRequest, Coordinates, Donor};

/// Number of columns in a model input row
pub const FEATURE_COUNT: usize = 7;

/// One model input row, columns in `FeatureVector` field order
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Features describing one donor against one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub blood_match: u8,
    pub distance_km: f64,
    pub urgency_score: u8,
    pub days_since_first_donation: i64,
    pub availability: u8,
    pub donation_count: u32,
    pub pints_donated: u32,
}

impl FeatureVector {
    /// Row layout expected by the trained classifiers
    pub fn to_row(&self) -> FeatureRow {
        [
            f64::from(self.blood_match),
            self.distance_km,
            f64::from(self.urgency_score),
            self.days_since_first_donation as f64,
            f64::from(self.availability),
            f64::from(self.donation_count),
            f64::from(self.pints_donated),
        ]
    }
}

/// Request-side values shared by every donor row
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub blood_group_needed: &'a str,
    pub location: Coordinates,
    pub urgency_score: u8,
}

impl<'a> RequestContext<'a> {
    pub fn new(request: &'a BloodRequest, cities: &CityDirectory) -> Self {
        Self {
            blood_group_needed: &request.blood_group_needed,
            location: cities.resolve(request.city.as_deref(), request.state.as_deref()),
            urgency_score: request.urgency_level().score(),
        }
    }
}

/// Build the feature vector for a donor. Never fails; malformed donor fields
/// take their default values.
pub fn extract_features(
    donor: &Donor,
    context: &RequestContext<'_>,
    cities: &CityDirectory,
) -> FeatureVector {
    let donor_location = cities.resolve(donor.city.as_deref(), donor.state.as_deref());

    FeatureVector {
        blood_match: blood_compatible(&donor.blood_group, context.blood_group_needed),
        distance_km: distance_km(donor_location, context.location),
        urgency_score: context.urgency_score,
        days_since_first_donation: donor.days_since_first_donation(),
        availability: u8::from(donor.is_available()),
        donation_count: donor.donation_count(),
        pints_donated: donor.pints_donated(),
    }
}
