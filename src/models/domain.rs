use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ABO/Rh blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "O-")]
    ONeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "AB+")]
    AbPos,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::ONeg,
        BloodGroup::OPos,
        BloodGroup::ANeg,
        BloodGroup::APos,
        BloodGroup::BNeg,
        BloodGroup::BPos,
        BloodGroup::AbNeg,
        BloodGroup::AbPos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::ONeg => "O-",
            BloodGroup::OPos => "O+",
            BloodGroup::ANeg => "A-",
            BloodGroup::APos => "A+",
            BloodGroup::BNeg => "B-",
            BloodGroup::BPos => "B+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::AbPos => "AB+",
        }
    }

    /// Parse a free-text label, returning `None` for anything unrecognized
    pub fn parse(label: &str) -> Option<Self> {
        label.parse().ok()
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == normalized)
            .ok_or_else(|| format!("unknown blood group: {:?}", s))
    }
}

/// Request urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Map a stored label to an urgency level. Missing or unrecognized labels are Medium.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Urgency::Low,
            Some("medium") => Urgency::Medium,
            Some("high") => Urgency::High,
            Some("critical") => Urgency::Critical,
            _ => Urgency::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "Low",
            Urgency::Medium => "Medium",
            Urgency::High => "High",
            Urgency::Critical => "Critical",
        }
    }

    /// Ordinal score used as a model feature (1-4)
    pub fn score(&self) -> u8 {
        match self {
            Urgency::Low => 1,
            Urgency::Medium => 2,
            Urgency::High => 3,
            Urgency::Critical => 4,
        }
    }
}

/// Registered blood donor as read from storage
///
/// Numeric history fields are kept as stored; the accessor methods apply the
/// parse-or-default policy so that malformed rows never fail a ranking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Donor {
    pub donor_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub blood_group: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub months_since_first_donation: Option<String>,
    #[serde(rename = "number_of_donation", default)]
    pub donation_count: Option<i64>,
    #[serde(default)]
    pub pints_donated: Option<i64>,
}

impl Donor {
    /// Availability is a textual flag; "yes", "y" and "true" count as available
    pub fn is_available(&self) -> bool {
        matches!(
            self.availability.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true"
        )
    }

    /// Months since first donation, 0 when missing, unparseable, negative or non-finite
    pub fn months_since_first_donation(&self) -> f64 {
        self.months_since_first_donation
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|months| months.is_finite() && *months > 0.0)
            .unwrap_or(0.0)
    }

    /// Days since first donation, approximated as 30 days per month and truncated
    pub fn days_since_first_donation(&self) -> i64 {
        (self.months_since_first_donation() * 30.0) as i64
    }

    pub fn donation_count(&self) -> u32 {
        clamp_count(self.donation_count)
    }

    pub fn pints_donated(&self) -> u32 {
        clamp_count(self.pints_donated)
    }
}

fn clamp_count(value: Option<i64>) -> u32 {
    value
        .unwrap_or(0)
        .clamp(0, i64::from(u32::MAX)) as u32
}

/// Blood request raised for a patient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BloodRequest {
    pub request_id: i64,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub blood_group_needed: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

impl BloodRequest {
    pub fn urgency_level(&self) -> Urgency {
        Urgency::from_label(self.urgency.as_deref())
    }
}

/// Persisted (request, donor) match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub request_id: i64,
    pub donor_id: i64,
    #[serde(rename = "match_score")]
    pub score: f64,
    pub matched_at: chrono::DateTime<chrono::Utc>,
}

/// Ranked donor returned for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDonor {
    pub donor_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub blood_group: String,
    pub availability: String,
    pub score: f64,
    pub distance_km: f64,
    pub blood_match: u8,
}

/// Donor to be inserted by the registration endpoint
#[derive(Debug, Clone)]
pub struct NewDonor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    pub city: Option<String>,
    pub state: Option<String>,
    pub availability: String,
    pub months_since_first_donation: Option<f64>,
    pub donation_count: i64,
    pub pints_donated: i64,
    pub last_donation_date: Option<chrono::NaiveDate>,
}

/// Request to be inserted by the request-creation endpoint
#[derive(Debug, Clone)]
pub struct NewBloodRequest {
    pub patient_name: String,
    pub email: String,
    pub phone: String,
    pub blood_group_needed: BloodGroup,
    pub city: Option<String>,
    pub state: Option<String>,
    pub urgency: Urgency,
    pub radius_km: Option<f64>,
}

/// Geographic coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Heuristic scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub blood_match: f64,
    pub availability: f64,
    pub proximity: f64,
    /// Distance at which the proximity bonus reaches zero
    pub proximity_range_km: f64,
    pub donation_count: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            blood_match: 2.0,
            availability: 1.0,
            proximity: 1.0,
            proximity_range_km: 100.0,
            donation_count: 0.1,
        }
    }
}
