use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{BloodGroup, NewBloodRequest, NewDonor, Urgency};

/// Query parameters for the ranking endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RankQuery {
    #[validate(range(min = 0.0))]
    #[serde(alias = "radius_km")]
    pub radius: Option<f64>,
}

/// Request to register a donor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterDonorRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "full_name")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(custom(function = "validate_blood_group"))]
    #[serde(alias = "donor_blood_group")]
    pub blood_group: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub availability: String,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub months_since_first_donation: Option<f64>,
    #[validate(range(min = 0))]
    #[serde(default, alias = "donation_count")]
    pub number_of_donation: Option<i64>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub pints_donated: Option<i64>,
    #[serde(default)]
    pub last_donation_date: Option<chrono::NaiveDate>,
}

impl RegisterDonorRequest {
    /// Convert a validated payload into the storage shape
    pub fn into_new_donor(self) -> Result<NewDonor, String> {
        Ok(NewDonor {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone,
            blood_group: self.blood_group.parse::<BloodGroup>()?,
            city: non_empty(self.city),
            state: non_empty(self.state),
            availability: self.availability,
            months_since_first_donation: self.months_since_first_donation,
            donation_count: self.number_of_donation.unwrap_or(0),
            pints_donated: self.pints_donated.unwrap_or(0),
            last_donation_date: self.last_donation_date,
        })
    }
}

/// Request to create a blood request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBloodRequest {
    #[validate(length(min = 1))]
    pub patient_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(custom(function = "validate_blood_group"))]
    #[serde(alias = "blood_group")]
    pub blood_group_needed: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default, alias = "radius")]
    pub radius_km: Option<f64>,
}

impl CreateBloodRequest {
    pub fn into_new_request(self) -> Result<NewBloodRequest, String> {
        Ok(NewBloodRequest {
            patient_name: self.patient_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone,
            blood_group_needed: self.blood_group_needed.parse::<BloodGroup>()?,
            city: non_empty(self.city),
            state: non_empty(self.state),
            urgency: Urgency::from_label(self.urgency.as_deref()),
            radius_km: self.radius_km,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_blood_group(value: &str) -> Result<(), ValidationError> {
    match BloodGroup::parse(value) {
        Some(_) => Ok(()),
        None => {
            let mut error = ValidationError::new("blood_group");
            error.message = Some("must be one of O-, O+, A-, A+, B-, B+, AB-, AB+".into());
            Err(error)
        }
    }
}
