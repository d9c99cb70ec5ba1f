// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{BloodGroup, BloodRequest, Coordinates, Donor, MatchRecord, NewBloodRequest, NewDonor, RankedDonor, ScoringWeights, Urgency};
pub use requests::{CreateBloodRequest, RankQuery, RegisterDonorRequest};
pub use responses::{CreateRequestResponse, ErrorResponse, HealthResponse, MatchListResponse, RankResponse, RegisterDonorResponse};
