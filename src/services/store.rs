use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BloodRequest, Donor, MatchRecord, NewBloodRequest, NewDonor};

/// Errors that can occur when reading or writing donor data
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Storage backing the matcher
///
/// Match rows are unique per (request_id, donor_id); `insert_match` must be a
/// no-op returning `false` when the pair already exists so concurrent rankings
/// of the same request cannot duplicate rows.
#[async_trait]
pub trait MatchStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn get_request(&self, request_id: i64) -> Result<Option<BloodRequest>, StoreError>;

    /// Full scan of the donor pool
    async fn list_donors(&self) -> Result<Vec<Donor>, StoreError>;

    async fn match_exists(&self, request_id: i64, donor_id: i64) -> Result<bool, StoreError>;

    /// Insert a match if absent. Returns whether a row was written.
    async fn insert_match(&self, request_id: i64, donor_id: i64, score: f64) -> Result<bool, StoreError>;

    async fn list_matches(&self, request_id: i64) -> Result<Vec<MatchRecord>, StoreError>;

    async fn create_request(&self, request: NewBloodRequest) -> Result<i64, StoreError>;

    async fn register_donor(&self, donor: NewDonor) -> Result<i64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
