use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::models::{BloodRequest, Donor, MatchRecord, NewBloodRequest, NewDonor};
use crate::services::store::{MatchStore, StoreError};

/// In-process store used by tests, benchmarks and local runs without a database
///
/// All writes go through one mutex, which gives the same insert-if-absent
/// guarantee as the unique constraint in PostgreSQL.
#[derive(Default)]
pub struct InMemoryStore {
    requests: Mutex<BTreeMap<i64, BloodRequest>>,
    donors: Mutex<BTreeMap<i64, Donor>>,
    matches: Mutex<Vec<MatchRecord>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(requests: Vec<BloodRequest>, donors: Vec<Donor>) -> Self {
        Self {
            requests: Mutex::new(requests.into_iter().map(|r| (r.request_id, r)).collect()),
            donors: Mutex::new(donors.into_iter().map(|d| (d.donor_id, d)).collect()),
            ..Self::default()
        }
    }

    /// Make the match table (existence checks, inserts) and registrations fail
    /// with `StoreError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make request and donor reads fail with `StoreError::Unavailable`
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn match_count(&self) -> usize {
        self.matches.lock().await.len()
    }

    fn allocate_id(&self) -> i64 {
        // Ids start above any seeded fixture ids used in tests
        1_000_000 + self.next_id.fetch_add(1, Ordering::SeqCst) as i64
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<BloodRequest>, StoreError> {
        self.check_reads()?;
        Ok(self.requests.lock().await.get(&request_id).cloned())
    }

    async fn list_donors(&self) -> Result<Vec<Donor>, StoreError> {
        self.check_reads()?;
        Ok(self.donors.lock().await.values().cloned().collect())
    }

    async fn match_exists(&self, request_id: i64, donor_id: i64) -> Result<bool, StoreError> {
        self.check_writes()?;
        Ok(self
            .matches
            .lock()
            .await
            .iter()
            .any(|m| m.request_id == request_id && m.donor_id == donor_id))
    }

    async fn insert_match(&self, request_id: i64, donor_id: i64, score: f64) -> Result<bool, StoreError> {
        self.check_writes()?;
        let mut matches = self.matches.lock().await;
        if matches
            .iter()
            .any(|m| m.request_id == request_id && m.donor_id == donor_id)
        {
            return Ok(false);
        }
        matches.push(MatchRecord {
            request_id,
            donor_id,
            score,
            matched_at: chrono::Utc::now(),
        });
        Ok(true)
    }

    async fn list_matches(&self, request_id: i64) -> Result<Vec<MatchRecord>, StoreError> {
        self.check_reads()?;
        let mut matches: Vec<MatchRecord> = self
            .matches
            .lock()
            .await
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.donor_id.cmp(&b.donor_id)));
        Ok(matches)
    }

    async fn create_request(&self, request: NewBloodRequest) -> Result<i64, StoreError> {
        self.check_writes()?;
        let request_id = self.allocate_id();
        self.requests.lock().await.insert(
            request_id,
            BloodRequest {
                request_id,
                patient_name: request.patient_name,
                email: request.email,
                phone: request.phone,
                blood_group_needed: request.blood_group_needed.to_string(),
                city: request.city,
                state: request.state,
                urgency: Some(request.urgency.as_str().to_string()),
                radius_km: request.radius_km,
            },
        );
        Ok(request_id)
    }

    async fn register_donor(&self, donor: NewDonor) -> Result<i64, StoreError> {
        self.check_writes()?;
        let donor_id = self.allocate_id();
        self.donors.lock().await.insert(
            donor_id,
            Donor {
                donor_id,
                name: donor.name,
                email: donor.email,
                phone: donor.phone,
                blood_group: donor.blood_group.to_string(),
                city: donor.city,
                state: donor.state,
                availability: donor.availability,
                months_since_first_donation: donor.months_since_first_donation.map(|m| m.to_string()),
                donation_count: Some(donor.donation_count),
                pints_donated: Some(donor.pints_donated),
            },
        );
        Ok(donor_id)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.fail_reads.load(Ordering::SeqCst))
    }
}
