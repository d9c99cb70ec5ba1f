use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{BloodRequest, Donor, MatchRecord, NewBloodRequest, NewDonor};
use crate::services::store::{MatchStore, StoreError};

/// PostgreSQL client for donors, requests and persisted matches
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn request_from_row(row: &PgRow) -> Result<BloodRequest, sqlx::Error> {
    Ok(BloodRequest {
        request_id: row.try_get("request_id")?,
        patient_name: row.try_get::<Option<String>, _>("patient_name")?.unwrap_or_default(),
        email: row.try_get::<Option<String>, _>("email")?.unwrap_or_default(),
        phone: row.try_get::<Option<String>, _>("phone")?.unwrap_or_default(),
        blood_group_needed: row
            .try_get::<Option<String>, _>("blood_group_needed")?
            .unwrap_or_default(),
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        urgency: row.try_get("urgency")?,
        radius_km: row.try_get("radius_km")?,
    })
}

fn donor_from_row(row: &PgRow) -> Result<Donor, sqlx::Error> {
    Ok(Donor {
        donor_id: row.try_get("donor_id")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        email: row.try_get::<Option<String>, _>("email")?.unwrap_or_default(),
        phone: row.try_get::<Option<String>, _>("phone")?.unwrap_or_default(),
        blood_group: row.try_get::<Option<String>, _>("blood_group")?.unwrap_or_default(),
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        availability: row.try_get::<Option<String>, _>("availability")?.unwrap_or_default(),
        months_since_first_donation: row.try_get("months_since_first_donation")?,
        donation_count: row.try_get("number_of_donation")?,
        pints_donated: row.try_get("pints_donated")?,
    })
}

#[async_trait]
impl MatchStore for PostgresClient {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<BloodRequest>, StoreError> {
        let query = r#"
            SELECT request_id, patient_name, email, phone, blood_group_needed,
                   city, state, urgency, radius_km
            FROM requests
            WHERE request_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(request_from_row).transpose()?)
    }

    async fn list_donors(&self) -> Result<Vec<Donor>, StoreError> {
        let query = r#"
            SELECT donor_id, name, email, phone, blood_group, city, state, availability,
                   months_since_first_donation, number_of_donation, pints_donated
            FROM donors
            ORDER BY donor_id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        let donors = rows
            .iter()
            .map(donor_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} donors", donors.len());

        Ok(donors)
    }

    async fn match_exists(&self, request_id: i64, donor_id: i64) -> Result<bool, StoreError> {
        let query = r#"
            SELECT EXISTS(
                SELECT 1 FROM matches WHERE request_id = $1 AND donor_id = $2
            ) AS present
        "#;

        let row = sqlx::query(query)
            .bind(request_id)
            .bind(donor_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("present")?)
    }

    /// Uses INSERT ... ON CONFLICT DO NOTHING, so the first score written for a
    /// pair is kept even when rankings race.
    async fn insert_match(&self, request_id: i64, donor_id: i64, score: f64) -> Result<bool, StoreError> {
        let query = r#"
            INSERT INTO matches (request_id, donor_id, match_score, matched_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (request_id, donor_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(request_id)
            .bind(donor_id)
            .bind(score)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Insert match {} -> {} (score {:.3}): {} row(s)",
            request_id,
            donor_id,
            score,
            result.rows_affected()
        );

        Ok(result.rows_affected() > 0)
    }

    async fn list_matches(&self, request_id: i64) -> Result<Vec<MatchRecord>, StoreError> {
        let query = r#"
            SELECT request_id, donor_id, match_score, matched_at
            FROM matches
            WHERE request_id = $1
            ORDER BY match_score DESC, donor_id
        "#;

        let rows = sqlx::query(query).bind(request_id).fetch_all(&self.pool).await?;

        let matches = rows
            .iter()
            .map(|row| {
                Ok(MatchRecord {
                    request_id: row.try_get("request_id")?,
                    donor_id: row.try_get("donor_id")?,
                    score: row.try_get("match_score")?,
                    matched_at: row.try_get("matched_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(matches)
    }

    async fn create_request(&self, request: NewBloodRequest) -> Result<i64, StoreError> {
        let query = r#"
            INSERT INTO requests (patient_name, email, phone, blood_group_needed, city, state, urgency, radius_km)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING request_id
        "#;

        let row = sqlx::query(query)
            .bind(&request.patient_name)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(request.blood_group_needed.as_str())
            .bind(&request.city)
            .bind(&request.state)
            .bind(request.urgency.as_str())
            .bind(request.radius_km)
            .fetch_one(&self.pool)
            .await?;

        let request_id: i64 = row.try_get("request_id")?;
        tracing::info!("Created request {} ({})", request_id, request.blood_group_needed);

        Ok(request_id)
    }

    async fn register_donor(&self, donor: NewDonor) -> Result<i64, StoreError> {
        let query = r#"
            INSERT INTO donors (name, email, phone, blood_group, city, state, availability,
                                months_since_first_donation, number_of_donation, pints_donated,
                                last_donation_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING donor_id
        "#;

        let row = sqlx::query(query)
            .bind(&donor.name)
            .bind(&donor.email)
            .bind(&donor.phone)
            .bind(donor.blood_group.as_str())
            .bind(&donor.city)
            .bind(&donor.state)
            .bind(&donor.availability)
            .bind(donor.months_since_first_donation.map(|m| m.to_string()))
            .bind(donor.donation_count)
            .bind(donor.pints_donated)
            .bind(donor.last_donation_date)
            .fetch_one(&self.pool)
            .await?;

        let donor_id: i64 = row.try_get("donor_id")?;
        tracing::info!("Registered donor {} ({})", donor_id, donor.blood_group);

        Ok(donor_id)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
