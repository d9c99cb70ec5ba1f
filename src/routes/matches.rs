use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{ModelProvider, ScoringMode};
use crate::models::{
    CreateBloodRequest, CreateRequestResponse, ErrorResponse, HealthResponse, MatchListResponse,
    RankQuery, RegisterDonorRequest, RegisterDonorResponse,
};
use crate::services::{MatchStore, RankError, RankingService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub ranking: RankingService,
    pub models: ModelProvider,
}

impl AppState {
    pub fn scoring_mode(&self) -> ScoringMode {
        if self.models.is_available() {
            ScoringMode::Model
        } else {
            ScoringMode::Heuristic
        }
    }
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/match/{request_id}", web::get().to(rank_request))
        .route("/matches/request/{request_id}", web::get().to(get_matches_for_request))
        .route("/donors/register", web::post().to(register_donor))
        .route("/requests/create", web::post().to(create_request));
}

fn error_response(status: u16, error: &str, message: String) -> HttpResponse {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status,
    };
    match status {
        400 => HttpResponse::BadRequest().json(body),
        404 => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scoring_mode: state.scoring_mode(),
        timestamp: chrono::Utc::now(),
    })
}

/// Rank donors for a stored request
///
/// GET /api/v1/match/{request_id}?radius=50
///
/// Newly ranked donors are recorded as matches; see `new_matches` in the body.
async fn rank_request(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<RankQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(400, "Validation failed", errors.to_string());
    }

    let request_id = path.into_inner();
    tracing::info!("Ranking donors for request {}", request_id);

    match state.ranking.rank(request_id, query.radius, &state.models).await {
        Ok(response) => {
            tracing::info!(
                "Returning {} donors for request {} ({} new matches)",
                response.top_donors.len(),
                request_id,
                response.new_matches.len()
            );
            HttpResponse::Ok().json(response)
        }
        Err(RankError::NotFound(message)) => error_response(404, "Not found", message),
        Err(e) => {
            tracing::error!("Failed to rank request {}: {}", request_id, e);
            error_response(500, "Failed to rank donors", e.to_string())
        }
    }
}

/// Stored matches for a request, best score first
///
/// GET /api/v1/matches/request/{request_id}
async fn get_matches_for_request(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    let request_id = path.into_inner();

    match state.store.list_matches(request_id).await {
        Ok(matches) if matches.is_empty() => error_response(
            404,
            "Not found",
            format!("No matches recorded for request {}", request_id),
        ),
        Ok(matches) => HttpResponse::Ok().json(MatchListResponse { request_id, matches }),
        Err(e) => {
            tracing::error!("Failed to fetch matches for {}: {}", request_id, e);
            error_response(500, "Failed to fetch matches", e.to_string())
        }
    }
}

/// Register a donor
///
/// POST /api/v1/donors/register
///
/// Request body:
/// ```json
/// {
///   "name": "string",
///   "email": "string",
///   "phone": "string",
///   "blood_group": "O+",
///   "city": "Hyderabad",
///   "availability": "yes",
///   "number_of_donation": 3
/// }
/// ```
async fn register_donor(
    state: web::Data<AppState>,
    req: web::Json<RegisterDonorRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for donor registration: {:?}", errors);
        return error_response(400, "Validation failed", errors.to_string());
    }

    let donor = match req.into_inner().into_new_donor() {
        Ok(donor) => donor,
        Err(message) => return error_response(400, "Validation failed", message),
    };

    match state.store.register_donor(donor).await {
        Ok(donor_id) => HttpResponse::Created().json(RegisterDonorResponse { donor_id }),
        Err(e) => {
            tracing::error!("Failed to register donor: {}", e);
            error_response(500, "Failed to register donor", e.to_string())
        }
    }
}

/// Create a blood request
///
/// POST /api/v1/requests/create
async fn create_request(
    state: web::Data<AppState>,
    req: web::Json<CreateBloodRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for blood request: {:?}", errors);
        return error_response(400, "Validation failed", errors.to_string());
    }

    let request = match req.into_inner().into_new_request() {
        Ok(request) => request,
        Err(message) => return error_response(400, "Validation failed", message),
    };

    match state.store.create_request(request).await {
        Ok(request_id) => HttpResponse::Created().json(CreateRequestResponse {
            request_id,
            message: "Blood request created".to_string(),
        }),
        Err(e) => {
            tracing::error!("Failed to create blood request: {}", e);
            error_response(500, "Failed to create request", e.to_string())
        }
    }
}
