// Integration tests for Rakth Match

use rakth_match::core::{
    features::FeatureRow,
    model::TreeNode,
    Classifier, CityDirectory, DecisionTree, LogisticModel, Matcher, ModelError, ModelProvider,
    ScoringMode,
};
use rakth_match::models::{BloodRequest, Donor, ScoringWeights};
use rakth_match::services::{InMemoryStore, MatchStore, RankError, RankingService, DEFAULT_RADIUS_KM};
use std::sync::Arc;

fn create_request(id: i64, blood_group: &str, city: &str) -> BloodRequest {
    BloodRequest {
        request_id: id,
        patient_name: format!("Patient {}", id),
        blood_group_needed: blood_group.to_string(),
        city: Some(city.to_string()),
        state: Some("Telangana".to_string()),
        urgency: Some("High".to_string()),
        ..Default::default()
    }
}

fn create_donor(id: i64, blood_group: &str, city: &str, availability: &str) -> Donor {
    Donor {
        donor_id: id,
        name: format!("Donor {}", id),
        email: format!("donor{}@example.com", id),
        blood_group: blood_group.to_string(),
        city: Some(city.to_string()),
        availability: availability.to_string(),
        months_since_first_donation: Some("12".to_string()),
        donation_count: Some(id % 4),
        pints_donated: Some(id % 3),
        ..Default::default()
    }
}

fn create_service(requests: Vec<BloodRequest>, donors: Vec<Donor>) -> (Arc<InMemoryStore>, RankingService) {
    let store = Arc::new(InMemoryStore::with_data(requests, donors));
    let service = RankingService::new(store.clone(), Matcher::with_defaults(), DEFAULT_RADIUS_KM);
    (store, service)
}

/// Logistic model that only looks at distance, so far donors score higher
fn distance_loving_logistic() -> LogisticModel {
    LogisticModel {
        coefficients: vec![0.0, 0.05, 0.0, 0.0, 0.0, 0.0, 0.0],
        intercept: -2.0,
    }
}

/// Label-only tree: available donors are class 1
fn availability_tree() -> DecisionTree {
    DecisionTree::new(vec![
        TreeNode::Split { feature: 4, threshold: 0.5, left: 1, right: 2 },
        TreeNode::Label { class: 0 },
        TreeNode::Label { class: 1 },
    ])
    .unwrap()
}

#[derive(Debug)]
struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn name(&self) -> &str {
        "broken"
    }

    fn predict_proba(&self, _rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::Malformed("weights missing".to_string()))
    }

    fn predict(&self, _rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError> {
        Err(ModelError::Malformed("weights missing".to_string()))
    }
}

#[tokio::test]
async fn test_compatible_donor_first_regardless_of_model_scores() {
    let mut request = create_request(1, "O+", "Hyderabad");
    request.radius_km = Some(1000.0);
    let (_, service) = create_service(
        vec![request],
        vec![
            create_donor(1, "O-", "Hyderabad", "yes"),
            create_donor(2, "A+", "Visakhapatnam", "yes"),
        ],
    );

    let models = ModelProvider::ensemble(availability_tree(), distance_loving_logistic());
    let response = service.rank(1, None, &models).await.unwrap();

    assert_eq!(response.scoring_mode, ScoringMode::Model);
    assert_eq!(response.radius_used_km, 1000.0);
    assert_eq!(response.top_donors.len(), 2);
    assert_eq!(response.top_donors[0].donor_id, 1);
    assert_eq!(response.top_donors[0].blood_match, 1);
    assert_eq!(response.top_donors[1].blood_match, 0);
    assert!(response.top_donors[1].score > response.top_donors[0].score);

    // Label-only tree contributes exactly 0 or 1 to the mean
    for donor in &response.top_donors {
        assert!(donor.score >= 0.5 && donor.score <= 1.0);
    }
}

#[tokio::test]
async fn test_ranking_twice_adds_no_rows() {
    let donors: Vec<Donor> = (1..=6)
        .map(|i| create_donor(i, "O+", "Hyderabad", "yes"))
        .collect();
    let (store, service) = create_service(vec![create_request(7, "AB+", "Hyderabad")], donors);

    let first = service.rank(7, None, &ModelProvider::Absent).await.unwrap();
    assert_eq!(first.new_matches.len(), 6);
    assert_eq!(store.match_count().await, 6);

    let second = service.rank(7, None, &ModelProvider::Absent).await.unwrap();
    assert!(second.new_matches.is_empty());
    assert_eq!(store.match_count().await, 6);
    assert_eq!(second.top_donors, first.top_donors);
}

#[tokio::test]
async fn test_first_score_is_kept() {
    let (store, service) = create_service(
        vec![create_request(3, "O+", "Hyderabad")],
        vec![create_donor(1, "O+", "Hyderabad", "yes")],
    );

    let heuristic = service.rank(3, None, &ModelProvider::Absent).await.unwrap();
    let models = ModelProvider::ensemble(availability_tree(), distance_loving_logistic());
    let modelled = service.rank(3, None, &models).await.unwrap();

    assert_ne!(heuristic.top_donors[0].score, modelled.top_donors[0].score);

    let stored = store.list_matches(3).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score, heuristic.top_donors[0].score);
}

#[tokio::test]
async fn test_concurrent_rankings_do_not_duplicate_matches() {
    let donors: Vec<Donor> = (1..=15)
        .map(|i| create_donor(i, "O-", "Hyderabad", "yes"))
        .collect();
    let (store, service) = create_service(vec![create_request(1, "A+", "Hyderabad")], donors);
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.rank(1, None, &ModelProvider::Absent).await.unwrap() })
        })
        .collect();

    let mut total_new = 0;
    for handle in handles {
        total_new += handle.await.unwrap().new_matches.len();
    }

    assert_eq!(total_new, 10);
    assert_eq!(store.match_count().await, 10);
}

#[tokio::test]
async fn test_radius_excluding_everyone_falls_back_to_full_ranking() {
    let donors: Vec<Donor> = (1..=14)
        .map(|i| {
            let city = if i % 2 == 0 { "Visakhapatnam" } else { "Tirupati" };
            let group = if i % 3 == 0 { "B+" } else { "O-" };
            create_donor(i, group, city, if i % 4 == 0 { "no" } else { "yes" })
        })
        .collect();
    let (_, service) = create_service(vec![create_request(1, "O+", "Hyderabad")], donors);

    let narrow = service.rank(1, Some(1.0), &ModelProvider::Absent).await.unwrap();
    let unbounded = service.rank(1, Some(100_000.0), &ModelProvider::Absent).await.unwrap();

    assert!(narrow.radius_fallback);
    assert!(!unbounded.radius_fallback);
    assert_eq!(narrow.top_donors.len(), 10);
    assert_eq!(narrow.top_donors, unbounded.top_donors);
}

#[tokio::test]
async fn test_persistence_failure_still_returns_ranking() {
    let (store, service) = create_service(
        vec![create_request(1, "O+", "Hyderabad")],
        vec![
            create_donor(1, "O+", "Hyderabad", "yes"),
            create_donor(2, "O-", "Hyderabad", "yes"),
        ],
    );
    store.set_fail_writes(true);

    let response = service.rank(1, None, &ModelProvider::Absent).await.unwrap();

    assert_eq!(response.top_donors.len(), 2);
    assert!(response.new_matches.is_empty());
    assert_eq!(store.match_count().await, 0);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let (_, service) = create_service(vec![], vec![create_donor(1, "O+", "Hyderabad", "yes")]);

    let result = service.rank(404, None, &ModelProvider::Absent).await;
    assert!(matches!(result, Err(RankError::NotFound(_))));
}

#[tokio::test]
async fn test_empty_donor_pool_is_not_found() {
    let (_, service) = create_service(vec![create_request(1, "O+", "Hyderabad")], vec![]);

    let result = service.rank(1, None, &ModelProvider::Absent).await;
    assert!(matches!(result, Err(RankError::NotFound(_))));
}

#[tokio::test]
async fn test_failing_classifier_falls_back_to_heuristic() {
    let (_, service) = create_service(
        vec![create_request(1, "O+", "Hyderabad")],
        vec![create_donor(1, "O+", "Hyderabad", "yes")],
    );

    let models = ModelProvider::ensemble(availability_tree(), BrokenClassifier);
    let response = service.rank(1, None, &models).await.unwrap();

    assert_eq!(response.scoring_mode, ScoringMode::Heuristic);
    // 2 + 1 + 1 + 0.1 * (1 % 4)
    assert!((response.top_donors[0].score - 4.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_mismatched_logistic_export_falls_back_to_heuristic() {
    let (_, service) = create_service(
        vec![create_request(1, "O+", "Hyderabad")],
        vec![create_donor(2, "A+", "Hyderabad", "no")],
    );

    let logistic = LogisticModel {
        coefficients: vec![1.0, 1.0, 1.0],
        intercept: 0.0,
    };
    let models = ModelProvider::ensemble(availability_tree(), logistic);
    let response = service.rank(1, None, &models).await.unwrap();

    assert_eq!(response.scoring_mode, ScoringMode::Heuristic);
    // Incompatible, unavailable, local, two donations
    assert!((response.top_donors[0].score - 1.2).abs() < 1e-9);
}

#[tokio::test]
async fn test_custom_weights_and_result_limit() {
    let donors: Vec<Donor> = (1..=8)
        .map(|i| create_donor(i, "O+", "Hyderabad", "yes"))
        .collect();
    let store = Arc::new(InMemoryStore::with_data(vec![create_request(1, "O+", "Hyderabad")], donors));

    let weights = ScoringWeights {
        donation_count: 0.0,
        ..ScoringWeights::default()
    };
    let service = RankingService::new(store, Matcher::new(weights, CityDirectory::builtin(), 3), 25.0);

    let response = service.rank(1, None, &ModelProvider::Absent).await.unwrap();

    assert_eq!(response.radius_used_km, 25.0);
    assert_eq!(response.top_donors.len(), 3);
    assert!(response.top_donors.iter().all(|d| d.score == 4.0));
    let ids: Vec<i64> = response.top_donors.iter().map(|d| d.donor_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_models_load_from_exported_files() {
    let dir = std::env::temp_dir().join(format!("rakth-models-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let tree_path = dir.join("tree.json");
    let logistic_path = dir.join("logistic.json");

    std::fs::write(
        &tree_path,
        r#"{"nodes": [
            {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
            {"value": [9.0, 1.0]},
            {"value": [2.0, 8.0]}
        ]}"#,
    )
    .unwrap();
    std::fs::write(
        &logistic_path,
        r#"{"coefficients": [2.0, -0.01, 0.1, 0.0, 1.0, 0.05, 0.0], "intercept": -1.5}"#,
    )
    .unwrap();

    let models = ModelProvider::load(Some(&tree_path), Some(&logistic_path));
    assert!(models.is_available());

    let missing = ModelProvider::load(Some(&dir.join("absent.json")), Some(&logistic_path));
    assert!(!missing.is_available());

    std::fs::remove_dir_all(&dir).ok();
}
