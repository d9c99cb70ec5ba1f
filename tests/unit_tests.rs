// Unit tests for Rakth Match

use rakth_match::core::{
    compatibility::{blood_compatible, can_donate},
    distance::haversine_distance,
    features::{extract_features, RequestContext},
    scoring::heuristic_score,
    CityDirectory, FeatureVector,
};
use rakth_match::models::{BloodGroup, BloodRequest, Donor, ScoringWeights, Urgency};

#[test]
fn test_same_group_is_compatible() {
    assert_eq!(blood_compatible("AB+", "AB+"), 1);
    for group in BloodGroup::ALL {
        assert_eq!(blood_compatible(group.as_str(), group.as_str()), 1, "{}", group);
    }
}

#[test]
fn test_universal_donor() {
    for group in BloodGroup::ALL {
        assert_eq!(blood_compatible("O-", group.as_str()), 1);
    }
}

#[test]
fn test_incompatible_pairs() {
    assert_eq!(blood_compatible("A+", "O-"), 0);
    assert_eq!(blood_compatible("AB+", "O+"), 0);
    assert_eq!(blood_compatible("B-", "A-"), 0);
    assert!(!can_donate(BloodGroup::OPos, BloodGroup::ONeg));
}

#[test]
fn test_labels_are_normalised() {
    assert_eq!(blood_compatible(" o- ", "ab+"), 1);
    assert_eq!(blood_compatible("X+", "O+"), 0);
    assert_eq!(blood_compatible("O-", ""), 0);
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(17.3850, 78.4867, 17.3850, 78.4867);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_symmetric() {
    let hyderabad = (17.3850, 78.4867);
    let tirupati = (13.6288, 79.4192);

    let forward = haversine_distance(hyderabad.0, hyderabad.1, tirupati.0, tirupati.1);
    let back = haversine_distance(tirupati.0, tirupati.1, hyderabad.0, hyderabad.1);

    assert!((forward - back).abs() < 1e-9);
    assert!(forward > 400.0 && forward < 450.0);
}

#[test]
fn test_urgency_scores() {
    assert_eq!(Urgency::from_label(Some("Critical")).score(), 4);
    assert_eq!(Urgency::from_label(Some("High")).score(), 3);
    assert_eq!(Urgency::from_label(Some("Medium")).score(), 2);
    assert_eq!(Urgency::from_label(Some("Low")).score(), 1);
    assert_eq!(Urgency::from_label(Some("unknown-label")).score(), 2);
    assert_eq!(Urgency::from_label(None).score(), 2);
}

#[test]
fn test_heuristic_score_for_perfect_local_donor() {
    let features = FeatureVector {
        blood_match: 1,
        distance_km: 0.0,
        urgency_score: 2,
        days_since_first_donation: 0,
        availability: 1,
        donation_count: 0,
        pints_donated: 0,
    };

    assert_eq!(heuristic_score(&features, &ScoringWeights::default()), 4.0);
}

#[test]
fn test_heuristic_proximity_never_negative() {
    let features = FeatureVector {
        blood_match: 0,
        distance_km: 800.0,
        urgency_score: 2,
        days_since_first_donation: 0,
        availability: 0,
        donation_count: 3,
        pints_donated: 0,
    };

    let score = heuristic_score(&features, &ScoringWeights::default());
    assert!((score - 0.3).abs() < 1e-9);
}

#[test]
fn test_feature_extraction_with_malformed_donor_fields() {
    let cities = CityDirectory::builtin();
    let request = BloodRequest {
        request_id: 1,
        blood_group_needed: "A+".to_string(),
        city: Some("Guntur".to_string()),
        urgency: Some("critical".to_string()),
        ..Default::default()
    };
    let donor = Donor {
        donor_id: 9,
        blood_group: "A-".to_string(),
        city: Some("Guntur".to_string()),
        availability: "Yes".to_string(),
        months_since_first_donation: Some("not a number".to_string()),
        donation_count: Some(-4),
        ..Default::default()
    };

    let context = RequestContext::new(&request, &cities);
    let features = extract_features(&donor, &context, &cities);

    assert_eq!(features.blood_match, 1);
    assert_eq!(features.distance_km, 0.0);
    assert_eq!(features.urgency_score, 4);
    assert_eq!(features.days_since_first_donation, 0);
    assert_eq!(features.availability, 1);
    assert_eq!(features.donation_count, 0);
    assert_eq!(features.pints_donated, 0);
}

#[test]
fn test_unknown_cities_resolve_to_origin() {
    let cities = CityDirectory::builtin();
    let request = BloodRequest {
        blood_group_needed: "O+".to_string(),
        city: Some("Atlantis".to_string()),
        ..Default::default()
    };
    let donor = Donor {
        blood_group: "O+".to_string(),
        city: None,
        ..Default::default()
    };

    let context = RequestContext::new(&request, &cities);
    let features = extract_features(&donor, &context, &cities);

    assert_eq!(features.distance_km, 0.0);
}
