// Core algorithm exports
pub mod cities;
pub mod compatibility;
pub mod distance;
pub mod features;
pub mod matcher;
pub mod model;
pub mod scoring;

pub use cities::{CityDirectory, CityTableError};
pub use compatibility::{blood_compatible, can_donate};
pub use distance::haversine_distance;
pub use features::{extract_features, FeatureVector};
pub use matcher::{Matcher, MatchResult, MAX_RANKED_DONORS};
pub use model::{Classifier, DecisionTree, LogisticModel, ModelError, ModelProvider};
pub use scoring::{heuristic_score, score_candidates, ScoringMode};
