use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::core::features::{FeatureRow, FEATURE_COUNT};

/// Errors raised while loading or invoking a classifier
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0} does not support probability output")]
    ProbabilityUnsupported(String),

    #[error("{model} expects {expected} features, got {actual}")]
    ShapeMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("{model} returned {actual} predictions for {expected} rows")]
    OutputLength {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("{model} returned invalid score {value}")]
    InvalidOutput { model: String, value: f64 },

    #[error("malformed model: {0}")]
    Malformed(String),

    #[error("failed to read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Binary classifier scoring donor feature rows
///
/// `predict_proba` returns the probability of the positive (good match) class for
/// every row. Classifiers that can only emit hard labels return
/// `ModelError::ProbabilityUnsupported` there and implement `predict`.
pub trait Classifier: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError>;

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError>;
}

/// Logistic regression exported as JSON:
/// `{"coefficients": [..7 values..], "intercept": -1.2}`
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// Validated constructor: one finite coefficient per feature and a finite intercept
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ModelError> {
        if coefficients.len() != FEATURE_COUNT {
            return Err(ModelError::ShapeMismatch {
                model: "logistic_regression".to_string(),
                expected: coefficients.len(),
                actual: FEATURE_COUNT,
            });
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Malformed(
                "logistic regression has non-finite parameters".to_string(),
            ));
        }

        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let raw: LogisticModel = read_json(path.as_ref())?;
        Self::new(raw.coefficients, raw.intercept)
    }

    fn decision(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(ModelError::ShapeMismatch {
                model: self.name().to_string(),
                expected: self.coefficients.len(),
                actual: FEATURE_COUNT,
            });
        }

        let dot: f64 = self
            .coefficients
            .iter()
            .zip(row.iter())
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.intercept)
    }
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticModel {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.decision(row).map(sigmoid)).collect()
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError> {
        rows.iter()
            .map(|row| self.decision(row).map(|z| u8::from(z > 0.0)))
            .collect()
    }
}

/// Decision tree node
///
/// Splits send `row[feature] <= threshold` to `left`. Leaves carry either the
/// per-class sample weights `[negative, positive]` or only a class label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: [f64; 2],
    },
    Label {
        class: u8,
    },
}

#[derive(Debug, Deserialize)]
struct TreeFile {
    nodes: Vec<TreeNode>,
}

/// Decision tree classifier exported as a flat node array, root at index 0
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self, ModelError> {
        if nodes.is_empty() {
            return Err(ModelError::Malformed("decision tree has no nodes".to_string()));
        }

        for (index, node) in nodes.iter().enumerate() {
            match node {
                TreeNode::Split { feature, left, right, .. } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(ModelError::ShapeMismatch {
                            model: "decision_tree".to_string(),
                            expected: feature + 1,
                            actual: FEATURE_COUNT,
                        });
                    }
                    if *left >= nodes.len() || *right >= nodes.len() {
                        return Err(ModelError::Malformed(format!(
                            "node {} points outside the tree",
                            index
                        )));
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(ModelError::Malformed(format!(
                            "leaf {} has invalid class weights",
                            index
                        )));
                    }
                }
                TreeNode::Label { class } => {
                    if *class > 1 {
                        return Err(ModelError::Malformed(format!(
                            "leaf {} has non-binary class {}",
                            index, class
                        )));
                    }
                }
            }
        }

        Ok(Self { nodes })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let file: TreeFile = read_json(path.as_ref())?;
        Self::new(file.nodes)
    }

    /// Walk from the root to a leaf. The walk is bounded by the node count so a
    /// cyclic export cannot loop forever.
    fn leaf(&self, row: &FeatureRow) -> Result<&TreeNode, ModelError> {
        let mut index = 0;
        for _ in 0..=self.nodes.len() {
            let node = &self.nodes[index];
            match node {
                TreeNode::Split { feature, threshold, left, right } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                leaf => return Ok(leaf),
            }
        }
        Err(ModelError::Malformed("decision tree contains a cycle".to_string()))
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &str {
        "decision_tree"
    }

    fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .map(|row| match self.leaf(row)? {
                TreeNode::Leaf { value: [negative, positive] } => {
                    let total = negative + positive;
                    Ok(if total > 0.0 { positive / total } else { 0.0 })
                }
                _ => Err(ModelError::ProbabilityUnsupported(self.name().to_string())),
            })
            .collect()
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError> {
        rows.iter()
            .map(|row| match self.leaf(row)? {
                TreeNode::Leaf { value: [negative, positive] } => Ok(u8::from(positive > negative)),
                TreeNode::Label { class } => Ok(*class),
                TreeNode::Split { .. } => {
                    Err(ModelError::Malformed("walk ended on a split node".to_string()))
                }
            })
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let raw = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Source of the two trained classifiers used in model mode
///
/// `Absent` selects heuristic scoring. The provider is passed into each ranking
/// call rather than living in global state.
#[derive(Debug, Clone, Default)]
pub enum ModelProvider {
    #[default]
    Absent,
    Ensemble {
        tree: Arc<dyn Classifier>,
        logistic: Arc<dyn Classifier>,
    },
}

impl ModelProvider {
    pub fn ensemble<T, L>(tree: T, logistic: L) -> Self
    where
        T: Classifier + 'static,
        L: Classifier + 'static,
    {
        ModelProvider::Ensemble {
            tree: Arc::new(tree),
            logistic: Arc::new(logistic),
        }
    }

    /// Load both classifiers from their exported files
    ///
    /// Model mode needs both. A missing path, missing file or unreadable export
    /// leaves the provider `Absent` and ranking uses the heuristic.
    pub fn load(tree_path: Option<&Path>, logistic_path: Option<&Path>) -> Self {
        let (Some(tree_path), Some(logistic_path)) = (tree_path, logistic_path) else {
            tracing::info!("Model paths not configured, using heuristic scoring");
            return ModelProvider::Absent;
        };

        if !tree_path.exists() || !logistic_path.exists() {
            tracing::info!(
                "Model files not found ({}, {}), using heuristic scoring",
                tree_path.display(),
                logistic_path.display()
            );
            return ModelProvider::Absent;
        }

        let tree = match DecisionTree::from_json_file(tree_path) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Failed to load decision tree, using heuristic scoring: {}", e);
                return ModelProvider::Absent;
            }
        };

        let logistic = match LogisticModel::from_json_file(logistic_path) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!("Failed to load logistic model, using heuristic scoring: {}", e);
                return ModelProvider::Absent;
            }
        };

        tracing::info!("Loaded classifiers from {} and {}", tree_path.display(), logistic_path.display());
        ModelProvider::ensemble(tree, logistic)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ModelProvider::Ensemble { .. })
    }
}
