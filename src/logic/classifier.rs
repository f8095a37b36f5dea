//! Classifier capability
//!
//! The learning algorithm is an external dependency. Pipelines only see the
//! `Classifier` / `TrainedModel` pair so the forest can be swapped for a
//! stub in tests or another estimator later.

use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("no rows to {0}")]
    NoRows(&'static str),

    #[error("{rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("rows have {got} features, model expects {expected}")]
    WidthMismatch { expected: usize, got: usize },

    #[error("classifier failed: {0}")]
    Backend(String),
}

/// Untrained estimator
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn fit(&self, x: &[Vec<f64>], y: &[i64]) -> Result<Box<dyn TrainedModel>, ClassifierError>;
}

/// Fitted estimator
pub trait TrainedModel: Send + Sync {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i64>, ClassifierError>;

    /// Mean accuracy on the given rows
    fn score(&self, x: &[Vec<f64>], y: &[i64]) -> Result<f64, ClassifierError> {
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch { rows: x.len(), labels: y.len() });
        }
        if y.is_empty() {
            return Err(ClassifierError::NoRows("score"));
        }

        let predicted = self.predict(x)?;
        let correct = predicted.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }
}

// ============================================================================
// RANDOM FOREST
// ============================================================================

type Forest = RandomForestClassifier<f64, i64, DenseMatrix<f64>, Vec<i64>>;

/// Random forest backed by smartcore
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub n_trees: u16,
    pub seed: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self { n_trees: 100, seed: 42 }
    }
}

impl RandomForest {
    pub fn new(n_trees: u16, seed: u64) -> Self {
        Self { n_trees: n_trees.max(1), seed }
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&self, x: &[Vec<f64>], y: &[i64]) -> Result<Box<dyn TrainedModel>, ClassifierError> {
        if x.is_empty() {
            return Err(ClassifierError::NoRows("fit"));
        }
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch { rows: x.len(), labels: y.len() });
        }
        let width = check_width(x, None)?;

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec());
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(self.n_trees)
            .with_seed(self.seed);

        let forest = Forest::fit(&matrix, &y.to_vec(), params)
            .map_err(|e| ClassifierError::Backend(e.to_string()))?;

        Ok(Box::new(FittedForest { forest, width }))
    }
}

struct FittedForest {
    forest: Forest,
    width: usize,
}

impl TrainedModel for FittedForest {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i64>, ClassifierError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        check_width(x, Some(self.width))?;

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec());
        self.forest
            .predict(&matrix)
            .map_err(|e| ClassifierError::Backend(e.to_string()))
    }
}

/// All rows share one width, optionally a required one
fn check_width(x: &[Vec<f64>], expected: Option<usize>) -> Result<usize, ClassifierError> {
    let expected = expected.unwrap_or_else(|| x.first().map(Vec::len).unwrap_or(0));
    if expected == 0 {
        return Err(ClassifierError::WidthMismatch { expected: 1, got: 0 });
    }
    match x.iter().find(|row| row.len() != expected) {
        Some(row) => Err(ClassifierError::WidthMismatch { expected, got: row.len() }),
        None => Ok(expected),
    }
}
