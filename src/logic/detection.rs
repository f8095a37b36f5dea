//! Detect pipeline: file-level SAFE / ATTACK verdict

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::TrainedModel;
use super::training::PipelineError;
use crate::models::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Attack,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Attack => "ATTACK",
        }
    }

    pub fn banner(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE / NORMAL TRAFFIC",
            Self::Attack => "HARMFUL / ATTACK DETECTED",
        }
    }

    /// Any positive-class prediction makes the whole file an attack
    pub fn from_predictions(predictions: &[i64]) -> Self {
        if predictions.iter().map(|&p| i128::from(p)).sum::<i128>() > 0 {
            Self::Attack
        } else {
            Self::Safe
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trained model bundled with the exact feature columns it was fitted on
pub struct Detector {
    model: Arc<dyn TrainedModel>,
    features: Vec<String>,
    accuracy: f64,
    trained_at: DateTime<Utc>,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("features", &self.features)
            .field("accuracy", &self.accuracy)
            .field("trained_at", &self.trained_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub verdict: Verdict,
    pub rows: usize,
    pub flagged_rows: usize,
}

impl Detector {
    pub fn new(model: Arc<dyn TrainedModel>, features: Vec<String>, accuracy: f64) -> Self {
        Self {
            model,
            features,
            accuracy,
            trained_at: Utc::now(),
        }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Classify a whole file. Columns are re-selected by name so extra
    /// columns, including `label`, are ignored.
    pub fn detect(&self, dataset: &Dataset) -> Result<Detection, PipelineError> {
        let x = dataset.select(&self.features)?;
        let predictions = self.model.predict(&x)?;

        Ok(Detection {
            verdict: Verdict::from_predictions(&predictions),
            rows: predictions.len(),
            flagged_rows: predictions.iter().filter(|p| **p > 0).count(),
        })
    }
}
