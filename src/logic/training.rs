//! Train pipeline: dataset -> split -> fit -> held-out accuracy

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use super::classifier::{Classifier, ClassifierError};
use super::detection::Detector;
use crate::models::{Dataset, DatasetError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("dataset has no feature columns besides 'label'")]
    NoFeatures,

    #[error("{rows} rows cannot be split into train and test partitions")]
    NotEnoughRows { rows: usize },
}

/// How rows are partitioned before fitting
#[derive(Debug, Clone, Copy)]
pub struct SplitConfig {
    /// Fraction of rows held out for scoring
    pub test_ratio: f64,
    /// Fixed shuffle seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { test_ratio: 0.2, seed: None }
    }
}

/// Row indices of the train and test partitions
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..rows` and hold out `ceil(rows * test_ratio)` of them
pub fn train_test_split(rows: usize, config: &SplitConfig) -> Result<Split, PipelineError> {
    let n_test = (rows as f64 * config.test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= rows {
        return Err(PipelineError::NotEnoughRows { rows });
    }

    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(Split { train, test: indices })
}

/// Fit `classifier` on a labeled dataset and score it on the held-out rows
pub fn train(
    classifier: &dyn Classifier,
    dataset: &Dataset,
    split: &SplitConfig,
) -> Result<Detector, PipelineError> {
    dataset.require_label()?;

    let features = dataset.feature_columns();
    if features.is_empty() {
        return Err(PipelineError::NoFeatures);
    }

    let x = dataset.select(&features)?;
    let y = dataset.labels()?;
    let partition = train_test_split(x.len(), split)?;

    let (x_train, y_train) = gather(&x, &y, &partition.train);
    let (x_test, y_test) = gather(&x, &y, &partition.test);

    let model = classifier.fit(&x_train, &y_train)?;
    let accuracy = model.score(&x_test, &y_test)?;

    tracing::debug!(
        classifier = classifier.name(),
        train_rows = x_train.len(),
        test_rows = x_test.len(),
        accuracy,
        "Model fitted"
    );

    Ok(Detector::new(Arc::from(model), features, accuracy))
}

fn gather(x: &[Vec<f64>], y: &[i64], idx: &[usize]) -> (Vec<Vec<f64>>, Vec<i64>) {
    idx.iter().map(|&i| (x[i].clone(), y[i])).unzip()
}
