//! Gradient boosted tree ensemble trained with rotating folds.
//!
//! With `k >= 3` folds, model `n` trains on fold `n` and early-stops on
//! fold `n + 1`. New peak groups are scored with the average of all
//! fold models.

use super::{
    LabelledGroup,
    feature_vector,
};
use crate::config::{
    ClassifierConfig,
    GbmSettings,
};
use crate::errors::CalibrationError;
use crate::models::{
    CandidatePeakGroup,
    ScoreType,
};
use forust_ml::errors::ForustError;
use forust_ml::gradientbooster::{
    GrowPolicy,
    MissingNodeTreatment,
};
use forust_ml::metric::Metric;
use forust_ml::objective::ObjectiveType;
use forust_ml::sampler::SampleMethod;
use forust_ml::{
    GradientBooster,
    Matrix,
};
use rayon::prelude::*;
use std::collections::HashSet;

const MIN_FOLDS: u8 = 3;

#[derive(Debug, Clone)]
pub struct GBMConfig {
    iterations: usize,
    learning_rate: f32,
    max_depth: usize,
    min_leaf_weight: f32,
    early_stopping_rounds: Option<usize>,
    seed: u64,
}

impl From<&GbmSettings> for GBMConfig {
    fn from(settings: &GbmSettings) -> Self {
        Self {
            iterations: settings.iterations,
            learning_rate: settings.learning_rate,
            max_depth: settings.max_depth,
            min_leaf_weight: settings.min_leaf_weight,
            early_stopping_rounds: Some(settings.early_stopping_rounds),
            seed: 0,
        }
    }
}

impl GBMConfig {
    fn try_build(&self) -> Result<GradientBooster, ForustError> {
        GradientBooster::new(
            ObjectiveType::LogLoss,
            self.iterations,
            self.learning_rate,
            self.max_depth,
            usize::MAX,
            0.,
            1.,
            0.,
            0.,
            self.min_leaf_weight,
            0.5,
            256,
            // Fold models are already trained from a parallel context.
            false,
            true,
            None,
            1.0,
            0.1,
            0.2,
            1.0,
            self.seed,
            f64::NAN,
            false,
            SampleMethod::None,
            GrowPolicy::DepthWise,
            Some(Metric::LogLoss),
            self.early_stopping_rounds,
            true,
            HashSet::new(),
            MissingNodeTreatment::AssignToParent,
            0,
            false,
        )
    }
}

/// Feature-major matrix of the examples of one fold.
struct DataBuffer {
    values: Vec<f64>,
    response: Vec<f64>,
    weights: Vec<f64>,
    nrows: usize,
}

impl DataBuffer {
    fn from_rows<'a>(rows: impl Iterator<Item = (&'a [f64], f64, f64)>, ncols: usize) -> Self {
        let rows: Vec<_> = rows.collect();
        let nrows = rows.len();
        let mut values = vec![0.0; nrows * ncols];
        let mut response = Vec::with_capacity(nrows);
        let mut weights = Vec::with_capacity(nrows);
        for (sample_idx, (features, y, w)) in rows.into_iter().enumerate() {
            for (feature_idx, val) in features.iter().enumerate() {
                values[feature_idx * nrows + sample_idx] = *val;
            }
            response.push(y);
            weights.push(w);
        }
        Self {
            values,
            response,
            weights,
            nrows,
        }
    }

    fn as_matrix(&self) -> Matrix<'_, f64> {
        let ncols = if self.nrows == 0 {
            0
        } else {
            self.values.len() / self.nrows
        };
        Matrix::new(self.values.as_slice(), self.nrows, ncols)
    }
}

/// One booster per fold, averaged at prediction time.
pub struct BoostedModel {
    score_types: Vec<ScoreType>,
    fold_models: Vec<GradientBooster>,
}

impl BoostedModel {
    pub fn num_models(&self) -> usize {
        self.fold_models.len()
    }

    /// Fits `n_folds` boosters, folds assigned round-robin in input order.
    ///
    /// Targets are down-weighted to half the weight of decoys.
    pub fn fit(
        examples: &[LabelledGroup],
        score_types: &[ScoreType],
        config: &ClassifierConfig,
    ) -> Result<Self, CalibrationError> {
        let n_folds = (config.n_folds.clamp(MIN_FOLDS as usize, u8::MAX as usize)) as u8;
        let ncols = score_types.len();
        let assigned_fold: Vec<u8> = (0..examples.len())
            .map(|i| (i % n_folds as usize) as u8)
            .collect();
        let fold_buffer = |fold: u8| {
            DataBuffer::from_rows(
                examples
                    .iter()
                    .zip(assigned_fold.iter())
                    .filter(|(_, f)| **f == fold)
                    .map(|(x, _)| {
                        let (y, w) = if x.label.is_target() { (1.0, 0.5) } else { (0.0, 1.0) };
                        (x.features.as_slice(), y, w)
                    }),
                ncols,
            )
        };
        let buffers: Vec<DataBuffer> = (0..n_folds).map(fold_buffer).collect();
        if let Some(fold) = buffers.iter().position(|b| b.nrows == 0) {
            return Err(CalibrationError::EmptyFold { fold: fold as u8 });
        }

        let gbm_config = GBMConfig::from(&config.gbm);
        let fold_models = (0..n_folds as usize)
            .into_par_iter()
            .map(|fold| {
                let train = &buffers[fold];
                let val = &buffers[(fold + 1) % n_folds as usize];
                let mut model = gbm_config.try_build()?;
                let evaluation_data = Some(vec![(
                    val.as_matrix(),
                    val.response.as_slice(),
                    val.weights.as_slice(),
                )]);
                model.fit(
                    &train.as_matrix(),
                    &train.response,
                    &train.weights,
                    evaluation_data,
                )?;
                Ok(model)
            })
            .collect::<Result<Vec<_>, ForustError>>()?;

        Ok(Self {
            score_types: score_types.to_vec(),
            fold_models,
        })
    }

    /// Mean prediction of the fold models for each peak group.
    pub fn predict(&self, groups: &[&CandidatePeakGroup]) -> Vec<f64> {
        if groups.is_empty() {
            return Vec::new();
        }
        let rows: Vec<Vec<f64>> = groups
            .iter()
            .map(|g| feature_vector(g, &self.score_types))
            .collect();
        let buffer = DataBuffer::from_rows(
            rows.iter().map(|r| (r.as_slice(), 0.0, 1.0)),
            self.score_types.len(),
        );
        let matrix = buffer.as_matrix();

        let mut scores = vec![0.0; groups.len()];
        for model in self.fold_models.iter() {
            for (s, p) in scores.iter_mut().zip(model.predict(&matrix, true)) {
                *s += p;
            }
        }
        let n = self.fold_models.len().max(1) as f64;
        scores.iter_mut().for_each(|x| *x /= n);
        scores
    }
}
