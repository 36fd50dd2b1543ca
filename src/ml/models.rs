//! Sequence model definitions
//!
//! A sequence model maps one `[1, 48, 19]` window of scaled features to a
//! `[1, H, 6]` block of scaled target predictions. The horizon `H` belongs to
//! the loaded artifact.

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use super::tensor::{FEATURE_COUNT, TARGET_COUNT, WINDOW_SIZE};
use super::ModelMetadata;
use crate::forecast::FEATURE_NAMES;

/// Trait for loaded sequence models
pub trait SequenceModel: Send + Sync {
    /// Run inference on a `[1, 48, 19]` input, returning `[1, H, 6]`.
    fn infer(&self, input: &Array3<f64>) -> Result<Array3<f64>>;

    /// Number of future hourly steps produced per call
    fn horizon(&self) -> usize;

    fn metadata(&self) -> &ModelMetadata;

    /// Whether `infer` may run on several threads at once. Models returning
    /// `false` are serialized by the forecaster.
    fn supports_concurrent_inference(&self) -> bool {
        true
    }
}

/// Dense sequence head: a single affine layer over the flattened input window.
///
/// `weights` has shape `[H * 6, 48 * 19]`, `bias` has shape `[H * 6]`. Output
/// row `h * 6 + c` is horizon step `h`, target channel `c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseSequenceModel {
    pub metadata: ModelMetadata,
    pub horizon: usize,
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseSequenceModel {
    pub fn new(
        metadata: ModelMetadata,
        horizon: usize,
        weights: Array2<f64>,
        bias: Array1<f64>,
    ) -> Result<Self> {
        let model = Self {
            metadata,
            horizon,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    /// Model whose every output equals `value` regardless of input (for testing)
    pub fn constant(horizon: usize, value: f64) -> Self {
        let outputs = horizon * TARGET_COUNT;
        Self {
            metadata: ModelMetadata::named("constant_dense"),
            horizon,
            weights: Array2::<f64>::zeros((outputs, WINDOW_SIZE * FEATURE_COUNT)),
            bias: Array1::from_elem(outputs, value),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            anyhow::bail!("model horizon must be positive");
        }

        let outputs = self.horizon * TARGET_COUNT;
        let inputs = WINDOW_SIZE * FEATURE_COUNT;
        if self.weights.shape() != [outputs, inputs] {
            anyhow::bail!(
                "weight matrix shape {:?}, expected [{}, {}]",
                self.weights.shape(),
                outputs,
                inputs
            );
        }
        if self.bias.len() != outputs {
            anyhow::bail!("bias length {}, expected {}", self.bias.len(), outputs);
        }
        if self
            .weights
            .iter()
            .chain(self.bias.iter())
            .any(|v| !v.is_finite())
        {
            anyhow::bail!("model parameters contain non-finite values");
        }

        let names = &self.metadata.feature_names;
        if !names.is_empty() && names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
            anyhow::bail!(
                "model was trained on features {:?}, encoder produces {:?}",
                names,
                FEATURE_NAMES
            );
        }
        Ok(())
    }

    /// Load and validate a model artifact.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
        model
            .validate()
            .with_context(|| format!("incompatible model artifact {}", path.display()))?;
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write model artifact {}", path.display()))?;
        Ok(())
    }
}

impl SequenceModel for DenseSequenceModel {
    fn infer(&self, input: &Array3<f64>) -> Result<Array3<f64>> {
        if input.shape() != [1, WINDOW_SIZE, FEATURE_COUNT] {
            anyhow::bail!(
                "input shape {:?}, expected [1, {}, {}]",
                input.shape(),
                WINDOW_SIZE,
                FEATURE_COUNT
            );
        }

        let flat: Array1<f64> = input.index_axis(Axis(0), 0).iter().copied().collect();
        let out = self.weights.dot(&flat) + &self.bias;

        out.into_shape((1, self.horizon, TARGET_COUNT))
            .context("failed to reshape model output")
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
