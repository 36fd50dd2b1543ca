//! Pre-fit feature and target scalers
//!
//! Scalers are loaded from JSON artifacts. The transform family (min-max or
//! z-score) and the per-column statistics come from the artifact; this module
//! only applies them, column by column, without reordering.

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::tensor::{ensure_columns, FEATURE_COUNT, TARGET_COUNT};
use crate::error::ForecastError;

/// Column statistics below this magnitude are treated as zero.
const EPSILON: f64 = 1e-10;

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// A fitted per-column transformer over 2-D arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedScaler {
    /// Scales each column from `[data_min, data_max]` into `feature_range`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    /// Z-score: `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

impl FittedScaler {
    /// Fit a min-max scaler on `data`, one statistic pair per column.
    pub fn fit_min_max(data: &ArrayView2<'_, f64>, feature_range: (f64, f64)) -> Result<Self> {
        if data.nrows() == 0 {
            anyhow::bail!("cannot fit scaler on an empty matrix");
        }
        if feature_range.0 >= feature_range.1 {
            anyhow::bail!("invalid feature range {:?}", feature_range);
        }

        let data_min = data
            .axis_iter(Axis(1))
            .map(|col| col.fold(f64::INFINITY, |a, &b| a.min(b)))
            .collect();
        let data_max = data
            .axis_iter(Axis(1))
            .map(|col| col.fold(f64::NEG_INFINITY, |a, &b| a.max(b)))
            .collect();

        Ok(Self::MinMax {
            data_min,
            data_max,
            feature_range,
        })
    }

    /// Fit a z-score scaler on `data` (population standard deviation).
    pub fn fit_standard(data: &ArrayView2<'_, f64>) -> Result<Self> {
        if data.nrows() == 0 {
            anyhow::bail!("cannot fit scaler on an empty matrix");
        }

        let mean = data
            .mean_axis(Axis(0))
            .context("mean of empty matrix")?;
        let scale = data.std_axis(Axis(0), 0.0);

        Ok(Self::Standard {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MinMax { .. } => "min_max",
            Self::Standard { .. } => "standard",
        }
    }

    /// Number of columns the scaler was fit on
    pub fn n_columns(&self) -> usize {
        match self {
            Self::MinMax { data_min, .. } => data_min.len(),
            Self::Standard { mean, .. } => mean.len(),
        }
    }

    /// Check that the artifact's statistics are internally consistent.
    pub fn validate(&self) -> Result<()> {
        let (a, b, what) = match self {
            Self::MinMax {
                data_min, data_max, ..
            } => (data_min, data_max, "data_min/data_max"),
            Self::Standard { mean, scale } => (mean, scale, "mean/scale"),
        };
        if a.is_empty() {
            anyhow::bail!("scaler has no columns");
        }
        if a.len() != b.len() {
            anyhow::bail!("{} length mismatch: {} vs {}", what, a.len(), b.len());
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            anyhow::bail!("scaler statistics contain non-finite values");
        }
        if let Self::MinMax { feature_range, .. } = self {
            if feature_range.0 >= feature_range.1 {
                anyhow::bail!("invalid feature range {:?}", feature_range);
            }
        }
        Ok(())
    }

    /// Per-column `(multiplier, offset)` so that `scaled = x * multiplier + offset`.
    fn affine(&self) -> (Array1<f64>, Array1<f64>) {
        match self {
            Self::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                let mul: Array1<f64> = data_min
                    .iter()
                    .zip(data_max.iter())
                    .map(|(min, max)| {
                        let range = max - min;
                        let range = if range.abs() < EPSILON { 1.0 } else { range };
                        (hi - lo) / range
                    })
                    .collect();
                let offset = data_min
                    .iter()
                    .zip(mul.iter())
                    .map(|(min, m)| lo - min * m)
                    .collect();
                (mul, offset)
            }
            Self::Standard { mean, scale } => {
                let mul: Array1<f64> = scale
                    .iter()
                    .map(|s| if s.abs() < EPSILON { 1.0 } else { 1.0 / s })
                    .collect();
                let offset = mean.iter().zip(mul.iter()).map(|(m, k)| -m * k).collect();
                (mul, offset)
            }
        }
    }

    pub fn transform(&self, data: &ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        ensure_columns(data, self.n_columns(), "scaler input")?;
        let (mul, offset) = self.affine();

        let mut out = data.to_owned();
        out *= &mul;
        out += &offset;
        Ok(out)
    }

    pub fn inverse_transform(&self, data: &ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        ensure_columns(data, self.n_columns(), "scaler input")?;
        let (mul, offset) = self.affine();

        let mut out = data.to_owned();
        out -= &offset;
        out /= &mul;
        Ok(out)
    }

    /// Load and validate a scaler artifact.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scaler artifact {}", path.display()))?;
        let scaler: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse scaler artifact {}", path.display()))?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write scaler artifact {}", path.display()))?;
        Ok(())
    }
}

/// Feature scaler (19 columns) and target scaler (6 columns), loaded together
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerPair {
    features: FittedScaler,
    targets: FittedScaler,
}

impl ScalerPair {
    pub fn new(features: FittedScaler, targets: FittedScaler) -> Result<Self> {
        features.validate().context("feature scaler")?;
        targets.validate().context("target scaler")?;

        if features.n_columns() != FEATURE_COUNT {
            anyhow::bail!(
                "feature scaler fit on {} columns, expected {}",
                features.n_columns(),
                FEATURE_COUNT
            );
        }
        if targets.n_columns() != TARGET_COUNT {
            anyhow::bail!(
                "target scaler fit on {} columns, expected {}",
                targets.n_columns(),
                TARGET_COUNT
            );
        }

        Ok(Self { features, targets })
    }

    pub fn load(feature_path: &Path, target_path: &Path) -> Result<Self> {
        let features = FittedScaler::from_file(feature_path)?;
        let targets = FittedScaler::from_file(target_path)?;
        Self::new(features, targets)
    }

    pub fn features(&self) -> &FittedScaler {
        &self.features
    }

    pub fn targets(&self) -> &FittedScaler {
        &self.targets
    }

    pub fn adapter(&self) -> ScalerAdapter<'_> {
        ScalerAdapter { pair: self }
    }
}

/// Applies the scaler pair at the two pipeline boundaries
pub struct ScalerAdapter<'a> {
    pair: &'a ScalerPair,
}

impl ScalerAdapter<'_> {
    /// Forward-scale an encoded `[T, 19]` feature matrix.
    pub fn scale_features(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        self.pair
            .features
            .transform(&matrix.view())
            .map_err(|e| ForecastError::MalformedInput(format!("{:#}", e)))
    }

    /// Inverse-scale a `[H, 6]` model output back to physical units.
    pub fn unscale_targets(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        self.pair
            .targets
            .inverse_transform(&matrix.view())
            .map_err(|e| ForecastError::InferenceFailed(format!("{:#}", e)))
    }
}
