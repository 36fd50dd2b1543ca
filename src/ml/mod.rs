//! Machine Learning Module
//!
//! This module holds everything the forecaster needs from the trained model:
//! - Fixed-shape tensor contracts
//! - Feature/target scalers and their adapter
//! - Sequence model artifacts
//! - The process-wide resource cache with single-flight loading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod models;
pub mod scaler;
pub mod tensor;

pub use cache::{ArtifactLoader, FileArtifactLoader, ResourceCache};
pub use models::{DenseSequenceModel, SequenceModel};
pub use scaler::{FittedScaler, ScalerAdapter, ScalerPair};
pub use tensor::{FEATURE_COUNT, TARGET_COUNT, WINDOW_SIZE};

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    /// Encoder columns the model was trained on; empty means unchecked
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl ModelMetadata {
    pub fn named(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            version: "0.1.0".to_string(),
            trained_at: None,
            feature_names: Vec::new(),
        }
    }
}
