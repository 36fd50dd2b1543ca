use std::path::PathBuf;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
}

/// Artifact locations and inference settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub model_path: PathBuf,
    pub feature_scaler_path: PathBuf,
    pub target_scaler_path: PathBuf,
    /// Force one inference at a time even if the model allows concurrent calls
    pub serialize_inference: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/best_model.json"),
            feature_scaler_path: PathBuf::from("models/feature_scaler.json"),
            target_scaler_path: PathBuf::from("models/target_scaler.json"),
            serialize_inference: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config/default.toml")
    }

    /// Defaults, then the TOML file (if present), then `WXF__SECTION__KEY`
    /// variables, then the plain `MODEL_PATH` / `FEATURE_SCALER_PATH` /
    /// `TARGET_SCALER_PATH` overrides.
    pub fn load_from(path: &str) -> Result<Self> {
        Ok(Self::figment(path).extract()?)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("WXF__").split("__"))
            .merge(Env::raw().only(&["MODEL_PATH"]).map(|_| "models.model_path".into()))
            .merge(
                Env::raw()
                    .only(&["FEATURE_SCALER_PATH"])
                    .map(|_| "models.feature_scaler_path".into()),
            )
            .merge(
                Env::raw()
                    .only(&["TARGET_SCALER_PATH"])
                    .map(|_| "models.target_scaler_path".into()),
            )
    }
}
