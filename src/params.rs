//! The flat, human-meaningful generation parameters record.
//!
//! A pure data-mapping contract between the configuration the graph was
//! built from and saved output metadata; kept in sync field-for-field with
//! what the graph actually used.

use serde::{Deserialize, Serialize};

use crate::config::{ModelFile, WorkflowConfig};
use crate::error::NameParseError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(default)]
    pub positive_prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    pub seed: u64,
    pub steps: u32,
    pub cfg_scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hash: Option<String>,
}

impl GenerationParameters {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            positive_prompt: config.positive_prompt.clone(),
            negative_prompt: config.negative_prompt.clone(),
            seed: config.seed,
            steps: config.steps,
            cfg_scale: config.cfg_scale,
            sampler: config.sampler.map(|s| s.wire_name().to_string()),
            scheduler: config.scheduler.map(|s| s.wire_name().to_string()),
            width: config.size.width,
            height: config.size.height,
            model_name: config
                .checkpoint
                .as_ref()
                .map(|m| m.relative_path.clone()),
            model_hash: config.checkpoint.as_ref().and_then(|m| m.hash.clone()),
        }
    }

    /// Writes these parameters back onto a configuration, for re-loading a
    /// prior generation from saved metadata.
    pub fn apply_to(&self, config: &mut WorkflowConfig) -> Result<(), NameParseError> {
        config.positive_prompt = self.positive_prompt.clone();
        config.negative_prompt = self.negative_prompt.clone();
        config.seed = self.seed;
        config.steps = self.steps;
        config.cfg_scale = self.cfg_scale;
        config.sampler = self.sampler.as_deref().map(str::parse).transpose()?;
        config.scheduler = self.scheduler.as_deref().map(str::parse).transpose()?;
        config.size.width = self.width;
        config.size.height = self.height;
        if let Some(name) = &self.model_name {
            config.checkpoint = Some(ModelFile {
                relative_path: name.clone(),
                hash: self.model_hash.clone(),
            });
        }
        Ok(())
    }
}
