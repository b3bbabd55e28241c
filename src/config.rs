//! The declarative pipeline configuration the builder consumes.
//!
//! Values here are supplied by the surrounding configuration layer; ranges
//! and requiredness are validated before they reach the builder, which only
//! checks presence of required selections.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NameParseError;

/// An opaque reference to a model/VAE/CLIP file supplied by the model
/// indexing collaborator. The builder never resolves or validates it beyond
/// using the relative path as a node parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl ModelFile {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            hash: None,
        }
    }

    pub fn with_hash(relative_path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            hash: Some(hash.into()),
        }
    }
}

/// Sampler selection, by backend wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Euler,
    EulerAncestral,
    Heun,
    Dpm2,
    Dpmpp2m,
    Dpmpp2mSde,
    DpmppSde,
    Ddim,
    UniPc,
    Lcm,
}

impl SamplerKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SamplerKind::Euler => "euler",
            SamplerKind::EulerAncestral => "euler_ancestral",
            SamplerKind::Heun => "heun",
            SamplerKind::Dpm2 => "dpm_2",
            SamplerKind::Dpmpp2m => "dpmpp_2m",
            SamplerKind::Dpmpp2mSde => "dpmpp_2m_sde",
            SamplerKind::DpmppSde => "dpmpp_sde",
            SamplerKind::Ddim => "ddim",
            SamplerKind::UniPc => "uni_pc",
            SamplerKind::Lcm => "lcm",
        }
    }
}

impl FromStr for SamplerKind {
    type Err = NameParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "euler" => Ok(SamplerKind::Euler),
            "euler_ancestral" => Ok(SamplerKind::EulerAncestral),
            "heun" => Ok(SamplerKind::Heun),
            "dpm_2" => Ok(SamplerKind::Dpm2),
            "dpmpp_2m" => Ok(SamplerKind::Dpmpp2m),
            "dpmpp_2m_sde" => Ok(SamplerKind::Dpmpp2mSde),
            "dpmpp_sde" => Ok(SamplerKind::DpmppSde),
            "ddim" => Ok(SamplerKind::Ddim),
            "uni_pc" => Ok(SamplerKind::UniPc),
            "lcm" => Ok(SamplerKind::Lcm),
            other => Err(NameParseError {
                kind: "sampler",
                name: other.to_string(),
            }),
        }
    }
}

/// Scheduler selection, by backend wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    Normal,
    Karras,
    Exponential,
    SgmUniform,
    Simple,
    DdimUniform,
    Beta,
}

impl SchedulerKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SchedulerKind::Normal => "normal",
            SchedulerKind::Karras => "karras",
            SchedulerKind::Exponential => "exponential",
            SchedulerKind::SgmUniform => "sgm_uniform",
            SchedulerKind::Simple => "simple",
            SchedulerKind::DdimUniform => "ddim_uniform",
            SchedulerKind::Beta => "beta",
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = NameParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "normal" => Ok(SchedulerKind::Normal),
            "karras" => Ok(SchedulerKind::Karras),
            "exponential" => Ok(SchedulerKind::Exponential),
            "sgm_uniform" => Ok(SchedulerKind::SgmUniform),
            "simple" => Ok(SchedulerKind::Simple),
            "ddim_uniform" => Ok(SchedulerKind::DdimUniform),
            "beta" => Ok(SchedulerKind::Beta),
            other => Err(NameParseError {
                kind: "scheduler",
                name: other.to_string(),
            }),
        }
    }
}

/// Pixel dimensions of the primary image/latent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn scaled_by(&self, factor: f64) -> Size {
        Size {
            width: (self.width as f64 * factor).round() as u32,
            height: (self.height as f64 * factor).round() as u32,
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Size::new(512, 512)
    }
}

/// Upscaler selection: a latent/pixel interpolation method or an
/// ESRGAN-style upscale model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpscalerKind {
    Latent,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upscaler {
    /// Interpolation method name ("nearest-exact", "bilinear", ...) for
    /// latent upscalers; model file name for model upscalers.
    pub name: String,
    pub kind: UpscalerKind,
}

impl Upscaler {
    pub fn latent(method: impl Into<String>) -> Self {
        Self {
            name: method.into(),
            kind: UpscalerKind::Latent,
        }
    }

    pub fn model(model_name: impl Into<String>) -> Self {
        Self {
            name: model_name.into(),
            kind: UpscalerKind::Model,
        }
    }
}

/// One LoRA applied to the model/clip chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraWeight {
    pub file: ModelFile,
    #[serde(default = "default_weight")]
    pub model_weight: f64,
    #[serde(default = "default_weight")]
    pub clip_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Where the initial primary latent/image comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum LatentSource {
    /// Start from an empty latent of the configured size.
    TextToImage,
    /// Start from a local image file, optionally masked for inpainting.
    ImageToImage {
        image: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mask: Option<MaskSource>,
    },
}

impl Default for LatentSource {
    fn default() -> Self {
        LatentSource::TextToImage
    }
}

/// A mask loaded from an image channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskSource {
    pub image: String,
    #[serde(default = "default_mask_channel")]
    pub channel: String,
}

fn default_mask_channel() -> String {
    "alpha".to_string()
}

/// Refiner pass configuration for two-stage sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinerConfig {
    pub checkpoint: ModelFile,
    /// Step at which the refiner takes over from the base model.
    pub start_at_step: u32,
}

/// How the primary sampler is expressed in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// A single all-in-one sampler node.
    #[default]
    Simple,
    /// Separate noise/sigmas/guider/sampler-select nodes feeding a custom
    /// sampler node.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeUConfig {
    pub b1: f64,
    pub b2: f64,
    pub s1: f64,
    pub s2: f64,
}

impl Default for FreeUConfig {
    fn default() -> Self {
        Self {
            b1: 1.1,
            b2: 1.2,
            s1: 0.9,
            s2: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescaleCfgConfig {
    pub multiplier: f64,
}

impl Default for RescaleCfgConfig {
    fn default() -> Self {
        Self { multiplier: 0.7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlNetConfig {
    pub model: ModelFile,
    /// Conditioning image, as an already-materialized local file reference.
    pub image: String,
    pub strength: f64,
    #[serde(default)]
    pub start_percent: f64,
    #[serde(default = "default_end_percent")]
    pub end_percent: f64,
}

fn default_end_percent() -> f64 {
    1.0
}

/// Stable Diffusion generation the layer-diffuse nodes distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdVersion {
    Sd15,
    Sdxl,
}

impl SdVersion {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SdVersion::Sd15 => "SD15",
            SdVersion::Sdxl => "SDXL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDiffuseConfig {
    pub sd_version: SdVersion,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiresFixConfig {
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscaler: Option<Upscaler>,
    pub steps: u32,
    pub denoise: f64,
    /// Falls back to the primary sampler selections when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaleConfig {
    pub upscaler: Upscaler,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetailerConfig {
    pub bbox_model: ModelFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segm_model: Option<ModelFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sam_model: Option<ModelFile>,
    #[serde(default = "default_detailer_denoise")]
    pub denoise: f64,
    #[serde(default = "default_feather")]
    pub feather: u32,
    /// Falls back to the primary sampler/scheduler/steps/cfg when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg: Option<f64>,
    /// Separate detailing seed; inherits the build seed when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_detailer_denoise() -> f64 {
    0.5
}

fn default_feather() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledVaeConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default = "default_tile_overlap")]
    pub overlap: u32,
}

fn default_tile_size() -> u32 {
    512
}

fn default_tile_overlap() -> u32 {
    64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptExpansionConfig {
    pub model: ModelFile,
    #[serde(default)]
    pub log_prompt: bool,
}

/// Optional, user-toggleable pipeline addons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_u: Option<FreeUConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescale_cfg: Option<RescaleCfgConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_net: Option<ControlNetConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_diffuse: Option<LayerDiffuseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hires_fix: Option<HiresFixConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscale: Option<UpscaleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_detailer: Option<FaceDetailerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiled_vae: Option<TiledVaeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_expansion: Option<PromptExpansionConfig>,
}

/// The full declarative configuration for one workflow build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub checkpoint: Option<ModelFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vae: Option<ModelFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loras: Vec<LoraWeight>,
    /// CLIP skip; `Some(2)` stops at the second-to-last layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_skip: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner: Option<RefinerConfig>,

    #[serde(default)]
    pub positive_prompt: String,
    #[serde(default)]
    pub negative_prompt: String,

    pub seed: u64,
    pub steps: u32,
    pub cfg_scale: f64,
    #[serde(default)]
    pub sampler: Option<SamplerKind>,
    #[serde(default)]
    pub scheduler: Option<SchedulerKind>,
    #[serde(default = "default_denoise")]
    pub denoise: f64,
    #[serde(default)]
    pub sampling_mode: SamplingMode,

    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<u32>,

    #[serde(default)]
    pub source: LatentSource,

    #[serde(default)]
    pub addons: AddonConfig,

    #[serde(default = "default_output_prefix")]
    pub filename_prefix: String,
}

fn default_denoise() -> f64 {
    1.0
}

fn default_batch_size() -> u32 {
    1
}

fn default_output_prefix() -> String {
    "kumiki".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            checkpoint: None,
            vae: None,
            loras: Vec::new(),
            clip_skip: None,
            refiner: None,
            positive_prompt: String::new(),
            negative_prompt: String::new(),
            seed: 0,
            steps: 20,
            cfg_scale: 7.0,
            sampler: None,
            scheduler: None,
            denoise: 1.0,
            sampling_mode: SamplingMode::Simple,
            size: Size::default(),
            batch_size: 1,
            batch_index: None,
            source: LatentSource::default(),
            addons: AddonConfig::default(),
            filename_prefix: default_output_prefix(),
        }
    }
}
