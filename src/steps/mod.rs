//! The pluggable step protocol.
//!
//! Every unit of pipeline construction (model loaders, the sampler,
//! optional addons) is one variant of [`WorkflowStep`] with an
//! `apply(&mut BuildContext)` operation. The set of step kinds is a closed
//! enum so dispatch stays exhaustively checkable.

pub mod addons;
pub mod latent;
pub mod model;
pub mod modules;
pub mod prompt;
pub mod sampler;

pub use addons::SamplerAddon;
pub use latent::LatentSourceStep;
pub use model::{ModelLoadStep, SeedStep};
pub use modules::{FaceDetailerStep, HiresFixStep, TiledVaeStep, UpscaleStep};
pub use prompt::ConditioningStep;
pub use sampler::SamplerStep;

use crate::build::BuildContext;
use crate::config::WorkflowConfig;
use crate::error::BuildError;

/// One step of the fixed build sequence.
#[derive(Debug, Clone)]
pub enum WorkflowStep {
    Seed(SeedStep),
    ModelLoad(ModelLoadStep),
    LatentSource(LatentSourceStep),
    Conditioning(ConditioningStep),
    Sampler(SamplerStep),
    HiresFix(HiresFixStep),
    Upscale(UpscaleStep),
    FaceDetailer(FaceDetailerStep),
    TiledVae(TiledVaeStep),
}

impl WorkflowStep {
    /// Assembles the step sequence for a configuration, validating that the
    /// required selections are present before any node is created.
    pub fn plan(config: &WorkflowConfig) -> Result<Vec<WorkflowStep>, BuildError> {
        let checkpoint = config
            .checkpoint
            .clone()
            .ok_or(BuildError::Validation {
                field: "checkpoint",
            })?;
        let sampler = config
            .sampler
            .ok_or(BuildError::Validation { field: "sampler" })?;
        let scheduler = config
            .scheduler
            .ok_or(BuildError::Validation { field: "scheduler" })?;

        let mut steps = vec![
            WorkflowStep::Seed(SeedStep {
                seed: config.seed,
                batch_size: config.batch_size,
                batch_index: config.batch_index,
            }),
            WorkflowStep::ModelLoad(ModelLoadStep {
                checkpoint,
                refiner: config.refiner.clone(),
                vae: config.vae.clone(),
                loras: config.loras.clone(),
                clip_skip: config.clip_skip,
            }),
            WorkflowStep::LatentSource(LatentSourceStep {
                source: config.source.clone(),
                size: config.size,
                batch_size: config.batch_size,
            }),
            WorkflowStep::Conditioning(ConditioningStep {
                positive: config.positive_prompt.clone(),
                negative: config.negative_prompt.clone(),
                expansion: config.addons.prompt_expansion.clone(),
            }),
            WorkflowStep::Sampler(SamplerStep {
                steps: config.steps,
                cfg: config.cfg_scale,
                sampler,
                scheduler,
                denoise: config.denoise,
                mode: config.sampling_mode,
                refiner_start_at_step: config.refiner.as_ref().map(|r| r.start_at_step),
                addons: SamplerAddon::plan(&config.addons),
            }),
        ];

        if let Some(hires) = &config.addons.hires_fix {
            steps.push(WorkflowStep::HiresFix(HiresFixStep {
                config: hires.clone(),
            }));
        }
        if let Some(upscale) = &config.addons.upscale {
            steps.push(WorkflowStep::Upscale(UpscaleStep {
                config: upscale.clone(),
            }));
        }
        if let Some(detailer) = &config.addons.face_detailer {
            steps.push(WorkflowStep::FaceDetailer(FaceDetailerStep {
                config: detailer.clone(),
            }));
        }
        if let Some(tiled) = &config.addons.tiled_vae {
            steps.push(WorkflowStep::TiledVae(TiledVaeStep {
                config: tiled.clone(),
            }));
        }

        Ok(steps)
    }

    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        match self {
            WorkflowStep::Seed(step) => step.apply(ctx),
            WorkflowStep::ModelLoad(step) => step.apply(ctx),
            WorkflowStep::LatentSource(step) => step.apply(ctx),
            WorkflowStep::Conditioning(step) => step.apply(ctx),
            WorkflowStep::Sampler(step) => step.apply(ctx),
            WorkflowStep::HiresFix(step) => step.apply(ctx),
            WorkflowStep::Upscale(step) => step.apply(ctx),
            WorkflowStep::FaceDetailer(step) => step.apply(ctx),
            WorkflowStep::TiledVae(step) => step.apply(ctx),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::Seed(_) => "seed",
            WorkflowStep::ModelLoad(_) => "model_load",
            WorkflowStep::LatentSource(_) => "latent_source",
            WorkflowStep::Conditioning(_) => "conditioning",
            WorkflowStep::Sampler(_) => "sampler",
            WorkflowStep::HiresFix(_) => "hires_fix",
            WorkflowStep::Upscale(_) => "upscale",
            WorkflowStep::FaceDetailer(_) => "face_detailer",
            WorkflowStep::TiledVae(_) => "tiled_vae",
        }
    }
}
