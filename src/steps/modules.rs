//! Post-sampler addon modules: image-space rewrites of the primary.

use tracing::debug;

use crate::build::{BuildContext, PreOutputAction};
use crate::config::{FaceDetailerConfig, HiresFixConfig, TiledVaeConfig, UpscaleConfig};
use crate::error::BuildError;
use crate::nodes::groups::scale_primary;
use crate::nodes::{FaceDetailer, KSampler, SamLoader, UltralyticsDetectorProvider};

/// Upscales the primary and runs a second sampler pass over it at the new
/// resolution. The original sampler node is left untouched.
#[derive(Debug, Clone)]
pub struct HiresFixStep {
    pub config: HiresFixConfig,
}

impl HiresFixStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let hires_size = ctx.connections.primary_size.scaled_by(self.config.scale);
        debug!(
            width = hires_size.width,
            height = hires_size.height,
            "building hires pass"
        );

        if let Some(upscaler) = &self.config.upscaler {
            let primary = ctx.connections.require_primary()?;
            let vae = ctx.connections.default_vae()?;
            let scaled = scale_primary(
                &mut ctx.registry,
                "HiresFix",
                primary,
                vae,
                upscaler,
                hires_size.width,
                hires_size.height,
            )?;
            ctx.connections.set_primary(scaled);
        }

        let model = ctx.connections.refiner_or_base_model()?;
        let conditioning = ctx.connections.refiner_or_base_conditioning()?;
        let sampler = self
            .config
            .sampler
            .or(ctx.connections.primary_sampler)
            .ok_or(BuildError::Validation { field: "sampler" })?;
        let scheduler = self
            .config
            .scheduler
            .or(ctx.connections.primary_scheduler)
            .ok_or(BuildError::Validation { field: "scheduler" })?;
        let cfg = self
            .config
            .cfg
            .or(ctx.connections.primary_cfg)
            .ok_or(BuildError::Validation { field: "cfg" })?;
        let seed = ctx.connections.seed;

        let latent_image = ctx.primary_as_latent()?;
        let name = ctx.registry.unique_name("HiresFix_Sampler");
        let output = ctx.registry.add_named(
            name,
            KSampler {
                model,
                seed,
                steps: self.config.steps,
                cfg,
                sampler_name: sampler.wire_name(),
                scheduler: scheduler.wire_name(),
                positive: conditioning.positive,
                negative: conditioning.negative,
                latent_image,
                denoise: self.config.denoise,
            },
        )?;

        ctx.connections.set_primary(output);
        ctx.connections.primary_size = hires_size;
        Ok(())
    }
}

/// Scales the primary to a new size without re-sampling.
#[derive(Debug, Clone)]
pub struct UpscaleStep {
    pub config: UpscaleConfig,
}

impl UpscaleStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let target = ctx.connections.primary_size.scaled_by(self.config.scale);
        let primary = ctx.connections.require_primary()?;
        let vae = ctx.connections.default_vae()?;
        let scaled = scale_primary(
            &mut ctx.registry,
            "Upscale",
            primary,
            vae,
            &self.config.upscaler,
            target.width,
            target.height,
        )?;
        ctx.connections.set_primary(scaled);
        ctx.connections.primary_size = target;
        Ok(())
    }
}

/// Detects and re-samples faces in the primary image.
#[derive(Debug, Clone)]
pub struct FaceDetailerStep {
    pub config: FaceDetailerConfig,
}

impl FaceDetailerStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let config = &self.config;

        let sampler = config
            .sampler
            .or(ctx.connections.primary_sampler)
            .ok_or(BuildError::Validation { field: "sampler" })?;
        let scheduler = config
            .scheduler
            .or(ctx.connections.primary_scheduler)
            .ok_or(BuildError::Validation { field: "scheduler" })?;
        let steps = config
            .steps
            .or(ctx.connections.primary_steps)
            .ok_or(BuildError::Validation { field: "steps" })?;
        let cfg = config
            .cfg
            .or(ctx.connections.primary_cfg)
            .ok_or(BuildError::Validation { field: "cfg" })?;
        let seed = config.seed.unwrap_or(ctx.connections.seed);

        let (bbox_detector, _segm) = ctx.registry.add(UltralyticsDetectorProvider {
            model_name: config.bbox_model.relative_path.clone(),
        })?;
        let segm_detector_opt = match &config.segm_model {
            Some(segm_model) => {
                let (_bbox, segm) = ctx.registry.add(UltralyticsDetectorProvider {
                    model_name: segm_model.relative_path.clone(),
                })?;
                Some(segm)
            }
            None => None,
        };
        let sam_model_opt = match &config.sam_model {
            Some(sam_model) => Some(ctx.registry.add(SamLoader {
                model_name: sam_model.relative_path.clone(),
                device_mode: "AUTO",
            })?),
            None => None,
        };

        let image = ctx.primary_as_image()?;
        let model = ctx.connections.refiner_or_base_model()?;
        let clip = ctx
            .connections
            .base
            .clip
            .ok_or(BuildError::Validation { field: "clip" })?;
        let vae = ctx.connections.default_vae()?;
        let conditioning = ctx.connections.refiner_or_base_conditioning()?;

        let detailed = ctx.registry.add(FaceDetailer {
            image,
            model,
            clip,
            vae,
            positive: conditioning.positive,
            negative: conditioning.negative,
            bbox_detector,
            seed,
            steps,
            cfg,
            sampler_name: sampler.wire_name(),
            scheduler: scheduler.wire_name(),
            denoise: config.denoise,
            feather: config.feather,
            sam_model_opt,
            segm_detector_opt,
        })?;

        ctx.connections.set_primary(detailed);
        Ok(())
    }
}

/// Defers replacement of the final decode with a tiled decode.
#[derive(Debug, Clone)]
pub struct TiledVaeStep {
    pub config: TiledVaeConfig,
}

impl TiledVaeStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        ctx.push_pre_output(PreOutputAction::TiledVaeDecode {
            tile_size: self.config.tile_size,
            overlap: self.config.overlap,
        });
        Ok(())
    }
}
