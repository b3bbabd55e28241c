use tracing::debug;

use super::addons::SamplerAddon;
use crate::build::{BuildContext, SamplerState};
use crate::config::{SamplerKind, SamplingMode, SchedulerKind};
use crate::error::BuildError;
use crate::nodes::{
    BasicScheduler, CfgGuider, KSampler, KSamplerAdvanced, KSamplerSelect, RandomNoise,
    SamplerCustomAdvanced,
};

/// Constructs the primary sampler, following the state machine
/// `NoSamplerNode → TempSnapshotTaken → AddonsApplied → SamplerNodeCreated
/// → RefinerSamplerNodeCreated`.
///
/// A Temp snapshot of the connections is taken first; sampler-scoped addons
/// mutate only the snapshot, and the sampler node reads its model and
/// conditioning from it. The snapshot is discarded when this step returns.
#[derive(Debug, Clone)]
pub struct SamplerStep {
    pub steps: u32,
    pub cfg: f64,
    pub sampler: SamplerKind,
    pub scheduler: SchedulerKind,
    pub denoise: f64,
    pub mode: SamplingMode,
    /// When set, a two-stage advanced sampler pair is built and the refiner
    /// model takes over at this step.
    pub refiner_start_at_step: Option<u32>,
    pub addons: Vec<SamplerAddon>,
}

impl SamplerStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        // Re-entering initial sampler construction is a programming error,
        // not a recoverable condition.
        if ctx.sampler_state() != SamplerState::NoSamplerNode {
            return Err(BuildError::InvalidBuildState {
                message: "Primary sampler has already been constructed".to_string(),
            });
        }

        ctx.connections.primary_sampler = Some(self.sampler);
        ctx.connections.primary_scheduler = Some(self.scheduler);
        ctx.connections.primary_steps = Some(self.steps);
        ctx.connections.primary_cfg = Some(self.cfg);

        ctx.temp = Some(ctx.connections.clone());
        ctx.sampler_state = SamplerState::TempSnapshotTaken;

        for addon in &self.addons {
            debug!(addon = addon.name(), "applying sampler addon");
            addon.apply(ctx)?;
        }
        ctx.sampler_state = SamplerState::AddonsApplied;

        // The sampler reads from the snapshot the addons rewired; handles
        // are copies, so the borrows end here.
        let view = ctx.working();
        let model = view
            .base
            .model
            .ok_or(BuildError::Validation { field: "model" })?;
        let conditioning = view
            .base
            .conditioning
            .ok_or(BuildError::Validation {
                field: "conditioning",
            })?;
        let refiner_model = view.refiner.model;
        let refiner_conditioning = view.refiner.conditioning;
        let seed = view.seed;

        let latent_image = ctx.primary_as_latent()?;

        match (self.refiner_start_at_step, self.mode) {
            (Some(start_at_step), _) => {
                let refiner_model = refiner_model.ok_or(BuildError::Validation {
                    field: "refiner_model",
                })?;
                let refiner_conditioning = refiner_conditioning.unwrap_or(conditioning);

                let base_latent = ctx.registry.add(KSamplerAdvanced {
                    model,
                    add_noise: true,
                    noise_seed: seed,
                    steps: self.steps,
                    cfg: self.cfg,
                    sampler_name: self.sampler.wire_name(),
                    scheduler: self.scheduler.wire_name(),
                    positive: conditioning.positive,
                    negative: conditioning.negative,
                    latent_image,
                    start_at_step: 0,
                    end_at_step: start_at_step,
                    return_with_leftover_noise: true,
                })?;
                ctx.sampler_state = SamplerState::SamplerNodeCreated;

                let refined = ctx.registry.add(KSamplerAdvanced {
                    model: refiner_model,
                    add_noise: false,
                    noise_seed: seed,
                    steps: self.steps,
                    cfg: self.cfg,
                    sampler_name: self.sampler.wire_name(),
                    scheduler: self.scheduler.wire_name(),
                    positive: refiner_conditioning.positive,
                    negative: refiner_conditioning.negative,
                    latent_image: base_latent,
                    start_at_step,
                    end_at_step: self.steps,
                    return_with_leftover_noise: false,
                })?;
                ctx.connections.set_primary(refined);
                ctx.sampler_state = SamplerState::RefinerSamplerNodeCreated;
            }
            (None, SamplingMode::Custom) => {
                let noise = ctx.registry.add(RandomNoise { noise_seed: seed })?;
                let sampler = ctx.registry.add(KSamplerSelect {
                    sampler_name: self.sampler.wire_name(),
                })?;
                let sigmas = ctx.registry.add(BasicScheduler {
                    model,
                    scheduler: self.scheduler.wire_name(),
                    steps: self.steps,
                    denoise: self.denoise,
                })?;
                let guider = ctx.registry.add(CfgGuider {
                    model,
                    positive: conditioning.positive,
                    negative: conditioning.negative,
                    cfg: self.cfg,
                })?;
                let (output, _denoised) = ctx.registry.add(SamplerCustomAdvanced {
                    noise,
                    guider,
                    sampler,
                    sigmas,
                    latent_image,
                })?;
                ctx.connections.set_primary(output);
                ctx.sampler_state = SamplerState::SamplerNodeCreated;
            }
            (None, SamplingMode::Simple) => {
                let output = ctx.registry.add(KSampler {
                    model,
                    seed,
                    steps: self.steps,
                    cfg: self.cfg,
                    sampler_name: self.sampler.wire_name(),
                    scheduler: self.scheduler.wire_name(),
                    positive: conditioning.positive,
                    negative: conditioning.negative,
                    latent_image,
                    denoise: self.denoise,
                })?;
                ctx.connections.set_primary(output);
                ctx.sampler_state = SamplerState::SamplerNodeCreated;
            }
        }

        // Changes an addon made are only visible to this construction.
        ctx.temp = None;
        Ok(())
    }
}
