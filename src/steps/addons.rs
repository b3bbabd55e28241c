use crate::build::{BuildContext, PreOutputAction};
use crate::config::{
    AddonConfig, ControlNetConfig, FreeUConfig, LayerDiffuseConfig, RescaleCfgConfig, SdVersion,
};
use crate::error::BuildError;
use crate::graph::{ConditioningPair, ModelConnection};
use crate::nodes::{
    ControlNetApplyAdvanced, ControlNetLoader, FreeU, LayeredDiffusionApply, LoadImage, RescaleCfg,
};

/// A sampler-scoped addon.
///
/// These run between the Temp snapshot and the sampler node construction
/// and mutate only the snapshot, so the rest of the pipeline never sees
/// their rewires unless the sampler consumes them.
#[derive(Debug, Clone)]
pub enum SamplerAddon {
    FreeU(FreeUConfig),
    RescaleCfg(RescaleCfgConfig),
    ControlNet(ControlNetConfig),
    LayerDiffuse(LayerDiffuseConfig),
}

impl SamplerAddon {
    /// The enabled sampler-scoped addons of a configuration, in their fixed
    /// application order.
    pub fn plan(addons: &AddonConfig) -> Vec<SamplerAddon> {
        let mut planned = Vec::new();
        if let Some(free_u) = &addons.free_u {
            planned.push(SamplerAddon::FreeU(free_u.clone()));
        }
        if let Some(rescale) = &addons.rescale_cfg {
            planned.push(SamplerAddon::RescaleCfg(rescale.clone()));
        }
        if let Some(control_net) = &addons.control_net {
            planned.push(SamplerAddon::ControlNet(control_net.clone()));
        }
        if let Some(layer_diffuse) = &addons.layer_diffuse {
            planned.push(SamplerAddon::LayerDiffuse(layer_diffuse.clone()));
        }
        planned
    }

    pub fn name(&self) -> &'static str {
        match self {
            SamplerAddon::FreeU(_) => "free_u",
            SamplerAddon::RescaleCfg(_) => "rescale_cfg",
            SamplerAddon::ControlNet(_) => "control_net",
            SamplerAddon::LayerDiffuse(_) => "layer_diffuse",
        }
    }

    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        if ctx.temp.is_none() {
            return Err(BuildError::InvalidBuildState {
                message: format!(
                    "Addon '{}' applied outside of sampler construction",
                    self.name()
                ),
            });
        }

        match self {
            SamplerAddon::FreeU(config) => {
                let model = Self::temp_model(ctx)?;
                let patched = ctx.registry.add(FreeU {
                    model,
                    b1: config.b1,
                    b2: config.b2,
                    s1: config.s1,
                    s2: config.s2,
                })?;
                Self::set_temp_model(ctx, patched);
            }
            SamplerAddon::RescaleCfg(config) => {
                let model = Self::temp_model(ctx)?;
                let patched = ctx.registry.add(RescaleCfg {
                    model,
                    multiplier: config.multiplier,
                })?;
                Self::set_temp_model(ctx, patched);
            }
            SamplerAddon::ControlNet(config) => {
                let conditioning = ctx
                    .working()
                    .base
                    .conditioning
                    .ok_or(BuildError::Validation {
                        field: "conditioning",
                    })?;
                let control_net = ctx.registry.add(ControlNetLoader {
                    control_net_name: config.model.relative_path.clone(),
                })?;
                let (image, _mask) = ctx.registry.add(LoadImage {
                    image: config.image.clone(),
                })?;
                let (positive, negative) = ctx.registry.add(ControlNetApplyAdvanced {
                    positive: conditioning.positive,
                    negative: conditioning.negative,
                    control_net,
                    image,
                    strength: config.strength,
                    start_percent: config.start_percent,
                    end_percent: config.end_percent,
                })?;
                if let Some(temp) = ctx.temp.as_mut() {
                    temp.base.conditioning = Some(ConditioningPair { positive, negative });
                }
            }
            SamplerAddon::LayerDiffuse(config) => {
                let model = Self::temp_model(ctx)?;
                let injection = match config.sd_version {
                    SdVersion::Sd15 => "SD15, Attention Injection, attn_sharing",
                    SdVersion::Sdxl => "SDXL, Attention Injection",
                };
                let patched = ctx.registry.add(LayeredDiffusionApply {
                    model,
                    config: injection.to_string(),
                    weight: config.weight,
                })?;
                Self::set_temp_model(ctx, patched);

                // The alpha decode can only be expressed once the final
                // latent is known.
                ctx.push_pre_output(PreOutputAction::LayerDiffuseDecode {
                    sd_version: config.sd_version,
                    sub_batch_size: 16,
                });
            }
        }
        Ok(())
    }

    fn temp_model(ctx: &BuildContext) -> Result<ModelConnection, BuildError> {
        ctx.working()
            .base
            .model
            .ok_or(BuildError::Validation { field: "model" })
    }

    fn set_temp_model(ctx: &mut BuildContext, model: ModelConnection) {
        if let Some(temp) = ctx.temp.as_mut() {
            temp.base.model = Some(model);
        }
    }
}
