use tracing::debug;

use crate::build::BuildContext;
use crate::config::{LoraWeight, ModelFile, RefinerConfig};
use crate::error::BuildError;
use crate::nodes::groups::lora_chain;
use crate::nodes::{CheckpointLoaderSimple, ClipSetLastLayer, VaeLoader};

/// Commits the seed and batch parameters every later step reads.
#[derive(Debug, Clone)]
pub struct SeedStep {
    pub seed: u64,
    pub batch_size: u32,
    pub batch_index: Option<u32>,
}

impl SeedStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        ctx.connections.seed = self.seed;
        ctx.connections.batch_size = self.batch_size;
        ctx.connections.batch_index = self.batch_index;
        Ok(())
    }
}

/// Loads the base checkpoint (and optionally a refiner checkpoint, a VAE
/// override, CLIP skip and a LoRA chain) into the connections.
#[derive(Debug, Clone)]
pub struct ModelLoadStep {
    pub checkpoint: ModelFile,
    pub refiner: Option<RefinerConfig>,
    pub vae: Option<ModelFile>,
    pub loras: Vec<LoraWeight>,
    pub clip_skip: Option<u32>,
}

impl ModelLoadStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let (mut model, mut clip, vae) = ctx.registry.add(CheckpointLoaderSimple {
            ckpt_name: self.checkpoint.relative_path.clone(),
        })?;
        debug!(checkpoint = %self.checkpoint.relative_path, "loaded base checkpoint");

        if let Some(skip) = self.clip_skip {
            // skip=1 is the default last layer; only deeper skips need a node
            if skip > 1 {
                clip = ctx.registry.add(ClipSetLastLayer {
                    clip,
                    stop_at_clip_layer: -(skip as i32),
                })?;
            }
        }

        if !self.loras.is_empty() {
            (model, clip) = lora_chain(&mut ctx.registry, "Base", model, clip, &self.loras)?;
        }

        ctx.connections.base.model = Some(model);
        ctx.connections.base.clip = Some(clip);
        ctx.connections.base.vae = Some(vae);

        if let Some(vae_file) = &self.vae {
            let vae = ctx.registry.add(VaeLoader {
                vae_name: vae_file.relative_path.clone(),
            })?;
            ctx.connections.primary_vae = Some(vae);
        }

        if let Some(refiner) = &self.refiner {
            let (model, clip, vae) = ctx.registry.add(CheckpointLoaderSimple {
                ckpt_name: refiner.checkpoint.relative_path.clone(),
            })?;
            ctx.connections.refiner.model = Some(model);
            ctx.connections.refiner.clip = Some(clip);
            ctx.connections.refiner.vae = Some(vae);
        }

        Ok(())
    }
}
