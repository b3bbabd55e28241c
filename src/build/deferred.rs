use tracing::debug;

use super::BuildContext;
use crate::config::SdVersion;
use crate::error::BuildError;
use crate::graph::Primary;
use crate::nodes::{LayeredDiffusionDecodeRgba, TiledVaeDecode};

/// A deferred transformation that can only be expressed once the final
/// primary value is known.
///
/// Actions are data, not closures: registration order and single execution
/// are guaranteed by the queue in [`BuildContext`], and each variant reads
/// whatever committed state it needs when it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PreOutputAction {
    /// Decode the final latent with the tiled VAE decoder instead of the
    /// standard one.
    TiledVaeDecode { tile_size: u32, overlap: u32 },
    /// Decode the final latent and image into an RGBA image carrying the
    /// layer-diffuse alpha.
    LayerDiffuseDecode {
        sd_version: SdVersion,
        sub_batch_size: u32,
    },
}

impl PreOutputAction {
    /// Runs the action. All normal graph construction is complete at this
    /// point, so the primary and last latent may be read safely.
    pub(crate) fn run(self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        match self {
            PreOutputAction::TiledVaeDecode { tile_size, overlap } => {
                // Only applies while the primary is still in latent space.
                let Some(Primary::Latent(samples)) = ctx.connections.primary() else {
                    return Ok(());
                };
                let vae = ctx.connections.default_vae()?;
                debug!(tile_size, overlap, "replacing final decode with tiled decode");
                let image = ctx.registry.add(TiledVaeDecode {
                    samples,
                    vae,
                    tile_size,
                    overlap,
                })?;
                ctx.connections.set_primary(image);
                Ok(())
            }
            PreOutputAction::LayerDiffuseDecode {
                sd_version,
                sub_batch_size,
            } => {
                let samples = ctx
                    .connections
                    .last_primary_latent()
                    .ok_or(BuildError::MissingPrerequisite { slot: "latent" })?;
                let images = ctx.primary_as_image()?;
                let rgba = ctx.registry.add(LayeredDiffusionDecodeRgba {
                    samples,
                    images,
                    sd_version: sd_version.wire_name(),
                    sub_batch_size,
                })?;
                ctx.connections.set_primary(rgba);
                Ok(())
            }
        }
    }
}
