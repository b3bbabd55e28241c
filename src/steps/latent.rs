use crate::build::BuildContext;
use crate::config::{LatentSource, Size};
use crate::error::BuildError;
use crate::nodes::{EmptyLatentImage, LoadImage, LoadImageMask, SetLatentNoiseMask};

/// Establishes the initial primary latent/image.
#[derive(Debug, Clone)]
pub struct LatentSourceStep {
    pub source: LatentSource,
    pub size: Size,
    pub batch_size: u32,
}

impl LatentSourceStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        match &self.source {
            LatentSource::TextToImage => {
                let latent = ctx.registry.add(EmptyLatentImage {
                    width: self.size.width,
                    height: self.size.height,
                    batch_size: self.batch_size,
                })?;
                ctx.connections.set_primary(latent);
            }
            LatentSource::ImageToImage { image, mask } => {
                let (pixels, _mask) = ctx.registry.add(LoadImage {
                    image: image.clone(),
                })?;
                ctx.connections.set_primary(pixels);

                // An inpaint mask needs the latent representation; the
                // masked latent becomes the new primary.
                if let Some(mask_source) = mask {
                    let mask = ctx.registry.add(LoadImageMask {
                        image: mask_source.image.clone(),
                        channel: mask_source.channel.clone(),
                    })?;
                    let samples = ctx.primary_as_latent()?;
                    let masked = ctx.registry.add(SetLatentNoiseMask { samples, mask })?;
                    ctx.connections.set_primary(masked);
                }
            }
        }

        ctx.connections.primary_size = self.size;
        Ok(())
    }
}
