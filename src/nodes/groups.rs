//! Multi-node group helpers: common subgraphs built in one call.

use super::{
    ImageScale, ImageUpscaleWithModel, LatentUpscale, LoraLoader, UpscaleModelLoader, VaeDecode,
};
use crate::config::{LoraWeight, Upscaler, UpscalerKind};
use crate::error::BuildError;
use crate::graph::{
    ClipConnection, ImageConnection, LatentConnection, ModelConnection, NodeRegistry, Primary,
    VaeConnection,
};

/// Upscales an image with an ESRGAN-style model: loads the model and runs
/// the upscale node, named under a common prefix.
pub fn upscale_with_model(
    registry: &mut NodeRegistry,
    name: &str,
    model_name: &str,
    image: ImageConnection,
) -> Result<ImageConnection, BuildError> {
    let loader_name = registry.unique_name(&format!("{}_UpscaleModelLoader", name));
    let upscale_model = registry.add_named(
        loader_name,
        UpscaleModelLoader {
            model_name: model_name.to_string(),
        },
    )?;

    let upscaler_name = registry.unique_name(&format!("{}_ImageUpscaleWithModel", name));
    registry.add_named(
        upscaler_name,
        ImageUpscaleWithModel {
            upscale_model,
            image,
        },
    )
}

/// Scales the primary to the requested size, staying in its current
/// representation where possible.
///
/// Latent upscalers keep a latent primary in latent space; model upscalers
/// require pixel space, so a latent primary is decoded first. Model
/// upscalers are fixed-factor, so the result is scaled again to the exact
/// requested size.
pub fn scale_primary(
    registry: &mut NodeRegistry,
    name: &str,
    primary: Primary,
    vae: VaeConnection,
    upscaler: &Upscaler,
    width: u32,
    height: u32,
) -> Result<Primary, BuildError> {
    match upscaler.kind {
        UpscalerKind::Latent => match primary {
            Primary::Latent(latent) => {
                let node_name = registry.unique_name(&format!("{}_LatentUpscale", name));
                let upscaled: LatentConnection = registry.add_named(
                    node_name,
                    LatentUpscale {
                        samples: latent,
                        upscale_method: upscaler.name.clone(),
                        width,
                        height,
                    },
                )?;
                Ok(Primary::Latent(upscaled))
            }
            Primary::Image(image) => {
                let node_name = registry.unique_name(&format!("{}_ImageUpscale", name));
                let scaled: ImageConnection = registry.add_named(
                    node_name,
                    ImageScale {
                        image,
                        upscale_method: upscaler.name.clone(),
                        width,
                        height,
                        crop: false,
                    },
                )?;
                Ok(Primary::Image(scaled))
            }
        },
        UpscalerKind::Model => {
            let image = match primary {
                Primary::Image(image) => image,
                Primary::Latent(latent) => {
                    let decode_name = registry.unique_name(&format!("{}_VAEDecode", name));
                    registry.add_named(
                        decode_name,
                        VaeDecode {
                            samples: latent,
                            vae,
                        },
                    )?
                }
            };

            let upscaled =
                upscale_with_model(registry, &format!("{}_ModelUpscale", name), &upscaler.name, image)?;

            let resize_name = registry.unique_name(&format!("{}_ImageScale", name));
            let resized: ImageConnection = registry.add_named(
                resize_name,
                ImageScale {
                    image: upscaled,
                    upscale_method: "bilinear".to_string(),
                    width,
                    height,
                    crop: false,
                },
            )?;
            Ok(Primary::Image(resized))
        }
    }
}

/// Loads a series of LoRAs, each rewiring the model and clip of the
/// previous link.
pub fn lora_chain(
    registry: &mut NodeRegistry,
    name: &str,
    model: ModelConnection,
    clip: ClipConnection,
    loras: &[LoraWeight],
) -> Result<(ModelConnection, ClipConnection), BuildError> {
    if loras.is_empty() {
        return Err(BuildError::Validation { field: "loras" });
    }

    loras
        .iter()
        .enumerate()
        .try_fold((model, clip), |(model, clip), (index, lora)| {
            let node_name = registry.unique_name(&format!("{}_LoraLoader_{}", name, index + 1));
            registry.add_named(
                node_name,
                LoraLoader {
                    model,
                    clip,
                    lora_name: lora.file.relative_path.clone(),
                    strength_model: lora.model_weight,
                    strength_clip: lora.clip_weight,
                },
            )
        })
}
