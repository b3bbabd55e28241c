use tracing::debug;

use crate::build::BuildContext;
use crate::config::PromptExpansionConfig;
use crate::error::BuildError;
use crate::graph::{ClipConnection, ConditioningPair, PromptText};
use crate::nodes::{ClipTextEncode, PromptExpansion};

/// Applies the prompts: optional expansion of the positive prompt, then
/// CLIP text encoding into conditioning for the base (and, when loaded,
/// refiner) model.
#[derive(Debug, Clone)]
pub struct ConditioningStep {
    pub positive: String,
    pub negative: String,
    pub expansion: Option<PromptExpansionConfig>,
}

impl ConditioningStep {
    pub fn apply(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let mut positive = PromptText::from(self.positive.clone());
        let negative = PromptText::from(self.negative.clone());

        if let Some(expansion) = &self.expansion {
            debug!(model = %expansion.model.relative_path, "expanding positive prompt");
            let expanded = ctx.registry.add(PromptExpansion {
                model_name: expansion.model.relative_path.clone(),
                text: positive.clone(),
                seed: ctx.connections.seed,
                log_prompt: expansion.log_prompt,
            })?;
            positive = PromptText::Connection(expanded);
        }

        ctx.connections.positive_prompt = positive.clone();
        ctx.connections.negative_prompt = negative.clone();

        let base_clip = ctx
            .connections
            .base
            .clip
            .ok_or(BuildError::Validation { field: "clip" })?;
        let pair = Self::encode_pair(ctx, base_clip, &positive, &negative)?;
        ctx.connections.base.conditioning = Some(pair);

        if let Some(refiner_clip) = ctx.connections.refiner.clip {
            let pair = Self::encode_pair(ctx, refiner_clip, &positive, &negative)?;
            ctx.connections.refiner.conditioning = Some(pair);
        }

        Ok(())
    }

    fn encode_pair(
        ctx: &mut BuildContext,
        clip: ClipConnection,
        positive: &PromptText,
        negative: &PromptText,
    ) -> Result<ConditioningPair, BuildError> {
        let positive = ctx.registry.add(ClipTextEncode {
            clip,
            text: positive.clone(),
        })?;
        let negative = ctx.registry.add(ClipTextEncode {
            clip,
            text: negative.clone(),
        })?;
        Ok(ConditioningPair { positive, negative })
    }
}
