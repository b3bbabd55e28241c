use crate::config::{SamplerKind, SchedulerKind, Size};
use crate::error::BuildError;
use crate::graph::{
    ClipConnection, ClipVisionConnection, ConditioningPair, ImageConnection, LatentConnection,
    ModelConnection, Primary, PromptText, VaeConnection,
};

/// The typed slots associated with one loaded model (base or refiner).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSlots {
    pub model: Option<ModelConnection>,
    pub clip: Option<ClipConnection>,
    pub clip_vision: Option<ClipVisionConnection>,
    pub vae: Option<VaeConnection>,
    pub conditioning: Option<ConditioningPair>,
}

/// The primary value plus its cached representation conversions.
///
/// Conversions are cached so that repeated requests for the same
/// representation reuse one conversion node instead of duplicating it; any
/// write to the primary replaces the slot and with it the caches.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrimarySlot {
    pub value: Primary,
    pub as_latent: Option<LatentConnection>,
    pub as_image: Option<ImageConnection>,
}

/// The builder's working memory of "current" typed values as the pipeline
/// is assembled. Every step reads and updates this aggregate.
///
/// A structural clone of this type is the Temp snapshot addons mutate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionsContext {
    pub seed: u64,
    pub batch_size: u32,
    pub batch_index: Option<u32>,

    pub positive_prompt: PromptText,
    pub negative_prompt: PromptText,

    pub base: ModelSlots,
    pub refiner: ModelSlots,

    /// Sampler parameters the primary sampler committed, for addons that
    /// inherit them (e.g. the face detailer).
    pub primary_steps: Option<u32>,
    pub primary_cfg: Option<f64>,
    pub primary_sampler: Option<SamplerKind>,
    pub primary_scheduler: Option<SchedulerKind>,

    /// Explicitly selected VAE, preferred over the loaded models' VAEs.
    pub primary_vae: Option<VaeConnection>,
    pub primary_size: Size,

    primary: Option<PrimarySlot>,
    last_primary_latent: Option<LatentConnection>,

    output_nodes: Vec<String>,
}

impl ConnectionsContext {
    pub fn new() -> Self {
        Self {
            batch_size: 1,
            ..Self::default()
        }
    }

    pub fn primary(&self) -> Option<Primary> {
        self.primary.as_ref().map(|slot| slot.value)
    }

    pub fn require_primary(&self) -> Result<Primary, BuildError> {
        self.primary()
            .ok_or(BuildError::MissingPrerequisite { slot: "primary" })
    }

    /// Replaces the primary value, invalidating the conversion caches.
    pub fn set_primary(&mut self, primary: impl Into<Primary>) {
        let primary = primary.into();
        if let Primary::Latent(latent) = primary {
            self.last_primary_latent = Some(latent);
        }
        self.primary = Some(PrimarySlot {
            value: primary,
            as_latent: None,
            as_image: None,
        });
    }

    /// The last latent value the primary held, tracked across image-space
    /// rewrites for consumers that need the final latent (e.g. the
    /// layer-diffuse decode).
    pub fn last_primary_latent(&self) -> Option<LatentConnection> {
        self.last_primary_latent
    }

    pub(crate) fn primary_slot_mut(&mut self) -> Option<&mut PrimarySlot> {
        self.primary.as_mut()
    }

    /// The VAE used for encode/decode: the explicit selection if set, else
    /// the refiner's, else the base model's.
    pub fn default_vae(&self) -> Result<VaeConnection, BuildError> {
        self.primary_vae
            .or(self.refiner.vae)
            .or(self.base.vae)
            .ok_or(BuildError::MissingPrerequisite { slot: "vae" })
    }

    /// Prefer-refiner resolution used throughout sampler construction.
    pub fn refiner_or_base_model(&self) -> Result<ModelConnection, BuildError> {
        self.refiner
            .model
            .or(self.base.model)
            .ok_or(BuildError::MissingPrerequisite { slot: "model" })
    }

    pub fn refiner_or_base_conditioning(&self) -> Result<ConditioningPair, BuildError> {
        self.refiner
            .conditioning
            .or(self.base.conditioning)
            .ok_or(BuildError::MissingPrerequisite {
                slot: "conditioning",
            })
    }

    /// Registers a node whose outputs are externally significant. Order is
    /// preserved exactly; names are not deduplicated.
    pub fn push_output(&mut self, name: impl Into<String>) {
        self.output_nodes.push(name.into());
    }

    pub fn output_nodes(&self) -> &[String] {
        &self.output_nodes
    }
}
