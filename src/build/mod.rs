//! The per-build mutable state and the top-level orchestrator.

pub mod connections;
pub mod deferred;

pub use connections::{ConnectionsContext, ModelSlots};
pub use deferred::PreOutputAction;

use tracing::debug;

use crate::config::WorkflowConfig;
use crate::error::{BuildError, WorkflowError};
use crate::graph::{
    ImageConnection, LatentConnection, NodeRegistry, Primary, WirePrompt, lower,
};
use crate::nodes::{LatentFromBatch, SaveImage, VaeDecode, VaeEncode};
use crate::params::GenerationParameters;
use crate::steps::WorkflowStep;

/// Progress of the primary sampler construction within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerState {
    #[default]
    NoSamplerNode,
    TempSnapshotTaken,
    AddonsApplied,
    SamplerNodeCreated,
    RefinerSamplerNodeCreated,
}

/// Everything a step may touch: the registry, the committed connections, an
/// optional Temp snapshot, and the deferred-action queue.
#[derive(Debug)]
pub struct BuildContext {
    pub registry: NodeRegistry,
    pub connections: ConnectionsContext,
    /// Working copy of the connections, present only during sampler
    /// construction. Changes here are visible to the sampler being built
    /// and discarded afterwards unless explicitly written back.
    pub temp: Option<ConnectionsContext>,
    pub(crate) sampler_state: SamplerState,
    deferred: Vec<PreOutputAction>,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            registry: NodeRegistry::new(),
            connections: ConnectionsContext::new(),
            temp: None,
            sampler_state: SamplerState::default(),
            deferred: Vec::new(),
        }
    }

    pub fn sampler_state(&self) -> SamplerState {
        self.sampler_state
    }

    /// The connections view the current step should read: the Temp snapshot
    /// while one is active, the committed connections otherwise.
    pub fn working(&self) -> &ConnectionsContext {
        self.temp.as_ref().unwrap_or(&self.connections)
    }

    pub fn working_mut(&mut self) -> &mut ConnectionsContext {
        self.temp.as_mut().unwrap_or(&mut self.connections)
    }

    /// Appends a deferred action, run once after every step in
    /// registration order.
    pub fn push_pre_output(&mut self, action: PreOutputAction) {
        self.deferred.push(action);
    }

    /// Runs every queued pre-output action once, in registration order.
    ///
    /// The orchestrator calls this after all steps and before output setup;
    /// actions may assume normal graph construction is complete.
    pub fn run_pre_output_actions(&mut self) -> Result<(), BuildError> {
        for action in std::mem::take(&mut self.deferred) {
            action.run(self)?;
        }
        Ok(())
    }

    /// The committed primary as a latent, inserting a VAE encode the first
    /// time the conversion is needed and reusing it afterwards.
    pub fn primary_as_latent(&mut self) -> Result<LatentConnection, BuildError> {
        match self.connections.require_primary()? {
            Primary::Latent(latent) => Ok(latent),
            Primary::Image(pixels) => {
                let cached = self
                    .connections
                    .primary_slot_mut()
                    .and_then(|slot| slot.as_latent);
                if let Some(latent) = cached {
                    return Ok(latent);
                }
                let vae = self.connections.default_vae()?;
                let latent = self.registry.add(VaeEncode { pixels, vae })?;
                if let Some(slot) = self.connections.primary_slot_mut() {
                    slot.as_latent = Some(latent);
                }
                Ok(latent)
            }
        }
    }

    /// The committed primary as an image, inserting a VAE decode the first
    /// time the conversion is needed and reusing it afterwards.
    pub fn primary_as_image(&mut self) -> Result<ImageConnection, BuildError> {
        match self.connections.require_primary()? {
            Primary::Image(image) => Ok(image),
            Primary::Latent(samples) => {
                let cached = self
                    .connections
                    .primary_slot_mut()
                    .and_then(|slot| slot.as_image);
                if let Some(image) = cached {
                    return Ok(image);
                }
                let vae = self.connections.default_vae()?;
                let image = self.registry.add(VaeDecode { samples, vae })?;
                if let Some(slot) = self.connections.primary_slot_mut() {
                    slot.as_image = Some(image);
                }
                Ok(image)
            }
        }
    }
}

/// The finished build artifact handed to the transport collaborator.
#[derive(Debug, Clone)]
pub struct BuiltWorkflow {
    pub prompt: WirePrompt,
    /// The human-meaningful parameters the graph was built from, for
    /// embedding in output metadata.
    pub parameters: GenerationParameters,
}

/// Converts a [`WorkflowConfig`] into a lowered wire prompt by applying the
/// fixed step sequence.
///
/// Each build allocates its own registry and connections, so independent
/// builds may run concurrently; the configuration is only read.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    config: WorkflowConfig,
}

impl WorkflowBuilder {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn build(&self) -> Result<BuiltWorkflow, WorkflowError> {
        let steps = WorkflowStep::plan(&self.config)?;
        let mut ctx = BuildContext::new();

        for step in &steps {
            debug!(step = step.name(), "applying step");
            step.apply(&mut ctx)?;
        }

        ctx.run_pre_output_actions()?;
        Self::finalize_output(&mut ctx, &self.config)?;

        let prompt = lower(&ctx.registry, ctx.connections.output_nodes())?;
        Ok(BuiltWorkflow {
            prompt,
            parameters: GenerationParameters::from_config(&self.config),
        })
    }

    /// Decodes the final primary and attaches the save node whose outputs
    /// the transport layer fetches back.
    fn finalize_output(ctx: &mut BuildContext, config: &WorkflowConfig) -> Result<(), BuildError> {
        if let Some(batch_index) = ctx.connections.batch_index {
            if let Some(Primary::Latent(samples)) = ctx.connections.primary() {
                let selected = ctx.registry.add(LatentFromBatch {
                    samples,
                    batch_index,
                    length: 1,
                })?;
                ctx.connections.set_primary(selected);
            }
        }

        let images = ctx.primary_as_image()?;
        let name = ctx.registry.unique_name("SaveImage");
        ctx.registry.add_named(
            name.clone(),
            SaveImage {
                images,
                filename_prefix: config.filename_prefix.clone(),
            },
        )?;
        ctx.connections.push_output(name);
        Ok(())
    }
}
