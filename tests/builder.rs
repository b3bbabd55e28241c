//! Tests for the build context: representation conversion caching, Temp
//! snapshot isolation, deferred actions, and the sampler state machine.
mod common;
use common::*;
use kumiki::build::{BuildContext, PreOutputAction};
use kumiki::config::FreeUConfig;
use kumiki::error::BuildError;
use kumiki::graph::{Primary, lower};
use kumiki::nodes::{CheckpointLoaderSimple, EmptyLatentImage, LoadImage};
use kumiki::prelude::*;

/// A context with a loaded base model and an image primary.
fn context_with_image_primary() -> BuildContext {
    let mut ctx = BuildContext::new();
    let (model, clip, vae) = ctx
        .registry
        .add(CheckpointLoaderSimple {
            ckpt_name: "sd15/photon_v1.safetensors".to_string(),
        })
        .expect("Failed to add checkpoint");
    ctx.connections.base.model = Some(model);
    ctx.connections.base.clip = Some(clip);
    ctx.connections.base.vae = Some(vae);

    let (image, _mask) = ctx
        .registry
        .add(LoadImage {
            image: "input.png".to_string(),
        })
        .expect("Failed to add image");
    ctx.connections.set_primary(image);
    ctx
}

#[test]
fn test_primary_as_latent_is_idempotent() {
    let mut ctx = context_with_image_primary();

    let first = ctx.primary_as_latent().expect("First conversion failed");
    let second = ctx.primary_as_latent().expect("Second conversion failed");
    assert_eq!(first, second);

    // Exactly one conversion node; a duplicate would silently produce a
    // divergent, more expensive graph with identical visible output.
    let prompt = lower(&ctx.registry, &[]).expect("Failed to lower");
    assert_eq!(prompt.nodes_of_type("VAEEncode").len(), 1);
}

#[test]
fn test_primary_write_invalidates_conversion_cache() {
    let mut ctx = context_with_image_primary();

    let first = ctx.primary_as_latent().expect("First conversion failed");

    // Writing a new primary makes the cached conversion stale.
    let (image, _mask) = ctx
        .registry
        .add(LoadImage {
            image: "other.png".to_string(),
        })
        .expect("Failed to add image");
    ctx.connections.set_primary(image);

    let second = ctx.primary_as_latent().expect("Second conversion failed");
    assert_ne!(first, second);

    let prompt = lower(&ctx.registry, &[]).expect("Failed to lower");
    assert_eq!(prompt.nodes_of_type("VAEEncode").len(), 2);
}

#[test]
fn test_default_vae_fails_without_any_vae() {
    let ctx = BuildContext::new();
    match ctx.connections.default_vae() {
        Err(BuildError::MissingPrerequisite { slot }) => assert_eq!(slot, "vae"),
        other => panic!("Expected MissingPrerequisite, got {:?}", other),
    }
}

#[test]
fn test_temp_mutation_does_not_leak_into_connections() {
    let mut ctx = context_with_image_primary();
    let committed_model = ctx.connections.base.model;

    ctx.temp = Some(ctx.connections.clone());
    SamplerAddon::FreeU(FreeUConfig::default())
        .apply(&mut ctx)
        .expect("Addon failed");

    let temp_model = ctx.temp.as_ref().and_then(|temp| temp.base.model);
    assert_ne!(temp_model, committed_model);
    assert_eq!(ctx.connections.base.model, committed_model);
}

#[test]
fn test_addon_outside_sampler_construction_is_rejected() {
    let mut ctx = context_with_image_primary();
    let result = SamplerAddon::FreeU(FreeUConfig::default()).apply(&mut ctx);
    assert!(matches!(
        result,
        Err(BuildError::InvalidBuildState { .. })
    ));
}

#[test]
fn test_pre_output_actions_run_in_order_exactly_once() {
    init_tracing();
    let mut ctx = BuildContext::new();
    let (_model, _clip, vae) = ctx
        .registry
        .add(CheckpointLoaderSimple {
            ckpt_name: "sd15/photon_v1.safetensors".to_string(),
        })
        .expect("Failed to add checkpoint");
    ctx.connections.base.vae = Some(vae);
    let latent = ctx
        .registry
        .add(EmptyLatentImage {
            width: 512,
            height: 512,
            batch_size: 1,
        })
        .expect("Failed to add latent");
    ctx.connections.set_primary(latent);

    // The first action decodes the latent primary to an image; the second
    // then finds nothing left in latent space and must do nothing. Only
    // the registration order produces this outcome.
    ctx.push_pre_output(PreOutputAction::TiledVaeDecode {
        tile_size: 512,
        overlap: 64,
    });
    ctx.push_pre_output(PreOutputAction::TiledVaeDecode {
        tile_size: 256,
        overlap: 32,
    });
    ctx.run_pre_output_actions().expect("Actions failed");

    assert!(matches!(ctx.connections.primary(), Some(Primary::Image(_))));

    let prompt = lower(&ctx.registry, &[]).expect("Failed to lower");
    let tiled = prompt.nodes_of_type("VAEDecodeTiled");
    assert_eq!(tiled.len(), 1, "Each registered action runs exactly once");
    let node = prompt.node(tiled[0]).expect("Missing tiled decode");
    assert_eq!(
        node.inputs.get("tile_size"),
        Some(&WireValue::Int(512)),
        "Actions must run in registration order"
    );
}

#[test]
fn test_sampler_state_machine_rejects_double_construction() {
    let config = base_config();
    let steps = WorkflowStep::plan(&config).expect("Failed to plan");
    let mut ctx = BuildContext::new();
    for step in &steps {
        step.apply(&mut ctx).expect("Step failed");
    }
    assert_eq!(ctx.sampler_state(), SamplerState::SamplerNodeCreated);

    let sampler = steps
        .iter()
        .find(|step| matches!(step, WorkflowStep::Sampler(_)))
        .expect("No sampler step planned");
    match sampler.apply(&mut ctx) {
        Err(BuildError::InvalidBuildState { message }) => {
            assert!(message.contains("already"));
        }
        other => panic!("Expected InvalidBuildState, got {:?}", other),
    }
}

#[test]
fn test_temp_snapshot_is_discarded_after_sampler() {
    let config = base_config();
    let steps = WorkflowStep::plan(&config).expect("Failed to plan");
    let mut ctx = BuildContext::new();
    for step in &steps {
        step.apply(&mut ctx).expect("Step failed");
    }
    assert!(ctx.temp.is_none());
}
