//! Tests for the node registry: name uniqueness, reservation, handle
//! ownership, and lowering invariants.
mod common;
use common::*;
use kumiki::error::{BuildError, LoweringError};
use kumiki::graph::{NodeRegistry, lower};
use kumiki::nodes::{CheckpointLoaderSimple, EmptyLatentImage, FreeU, VaeLoader};

fn empty_latent() -> EmptyLatentImage {
    EmptyLatentImage {
        width: 512,
        height: 512,
        batch_size: 1,
    }
}

#[test]
fn test_node_names_are_pairwise_distinct() {
    let mut registry = NodeRegistry::new();
    for _ in 0..100 {
        registry
            .add(empty_latent())
            .expect("Adding a literal-only node should always succeed");
    }

    // The wire dictionary is keyed by name, so 100 entries means 100
    // distinct names.
    let prompt = lower(&registry, &[]).expect("Failed to lower");
    assert_eq!(prompt.nodes.len(), 100);
    assert!(prompt.nodes.contains_key("EmptyLatentImage"));
    assert!(prompt.nodes.contains_key("EmptyLatentImage_2"));
    assert!(prompt.nodes.contains_key("EmptyLatentImage_100"));
}

#[test]
fn test_unique_name_reserves_deterministically() {
    let mut registry = NodeRegistry::new();
    assert_eq!(registry.unique_name("SaveImage"), "SaveImage");
    assert_eq!(registry.unique_name("SaveImage"), "SaveImage_2");

    // A reserved name stays taken for later nodes with the same base.
    let _ = registry
        .add_named("SaveImage_2", empty_latent())
        .expect("Reserved name should materialize");
    assert_eq!(registry.unique_name("SaveImage"), "SaveImage_3");
}

#[test]
fn test_add_named_renames_on_collision() {
    let mut registry = NodeRegistry::new();
    registry
        .add_named("Latent", empty_latent())
        .expect("Failed to add");
    // Same explicit name again: renamed, never an error.
    registry
        .add_named("Latent", empty_latent())
        .expect("Collision must rename, not fail");

    let prompt = lower(&registry, &[]).expect("Failed to lower");
    assert!(prompt.nodes.contains_key("Latent"));
    assert!(prompt.nodes.contains_key("Latent_2"));
}

#[test]
fn test_foreign_handle_is_rejected() {
    let mut registry_a = NodeRegistry::new();
    let (model, _clip, _vae) = registry_a
        .add(CheckpointLoaderSimple {
            ckpt_name: "a.safetensors".to_string(),
        })
        .expect("Failed to add checkpoint");

    // A handle minted by one build must not be usable in another.
    let mut registry_b = NodeRegistry::new();
    let result = registry_b.add(FreeU {
        model,
        b1: 1.1,
        b2: 1.2,
        s1: 0.9,
        s2: 0.2,
    });

    match result {
        Err(BuildError::InvalidBuildState { .. }) => {}
        other => panic!("Expected InvalidBuildState, got {:?}", other.err()),
    }
}

#[test]
fn test_lowering_preserves_output_order() {
    let mut registry = NodeRegistry::new();
    registry
        .add_named("First", empty_latent())
        .expect("Failed to add");
    registry
        .add_named("Second", empty_latent())
        .expect("Failed to add");

    let outputs = vec!["Second".to_string(), "First".to_string()];
    let prompt = lower(&registry, &outputs).expect("Failed to lower");
    assert_eq!(prompt.outputs, outputs);
}

#[test]
fn test_lowering_rejects_unknown_output_node() {
    let registry = NodeRegistry::new();
    let outputs = vec!["Ghost".to_string()];
    match lower(&registry, &outputs) {
        Err(LoweringError::UnknownOutputNode(name)) => assert_eq!(name, "Ghost"),
        other => panic!("Expected UnknownOutputNode, got {:?}", other),
    }
}

#[test]
fn test_lowered_connections_reference_producers_by_name() {
    let mut registry = NodeRegistry::new();
    let vae = registry
        .add(VaeLoader {
            vae_name: "vae.safetensors".to_string(),
        })
        .expect("Failed to add VAE loader");
    let latent = registry.add(empty_latent()).expect("Failed to add latent");
    registry
        .add(kumiki::nodes::VaeDecode {
            samples: latent,
            vae,
        })
        .expect("Failed to add decode");

    let prompt = lower(&registry, &[]).expect("Failed to lower");
    assert_closed_graph(&prompt);

    let decode = prompt.node("VAEDecode").expect("Missing decode node");
    assert_eq!(
        input_connection(decode, "samples"),
        Some(("EmptyLatentImage", 0))
    );
    assert_eq!(input_connection(decode, "vae"), Some(("VAELoader", 0)));
}
