//! Common test utilities for building workflow configurations and
//! inspecting lowered prompts.
use kumiki::graph::{WireNode, WirePrompt, WireValue};
use kumiki::prelude::*;

/// Installs a test subscriber so `tracing` output shows up with
/// `--nocapture`. Safe to call from multiple tests.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A minimal, valid text-to-image configuration.
///
/// {model=M, vae from checkpoint, steps=20, cfg=7, sampler=Euler,
/// scheduler=Normal, 512x512, seed=42}
#[allow(dead_code)]
pub fn base_config() -> WorkflowConfig {
    WorkflowConfig {
        checkpoint: Some(ModelFile::with_hash(
            "sd15/photon_v1.safetensors",
            "ec41bd2a82",
        )),
        positive_prompt: "a mountain lake at dawn".to_string(),
        negative_prompt: "blurry, low quality".to_string(),
        seed: 42,
        steps: 20,
        cfg_scale: 7.0,
        sampler: Some(SamplerKind::Euler),
        scheduler: Some(SchedulerKind::Normal),
        size: Size::new(512, 512),
        ..WorkflowConfig::default()
    }
}

/// Builds the given configuration, panicking on failure.
#[allow(dead_code)]
pub fn build(config: WorkflowConfig) -> BuiltWorkflow {
    WorkflowBuilder::new(config)
        .build()
        .expect("Failed to build workflow")
}

/// Asserts that every connection reference in the prompt resolves to a key
/// present in the same dictionary, and that every output name does too.
#[allow(dead_code)]
pub fn assert_closed_graph(prompt: &WirePrompt) {
    for (name, node) in &prompt.nodes {
        for (key, value) in &node.inputs {
            if let WireValue::Connection(target, _) = value {
                assert!(
                    prompt.nodes.contains_key(target),
                    "Node '{}' input '{}' references missing node '{}'",
                    name,
                    key,
                    target
                );
            }
        }
    }
    for output in &prompt.outputs {
        assert!(
            prompt.nodes.contains_key(output),
            "Output '{}' is not a node of the prompt",
            output
        );
    }
}

/// The `(producer, slot)` a node input is connected to, if it is a
/// connection reference.
#[allow(dead_code)]
pub fn input_connection<'a>(node: &'a WireNode, key: &str) -> Option<(&'a str, u32)> {
    match node.inputs.get(key) {
        Some(WireValue::Connection(name, slot)) => Some((name.as_str(), *slot)),
        _ => None,
    }
}
