//! End-to-end tests: full configurations through build and lowering.
mod common;
use common::*;
use kumiki::config::{
    FaceDetailerConfig, HiresFixConfig, LatentSource, LayerDiffuseConfig, MaskSource,
    PromptExpansionConfig, RefinerConfig, SamplingMode, SdVersion, TiledVaeConfig,
};
use kumiki::error::{BuildError, WorkflowError};
use kumiki::prelude::*;

#[test]
fn test_minimal_text_to_image_graph() {
    init_tracing();
    let built = build(base_config());
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    // Exactly one of each structural node, plus positive and negative
    // conditioning.
    assert_eq!(prompt.nodes_of_type("CheckpointLoaderSimple").len(), 1);
    assert_eq!(prompt.nodes_of_type("EmptyLatentImage").len(), 1);
    assert_eq!(prompt.nodes_of_type("CLIPTextEncode").len(), 2);
    assert_eq!(prompt.nodes_of_type("KSampler").len(), 1);
    assert_eq!(prompt.nodes_of_type("VAEDecode").len(), 1);
    assert_eq!(prompt.nodes_of_type("SaveImage").len(), 1);
    assert_eq!(prompt.nodes.len(), 7);

    // The sampler consumes model, both conditionings and the empty latent.
    let sampler = prompt.node("KSampler").expect("Missing sampler");
    assert_eq!(
        input_connection(sampler, "model"),
        Some(("CheckpointLoaderSimple", 0))
    );
    assert_eq!(
        input_connection(sampler, "positive"),
        Some(("CLIPTextEncode", 0))
    );
    assert_eq!(
        input_connection(sampler, "negative"),
        Some(("CLIPTextEncode_2", 0))
    );
    assert_eq!(
        input_connection(sampler, "latent_image"),
        Some(("EmptyLatentImage", 0))
    );
    assert_eq!(sampler.inputs.get("seed"), Some(&WireValue::Int(42)));
    assert_eq!(sampler.inputs.get("steps"), Some(&WireValue::Int(20)));
    assert_eq!(
        sampler.inputs.get("sampler_name"),
        Some(&WireValue::Text("euler".to_string()))
    );
    assert_eq!(
        sampler.inputs.get("scheduler"),
        Some(&WireValue::Text("normal".to_string()))
    );

    // The save node references the sampler's decoded image and is the only
    // output.
    let save = prompt.node("SaveImage").expect("Missing save node");
    assert_eq!(input_connection(save, "images"), Some(("VAEDecode", 0)));
    let decode = prompt.node("VAEDecode").expect("Missing decode");
    assert_eq!(input_connection(decode, "samples"), Some(("KSampler", 0)));
    assert_eq!(prompt.outputs, vec!["SaveImage".to_string()]);
}

#[test]
fn test_hires_fix_adds_one_upscale_and_one_sampler() {
    let mut config = base_config();
    config.addons.hires_fix = Some(HiresFixConfig {
        scale: 1.5,
        upscaler: Some(Upscaler::latent("nearest-exact")),
        steps: 12,
        denoise: 0.6,
        sampler: None,
        scheduler: None,
        cfg: None,
    });

    let baseline = build(base_config());
    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    // Exactly one additional upscale node and one additional sampler node.
    assert_eq!(prompt.nodes_of_type("LatentUpscale").len(), 1);
    assert_eq!(prompt.nodes_of_type("KSampler").len(), 2);
    assert_eq!(prompt.nodes.len(), baseline.prompt.nodes.len() + 2);

    // The original sampler is neither removed nor renamed.
    let original = prompt.node("KSampler").expect("Original sampler missing");
    assert_eq!(
        input_connection(original, "latent_image"),
        Some(("EmptyLatentImage", 0))
    );

    // The hires pass samples the upscaled latent at the scaled resolution.
    let hires = prompt
        .node("HiresFix_Sampler")
        .expect("Missing hires sampler");
    assert_eq!(
        input_connection(hires, "latent_image"),
        Some(("HiresFix_LatentUpscale", 0))
    );
    let upscale = prompt
        .node("HiresFix_LatentUpscale")
        .expect("Missing upscale node");
    assert_eq!(input_connection(upscale, "samples"), Some(("KSampler", 0)));
    assert_eq!(upscale.inputs.get("width"), Some(&WireValue::Int(768)));
    assert_eq!(upscale.inputs.get("height"), Some(&WireValue::Int(768)));

    // The decode now consumes the hires result.
    let decode = prompt.node("VAEDecode").expect("Missing decode");
    assert_eq!(
        input_connection(decode, "samples"),
        Some(("HiresFix_Sampler", 0))
    );
}

#[test]
fn test_image_to_image_with_mask() {
    let mut config = base_config();
    config.source = LatentSource::ImageToImage {
        image: "input/portrait.png".to_string(),
        mask: Some(MaskSource {
            image: "input/mask.png".to_string(),
            channel: "alpha".to_string(),
        }),
    };
    config.denoise = 0.75;

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    assert_eq!(prompt.nodes_of_type("LoadImage").len(), 1);
    assert_eq!(prompt.nodes_of_type("LoadImageMask").len(), 1);
    assert_eq!(prompt.nodes_of_type("VAEEncode").len(), 1);
    assert_eq!(prompt.nodes_of_type("SetLatentNoiseMask").len(), 1);
    assert_eq!(prompt.nodes_of_type("EmptyLatentImage").len(), 0);

    let sampler = prompt.node("KSampler").expect("Missing sampler");
    assert_eq!(
        input_connection(sampler, "latent_image"),
        Some(("SetLatentNoiseMask", 0))
    );
    assert_eq!(sampler.inputs.get("denoise"), Some(&WireValue::Float(0.75)));
}

#[test]
fn test_refiner_builds_two_stage_sampling() {
    let mut config = base_config();
    config.refiner = Some(RefinerConfig {
        checkpoint: ModelFile::new("sdxl/refiner_1.0.safetensors"),
        start_at_step: 15,
    });

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    assert_eq!(prompt.nodes_of_type("CheckpointLoaderSimple").len(), 2);
    // Base and refiner each get their own conditioning pair.
    assert_eq!(prompt.nodes_of_type("CLIPTextEncode").len(), 4);
    let samplers = prompt.nodes_of_type("KSamplerAdvanced");
    assert_eq!(samplers.len(), 2);
    assert_eq!(prompt.nodes_of_type("KSampler").len(), 0);

    let base = prompt
        .node("KSamplerAdvanced")
        .expect("Missing base sampler");
    assert_eq!(
        base.inputs.get("add_noise"),
        Some(&WireValue::Text("enable".to_string()))
    );
    assert_eq!(base.inputs.get("end_at_step"), Some(&WireValue::Int(15)));
    assert_eq!(
        base.inputs.get("return_with_leftover_noise"),
        Some(&WireValue::Text("enable".to_string()))
    );

    let refiner = prompt
        .node("KSamplerAdvanced_2")
        .expect("Missing refiner sampler");
    assert_eq!(
        input_connection(refiner, "latent_image"),
        Some(("KSamplerAdvanced", 0))
    );
    assert_eq!(
        refiner.inputs.get("add_noise"),
        Some(&WireValue::Text("disable".to_string()))
    );
    assert_eq!(refiner.inputs.get("start_at_step"), Some(&WireValue::Int(15)));
    assert_eq!(
        input_connection(refiner, "model"),
        Some(("CheckpointLoaderSimple_2", 0))
    );
}

#[test]
fn test_custom_sampling_mode() {
    let mut config = base_config();
    config.sampling_mode = SamplingMode::Custom;

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    assert_eq!(prompt.nodes_of_type("RandomNoise").len(), 1);
    assert_eq!(prompt.nodes_of_type("KSamplerSelect").len(), 1);
    assert_eq!(prompt.nodes_of_type("BasicScheduler").len(), 1);
    assert_eq!(prompt.nodes_of_type("CFGGuider").len(), 1);
    assert_eq!(prompt.nodes_of_type("SamplerCustomAdvanced").len(), 1);
    assert_eq!(prompt.nodes_of_type("KSampler").len(), 0);

    let decode = prompt.node("VAEDecode").expect("Missing decode");
    assert_eq!(
        input_connection(decode, "samples"),
        Some(("SamplerCustomAdvanced", 0))
    );
}

#[test]
fn test_face_detailer_consumes_decoded_primary() {
    let mut config = base_config();
    config.addons.face_detailer = Some(FaceDetailerConfig {
        bbox_model: ModelFile::new("detectors/face_yolov8m.pt"),
        segm_model: None,
        sam_model: None,
        denoise: 0.5,
        feather: 5,
        sampler: None,
        scheduler: None,
        steps: None,
        cfg: None,
        seed: None,
    });

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    assert_eq!(prompt.nodes_of_type("UltralyticsDetectorProvider").len(), 1);
    let detailers = prompt.nodes_of_type("FaceDetailer");
    assert_eq!(detailers.len(), 1);

    let detailer = prompt.node(detailers[0]).expect("Missing detailer");
    assert_eq!(input_connection(detailer, "image"), Some(("VAEDecode", 0)));
    // Sampler settings are inherited from the primary sampler.
    assert_eq!(
        detailer.inputs.get("sampler_name"),
        Some(&WireValue::Text("euler".to_string()))
    );
    assert_eq!(detailer.inputs.get("steps"), Some(&WireValue::Int(20)));

    // The detailed image, not the plain decode, feeds the save node.
    let save = prompt.node("SaveImage").expect("Missing save node");
    assert_eq!(input_connection(save, "images"), Some(("FaceDetailer", 0)));
}

#[test]
fn test_layer_diffuse_and_tiled_vae_defer_in_registration_order() {
    let mut config = base_config();
    config.addons.layer_diffuse = Some(LayerDiffuseConfig {
        sd_version: SdVersion::Sd15,
        weight: 1.0,
    });
    config.addons.tiled_vae = Some(TiledVaeConfig {
        tile_size: 512,
        overlap: 64,
    });

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    // The layer-diffuse patch rewires the sampler's model input.
    let sampler = prompt.node("KSampler").expect("Missing sampler");
    assert_eq!(
        input_connection(sampler, "model"),
        Some(("LayeredDiffusionApply", 0))
    );

    // The layer-diffuse decode registered first, so it consumes the final
    // latent; the tiled decode then finds an image primary and does
    // nothing.
    assert_eq!(prompt.nodes_of_type("LayeredDiffusionDecodeRGBA").len(), 1);
    assert_eq!(prompt.nodes_of_type("VAEDecodeTiled").len(), 0);

    let save = prompt.node("SaveImage").expect("Missing save node");
    assert_eq!(
        input_connection(save, "images"),
        Some(("LayeredDiffusionDecodeRGBA", 0))
    );
}

#[test]
fn test_tiled_vae_replaces_final_decode() {
    let mut config = base_config();
    config.addons.tiled_vae = Some(TiledVaeConfig {
        tile_size: 256,
        overlap: 32,
    });

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    assert_eq!(prompt.nodes_of_type("VAEDecodeTiled").len(), 1);
    assert_eq!(prompt.nodes_of_type("VAEDecode").len(), 0);

    let save = prompt.node("SaveImage").expect("Missing save node");
    assert_eq!(
        input_connection(save, "images"),
        Some(("VAEDecodeTiled", 0))
    );
}

#[test]
fn test_prompt_expansion_feeds_conditioning() {
    let mut config = base_config();
    config.addons.prompt_expansion = Some(PromptExpansionConfig {
        model: ModelFile::new("prompt_expansion/fooocus_gpt2"),
        log_prompt: false,
    });

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    let expansions = prompt.nodes_of_type("Inference_Core_PromptExpansion");
    assert_eq!(expansions.len(), 1);

    // Positive conditioning consumes the expanded string; negative keeps
    // the literal text.
    let positive = prompt.node("CLIPTextEncode").expect("Missing positive");
    assert_eq!(
        input_connection(positive, "text"),
        Some(("Inference_Core_PromptExpansion", 0))
    );
    let negative = prompt.node("CLIPTextEncode_2").expect("Missing negative");
    assert_eq!(
        negative.inputs.get("text"),
        Some(&WireValue::Text("blurry, low quality".to_string()))
    );
}

#[test]
fn test_batch_index_selects_latent_before_decode() {
    let mut config = base_config();
    config.batch_size = 4;
    config.batch_index = Some(2);

    let built = build(config);
    let prompt = &built.prompt;
    assert_closed_graph(prompt);

    let latent = prompt.node("EmptyLatentImage").expect("Missing latent");
    assert_eq!(latent.inputs.get("batch_size"), Some(&WireValue::Int(4)));

    let from_batch = prompt
        .node("LatentFromBatch")
        .expect("Missing batch selection");
    assert_eq!(
        input_connection(from_batch, "samples"),
        Some(("KSampler", 0))
    );
    assert_eq!(
        from_batch.inputs.get("batch_index"),
        Some(&WireValue::Int(2))
    );
    let decode = prompt.node("VAEDecode").expect("Missing decode");
    assert_eq!(
        input_connection(decode, "samples"),
        Some(("LatentFromBatch", 0))
    );
}

#[test]
fn test_missing_checkpoint_is_a_validation_error() {
    let mut config = base_config();
    config.checkpoint = None;

    let result = WorkflowBuilder::new(config).build();
    match result {
        Err(WorkflowError::Build(BuildError::Validation { field })) => {
            assert_eq!(field, "checkpoint");
        }
        other => panic!("Expected Validation error, got {:?}", other.err()),
    }
}

#[test]
fn test_missing_sampler_is_a_validation_error() {
    let mut config = base_config();
    config.sampler = None;

    let result = WorkflowBuilder::new(config).build();
    match result {
        Err(WorkflowError::Build(BuildError::Validation { field })) => {
            assert_eq!(field, "sampler");
        }
        other => panic!("Expected Validation error, got {:?}", other.err()),
    }
}

#[test]
fn test_wire_prompt_serializes_connections_as_arrays() {
    let built = build(base_config());
    let json = serde_json::to_value(&built.prompt).expect("Failed to serialize");

    let decode = &json["nodes"]["VAEDecode"];
    assert_eq!(decode["class_type"], "VAEDecode");
    assert_eq!(decode["inputs"]["samples"][0], "KSampler");
    assert_eq!(decode["inputs"]["samples"][1], 0);
}
