//! The typed node vocabulary.
//!
//! One constructor struct per backend node class. Each declares its wire
//! inputs (snake_case keys, as the backend expects) and the connection
//! types of its output slots; the registry mints the output handles when
//! the node is added.

pub mod groups;

use crate::graph::{
    BboxDetectorConnection, ClipConnection, ConditioningConnection, ControlNetConnection,
    GuiderConnection, ImageConnection, LatentConnection, MaskConnection, ModelConnection,
    NodeSpec, NoiseConnection, PromptText, SamModelConnection, SamplerConnection,
    SegmDetectorConnection, SigmasConnection, StringConnection, TypedNode,
    UpscaleModelConnection, VaeConnection,
};

pub struct CheckpointLoaderSimple {
    pub ckpt_name: String,
}

impl TypedNode for CheckpointLoaderSimple {
    type Outputs = (ModelConnection, ClipConnection, VaeConnection);

    fn spec(self) -> NodeSpec {
        NodeSpec::new("CheckpointLoaderSimple").input("ckpt_name", self.ckpt_name)
    }
}

pub struct VaeLoader {
    pub vae_name: String,
}

impl TypedNode for VaeLoader {
    type Outputs = VaeConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("VAELoader").input("vae_name", self.vae_name)
    }
}

pub struct LoraLoader {
    pub model: ModelConnection,
    pub clip: ClipConnection,
    pub lora_name: String,
    pub strength_model: f64,
    pub strength_clip: f64,
}

impl TypedNode for LoraLoader {
    type Outputs = (ModelConnection, ClipConnection);

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LoraLoader")
            .input("model", self.model)
            .input("clip", self.clip)
            .input("lora_name", self.lora_name)
            .input("strength_model", self.strength_model)
            .input("strength_clip", self.strength_clip)
    }
}

pub struct ClipSetLastLayer {
    pub clip: ClipConnection,
    /// Negative layer index; -1 keeps all layers.
    pub stop_at_clip_layer: i32,
}

impl TypedNode for ClipSetLastLayer {
    type Outputs = ClipConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("CLIPSetLastLayer")
            .input("clip", self.clip)
            .input("stop_at_clip_layer", self.stop_at_clip_layer)
    }
}

pub struct ClipTextEncode {
    pub clip: ClipConnection,
    pub text: PromptText,
}

impl TypedNode for ClipTextEncode {
    type Outputs = ConditioningConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("CLIPTextEncode")
            .input("clip", self.clip)
            .input("text", self.text)
    }
}

pub struct EmptyLatentImage {
    pub width: u32,
    pub height: u32,
    pub batch_size: u32,
}

impl TypedNode for EmptyLatentImage {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("EmptyLatentImage")
            .input("width", self.width)
            .input("height", self.height)
            .input("batch_size", self.batch_size)
    }
}

pub struct LoadImage {
    /// Path relative to the backend's input directory.
    pub image: String,
}

impl TypedNode for LoadImage {
    type Outputs = (ImageConnection, MaskConnection);

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LoadImage").input("image", self.image)
    }
}

pub struct LoadImageMask {
    pub image: String,
    /// Color channel to use as mask ("alpha", "red", "green", "blue").
    pub channel: String,
}

impl TypedNode for LoadImageMask {
    type Outputs = MaskConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LoadImageMask")
            .input("image", self.image)
            .input("channel", self.channel)
    }
}

pub struct VaeEncode {
    pub pixels: ImageConnection,
    pub vae: VaeConnection,
}

impl TypedNode for VaeEncode {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("VAEEncode")
            .input("pixels", self.pixels)
            .input("vae", self.vae)
    }
}

pub struct VaeDecode {
    pub samples: LatentConnection,
    pub vae: VaeConnection,
}

impl TypedNode for VaeDecode {
    type Outputs = ImageConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("VAEDecode")
            .input("samples", self.samples)
            .input("vae", self.vae)
    }
}

pub struct TiledVaeDecode {
    pub samples: LatentConnection,
    pub vae: VaeConnection,
    pub tile_size: u32,
    pub overlap: u32,
}

impl TypedNode for TiledVaeDecode {
    type Outputs = ImageConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("VAEDecodeTiled")
            .input("samples", self.samples)
            .input("vae", self.vae)
            .input("tile_size", self.tile_size)
            .input("overlap", self.overlap)
    }
}

pub struct SetLatentNoiseMask {
    pub samples: LatentConnection,
    pub mask: MaskConnection,
}

impl TypedNode for SetLatentNoiseMask {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("SetLatentNoiseMask")
            .input("samples", self.samples)
            .input("mask", self.mask)
    }
}

pub struct KSampler {
    pub model: ModelConnection,
    pub seed: u64,
    pub steps: u32,
    pub cfg: f64,
    pub sampler_name: &'static str,
    pub scheduler: &'static str,
    pub positive: ConditioningConnection,
    pub negative: ConditioningConnection,
    pub latent_image: LatentConnection,
    pub denoise: f64,
}

impl TypedNode for KSampler {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("KSampler")
            .input("model", self.model)
            .input("seed", self.seed)
            .input("steps", self.steps)
            .input("cfg", self.cfg)
            .input("sampler_name", self.sampler_name)
            .input("scheduler", self.scheduler)
            .input("positive", self.positive)
            .input("negative", self.negative)
            .input("latent_image", self.latent_image)
            .input("denoise", self.denoise)
    }
}

pub struct KSamplerAdvanced {
    pub model: ModelConnection,
    pub add_noise: bool,
    pub noise_seed: u64,
    pub steps: u32,
    pub cfg: f64,
    pub sampler_name: &'static str,
    pub scheduler: &'static str,
    pub positive: ConditioningConnection,
    pub negative: ConditioningConnection,
    pub latent_image: LatentConnection,
    pub start_at_step: u32,
    pub end_at_step: u32,
    pub return_with_leftover_noise: bool,
}

impl TypedNode for KSamplerAdvanced {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("KSamplerAdvanced")
            .input("model", self.model)
            .toggle_input("add_noise", self.add_noise)
            .input("noise_seed", self.noise_seed)
            .input("steps", self.steps)
            .input("cfg", self.cfg)
            .input("sampler_name", self.sampler_name)
            .input("scheduler", self.scheduler)
            .input("positive", self.positive)
            .input("negative", self.negative)
            .input("latent_image", self.latent_image)
            .input("start_at_step", self.start_at_step)
            .input("end_at_step", self.end_at_step)
            .toggle_input("return_with_leftover_noise", self.return_with_leftover_noise)
    }
}

pub struct RandomNoise {
    pub noise_seed: u64,
}

impl TypedNode for RandomNoise {
    type Outputs = NoiseConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("RandomNoise").input("noise_seed", self.noise_seed)
    }
}

pub struct KSamplerSelect {
    pub sampler_name: &'static str,
}

impl TypedNode for KSamplerSelect {
    type Outputs = SamplerConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("KSamplerSelect").input("sampler_name", self.sampler_name)
    }
}

pub struct BasicScheduler {
    pub model: ModelConnection,
    pub scheduler: &'static str,
    pub steps: u32,
    pub denoise: f64,
}

impl TypedNode for BasicScheduler {
    type Outputs = SigmasConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("BasicScheduler")
            .input("model", self.model)
            .input("scheduler", self.scheduler)
            .input("steps", self.steps)
            .input("denoise", self.denoise)
    }
}

pub struct CfgGuider {
    pub model: ModelConnection,
    pub positive: ConditioningConnection,
    pub negative: ConditioningConnection,
    pub cfg: f64,
}

impl TypedNode for CfgGuider {
    type Outputs = GuiderConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("CFGGuider")
            .input("model", self.model)
            .input("positive", self.positive)
            .input("negative", self.negative)
            .input("cfg", self.cfg)
    }
}

/// Outputs: (output, denoised_output).
pub struct SamplerCustomAdvanced {
    pub noise: NoiseConnection,
    pub guider: GuiderConnection,
    pub sampler: SamplerConnection,
    pub sigmas: SigmasConnection,
    pub latent_image: LatentConnection,
}

impl TypedNode for SamplerCustomAdvanced {
    type Outputs = (LatentConnection, LatentConnection);

    fn spec(self) -> NodeSpec {
        NodeSpec::new("SamplerCustomAdvanced")
            .input("noise", self.noise)
            .input("guider", self.guider)
            .input("sampler", self.sampler)
            .input("sigmas", self.sigmas)
            .input("latent_image", self.latent_image)
    }
}

pub struct LatentFromBatch {
    pub samples: LatentConnection,
    pub batch_index: u32,
    pub length: u32,
}

impl TypedNode for LatentFromBatch {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LatentFromBatch")
            .input("samples", self.samples)
            .input("batch_index", self.batch_index)
            .input("length", self.length)
    }
}

pub struct LatentUpscale {
    pub samples: LatentConnection,
    pub upscale_method: String,
    pub width: u32,
    pub height: u32,
}

impl TypedNode for LatentUpscale {
    type Outputs = LatentConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LatentUpscale")
            .input("samples", self.samples)
            .input("upscale_method", self.upscale_method)
            .input("width", self.width)
            .input("height", self.height)
            .input("crop", "disabled")
    }
}

pub struct ImageScale {
    pub image: ImageConnection,
    pub upscale_method: String,
    pub width: u32,
    pub height: u32,
    pub crop: bool,
}

impl TypedNode for ImageScale {
    type Outputs = ImageConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("ImageScale")
            .input("image", self.image)
            .input("upscale_method", self.upscale_method)
            .input("width", self.width)
            .input("height", self.height)
            .input("crop", if self.crop { "center" } else { "disabled" })
    }
}

pub struct UpscaleModelLoader {
    pub model_name: String,
}

impl TypedNode for UpscaleModelLoader {
    type Outputs = UpscaleModelConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("UpscaleModelLoader").input("model_name", self.model_name)
    }
}

pub struct ImageUpscaleWithModel {
    pub upscale_model: UpscaleModelConnection,
    pub image: ImageConnection,
}

impl TypedNode for ImageUpscaleWithModel {
    type Outputs = ImageConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("ImageUpscaleWithModel")
            .input("upscale_model", self.upscale_model)
            .input("image", self.image)
    }
}

pub struct FreeU {
    pub model: ModelConnection,
    pub b1: f64,
    pub b2: f64,
    pub s1: f64,
    pub s2: f64,
}

impl TypedNode for FreeU {
    type Outputs = ModelConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("FreeU")
            .input("model", self.model)
            .input("b1", self.b1)
            .input("b2", self.b2)
            .input("s1", self.s1)
            .input("s2", self.s2)
    }
}

pub struct RescaleCfg {
    pub model: ModelConnection,
    pub multiplier: f64,
}

impl TypedNode for RescaleCfg {
    type Outputs = ModelConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("RescaleCFG")
            .input("model", self.model)
            .input("multiplier", self.multiplier)
    }
}

pub struct ControlNetLoader {
    pub control_net_name: String,
}

impl TypedNode for ControlNetLoader {
    type Outputs = ControlNetConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("ControlNetLoader").input("control_net_name", self.control_net_name)
    }
}

pub struct ControlNetApplyAdvanced {
    pub positive: ConditioningConnection,
    pub negative: ConditioningConnection,
    pub control_net: ControlNetConnection,
    pub image: ImageConnection,
    pub strength: f64,
    pub start_percent: f64,
    pub end_percent: f64,
}

impl TypedNode for ControlNetApplyAdvanced {
    type Outputs = (ConditioningConnection, ConditioningConnection);

    fn spec(self) -> NodeSpec {
        NodeSpec::new("ControlNetApplyAdvanced")
            .input("positive", self.positive)
            .input("negative", self.negative)
            .input("control_net", self.control_net)
            .input("image", self.image)
            .input("strength", self.strength)
            .input("start_percent", self.start_percent)
            .input("end_percent", self.end_percent)
    }
}

pub struct LayeredDiffusionApply {
    pub model: ModelConnection,
    pub config: String,
    pub weight: f64,
}

impl TypedNode for LayeredDiffusionApply {
    type Outputs = ModelConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LayeredDiffusionApply")
            .input("model", self.model)
            .input("config", self.config)
            .input("weight", self.weight)
    }
}

pub struct LayeredDiffusionDecodeRgba {
    pub samples: LatentConnection,
    pub images: ImageConnection,
    pub sd_version: &'static str,
    pub sub_batch_size: u32,
}

impl TypedNode for LayeredDiffusionDecodeRgba {
    type Outputs = ImageConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("LayeredDiffusionDecodeRGBA")
            .input("samples", self.samples)
            .input("images", self.images)
            .input("sd_version", self.sd_version)
            .input("sub_batch_size", self.sub_batch_size)
    }
}

pub struct UltralyticsDetectorProvider {
    pub model_name: String,
}

impl TypedNode for UltralyticsDetectorProvider {
    type Outputs = (BboxDetectorConnection, SegmDetectorConnection);

    fn spec(self) -> NodeSpec {
        NodeSpec::new("UltralyticsDetectorProvider").input("model_name", self.model_name)
    }
}

pub struct SamLoader {
    pub model_name: String,
    /// "AUTO", "Prefer GPU" or "CPU".
    pub device_mode: &'static str,
}

impl TypedNode for SamLoader {
    type Outputs = SamModelConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("SAMLoader")
            .input("model_name", self.model_name)
            .input("device_mode", self.device_mode)
    }
}

pub struct FaceDetailer {
    pub image: ImageConnection,
    pub model: ModelConnection,
    pub clip: ClipConnection,
    pub vae: VaeConnection,
    pub positive: ConditioningConnection,
    pub negative: ConditioningConnection,
    pub bbox_detector: BboxDetectorConnection,
    pub seed: u64,
    pub steps: u32,
    pub cfg: f64,
    pub sampler_name: &'static str,
    pub scheduler: &'static str,
    pub denoise: f64,
    pub feather: u32,
    pub sam_model_opt: Option<SamModelConnection>,
    pub segm_detector_opt: Option<SegmDetectorConnection>,
}

impl TypedNode for FaceDetailer {
    type Outputs = ImageConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("FaceDetailer")
            .input("image", self.image)
            .input("model", self.model)
            .input("clip", self.clip)
            .input("vae", self.vae)
            .input("guide_size", 512.0)
            .input("guide_size_for", true)
            .input("max_size", 1024.0)
            .input("seed", self.seed)
            .input("steps", self.steps)
            .input("cfg", self.cfg)
            .input("sampler_name", self.sampler_name)
            .input("scheduler", self.scheduler)
            .input("positive", self.positive)
            .input("negative", self.negative)
            .input("denoise", self.denoise)
            .input("feather", self.feather)
            .input("noise_mask", true)
            .input("force_inpaint", true)
            .input("bbox_threshold", 0.5)
            .input("bbox_dilation", 10)
            .input("bbox_crop_factor", 3.0)
            .input("sam_detection_hint", "center-1")
            .input("sam_dilation", 0)
            .input("sam_threshold", 0.93)
            .input("sam_bbox_expansion", 0)
            .input("sam_mask_hint_threshold", 0.7)
            .input("sam_mask_hint_use_negative", "False")
            .input("drop_size", 10)
            .input("wildcard", "")
            .input("cycle", 1)
            .input("bbox_detector", self.bbox_detector)
            .optional_input("sam_model_opt", self.sam_model_opt)
            .optional_input("segm_detector_opt", self.segm_detector_opt)
    }
}

pub struct PromptExpansion {
    pub model_name: String,
    pub text: PromptText,
    pub seed: u64,
    pub log_prompt: bool,
}

impl TypedNode for PromptExpansion {
    type Outputs = StringConnection;

    fn spec(self) -> NodeSpec {
        NodeSpec::new("Inference_Core_PromptExpansion")
            .input("model_name", self.model_name)
            .input("text", self.text)
            .input("seed", self.seed)
            .input("log_prompt", self.log_prompt)
    }
}

pub struct SaveImage {
    pub images: ImageConnection,
    pub filename_prefix: String,
}

impl TypedNode for SaveImage {
    type Outputs = ();

    fn spec(self) -> NodeSpec {
        NodeSpec::new("SaveImage")
            .input("images", self.images)
            .input("filename_prefix", self.filename_prefix)
    }
}

pub struct PreviewImage {
    pub images: ImageConnection,
}

impl TypedNode for PreviewImage {
    type Outputs = ();

    fn spec(self) -> NodeSpec {
        NodeSpec::new("PreviewImage").input("images", self.images)
    }
}
