use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the build (registry instance) a handle belongs to.
///
/// Handles are only valid with respect to the registry that produced them;
/// the registry rejects handles carrying a foreign build id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildId(u64);

impl BuildId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        BuildId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index of a node in the registry's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// An untyped reference to one output slot of a registered node.
///
/// Holding an output is a "uses" relationship, never ownership; the node
/// itself stays in the registry's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeOutput {
    pub(crate) node: NodeId,
    pub(crate) slot: u32,
    pub(crate) build: BuildId,
}

/// A semantically tagged connection handle.
///
/// One implementing type exists per value kind flowing between nodes, so
/// wiring the wrong kind of output into an input is a compile error.
pub trait Connection: Copy {
    /// Semantic kind tag, used in diagnostics.
    const KIND: &'static str;

    fn from_output(output: NodeOutput) -> Self;

    fn output(&self) -> NodeOutput;
}

macro_rules! connection_type {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NodeOutput);

        impl Connection for $name {
            const KIND: &'static str = $kind;

            fn from_output(output: NodeOutput) -> Self {
                Self(output)
            }

            fn output(&self) -> NodeOutput {
                self.0
            }
        }
    };
}

connection_type!(
    /// A diffusion model (UNet) connection.
    ModelConnection,
    "model"
);
connection_type!(ClipConnection, "clip");
connection_type!(ClipVisionConnection, "clip_vision");
connection_type!(VaeConnection, "vae");
connection_type!(LatentConnection, "latent");
connection_type!(ImageConnection, "image");
connection_type!(ConditioningConnection, "conditioning");
connection_type!(MaskConnection, "mask");
connection_type!(NoiseConnection, "noise");
connection_type!(SigmasConnection, "sigmas");
connection_type!(GuiderConnection, "guider");
connection_type!(
    /// A sampler-selector connection, produced by `KSamplerSelect`.
    SamplerConnection,
    "sampler"
);
connection_type!(UpscaleModelConnection, "upscale_model");
connection_type!(ControlNetConnection, "control_net");
connection_type!(
    /// A string-valued connection, e.g. an expanded prompt.
    StringConnection,
    "string"
);
connection_type!(BboxDetectorConnection, "bbox_detector");
connection_type!(SegmDetectorConnection, "segm_detector");
connection_type!(SamModelConnection, "sam_model");

/// The "current" value the pipeline is operating on: exactly one of a
/// latent or a pixel-space image is meaningful at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primary {
    Latent(LatentConnection),
    Image(ImageConnection),
}

impl From<LatentConnection> for Primary {
    fn from(latent: LatentConnection) -> Self {
        Primary::Latent(latent)
    }
}

impl From<ImageConnection> for Primary {
    fn from(image: ImageConnection) -> Self {
        Primary::Image(image)
    }
}

/// Positive and negative conditioning produced by one prompt application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditioningPair {
    pub positive: ConditioningConnection,
    pub negative: ConditioningConnection,
}

/// A prompt text input: either a literal string or the string output of
/// another node (e.g. prompt expansion).
#[derive(Debug, Clone, PartialEq)]
pub enum PromptText {
    Literal(String),
    Connection(StringConnection),
}

impl Default for PromptText {
    fn default() -> Self {
        PromptText::Literal(String::new())
    }
}

impl From<&str> for PromptText {
    fn from(text: &str) -> Self {
        PromptText::Literal(text.to_string())
    }
}

impl From<String> for PromptText {
    fn from(text: String) -> Self {
        PromptText::Literal(text)
    }
}

impl From<StringConnection> for PromptText {
    fn from(connection: StringConnection) -> Self {
        PromptText::Connection(connection)
    }
}
