//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types from the kumiki crate. Import
//! this module to get access to the core functionality without having to
//! import each type individually.

// Core building and lowering
pub use crate::build::{BuildContext, BuiltWorkflow, SamplerState, WorkflowBuilder};
pub use crate::graph::{NodeRegistry, WirePrompt, WireValue, lower};

// Configuration and parameters
pub use crate::config::{
    AddonConfig, LatentSource, ModelFile, SamplerKind, SchedulerKind, Size, Upscaler,
    UpscalerKind, WorkflowConfig,
};
pub use crate::params::GenerationParameters;

// Typed connections
pub use crate::graph::{
    ConditioningPair, Connection, ImageConnection, LatentConnection, ModelConnection, Primary,
    PromptText, VaeConnection,
};

// Step protocol
pub use crate::steps::{SamplerAddon, WorkflowStep};

// Error types
pub use crate::error::{BuildError, LoweringError, WorkflowError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
