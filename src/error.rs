use thiserror::Error;

/// Errors that can occur while assembling the workflow graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Missing required selection: '{field}'")]
    Validation { field: &'static str },

    #[error("No {slot} available in the current connections")]
    MissingPrerequisite { slot: &'static str },

    #[error("Invalid build state: {message}")]
    InvalidBuildState { message: String },
}

/// Errors that can occur while lowering the registry into the wire format.
///
/// These indicate a bug in a build step, never bad user input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoweringError {
    #[error(
        "Node '{node}' input '{input}' references a node that is not part of this graph (slot {slot})"
    )]
    BrokenGraphInvariant {
        node: String,
        input: &'static str,
        slot: u32,
    },

    #[error("Output node '{0}' is not present in the lowered graph")]
    UnknownOutputNode(String),
}

/// Error raised when re-loading saved generation parameters references an
/// unknown sampler or scheduler wire name.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown {kind} name: '{name}'")]
pub struct NameParseError {
    pub kind: &'static str,
    pub name: String,
}

/// Umbrella error for a complete workflow build.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Lowering(#[from] LoweringError),
}
