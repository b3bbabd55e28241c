//! # Kumiki - Typed Workflow Graph Builder
//!
//! **Kumiki** converts a declarative image-generation pipeline configuration
//! into a directed acyclic graph of strongly-typed computation nodes, and
//! lowers that graph into the flat, string-addressed wire format a remote
//! execution backend consumes.
//!
//! ## Core Workflow
//!
//! 1.  **Configure**: Fill a [`config::WorkflowConfig`] with the model
//!     selections, sampler settings and optional addons (hires-fix,
//!     ControlNet, face detailing, ...). These values come from your own
//!     configuration layer; kumiki only checks that required selections are
//!     present.
//! 2.  **Build**: A [`build::WorkflowBuilder`] applies the fixed step
//!     sequence (seed, model load, latent source, conditioning, sampler,
//!     addon modules, output setup), each step reading and rewriting the
//!     shared connections context and adding nodes to the registry.
//! 3.  **Submit**: The resulting [`graph::WirePrompt`] is a plain
//!     serializable structure. JSON-encode it and hand it, together with
//!     the ordered output node names, to your transport layer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kumiki::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = WorkflowConfig {
//!         checkpoint: Some(ModelFile::new("sd15/photon_v1.safetensors")),
//!         positive_prompt: "a mountain lake at dawn".to_string(),
//!         negative_prompt: "blurry".to_string(),
//!         seed: 42,
//!         steps: 20,
//!         cfg_scale: 7.0,
//!         sampler: Some(SamplerKind::Euler),
//!         scheduler: Some(SchedulerKind::Normal),
//!         size: Size::new(512, 512),
//!         ..WorkflowConfig::default()
//!     };
//!
//!     let built = WorkflowBuilder::new(config).build()?;
//!
//!     println!("{}", serde_json::to_string_pretty(&built.prompt)?);
//!     println!("Outputs: {:?}", built.prompt.outputs);
//!     Ok(())
//! }
//! ```
//!
//! Builds are synchronous and perform no I/O; independent builds (e.g. one
//! per batch image) may run concurrently since each allocates its own
//! registry and connections.

pub mod build;
pub mod config;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod params;
pub mod prelude;
pub mod steps;
