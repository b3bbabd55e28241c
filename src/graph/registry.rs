use ahash::{AHashMap, AHashSet};
use tracing::debug;

use super::connection::{BuildId, NodeId};
use super::node::{InputValue, NodeOutputs, NodeSpec, TypedNode};
use crate::error::BuildError;

/// A node that has been committed to the graph.
///
/// Identity (name) never changes once added, and nothing removes nodes
/// mid-build; the graph only grows monotonically.
#[derive(Debug, Clone)]
pub struct RegisteredNode {
    pub name: String,
    pub class_type: &'static str,
    pub inputs: Vec<(&'static str, InputValue)>,
}

/// Owns every node added to the graph and guarantees globally unique names.
///
/// The registry does not validate semantic correctness; name collision is
/// never an error condition, only a rename.
#[derive(Debug)]
pub struct NodeRegistry {
    build: BuildId,
    nodes: Vec<RegisteredNode>,
    names: AHashMap<String, NodeId>,
    reserved: AHashSet<String>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            build: BuildId::next(),
            nodes: Vec::new(),
            names: AHashMap::new(),
            reserved: AHashSet::new(),
        }
    }

    pub fn build_id(&self) -> BuildId {
        self.build
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&RegisteredNode> {
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &RegisteredNode> {
        self.nodes.iter()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.names.contains_key(name) || self.reserved.contains(name)
    }

    /// Returns a name not yet used by any node and reserves it, so steps
    /// that need a name before constructing a node can obtain one
    /// deterministically.
    ///
    /// The first requester of a base gets the bare name; later requesters
    /// get `base_2`, `base_3`, and so on.
    pub fn unique_name(&mut self, base: &str) -> String {
        let name = self.find_unique(base);
        self.reserved.insert(name.clone());
        name
    }

    fn find_unique(&self, base: &str) -> String {
        if !self.is_taken(base) {
            return base.to_string();
        }
        let mut suffix = 2u32;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !self.is_taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Adds a typed node under its spec's base name (renamed if taken) and
    /// returns its typed output handles.
    pub fn add<N: TypedNode>(&mut self, node: N) -> Result<N::Outputs, BuildError> {
        let spec = node.spec();
        let name = self.find_unique(spec.base_name);
        self.insert(name, spec)
    }

    /// Adds a typed node under an explicit name, typically one previously
    /// obtained from [`unique_name`](Self::unique_name).
    pub fn add_named<N: TypedNode>(
        &mut self,
        name: impl Into<String>,
        node: N,
    ) -> Result<N::Outputs, BuildError> {
        let name = name.into();
        let spec = node.spec();
        // A reserved name may be materialized exactly once; anything else
        // is treated as a fresh base.
        let name = if self.reserved.remove(&name) {
            name
        } else {
            self.find_unique(&name)
        };
        self.insert(name, spec)
    }

    fn insert<O: NodeOutputs>(&mut self, name: String, spec: NodeSpec) -> Result<O, BuildError> {
        for (key, value) in &spec.inputs {
            if let InputValue::Connection(output) = value {
                if output.build != self.build {
                    return Err(BuildError::InvalidBuildState {
                        message: format!(
                            "Input '{}' of node '{}' holds a connection from a different build",
                            key, name
                        ),
                    });
                }
            }
        }

        let id = NodeId(self.nodes.len() as u32);
        debug!(name = %name, class_type = spec.class_type, "registering node");
        self.names.insert(name.clone(), id);
        self.nodes.push(RegisteredNode {
            name,
            class_type: spec.class_type,
            inputs: spec.inputs,
        });
        Ok(O::from_node(id, self.build))
    }
}
