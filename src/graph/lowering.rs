use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use super::node::InputValue;
use super::registry::NodeRegistry;
use crate::error::LoweringError;

/// A literal or connection reference in the wire format.
///
/// Connection references serialize as `[producing node name, slot index]`,
/// matching the backend's prompt format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Connection(String, u32),
}

/// One node of the lowered graph: `{class_type, inputs}`.
#[derive(Debug, Clone, Serialize)]
pub struct WireNode {
    pub class_type: String,
    pub inputs: AHashMap<String, WireValue>,
}

/// The terminal artifact of a build: a flat mapping from node name to node,
/// plus the ordered list of node names whose outputs are externally
/// significant.
#[derive(Debug, Clone, Serialize)]
pub struct WirePrompt {
    pub nodes: AHashMap<String, WireNode>,
    pub outputs: Vec<String>,
}

impl WirePrompt {
    pub fn node(&self, name: &str) -> Option<&WireNode> {
        self.nodes.get(name)
    }

    /// Names of all nodes with the given class type, in a deterministic
    /// order.
    pub fn nodes_of_type(&self, class_type: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.class_type == class_type)
            .map(|(name, _)| name.as_str())
            .sorted()
            .collect()
    }
}

/// Walks the registry and emits the wire format.
///
/// Every connection reference must resolve to a node present in the same
/// dictionary; a dangling reference is a fatal internal-consistency failure
/// indicating a bug in a step. Output order is preserved exactly as steps
/// registered output-significant nodes.
pub fn lower(registry: &NodeRegistry, output_names: &[String]) -> Result<WirePrompt, LoweringError> {
    let mut nodes = AHashMap::with_capacity(registry.len());

    for registered in registry.iter() {
        let mut inputs = AHashMap::with_capacity(registered.inputs.len());
        for (key, value) in &registered.inputs {
            let wire = match value {
                InputValue::Bool(v) => WireValue::Bool(*v),
                InputValue::Int(v) => WireValue::Int(*v),
                InputValue::Float(v) => WireValue::Float(*v),
                InputValue::Text(v) => WireValue::Text(v.clone()),
                InputValue::Connection(output) => {
                    let producer = registry
                        .node(output.node)
                        .filter(|_| output.build == registry.build_id())
                        .ok_or_else(|| LoweringError::BrokenGraphInvariant {
                            node: registered.name.clone(),
                            input: key,
                            slot: output.slot,
                        })?;
                    WireValue::Connection(producer.name.clone(), output.slot)
                }
            };
            inputs.insert((*key).to_string(), wire);
        }
        nodes.insert(
            registered.name.clone(),
            WireNode {
                class_type: registered.class_type.to_string(),
                inputs,
            },
        );
    }

    for name in output_names {
        if !nodes.contains_key(name) {
            return Err(LoweringError::UnknownOutputNode(name.clone()));
        }
    }

    debug!(
        nodes = nodes.len(),
        outputs = output_names.len(),
        "lowered graph to wire format"
    );

    Ok(WirePrompt {
        nodes,
        outputs: output_names.to_vec(),
    })
}
