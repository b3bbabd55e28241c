use super::connection::{BuildId, Connection, NodeId, NodeOutput, PromptText};

/// A single input of a node under construction: either a literal value or a
/// connection to another node's output.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Connection(NodeOutput),
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        InputValue::Int(value)
    }
}

impl From<u32> for InputValue {
    fn from(value: u32) -> Self {
        InputValue::Int(value as i64)
    }
}

impl From<u64> for InputValue {
    fn from(value: u64) -> Self {
        InputValue::Int(value as i64)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Int(value as i64)
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Float(value)
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Text(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

impl From<PromptText> for InputValue {
    fn from(value: PromptText) -> Self {
        match value {
            PromptText::Literal(text) => InputValue::Text(text),
            PromptText::Connection(connection) => InputValue::Connection(connection.output()),
        }
    }
}

impl<C: Connection> From<C> for InputValue {
    fn from(connection: C) -> Self {
        InputValue::Connection(connection.output())
    }
}

/// The untyped description of one node: its backend class type, the base
/// name used for unique naming, and its named inputs in declaration order.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub class_type: &'static str,
    pub base_name: &'static str,
    pub inputs: Vec<(&'static str, InputValue)>,
}

impl NodeSpec {
    pub fn new(class_type: &'static str) -> Self {
        Self {
            class_type,
            base_name: class_type,
            inputs: Vec::new(),
        }
    }

    pub fn input(mut self, key: &'static str, value: impl Into<InputValue>) -> Self {
        self.inputs.push((key, value.into()));
        self
    }

    pub fn optional_input<V: Into<InputValue>>(
        mut self,
        key: &'static str,
        value: Option<V>,
    ) -> Self {
        if let Some(value) = value {
            self.inputs.push((key, value.into()));
        }
        self
    }

    /// Booleans the backend expects as "enable"/"disable" strings.
    pub fn toggle_input(self, key: &'static str, value: bool) -> Self {
        self.input(key, if value { "enable" } else { "disable" })
    }
}

/// A strongly-typed node constructor.
///
/// Implementors describe their wire inputs via [`NodeSpec`] and declare the
/// connection types of their output slots, which the registry mints on add.
pub trait TypedNode {
    type Outputs: NodeOutputs;

    fn spec(self) -> NodeSpec;
}

/// Conversion from a freshly registered node to its typed output handles.
pub trait NodeOutputs {
    fn from_node(node: NodeId, build: BuildId) -> Self;
}

impl NodeOutputs for () {
    fn from_node(_node: NodeId, _build: BuildId) -> Self {}
}

fn output(node: NodeId, slot: u32, build: BuildId) -> NodeOutput {
    NodeOutput { node, slot, build }
}

impl<A: Connection> NodeOutputs for A {
    fn from_node(node: NodeId, build: BuildId) -> Self {
        A::from_output(output(node, 0, build))
    }
}

impl<A: Connection, B: Connection> NodeOutputs for (A, B) {
    fn from_node(node: NodeId, build: BuildId) -> Self {
        (
            A::from_output(output(node, 0, build)),
            B::from_output(output(node, 1, build)),
        )
    }
}

impl<A: Connection, B: Connection, C: Connection> NodeOutputs for (A, B, C) {
    fn from_node(node: NodeId, build: BuildId) -> Self {
        (
            A::from_output(output(node, 0, build)),
            B::from_output(output(node, 1, build)),
            C::from_output(output(node, 2, build)),
        )
    }
}
