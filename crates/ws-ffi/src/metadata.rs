//! Operator metadata - the static description a leaf kid publishes before
//! any record flows (§6 "what a leaf kid sees").

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One input or output port a kid declares: the type name it carries and
/// a human-readable label shown in graph diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSpec {
    pub type_name: String,
    pub label: String,
}

impl PortSpec {
    pub fn new(type_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            label: label.into(),
        }
    }
}

/// The metadata a kid publishes once, before its `init` is ever called:
/// name, version, its declared option schema, and its input/output ports.
///
/// `option_schema` is deliberately a loose [`serde_json::Value`] rather
/// than a fixed struct - individual kids define wildly different option
/// shapes, and validating against the published schema is the graph
/// loader's job (out of scope for this crate, per §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorMetadata {
    pub name: String,
    pub version: String,
    pub option_schema: Value,
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl OperatorMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            option_schema: Value::Null,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_option_schema(mut self, schema: Value) -> Self {
        self.option_schema = schema;
        self
    }

    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }
}
