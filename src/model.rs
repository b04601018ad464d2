use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

/// Position of a node in the program
pub type NodeId = usize;

/// Participant that supplies or receives the plaintext value of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Party {
    /// First participant (usually the model owner)
    Alice,
    /// Second participant (usually the data owner)
    Bob,
    /// Known to everyone
    Public,
}

/// ONNX data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Double,
    Float16,
    BFloat16,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
}

impl DataType {
    /// Check if the data type is a floating point type
    pub fn is_floating_point(&self) -> bool {
        matches!(
            self,
            DataType::Float | DataType::Double | DataType::Float16 | DataType::BFloat16
        )
    }
}

/// A named tensor owned by one party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorRef {
    pub name: String,
    pub shape: Vec<usize>,
    pub data_type: DataType,
    pub party: Party,
}

impl TensorRef {
    pub fn new(name: &str, shape: &[usize], data_type: DataType, party: Party) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.to_vec(),
            data_type,
            party,
        }
    }
}

/// Node attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Int(i64),
    Float(f32),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
    Strings(Vec<String>),
}

/// Operator application in the program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorNode {
    pub op_type: String,
    #[serde(default)]
    pub attributes: HashMap<String, Attribute>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl OperatorNode {
    pub fn new(op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            op_type: op_type.to_string(),
            attributes: HashMap::new(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Attach an attribute, builder style
    pub fn with_attribute(mut self, name: &str, value: Attribute) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

/// One entry of the program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramNode {
    Input(TensorRef),
    Operator(OperatorNode),
    Output(TensorRef),
}

/// Topologically sorted sequence of inputs, operators and outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub nodes: Vec<ProgramNode>,
}

impl Program {
    pub fn new(name: &str, nodes: Vec<ProgramNode>) -> Self {
        Self {
            name: name.to_string(),
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Graph-level inputs in program order
    pub fn inputs(&self) -> impl Iterator<Item = &TensorRef> {
        self.nodes.iter().filter_map(|node| match node {
            ProgramNode::Input(tensor) => Some(tensor),
            _ => None,
        })
    }

    /// Graph-level outputs in program order
    pub fn outputs(&self) -> impl Iterator<Item = &TensorRef> {
        self.nodes.iter().filter_map(|node| match node {
            ProgramNode::Output(tensor) => Some(tensor),
            _ => None,
        })
    }

    /// Operator nodes paired with their position
    pub fn operators(&self) -> impl Iterator<Item = (NodeId, &OperatorNode)> {
        self.nodes.iter().enumerate().filter_map(|(id, node)| match node {
            ProgramNode::Operator(op) => Some((id, op)),
            _ => None,
        })
    }
}

/// Datatype and shape of a tensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorInfo {
    pub data_type: DataType,
    pub shape: Vec<usize>,
}

/// Shape and datatype of every tensor, computed by the front-end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueInfo {
    entries: HashMap<String, TensorInfo>,
}

impl ValueInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, data_type: DataType, shape: &[usize]) {
        self.entries.insert(
            name.to_string(),
            TensorInfo {
                data_type,
                shape: shape.to_vec(),
            },
        );
    }

    /// Builder variant of `insert`
    pub fn with(mut self, name: &str, data_type: DataType, shape: &[usize]) -> Self {
        self.insert(name, data_type, shape);
        self
    }

    pub fn get(&self, name: &str) -> Result<&TensorInfo> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::UnknownTensor(name.to_string()))
    }

    pub fn shape(&self, name: &str) -> Result<&[usize]> {
        self.get(name).map(|info| info.shape.as_slice())
    }

    pub fn rank(&self, name: &str) -> Result<usize> {
        self.shape(name).map(|shape| shape.len())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mapping from tensor names to identifiers in the generated source.
///
/// Append-only and injective: a name keeps its identifier for the whole run and
/// no two names ever share one.
#[derive(Debug, Clone, Default)]
pub struct VarBinding {
    names: HashMap<String, String>,
    used: HashSet<String>,
    next_id: usize,
}

impl VarBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from identifiers chosen upstream
    pub fn with_seed(seed: HashMap<String, String>) -> Result<Self> {
        let mut binding = Self::new();
        for (name, ident) in seed {
            if !binding.used.insert(ident.clone()) {
                return Err(Error::InvalidProgram(format!(
                    "Identifier {} is bound to more than one tensor",
                    ident
                )));
            }
            binding.names.insert(name, ident);
        }
        Ok(binding)
    }

    /// Identifier bound to `name`, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(|s| s.as_str())
    }

    /// Identifier bound to `name`, binding a fresh one on first use
    pub fn bind(&mut self, name: &str) -> String {
        if let Some(ident) = self.names.get(name) {
            return ident.clone();
        }

        let ident = loop {
            let candidate = format!("var{}", self.next_id);
            self.next_id += 1;
            if !self.used.contains(&candidate) {
                break candidate;
            }
        };

        self.used.insert(ident.clone());
        self.names.insert(name.to_string(), ident.clone());
        ident
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_identifiers_skip_seeded_ones() {
        let mut seed = HashMap::new();
        seed.insert("weights".to_string(), "var0".to_string());
        let mut binding = VarBinding::with_seed(seed).unwrap();

        assert_eq!(binding.bind("x"), "var1");
        assert_eq!(binding.bind("weights"), "var0");
        assert_eq!(binding.bind("x"), "var1");
        assert_eq!(binding.len(), 2);
    }

    #[test]
    fn test_seed_must_be_injective() {
        let mut seed = HashMap::new();
        seed.insert("a".to_string(), "t".to_string());
        seed.insert("b".to_string(), "t".to_string());
        assert!(matches!(VarBinding::with_seed(seed), Err(Error::InvalidProgram(_))));
    }

    #[test]
    fn test_party_display_and_parse() {
        assert_eq!(Party::Alice.to_string(), "ALICE");
        assert_eq!("bob".parse::<Party>().unwrap(), Party::Bob);
    }

    #[test]
    fn test_tensor_ref_from_json() {
        let tensor: TensorRef = serde_json::from_str(
            r#"{"name": "x", "shape": [1, 3, 32, 32], "data_type": "float", "party": "alice"}"#,
        )
        .unwrap();
        assert_eq!(
            tensor,
            TensorRef::new("x", &[1, 3, 32, 32], DataType::Float, Party::Alice)
        );

        let node: ProgramNode = serde_json::from_str(
            r#"{"kind": "output", "name": "y", "shape": [1, 10], "data_type": "float", "party": "bob"}"#,
        )
        .unwrap();
        assert!(matches!(node, ProgramNode::Output(t) if t.party == Party::Bob && t.shape == vec![1, 10]));
    }
}
