//! Typed access to operator attributes.

use crate::error::{Error, Result};
use crate::model::{Attribute, OperatorNode};

/// Helper function to extract an optional ints attribute
pub fn extract_ints_attribute(node: &OperatorNode, name: &str) -> Result<Option<Vec<usize>>> {
    match node.attributes.get(name) {
        None => Ok(None),
        Some(Attribute::Ints(values)) => {
            let mut result = Vec::with_capacity(values.len());
            for &value in values {
                if value < 0 {
                    return Err(Error::MalformedAttribute(format!(
                        "{} attribute {} must not contain negative values, got {:?}",
                        node.op_type, name, values
                    )));
                }
                result.push(value as usize);
            }
            Ok(Some(result))
        }
        Some(other) => Err(Error::MalformedAttribute(format!(
            "{} attribute {} must be an array of ints, got {:?}",
            node.op_type, name, other
        ))),
    }
}

/// Ints attribute that must be present with exactly `len` entries
pub fn require_ints_attribute(node: &OperatorNode, name: &str, len: usize) -> Result<Vec<usize>> {
    let values = extract_ints_attribute(node, name)?.ok_or_else(|| {
        Error::MalformedAttribute(format!("{} requires attribute {}", node.op_type, name))
    })?;

    if values.len() != len {
        return Err(Error::MalformedAttribute(format!(
            "{} attribute {} must have {} entries, got {:?}",
            node.op_type, name, len, values
        )));
    }

    Ok(values)
}

/// Helper function to extract an int attribute
pub fn extract_int_attribute(node: &OperatorNode, name: &str) -> Result<Option<i64>> {
    match node.attributes.get(name) {
        None => Ok(None),
        Some(Attribute::Int(value)) => Ok(Some(*value)),
        Some(other) => Err(Error::MalformedAttribute(format!(
            "{} attribute {} must be an int, got {:?}",
            node.op_type, name, other
        ))),
    }
}

/// Helper function to extract a float attribute, accepting integral values
pub fn extract_float_attribute(node: &OperatorNode, name: &str, default: f32) -> Result<f32> {
    match node.attributes.get(name) {
        None => Ok(default),
        Some(Attribute::Float(value)) => Ok(*value),
        Some(Attribute::Int(value)) => Ok(*value as f32),
        Some(other) => Err(Error::MalformedAttribute(format!(
            "{} attribute {} must be a float, got {:?}",
            node.op_type, name, other
        ))),
    }
}

/// Helper function to extract a string attribute
pub fn extract_string_attribute(node: &OperatorNode, name: &str) -> Result<Option<String>> {
    match node.attributes.get(name) {
        None => Ok(None),
        Some(Attribute::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(Error::MalformedAttribute(format!(
            "{} attribute {} must be a string, got {:?}",
            node.op_type, name, other
        ))),
    }
}

/// Check the number of inputs and outputs of a node
pub fn check_arity(
    node: &OperatorNode,
    min_inputs: usize,
    max_inputs: usize,
    outputs: usize,
) -> Result<()> {
    let count = node.inputs.len();
    if count < min_inputs || count > max_inputs {
        let expected = if min_inputs == max_inputs {
            min_inputs.to_string()
        } else if max_inputs == usize::MAX {
            format!("at least {}", min_inputs)
        } else {
            format!("{} to {}", min_inputs, max_inputs)
        };
        return Err(Error::MalformedAttribute(format!(
            "{} requires {} inputs, got {}",
            node.op_type, expected, count
        )));
    }

    if node.outputs.len() != outputs {
        return Err(Error::MalformedAttribute(format!(
            "{} requires {} outputs, got {}",
            node.op_type,
            outputs,
            node.outputs.len()
        )));
    }

    Ok(())
}
