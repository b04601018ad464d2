//! Padding resolution for windowed operators (convolution and pooling).
//!
//! Padding is either declared explicitly through `pads` or derived from the
//! `auto_pad` policy. The same-size rule computes, per spatial axis,
//!
//! ```text
//! pad = ceil(((out - 1) * stride + kernel - in) / 2)
//! ```
//!
//! and uses the height value for top/bottom and the width value for left/right.

use std::str::FromStr;

use log::warn;

use crate::error::{Error, Result};
use crate::model::{OperatorNode, ValueInfo};
use crate::ops::attributes::{extract_ints_attribute, extract_string_attribute, require_ints_attribute};

/// Auto-padding modes supported by ONNX
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPadding {
    /// Use explicit padding values provided in the `pads` attribute
    NotSet,
    /// No padding unless `pads` says otherwise
    Valid,
    /// Keep the output size equal to input size divided by stride
    SameUpper,
    /// Same as SAME_UPPER with the extra pixel at the beginning
    SameLower,
}

impl FromStr for AutoPadding {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "NOTSET" => Ok(AutoPadding::NotSet),
            "VALID" => Ok(AutoPadding::Valid),
            "SAME_UPPER" => Ok(AutoPadding::SameUpper),
            "SAME_LOWER" => Ok(AutoPadding::SameLower),
            _ => Err(Error::MalformedAttribute(format!("Unknown auto_pad value: {}", s))),
        }
    }
}

/// Resolved padding of a 2D window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Padding {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self { top, left, bottom, right }
    }

    /// From ONNX `pads` order: [h_begin, w_begin, h_end, w_end]
    pub fn from_pads(node: &OperatorNode, pads: &[usize]) -> Result<Self> {
        match pads {
            [top, left, bottom, right] => Ok(Self::new(*top, *left, *bottom, *right)),
            _ => Err(Error::MalformedAttribute(format!(
                "{} pads must have 4 entries, got {:?}",
                node.op_type, pads
            ))),
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.top == self.left && self.top == self.bottom && self.top == self.right
    }

    /// The single pad scalar the runtime constructors accept.
    ///
    /// Only the first value is propagated; a non-uniform padding is logged.
    pub fn scalar(&self, op_type: &str) -> usize {
        if !self.is_uniform() {
            warn!(
                "{} has non-uniform padding {:?}; only {} is propagated",
                op_type, self, self.top
            );
        }
        self.top
    }
}

/// Same-size padding for one spatial axis, clamped at zero
pub fn same_size_pad(in_size: usize, out_size: usize, kernel: usize, stride: usize) -> usize {
    let needed = (out_size as i64 - 1) * stride as i64 + kernel as i64 - in_size as i64;
    let needed = needed.max(0);
    ((needed + 1) / 2) as usize
}

/// Resolve the padding of a convolution or pooling node
pub fn resolve_padding(node: &OperatorNode, value_info: &ValueInfo) -> Result<Padding> {
    let policy = match extract_string_attribute(node, "auto_pad")? {
        Some(value) => value.parse::<AutoPadding>()?,
        None => {
            let pads = extract_ints_attribute(node, "pads")?.ok_or_else(|| {
                Error::MalformedAttribute(format!(
                    "{} has neither pads nor an auto_pad policy",
                    node.op_type
                ))
            })?;
            return Padding::from_pads(node, &pads);
        }
    };

    match policy {
        AutoPadding::NotSet | AutoPadding::Valid => match extract_ints_attribute(node, "pads")? {
            Some(pads) => Padding::from_pads(node, &pads),
            None => Ok(Padding::default()),
        },
        AutoPadding::SameUpper | AutoPadding::SameLower => same_size_padding(node, value_info),
    }
}

fn same_size_padding(node: &OperatorNode, value_info: &ValueInfo) -> Result<Padding> {
    let strides = require_ints_attribute(node, "strides", 2)?;
    let input = spatial_dims(value_info, &node.inputs[0])?;
    let output = spatial_dims(value_info, &node.outputs[0])?;
    let kernel = window_size(node, value_info)?;

    let pad_h = same_size_pad(input[0], output[0], kernel[0], strides[0]);
    let pad_w = same_size_pad(input[1], output[1], kernel[1], strides[1]);

    Ok(Padding::new(pad_h, pad_w, pad_h, pad_w))
}

/// Kernel extent from `kernel_shape`, falling back to the weight tensor
pub fn window_size(node: &OperatorNode, value_info: &ValueInfo) -> Result<[usize; 2]> {
    if extract_ints_attribute(node, "kernel_shape")?.is_some() {
        let kernel = require_ints_attribute(node, "kernel_shape", 2)?;
        return Ok([kernel[0], kernel[1]]);
    }

    match node.inputs.get(1) {
        Some(weights) => spatial_dims(value_info, weights),
        None => Err(Error::MalformedAttribute(format!(
            "{} requires attribute kernel_shape",
            node.op_type
        ))),
    }
}

/// Height and width of an NCHW tensor
pub fn spatial_dims(value_info: &ValueInfo, name: &str) -> Result<[usize; 2]> {
    match value_info.shape(name)? {
        [_, _, h, w] => Ok([*h, *w]),
        other => Err(Error::ShapeMismatch(format!(
            "Tensor {} must be 4D (NCHW), got shape {:?}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, DataType};

    fn pool_node(attrs: Vec<(&str, Attribute)>) -> OperatorNode {
        attrs
            .into_iter()
            .fold(OperatorNode::new("MaxPool", &["x"], &["y"]), |node, (name, value)| {
                node.with_attribute(name, value)
            })
    }

    fn info(in_hw: usize, out_hw: usize) -> ValueInfo {
        ValueInfo::new()
            .with("x", DataType::Float, &[1, 8, in_hw, in_hw])
            .with("y", DataType::Float, &[1, 8, out_hw, out_hw])
    }

    #[test]
    fn test_same_size_stride_one_kernel_three() {
        assert_eq!(same_size_pad(32, 32, 3, 1), 1);

        let node = pool_node(vec![
            ("auto_pad", Attribute::String("SAME_UPPER".to_string())),
            ("strides", Attribute::Ints(vec![1, 1])),
            ("kernel_shape", Attribute::Ints(vec![3, 3])),
        ]);
        let padding = resolve_padding(&node, &info(32, 32)).unwrap();
        assert_eq!(padding, Padding::new(1, 1, 1, 1));
    }

    #[test]
    fn test_same_size_rounds_up() {
        // (16 - 1) * 2 + 3 - 32 = 1 -> ceil(0.5) = 1
        assert_eq!(same_size_pad(32, 16, 3, 2), 1);
        // Negative requirement clamps to zero
        assert_eq!(same_size_pad(32, 16, 1, 2), 0);
    }

    #[test]
    fn test_same_size_uses_weight_when_kernel_shape_missing() {
        let node = OperatorNode::new("Conv", &["x", "w"], &["y"])
            .with_attribute("auto_pad", Attribute::String("SAME_LOWER".to_string()))
            .with_attribute("strides", Attribute::Ints(vec![1, 1]));
        let value_info = info(28, 28).with("w", DataType::Float, &[16, 8, 5, 5]);

        let padding = resolve_padding(&node, &value_info).unwrap();
        assert_eq!(padding, Padding::new(2, 2, 2, 2));
    }

    #[test]
    fn test_explicit_and_valid_policies() {
        let node = pool_node(vec![
            ("auto_pad", Attribute::String("NOTSET".to_string())),
            ("pads", Attribute::Ints(vec![1, 2, 1, 2])),
        ]);
        assert_eq!(resolve_padding(&node, &info(8, 8)).unwrap(), Padding::new(1, 2, 1, 2));

        let node = pool_node(vec![("auto_pad", Attribute::String("VALID".to_string()))]);
        assert_eq!(resolve_padding(&node, &info(8, 6)).unwrap(), Padding::default());

        let node = pool_node(vec![("pads", Attribute::Ints(vec![0, 0, 0, 0]))]);
        assert_eq!(resolve_padding(&node, &info(8, 7)).unwrap(), Padding::default());
    }

    #[test]
    fn test_missing_padding_is_malformed() {
        let node = pool_node(vec![("strides", Attribute::Ints(vec![1, 1]))]);
        assert!(matches!(
            resolve_padding(&node, &info(8, 8)),
            Err(Error::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_unknown_policy_is_malformed() {
        let node = pool_node(vec![("auto_pad", Attribute::String("SAME".to_string()))]);
        assert!(matches!(
            resolve_padding(&node, &info(8, 8)),
            Err(Error::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_scalar_keeps_first_value() {
        assert_eq!(Padding::new(0, 1, 1, 0).scalar("Conv"), 0);
        assert!(Padding::new(2, 2, 2, 2).is_uniform());
    }
}
