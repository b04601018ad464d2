//! # Convolution Operator
//!
//! Emits a `Conv2D` layer for NCHW convolutions. Channel counts and the filter
//! size come from value info; stride and padding from the node attributes.
//!
//! The declared `kernel_shape` must match the spatial dimensions of the weight
//! tensor exactly. Only square strides and uniform padding can be expressed by
//! the runtime constructor, so the first value of each is propagated.
//!
//! In fixed-point modes the layer is always followed by a truncation entry.

use log::warn;

use crate::error::{Error, Result};
use crate::model::OperatorNode;
use crate::ops::attributes::{check_arity, extract_ints_attribute, extract_int_attribute, require_ints_attribute};
use crate::ops::nn::padding::{resolve_padding, spatial_dims};
use crate::ops::registry::{BoundNames, CodegenContext, OperatorCodegen};

/// 2D convolution operator
#[derive(Debug, Clone, Default)]
pub struct Conv;

impl OperatorCodegen for Conv {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 2, 3, 1)?;
        require_ints_attribute(node, "strides", 2)?;
        require_ints_attribute(node, "kernel_shape", 2)?;

        if let Some(dilations) = extract_ints_attribute(node, "dilations")? {
            if dilations.iter().any(|&d| d != 1) {
                return Err(Error::MalformedAttribute(format!(
                    "Conv dilations {:?} are not supported",
                    dilations
                )));
            }
        }

        if let Some(group) = extract_int_attribute(node, "group")? {
            if group != 1 {
                return Err(Error::MalformedAttribute(format!(
                    "Conv group {} is not supported",
                    group
                )));
            }
        }

        Ok(())
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        let x_shape = ctx.value_info.shape(&node.inputs[0])?;
        let y_shape = ctx.value_info.shape(&node.outputs[0])?;
        if x_shape.len() != 4 || y_shape.len() != 4 {
            return Err(Error::ShapeMismatch(format!(
                "Conv supports only 2D convolutions, got input {:?} and output {:?}",
                x_shape, y_shape
            )));
        }

        let kernel_shape = require_ints_attribute(node, "kernel_shape", 2)?;
        let filter = spatial_dims(ctx.value_info, &node.inputs[1])?;
        if kernel_shape[..] != filter[..] {
            return Err(Error::ShapeMismatch(format!(
                "Conv kernel_shape {:?} does not match weight {} spatial dims {:?}",
                kernel_shape, node.inputs[1], filter
            )));
        }

        let strides = require_ints_attribute(node, "strides", 2)?;
        if strides[0] != strides[1] {
            warn!("Conv has non-square strides {:?}; only {} is propagated", strides, strides[0]);
        }

        let pad = resolve_padding(node, ctx.value_info)?.scalar(&node.op_type);
        let in_channels = x_shape[1];
        let out_channels = y_shape[1];
        let bias = node.inputs.len() == 3;

        let mut code = format!(
            "{}new Conv2D<{}>({}, {}, {}, {}, {}, {}),\n",
            ctx.prefix(),
            ctx.ty(),
            in_channels,
            out_channels,
            filter[0],
            pad,
            strides[0],
            bias
        );
        code.push_str(&ctx.truncation());
        Ok(code)
    }
}
