//! Structural tensor operators: concatenation, reshape and flatten.

use crate::emit::brace_list;
use crate::error::{Error, Result};
use crate::layout::ReshapeTranslator;
use crate::model::OperatorNode;
use crate::ops::attributes::{check_arity, extract_int_attribute};
use crate::ops::registry::{BoundNames, CodegenContext, OperatorCodegen};

/// Concat operator
#[derive(Debug, Clone, Default)]
pub struct Concat;

/// Reshape operator
#[derive(Debug, Clone, Default)]
pub struct Reshape;

/// Flatten operator
#[derive(Debug, Clone, Default)]
pub struct Flatten;

/// Name of the monomorphized concatenation layer.
///
/// The runtime provides one layer per (input count, input ranks, output rank)
/// combination, e.g. `Concat2T4x4To4`.
pub fn concat_call_name(input_ranks: &[usize], output_rank: usize) -> String {
    let ranks: Vec<String> = input_ranks.iter().map(|rank| rank.to_string()).collect();
    format!(
        "Concat{}T{}To{}",
        input_ranks.len(),
        ranks.join("x"),
        output_rank
    )
}

/// Normalize a possibly negative axis against `rank`
fn normalize_axis(axis: i64, rank: usize) -> Result<usize> {
    let normalized = if axis < 0 { axis + rank as i64 } else { axis };
    if normalized < 0 || normalized >= rank as i64 {
        return Err(Error::MalformedAttribute(format!(
            "Concat axis {} out of range for rank {}",
            axis, rank
        )));
    }
    Ok(normalized as usize)
}

impl OperatorCodegen for Concat {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 1, usize::MAX, 1)?;
        extract_int_attribute(node, "axis")?.ok_or_else(|| {
            Error::MalformedAttribute("Concat requires attribute axis".to_string())
        })?;
        Ok(())
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        let output_shape = ctx.value_info.shape(&node.outputs[0])?;
        let rank = output_shape.len();
        let axis_attr = extract_int_attribute(node, "axis")?.ok_or_else(|| {
            Error::MalformedAttribute("Concat requires attribute axis".to_string())
        })?;
        let axis = normalize_axis(axis_attr, rank)?;

        let mut input_ranks = Vec::with_capacity(node.inputs.len());
        let mut axis_total = 0;
        for input in &node.inputs {
            let shape = ctx.value_info.shape(input)?;
            if shape.len() != rank {
                return Err(Error::ShapeMismatch(format!(
                    "Concat input {} has rank {}, output has rank {}",
                    input,
                    shape.len(),
                    rank
                )));
            }

            for (dim, (&have, &want)) in shape.iter().zip(output_shape.iter()).enumerate() {
                if dim != axis && have != want {
                    return Err(Error::ShapeMismatch(format!(
                        "Concat input {} has shape {:?}, incompatible with output {:?} outside axis {}",
                        input, shape, output_shape, axis
                    )));
                }
            }

            axis_total += shape[axis];
            input_ranks.push(shape.len());
        }

        if axis_total != output_shape[axis] {
            return Err(Error::ShapeMismatch(format!(
                "Concat inputs sum to {} along axis {}, output has {}",
                axis_total, axis, output_shape[axis]
            )));
        }

        Ok(format!(
            "{}new {}<{}>({}, {}, {}, {}),\n",
            ctx.prefix(),
            concat_call_name(&input_ranks, rank),
            ctx.ty(),
            brace_list(output_shape),
            names.input_list(),
            axis,
            names.output_list()
        ))
    }
}

impl OperatorCodegen for Reshape {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        // The optional second input is the target shape tensor
        check_arity(node, 1, 2, 1)
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        let input_shape = ctx.value_info.shape(&node.inputs[0])?;
        let output_shape = ctx.value_info.shape(&node.outputs[0])?;
        let translator = ReshapeTranslator::new(input_shape, output_shape)?;

        let ty = ctx.ty();
        let mut code = format!(
            "{}new Reshape<{}>({}, [](Tensor<{}> &{}, Tensor<{}> &{}) {{\n",
            ctx.prefix(),
            ty,
            translator.output_shape_list(),
            ty,
            names.inputs[0],
            ty,
            names.outputs[0]
        );
        code.push_str(&translator.emit_loops(
            &names.inputs[0],
            &names.outputs[0],
            ctx.indent_unit,
            ctx.level + 1,
        ));
        code.push_str(&format!("{}}}),\n", ctx.prefix()));
        Ok(code)
    }
}

impl OperatorCodegen for Flatten {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 1, 1, 1)
    }

    fn emit(&self, _node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        Ok(format!("{}new Flatten<{}>(),\n", ctx.prefix(), ctx.ty()))
    }
}
