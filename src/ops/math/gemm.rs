use crate::error::{Error, Result};
use crate::model::OperatorNode;
use crate::ops::attributes::{check_arity, extract_int_attribute};
use crate::ops::registry::{BoundNames, CodegenContext, OperatorCodegen};

/// GEMM (General Matrix Multiplication) operator
/// Y = alpha * (A @ B) + beta * C, lowered to a fully-connected layer
#[derive(Debug, Clone, Default)]
pub struct Gemm;

/// MatMul against a weight matrix, lowered to a fully-connected layer without bias
#[derive(Debug, Clone, Default)]
pub struct MatMul;

/// Feature size of a tensor (its last axis)
fn feature_dim(ctx: &CodegenContext, name: &str) -> Result<usize> {
    let shape = ctx.value_info.shape(name)?;
    shape.last().copied().ok_or_else(|| {
        Error::ShapeMismatch(format!("Tensor {} is a scalar, expected features", name))
    })
}

/// `new FC<T>(in, out, bias)` followed by the truncation entry
fn emit_fully_connected(node: &OperatorNode, ctx: &CodegenContext, bias: bool) -> Result<String> {
    let in_features = feature_dim(ctx, &node.inputs[0])?;
    let out_features = feature_dim(ctx, &node.outputs[0])?;

    let mut code = format!(
        "{}new FC<{}>({}, {}, {}),\n",
        ctx.prefix(),
        ctx.ty(),
        in_features,
        out_features,
        bias
    );
    code.push_str(&ctx.truncation());
    Ok(code)
}

impl OperatorCodegen for Gemm {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 2, 3, 1)?;
        if let Some(trans_a) = extract_int_attribute(node, "transA")? {
            if trans_a != 0 {
                return Err(Error::MalformedAttribute(
                    "Gemm with transA is not supported".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        emit_fully_connected(node, ctx, node.inputs.len() == 3)
    }
}

impl OperatorCodegen for MatMul {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 2, 2, 1)
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        emit_fully_connected(node, ctx, false)
    }
}
