use crate::error::{Error, Result};
use crate::model::OperatorNode;
use crate::ops::attributes::check_arity;
use crate::ops::registry::{BoundNames, CodegenContext, OperatorCodegen};

/// Inference-mode batch normalization.
///
/// Scale, bias, mean and variance are folded into per-channel parameters by the
/// runtime when the model weights are loaded.
#[derive(Debug, Clone, Default)]
pub struct BatchNormalization;

impl OperatorCodegen for BatchNormalization {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 1, 5, 1)
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        let shape = ctx.value_info.shape(&node.inputs[0])?;
        let channels = shape.get(1).copied().ok_or_else(|| {
            Error::ShapeMismatch(format!(
                "BatchNormalization input {} needs a channel axis, got shape {:?}",
                node.inputs[0], shape
            ))
        })?;

        let mut code = format!(
            "{}new BatchNormInference<{}>({}),\n",
            ctx.prefix(),
            ctx.ty(),
            channels
        );
        code.push_str(&ctx.truncation());
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::context::NumericMode;
    use crate::model::{DataType, ValueInfo};

    #[test]
    fn test_batchnorm_channels_and_truncation() {
        let value_info = ValueInfo::new().with("x", DataType::Float, &[1, 32, 16, 16]);
        let ctx = CodegenContext {
            value_info: &value_info,
            mode: NumericMode::SignedFixed,
            scale: 16,
            indent_unit: "    ",
            level: 0,
        };
        let node = OperatorNode::new("BatchNormalization", &["x", "s", "b", "m", "v"], &["y"]);
        let names = BoundNames {
            inputs: vec![],
            outputs: vec![],
        };

        BatchNormalization.validate(&node).unwrap();
        let code = BatchNormalization.emit(&node, &names, &ctx).unwrap();
        assert_eq!(
            code,
            "new BatchNormInference<i64>(32),\nnew Truncate<i64>(16),\n"
        );
    }
}
