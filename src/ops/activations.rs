use crate::emit::brace_list;
use crate::error::Result;
use crate::model::OperatorNode;
use crate::ops::attributes::{check_arity, extract_float_attribute};
use crate::ops::registry::{BoundNames, CodegenContext, OperatorCodegen};

/// Base struct for element-wise activation operators
#[derive(Debug, Clone)]
pub struct ActivationBase {
    layer: &'static str,
}

/// ReLU activation operator
#[derive(Debug, Clone, Default)]
pub struct Relu;

/// LeakyReLU activation operator
#[derive(Debug, Clone, Default)]
pub struct LeakyRelu;

/// Sigmoid activation operator
#[derive(Debug, Clone, Default)]
pub struct Sigmoid;

/// Tanh activation operator
#[derive(Debug, Clone, Default)]
pub struct Tanh;

/// Softmax operator
#[derive(Debug, Clone, Default)]
pub struct Softmax;

impl ActivationBase {
    fn new(layer: &'static str) -> Self {
        Self { layer }
    }

    fn validate_impl(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 1, 1, 1)
    }

    /// `new Layer<T>(shape, inputs, outputs)` with optional extra scalars before the names
    fn emit_impl(
        &self,
        node: &OperatorNode,
        names: &BoundNames,
        ctx: &CodegenContext,
        extra: Option<String>,
    ) -> Result<String> {
        let shape = ctx.value_info.shape(&node.inputs[0])?;
        let extra = extra.map(|value| format!("{}, ", value)).unwrap_or_default();

        Ok(format!(
            "{}new {}<{}>({}, {}{}, {}),\n",
            ctx.prefix(),
            self.layer,
            ctx.ty(),
            brace_list(shape),
            extra,
            names.input_list(),
            names.output_list()
        ))
    }
}

impl OperatorCodegen for Relu {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        ActivationBase::new("ReLU").validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        ActivationBase::new("ReLU").emit_impl(node, names, ctx, None)
    }
}

impl OperatorCodegen for LeakyRelu {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        extract_float_attribute(node, "alpha", 0.01)?;
        ActivationBase::new("LeakyReLU").validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        let alpha = extract_float_attribute(node, "alpha", 0.01)?;
        ActivationBase::new("LeakyReLU").emit_impl(node, names, ctx, Some(format!("{:?}", alpha)))
    }
}

impl OperatorCodegen for Sigmoid {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        ActivationBase::new("Sigmoid").validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        ActivationBase::new("Sigmoid").emit_impl(node, names, ctx, None)
    }
}

impl OperatorCodegen for Tanh {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        ActivationBase::new("Tanh").validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        ActivationBase::new("Tanh").emit_impl(node, names, ctx, None)
    }
}

impl OperatorCodegen for Softmax {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        ActivationBase::new("Softmax").validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        ActivationBase::new("Softmax").emit_impl(node, names, ctx, None)
    }
}
