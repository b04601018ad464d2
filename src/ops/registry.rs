use std::fmt::Debug;
use std::str::FromStr;

use log::debug;
use strum_macros::{Display, EnumString};

use crate::emit::{comment, indent, quoted_list};
use crate::error::{Error, Result};
use crate::execution::context::NumericMode;
use crate::model::{OperatorNode, ValueInfo, VarBinding};

/// Parameters shared by every operator handler
#[derive(Debug, Clone, Copy)]
pub struct CodegenContext<'a> {
    pub value_info: &'a ValueInfo,
    pub mode: NumericMode,
    pub scale: u32,
    pub indent_unit: &'a str,
    /// Nesting level of pipeline entries
    pub level: usize,
}

impl<'a> CodegenContext<'a> {
    /// Indentation prefix of a pipeline entry
    pub fn prefix(&self) -> String {
        indent(self.indent_unit, self.level)
    }

    /// Element type of the runtime templates
    pub fn ty(&self) -> &'static str {
        self.mode.cpp_type()
    }

    /// Rescale after a multiply-accumulate.
    ///
    /// Fixed-point products carry twice the scale; every such operator must be
    /// followed by exactly one truncation by `2^scale`.
    pub fn truncation(&self) -> String {
        if self.mode.is_fixed_point() {
            format!("{}new Truncate<{}>({}),\n", self.prefix(), self.ty(), self.scale)
        } else {
            String::new()
        }
    }
}

/// Identifiers bound to a node's inputs and outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundNames {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl BoundNames {
    pub fn input_list(&self) -> String {
        quoted_list(&self.inputs)
    }

    pub fn output_list(&self) -> String {
        quoted_list(&self.outputs)
    }
}

/// Code emission rule for one operator kind
pub trait OperatorCodegen: Send + Sync + Debug {
    /// Validate arity and attributes of the node
    fn validate(&self, node: &OperatorNode) -> Result<()>;

    /// Emit the pipeline entries for the node
    fn emit(&self, node: &OperatorNode, names: &BoundNames, ctx: &CodegenContext) -> Result<String>;
}

/// Operators the translator knows how to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum OpKind {
    Relu,
    LeakyRelu,
    Sigmoid,
    Tanh,
    Softmax,
    Conv,
    MaxPool,
    AveragePool,
    GlobalAveragePool,
    BatchNormalization,
    Gemm,
    MatMul,
    Concat,
    Reshape,
    Flatten,
}

impl OpKind {
    /// Resolve an ONNX op type
    pub fn from_op_type(op_type: &str) -> Result<Self> {
        Self::from_str(op_type).map_err(|_| {
            Error::UnsupportedOperator(format!("no code generation rule for {}", op_type))
        })
    }

    /// Handler for this operator kind
    pub fn codegen(&self) -> &'static dyn OperatorCodegen {
        use crate::ops::activations::{LeakyRelu, Relu, Sigmoid, Softmax, Tanh};
        use crate::ops::math::gemm::{Gemm, MatMul};
        use crate::ops::nn::batchnorm::BatchNormalization;
        use crate::ops::nn::conv::Conv;
        use crate::ops::nn::pool::{AveragePool, GlobalAveragePool, MaxPool};
        use crate::ops::tensor::{Concat, Flatten, Reshape};

        match self {
            OpKind::Relu => &Relu,
            OpKind::LeakyRelu => &LeakyRelu,
            OpKind::Sigmoid => &Sigmoid,
            OpKind::Tanh => &Tanh,
            OpKind::Softmax => &Softmax,
            OpKind::Conv => &Conv,
            OpKind::MaxPool => &MaxPool,
            OpKind::AveragePool => &AveragePool,
            OpKind::GlobalAveragePool => &GlobalAveragePool,
            OpKind::BatchNormalization => &BatchNormalization,
            OpKind::Gemm => &Gemm,
            OpKind::MatMul => &MatMul,
            OpKind::Concat => &Concat,
            OpKind::Reshape => &Reshape,
            OpKind::Flatten => &Flatten,
        }
    }
}

/// Emit the pipeline entries of one operator node.
///
/// Binds identifiers for every input and output name, then prefixes the
/// handler's fragment with a comment describing the data flow.
pub fn emit_operator(
    node: &OperatorNode,
    bindings: &mut VarBinding,
    ctx: &CodegenContext,
) -> Result<String> {
    let kind = OpKind::from_op_type(&node.op_type)?;
    let codegen = kind.codegen();
    codegen.validate(node)?;

    let names = BoundNames {
        inputs: node.inputs.iter().map(|name| bindings.bind(name)).collect(),
        outputs: node.outputs.iter().map(|name| bindings.bind(name)).collect(),
    };
    debug!(
        "Emitting {} node: {:?} -> {:?}",
        kind, names.inputs, names.outputs
    );

    let mut code = comment(
        &ctx.prefix(),
        &format!(
            "{}: [{}] -> [{}]",
            kind,
            names.inputs.join(", "),
            names.outputs.join(", ")
        ),
    );
    code.push_str(&codegen.emit(node, &names, ctx)?);
    Ok(code)
}
