use crate::error::Result;
use crate::model::OperatorNode;
use crate::ops::attributes::{check_arity, require_ints_attribute};
use crate::ops::nn::padding::{resolve_padding, spatial_dims};
use crate::ops::registry::{BoundNames, CodegenContext, OperatorCodegen};

/// Pooling type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolType {
    Max,
    Average,
}

/// Base struct for windowed pooling operators
#[derive(Debug, Clone)]
pub struct PoolingBase {
    pool_type: PoolType,
}

/// MaxPool operator
#[derive(Debug, Clone, Default)]
pub struct MaxPool;

/// AveragePool operator
#[derive(Debug, Clone, Default)]
pub struct AveragePool;

/// GlobalAveragePool operator
#[derive(Debug, Clone, Default)]
pub struct GlobalAveragePool;

impl PoolingBase {
    fn new(pool_type: PoolType) -> Self {
        Self { pool_type }
    }

    fn layer(&self) -> &'static str {
        match self.pool_type {
            PoolType::Max => "MaxPool2D",
            PoolType::Average => "AvgPool2D",
        }
    }

    fn validate_impl(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 1, 1, 1)?;
        require_ints_attribute(node, "kernel_shape", 2)?;
        require_ints_attribute(node, "strides", 2)?;
        Ok(())
    }

    /// `new Pool<T>(kernel, pad, stride)`
    fn emit_impl(&self, node: &OperatorNode, ctx: &CodegenContext) -> Result<String> {
        let kernel = require_ints_attribute(node, "kernel_shape", 2)?;
        let strides = require_ints_attribute(node, "strides", 2)?;
        let pad = resolve_padding(node, ctx.value_info)?.scalar(&node.op_type);

        Ok(format!(
            "{}new {}<{}>({}, {}, {}),\n",
            ctx.prefix(),
            self.layer(),
            ctx.ty(),
            kernel[0],
            pad,
            strides[0]
        ))
    }
}

impl OperatorCodegen for MaxPool {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        PoolingBase::new(PoolType::Max).validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        PoolingBase::new(PoolType::Max).emit_impl(node, ctx)
    }
}

impl OperatorCodegen for AveragePool {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        PoolingBase::new(PoolType::Average).validate_impl(node)
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        PoolingBase::new(PoolType::Average).emit_impl(node, ctx)
    }
}

impl OperatorCodegen for GlobalAveragePool {
    fn validate(&self, node: &OperatorNode) -> Result<()> {
        check_arity(node, 1, 1, 1)
    }

    fn emit(&self, node: &OperatorNode, _names: &BoundNames, ctx: &CodegenContext) -> Result<String> {
        let [h, w] = spatial_dims(ctx.value_info, &node.inputs[0])?;
        Ok(format!(
            "{}new GlobalAvgPool2D<{}>({}, {}),\n",
            ctx.prefix(),
            ctx.ty(),
            h,
            w
        ))
    }
}
