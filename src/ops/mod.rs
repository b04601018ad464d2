pub mod registry;
pub mod attributes;
pub mod tensor;
pub mod activations;

pub use registry::{emit_operator, BoundNames, CodegenContext, OpKind, OperatorCodegen};

// Module files for math subdirectory
pub mod math {
    pub mod gemm;
}

// Module files for nn subdirectory
pub mod nn {
    pub mod batchnorm;
    pub mod conv;
    pub mod padding;
    pub mod pool;
}
