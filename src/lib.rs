pub mod parser;
pub mod error;
pub mod model;
pub mod emit;
pub mod layout;
pub mod ops;
pub mod memory;
pub mod execution;

// Re-export commonly used types
pub use model::{
    Attribute, DataType, NodeId, OperatorNode, Party, Program, ProgramNode, TensorInfo, TensorRef,
    ValueInfo, VarBinding,
};
pub use error::{Error, Result};
pub use layout::{ReshapeTranslator, TensorLayout};
pub use ops::registry::{emit_operator, OpKind, OperatorCodegen};
pub use memory::{DeallocationSchedule, LifetimeScheduler};
pub use execution::backend::{Backend, BackendEmitter};
pub use execution::context::{ArtifactWriter, NumericMode, TranslationOptions};
pub use execution::engine::{GraphWalker, Translator};
pub use parser::{LoadedProgram, ProgramLoader};
