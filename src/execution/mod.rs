pub mod backend;
pub mod context;
pub mod engine;

pub use backend::{Backend, BackendEmitter, EmitterState};
pub use context::{ArtifactWriter, NumericMode, TranslationContext, TranslationOptions};
pub use engine::{GraphWalker, Translator};
