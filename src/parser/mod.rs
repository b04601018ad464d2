pub mod program_loader;

pub use program_loader::{LoadedProgram, ProgramLoader};
