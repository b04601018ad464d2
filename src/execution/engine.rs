use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::execution::backend::{Backend, BackendEmitter};
use crate::execution::context::{ArtifactWriter, NumericMode, TranslationContext, TranslationOptions};
use crate::memory::{DeallocationSchedule, LifetimeScheduler};
use crate::model::{Program, ProgramNode, ValueInfo, VarBinding};
use crate::ops::emit_operator;

/// Nesting level of statements inside the entry point
const STATEMENT_LEVEL: usize = 1;
/// Nesting level of entries inside the pipeline expression
const PIPELINE_LEVEL: usize = 2;

/// Walks a program once, in order, dispatching every node to its emitter
pub struct GraphWalker<'p> {
    program: &'p Program,
    schedule: Option<DeallocationSchedule>,
}

impl<'p> GraphWalker<'p> {
    /// Create a walker; `deallocate` enables lifetime-scheduled releases
    pub fn new(program: &'p Program, deallocate: bool) -> Self {
        let schedule = if deallocate {
            Some(LifetimeScheduler::new().schedule(program))
        } else {
            None
        };

        Self { program, schedule }
    }

    pub fn schedule(&self) -> Option<&DeallocationSchedule> {
        self.schedule.as_ref()
    }

    /// Emit every node into the sections of `ctx`.
    ///
    /// Inputs go to the input section, operators and releases to the pipeline,
    /// outputs to the output section. The first failing node aborts the walk.
    pub fn walk(&self, ctx: &mut TranslationContext) -> Result<()> {
        for (node_id, node) in self.program.nodes.iter().enumerate() {
            match node {
                ProgramNode::Input(tensor) => {
                    let ident = ctx.bindings_mut().bind(&tensor.name);
                    let options = ctx.options();
                    if let Some(code) =
                        options.backend.input_statement(tensor, &ident, options, STATEMENT_LEVEL)
                    {
                        ctx.push_input(&code);
                    }
                }
                ProgramNode::Operator(op) => {
                    let code = {
                        let (codegen, bindings) = ctx.codegen_parts(PIPELINE_LEVEL);
                        emit_operator(op, bindings, &codegen)?
                    };
                    ctx.push_body(&code);
                    self.release_dead(node_id, ctx);
                }
                ProgramNode::Output(tensor) => {
                    let ident = ctx.bindings_mut().bind(&tensor.name);
                    let options = ctx.options();
                    let code = options
                        .backend
                        .output_statement(tensor, &ident, options, STATEMENT_LEVEL);
                    ctx.push_output(&code);
                }
            }
        }

        Ok(())
    }

    fn release_dead(&self, node_id: usize, ctx: &mut TranslationContext) {
        let Some(schedule) = &self.schedule else {
            return;
        };

        for name in schedule.dead_after(node_id) {
            let ident = ctx.bindings_mut().bind(name);
            debug!("Releasing {} ({}) after node {}", ident, name, node_id);

            let options = ctx.options();
            let code = format!(
                "{}new Free<{}>(\"{}\"),\n",
                options.indent_unit.repeat(PIPELINE_LEVEL),
                options.mode.cpp_type(),
                ident
            );
            ctx.push_body(&code);
        }
    }
}

/// Translates programs into source files for one backend and numeric mode
#[derive(Debug, Clone)]
pub struct Translator {
    options: TranslationOptions,
}

impl Translator {
    /// Create a translator; the options are validated before anything is emitted
    pub fn new(options: TranslationOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Create a translator from textual mode and backend identifiers
    pub fn from_identifiers(mode: &str, scale: Option<u32>, backend: &str) -> Result<Self> {
        let backend = Backend::parse(backend)?;
        let mode = NumericMode::parse(mode)?;

        let mut options = TranslationOptions::new().set_mode(mode).set_backend(backend);
        options.scale = scale;
        Self::new(options)
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    /// Path of the artifact for `model_name` under `out_dir`
    pub fn artifact_path(&self, out_dir: &Path, model_name: &str) -> PathBuf {
        out_dir.join(format!("{}_{}.cpp", model_name, self.options.backend))
    }

    /// Translate a program to the complete source text
    pub fn translate(&self, program: &Program, value_info: &ValueInfo, seed: VarBinding) -> Result<String> {
        let start = Instant::now();
        let first_input = program.inputs().next().ok_or_else(|| {
            Error::InvalidProgram(format!("Program {} has no input node", program.name))
        })?;

        info!(
            "Translating {} ({} nodes) for {} in {} mode",
            program.name,
            program.len(),
            self.options.backend,
            self.options.mode
        );

        let mut bindings = seed;
        let mut emitter = BackendEmitter::new(&self.options);
        emitter.emit_preamble(program, &mut bindings)?;

        let mut ctx = TranslationContext::new(&self.options, value_info, bindings);
        let walker = GraphWalker::new(program, self.options.deallocation_enabled());
        walker.walk(&mut ctx)?;
        if let Some(schedule) = walker.schedule() {
            debug!("Scheduled {} deallocations", schedule.total());
        }

        let forward_input = ctx
            .bindings()
            .get(&first_input.name)
            .ok_or_else(|| Error::UnknownTensor(first_input.name.clone()))?
            .to_string();

        emitter.emit_body(ctx.inputs(), ctx.body())?;
        emitter.emit_postamble(program, &forward_input, ctx.outputs())?;
        let code = emitter.finish()?;

        info!(
            "Translated {} into {} bytes in {:?}",
            program.name,
            code.len(),
            start.elapsed()
        );
        Ok(code)
    }

    /// Translate and write `<out_dir>/<name>_<BACKEND>.cpp`.
    ///
    /// Nothing is written unless the whole translation succeeds.
    pub fn export(
        &self,
        program: &Program,
        value_info: &ValueInfo,
        seed: VarBinding,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let code = self.translate(program, value_info, seed)?;

        let mut writer = ArtifactWriter::create(&self.artifact_path(out_dir, &program.name))?;
        debug!("Staging {} bytes for {}", code.len(), writer.destination().display());
        writer.write_all(&code)?;
        let path = writer.commit()?;

        info!("Wrote {}", path.display());
        Ok(path)
    }
}
