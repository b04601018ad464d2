//! Backend-specific framing of the generated program.
//!
//! Emission runs through a fixed sequence of states:
//! `Preamble -> Body -> Postamble -> Done`. Each step may only be taken once
//! and in that order.

use std::fmt::Write as _;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::emit::{brace_list, comment, indent};
use crate::error::{Error, Result};
use crate::execution::context::{NumericMode, TranslationOptions};
use crate::model::{Program, TensorRef, VarBinding};

/// Target runtime of the generated program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Backend {
    /// Plaintext reference implementation
    Cleartext,
    /// Function-secret-sharing protocol over fixed-point rings
    Llama,
    /// Secure floating point
    Secfloat,
}

impl Backend {
    /// Parse a backend identifier such as `LLAMA`
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_str(value).map_err(|_| {
            Error::UnknownBackend(format!(
                "{} (expected one of CLEARTEXT, LLAMA, SECFLOAT)",
                value
            ))
        })
    }

    pub fn is_secure(&self) -> bool {
        !matches!(self, Backend::Cleartext)
    }

    /// Whether dead tensors are released by default
    pub fn schedules_deallocation(&self) -> bool {
        self.is_secure()
    }

    pub fn supports_mode(&self, mode: NumericMode) -> bool {
        match self {
            Backend::Cleartext => true,
            Backend::Llama => mode.is_fixed_point(),
            Backend::Secfloat => mode == NumericMode::Float,
        }
    }

    fn includes(&self) -> &'static [&'static str] {
        match self {
            Backend::Cleartext => &[
                "<iostream>",
                "<vector>",
                "<cmath>",
                "<iomanip>",
                "<sytorch/backend/cleartext.h>",
                "<sytorch/layers/layers.h>",
                "<sytorch/module.h>",
            ],
            Backend::Llama => &[
                "<sytorch/backend/llama_extended.h>",
                "<sytorch/layers/layers.h>",
                "<sytorch/module.h>",
                "<llama/utils.h>",
                "<llama/api.h>",
            ],
            Backend::Secfloat => &[
                "<sytorch/backend/secfloat.h>",
                "<sytorch/layers/layers.h>",
                "<sytorch/module.h>",
            ],
        }
    }

    /// Statement that brings a graph input into the program.
    ///
    /// The plaintext backend loads inputs eagerly in its preamble, so it has
    /// nothing to emit here.
    pub fn input_statement(
        &self,
        tensor: &TensorRef,
        ident: &str,
        options: &TranslationOptions,
        level: usize,
    ) -> Option<String> {
        if !self.is_secure() {
            return None;
        }

        let prefix = indent(&options.indent_unit, level);
        let encoding = if options.mode.is_fixed_point() && tensor.data_type.is_floating_point() {
            ", scale"
        } else {
            ""
        };

        let mut code = comment(
            &prefix,
            &format!(
                "Declaration and Input for variable {} of shape {:?} as {}",
                tensor.name, tensor.shape, ident
            ),
        );
        let _ = writeln!(
            code,
            "{}auto {} = take_input<{}>({}, {}{});",
            prefix,
            ident,
            options.mode.cpp_type(),
            tensor.party,
            brace_list(&tensor.shape),
            encoding
        );
        Some(code)
    }

    /// Statement revealing a graph output to its party
    pub fn output_statement(
        &self,
        tensor: &TensorRef,
        ident: &str,
        options: &TranslationOptions,
        level: usize,
    ) -> String {
        let prefix = indent(&options.indent_unit, level);
        let mut code = comment(
            &prefix,
            &format!(
                "Output of variable '{}' of shape {:?} as {} to {}",
                tensor.name, tensor.shape, ident, tensor.party
            ),
        );
        let _ = writeln!(
            code,
            "{}reveal_output({}, model.tensor(\"{}\"));",
            prefix, tensor.party, ident
        );
        code
    }
}

/// Emission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Preamble,
    Body,
    Postamble,
    Done,
}

/// Wraps the operator pipeline with backend-specific setup and teardown
pub struct BackendEmitter<'a> {
    options: &'a TranslationOptions,
    state: EmitterState,
    code: String,
}

impl<'a> BackendEmitter<'a> {
    pub fn new(options: &'a TranslationOptions) -> Self {
        Self {
            options,
            state: EmitterState::Preamble,
            code: String::new(),
        }
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    fn advance(&mut self, expected: EmitterState, next: EmitterState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidConfiguration(format!(
                "Backend emitter expected state {:?}, found {:?}",
                expected, self.state
            )));
        }
        self.state = next;
        Ok(())
    }

    fn prefix(&self, level: usize) -> String {
        indent(&self.options.indent_unit, level)
    }

    /// Includes, entry point and runtime initialization.
    ///
    /// The plaintext backend also loads every graph input here, binding their
    /// identifiers ahead of the body.
    pub fn emit_preamble(&mut self, program: &Program, bindings: &mut VarBinding) -> Result<()> {
        self.advance(EmitterState::Preamble, EmitterState::Body)?;

        let backend = self.options.backend;
        let ty = self.options.mode.cpp_type();
        let p1 = self.prefix(1);

        for include in backend.includes() {
            let _ = writeln!(self.code, "#include {}", include);
        }
        let _ = writeln!(self.code);
        let _ = writeln!(self.code, "int main(int __argc, char **__argv) {{");

        if backend.is_secure() {
            let _ = writeln!(self.code, "{}sytorch_init();", p1);
            let _ = writeln!(self.code, "{}const u64 scale = {};", p1, self.options.effective_scale());
            let _ = writeln!(self.code, "{}int party = atoi(__argv[1]);", p1);
            let _ = writeln!(
                self.code,
                "{}auto *backend = init_backend<{}>(\"{}\", party);",
                p1, ty, backend
            );
        } else {
            let _ = writeln!(self.code, "{}const u64 scale = {};", p1, self.options.effective_scale());
            let _ = writeln!(self.code, "{}prngWeights.SetSeed(osuCrypto::toBlock(time(NULL)));", p1);
            let _ = writeln!(self.code, "{}prng.SetSeed(osuCrypto::toBlock(time(NULL)));", p1);

            for tensor in program.inputs() {
                let ident = bindings.bind(&tensor.name);
                let shape = brace_list(&tensor.shape);
                self.code.push_str(&comment(
                    &p1,
                    &format!("Input {} of shape {:?} as {}", tensor.name, tensor.shape, ident),
                ));
                let _ = writeln!(self.code, "{}Tensor<{}> {}({});", p1, ty, ident, shape);
                let _ = writeln!(
                    self.code,
                    "{}{}.load(read_input(\"{}\", {}), scale);",
                    p1, ident, tensor.name, shape
                );
            }
        }
        let _ = writeln!(self.code);
        Ok(())
    }

    /// Input statements followed by the aggregate pipeline expression
    pub fn emit_body(&mut self, inputs: &str, pipeline: &str) -> Result<()> {
        self.advance(EmitterState::Body, EmitterState::Postamble)?;

        let p1 = self.prefix(1);
        self.code.push_str(inputs);
        let _ = writeln!(
            self.code,
            "{}auto model = Sequential<{}>({{",
            p1,
            self.options.mode.cpp_type()
        );
        self.code.push_str(pipeline);
        let _ = writeln!(self.code, "{}}});", p1);
        let _ = writeln!(self.code);
        Ok(())
    }

    /// Parameter loading, forward pass, output reveal and printing
    pub fn emit_postamble(&mut self, program: &Program, forward_input: &str, outputs: &str) -> Result<()> {
        self.advance(EmitterState::Postamble, EmitterState::Done)?;

        let p1 = self.prefix(1);
        if self.options.backend.is_secure() {
            let _ = writeln!(self.code, "{}model.setBackend(backend);", p1);
            let _ = writeln!(
                self.code,
                "{}model.load(\"{}_weights.dat\", scale);",
                p1, program.name
            );
        } else {
            let _ = writeln!(self.code, "{}model.load(scale);", p1);
        }
        let _ = writeln!(self.code, "{}model.forward({});", p1, forward_input);
        let _ = writeln!(self.code);
        self.code.push_str(outputs);
        let _ = writeln!(self.code, "{}model.activation.print();", p1);
        let _ = writeln!(self.code, "{}return 0;", p1);
        let _ = writeln!(self.code, "}}");
        Ok(())
    }

    /// The complete program text
    pub fn finish(self) -> Result<String> {
        if self.state != EmitterState::Done {
            return Err(Error::InvalidConfiguration(format!(
                "Backend emitter finished in state {:?}",
                self.state
            )));
        }
        Ok(self.code)
    }
}
