use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use strum_macros::{Display, EnumString};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::execution::backend::Backend;
use crate::model::{ValueInfo, VarBinding};
use crate::ops::registry::CodegenContext;

/// Numeric encoding the generated program computes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum NumericMode {
    /// Unsigned fixed-point over 64-bit rings
    #[strum(serialize = "u64")]
    UnsignedFixed,
    /// Signed fixed-point over 64-bit integers
    #[strum(serialize = "i64")]
    SignedFixed,
    /// Plain floating point
    #[strum(serialize = "float")]
    Float,
}

impl NumericMode {
    /// Parse a mode identifier such as `u64`
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_str(value).map_err(|_| {
            Error::InvalidMode(format!("{} (expected one of u64, i64, float)", value))
        })
    }

    /// Element type the runtime templates are instantiated with
    pub fn cpp_type(&self) -> &'static str {
        match self {
            NumericMode::UnsignedFixed => "u64",
            NumericMode::SignedFixed => "i64",
            NumericMode::Float => "float",
        }
    }

    pub fn is_fixed_point(&self) -> bool {
        !matches!(self, NumericMode::Float)
    }
}

/// Options for a translation run
#[derive(Debug, Clone)]
pub struct TranslationOptions {
    /// Numeric mode of the generated program
    pub mode: NumericMode,
    /// Fractional bits of the fixed-point encoding
    pub scale: Option<u32>,
    /// Target runtime
    pub backend: Backend,
    /// Override for lifetime-scheduled deallocation (None = backend default)
    pub deallocation: Option<bool>,
    /// One level of indentation in the generated source
    pub indent_unit: String,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            mode: NumericMode::Float,
            scale: None,
            backend: Backend::Cleartext,
            deallocation: None,
            indent_unit: "    ".to_string(),
        }
    }
}

impl TranslationOptions {
    /// Create a new translation options object
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the numeric mode
    pub fn set_mode(mut self, mode: NumericMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the fixed-point scale
    pub fn set_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the target backend
    pub fn set_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Force lifetime-scheduled deallocation on or off
    pub fn enable_deallocation(mut self, enable: bool) -> Self {
        self.deallocation = Some(enable);
        self
    }

    /// Set the indentation unit
    pub fn set_indent_unit(mut self, unit: &str) -> Self {
        self.indent_unit = unit.to_string();
        self
    }

    /// Scale threaded into truncations and input encoding
    pub fn effective_scale(&self) -> u32 {
        self.scale.unwrap_or(0)
    }

    pub fn deallocation_enabled(&self) -> bool {
        self.deallocation
            .unwrap_or_else(|| self.backend.schedules_deallocation())
    }

    /// Check the combination of options before anything is emitted
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_fixed_point() && self.scale.is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "Numeric mode {} requires a fixed-point scale",
                self.mode
            )));
        }

        if !self.backend.supports_mode(self.mode) {
            return Err(Error::InvalidConfiguration(format!(
                "Backend {} does not support numeric mode {}",
                self.backend, self.mode
            )));
        }

        Ok(())
    }
}

/// In-memory state of one translation run.
///
/// Fragments are buffered per section and only assembled once the whole
/// program has been walked.
pub struct TranslationContext<'a> {
    options: &'a TranslationOptions,
    value_info: &'a ValueInfo,
    bindings: VarBinding,
    inputs: String,
    body: String,
    outputs: String,
}

impl<'a> TranslationContext<'a> {
    pub fn new(options: &'a TranslationOptions, value_info: &'a ValueInfo, bindings: VarBinding) -> Self {
        Self {
            options,
            value_info,
            bindings,
            inputs: String::new(),
            body: String::new(),
            outputs: String::new(),
        }
    }

    pub fn options(&self) -> &TranslationOptions {
        self.options
    }

    pub fn bindings(&self) -> &VarBinding {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut VarBinding {
        &mut self.bindings
    }

    /// Split borrow: codegen parameters for the given nesting level plus the bindings
    pub fn codegen_parts(&mut self, level: usize) -> (CodegenContext<'_>, &mut VarBinding) {
        let ctx = CodegenContext {
            value_info: self.value_info,
            mode: self.options.mode,
            scale: self.options.effective_scale(),
            indent_unit: &self.options.indent_unit,
            level,
        };
        (ctx, &mut self.bindings)
    }

    pub fn push_input(&mut self, code: &str) {
        self.inputs.push_str(code);
    }

    pub fn push_body(&mut self, code: &str) {
        self.body.push_str(code);
    }

    pub fn push_output(&mut self, code: &str) {
        self.outputs.push_str(code);
    }

    pub fn inputs(&self) -> &str {
        &self.inputs
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn outputs(&self) -> &str {
        &self.outputs
    }
}

/// Writes a generated artifact atomically.
///
/// The text is staged in a temporary file next to the destination and only
/// renamed into place by `commit`. Dropping the writer discards the staged file.
pub struct ArtifactWriter {
    staged: Option<NamedTempFile>,
    destination: PathBuf,
}

impl ArtifactWriter {
    /// Create a writer for the given destination path
    pub fn create(destination: &Path) -> Result<Self> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let staged = NamedTempFile::new_in(dir)?;
        Ok(Self {
            staged: Some(staged),
            destination: destination.to_path_buf(),
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Append text to the staged file
    pub fn write_all(&mut self, text: &str) -> Result<()> {
        match self.staged.as_mut() {
            Some(file) => {
                file.write_all(text.as_bytes())?;
                Ok(())
            }
            None => Err(Error::InvalidConfiguration(
                "Artifact writer already committed".to_string(),
            )),
        }
    }

    /// Flush and move the staged file into place
    pub fn commit(mut self) -> Result<PathBuf> {
        let mut staged = self.staged.take().ok_or_else(|| {
            Error::InvalidConfiguration("Artifact writer already committed".to_string())
        })?;

        staged.flush()?;
        staged
            .persist(&self.destination)
            .map_err(|e| Error::IoError(e.error))?;

        Ok(self.destination.clone())
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        // The temporary file removes itself when dropped
        if self.staged.take().is_some() {
            debug!("Discarding uncommitted artifact for {}", self.destination.display());
        }
    }
}
