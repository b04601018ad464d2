use std::fmt::{self, Write as _};

use ndarray::{indices, Dimension, IxDyn};

use crate::emit::{brace_list, indent};
use crate::error::{Error, Result};

/// A tensor layout defines the shape and strides of a tensor in memory.
/// It describes how the logical indices of a tensor are mapped to flat offsets.
#[derive(Clone, PartialEq, Eq)]
pub struct TensorLayout {
    /// The shape of the tensor (dimensions)
    shape: Vec<usize>,
    /// The strides of the tensor (number of elements to skip in each dimension)
    strides: Vec<usize>,
}

impl TensorLayout {
    /// Create a standard contiguous (row-major) layout for the given shape.
    pub fn contiguous_layout(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            strides: Self::compute_contiguous_strides(shape),
        }
    }

    /// Calculate contiguous strides for a given shape in row-major (C-style) order.
    /// e.g., for shape [2, 3, 4], strides would be [12, 4, 1]
    fn compute_contiguous_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Calculate the flat offset for the given multi-dimensional indices.
    pub fn index_of(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() != self.shape.len() {
            return Err(Error::ShapeMismatch(format!(
                "Index of rank {} used with tensor of rank {}",
                indices.len(),
                self.shape.len()
            )));
        }

        let mut offset = 0;
        for (axis, (&idx, &dim)) in indices.iter().zip(self.shape.iter()).enumerate() {
            if idx >= dim {
                return Err(Error::ShapeMismatch(format!(
                    "Index {} out of bounds for axis {} of size {}",
                    idx, axis, dim
                )));
            }
            offset += idx * self.strides[axis];
        }
        Ok(offset)
    }

    /// Decompose a flat offset into multi-dimensional indices by successive
    /// division and modulo with descending strides.
    pub fn unravel(&self, flat: usize) -> Result<Vec<usize>> {
        if flat >= self.num_elements() {
            return Err(Error::ShapeMismatch(format!(
                "Flat offset {} out of bounds for shape {:?}",
                flat, self.shape
            )));
        }

        let mut remainder = flat;
        let mut result = Vec::with_capacity(self.strides.len());
        for &stride in &self.strides {
            result.push(remainder / stride);
            remainder %= stride;
        }
        Ok(result)
    }
}

impl fmt::Debug for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorLayout(shape={:?}, strides={:?})", self.shape, self.strides)
    }
}

/// Index correspondence between two shapes with the same element count.
///
/// Walks the output tensor in row-major order, maps each output index to its
/// flat offset and unravels that offset against the input shape.
#[derive(Debug, Clone)]
pub struct ReshapeTranslator {
    input: TensorLayout,
    output: TensorLayout,
}

impl ReshapeTranslator {
    pub fn new(input_shape: &[usize], output_shape: &[usize]) -> Result<Self> {
        let input = TensorLayout::contiguous_layout(input_shape);
        let output = TensorLayout::contiguous_layout(output_shape);

        if input.num_elements() != output.num_elements() {
            return Err(Error::ShapeMismatch(format!(
                "Cannot reshape {:?} ({} elements) into {:?} ({} elements)",
                input_shape,
                input.num_elements(),
                output_shape,
                output.num_elements()
            )));
        }

        Ok(Self { input, output })
    }

    pub fn input(&self) -> &TensorLayout {
        &self.input
    }

    pub fn output(&self) -> &TensorLayout {
        &self.output
    }

    /// Input index holding the element written to `output_index`
    pub fn source_index(&self, output_index: &[usize]) -> Result<Vec<usize>> {
        let flat = self.output.index_of(output_index)?;
        self.input.unravel(flat)
    }

    /// For every output position in row-major order, the flat input offset it reads
    pub fn correspondence(&self) -> Result<Vec<usize>> {
        let mut result = Vec::with_capacity(self.output.num_elements());
        for index in indices(IxDyn(self.output.shape())) {
            let source = self.source_index(index.slice())?;
            result.push(self.input.index_of(&source)?);
        }
        Ok(result)
    }

    /// Emit nested loops that copy `input_var` into `output_var`.
    ///
    /// Nesting depth equals the output rank. `level` is the indentation of the
    /// outermost loop.
    pub fn emit_loops(&self, input_var: &str, output_var: &str, unit: &str, level: usize) -> String {
        let mut code = String::new();
        let out_rank = self.output.rank();

        for (axis, dim) in self.output.shape().iter().enumerate() {
            let _ = writeln!(
                code,
                "{}for (u64 i{axis} = 0; i{axis} < {dim}; ++i{axis}) {{",
                indent(unit, level + axis),
            );
        }

        let body = indent(unit, level + out_rank);
        let flat_terms: Vec<String> = self
            .output
            .strides()
            .iter()
            .enumerate()
            .map(|(axis, stride)| format!("i{} * {}", axis, stride))
            .collect();
        let flat_expr = if flat_terms.is_empty() {
            "0".to_string()
        } else {
            flat_terms.join(" + ")
        };
        let _ = writeln!(code, "{}u64 rem = {};", body, flat_expr);

        for (axis, stride) in self.input.strides().iter().enumerate() {
            let _ = writeln!(
                code,
                "{}u64 j{axis} = rem / {stride}; rem = rem % {stride};",
                body
            );
        }

        let out_idx: Vec<String> = (0..out_rank).map(|axis| format!("i{}", axis)).collect();
        let in_idx: Vec<String> = (0..self.input.rank()).map(|axis| format!("j{}", axis)).collect();
        let _ = writeln!(
            code,
            "{}{}({}) = {}({});",
            body,
            output_var,
            out_idx.join(", "),
            input_var,
            in_idx.join(", ")
        );

        for axis in (0..out_rank).rev() {
            let _ = writeln!(code, "{}}}", indent(unit, level + axis));
        }

        code
    }

    /// Output shape as an initializer list
    pub fn output_shape_list(&self) -> String {
        brace_list(self.output.shape())
    }
}
