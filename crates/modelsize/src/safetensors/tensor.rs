use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dtype::bytes_per_param;

/// Why a header entry could not be accounted as a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("tensor entry {name} is not an object")]
    NotAnObject { name: String },

    #[error("invalid shape format")]
    InvalidShape,

    #[error("invalid shape dimension at index {index}: {value}")]
    InvalidDimension { index: usize, value: String },

    #[error("parameter count overflows u64")]
    Overflow,
}

/// One tensor entry of a header, borrowed from the decoded JSON.
#[derive(Debug, Clone, Copy)]
pub struct TensorEntry<'a> {
    name: &'a str,
    fields: &'a Map<String, Value>,
}

impl<'a> TensorEntry<'a> {
    pub(crate) fn from_value(name: &'a str, value: &'a Value) -> Result<Self, TensorError> {
        match value {
            Value::Object(fields) => Ok(Self { name, fields }),
            _ => Err(TensorError::NotAnObject {
                name: name.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The `dtype` label, if it is a string.
    #[must_use]
    pub fn dtype(&self) -> Option<&'a str> {
        self.fields.get("dtype").and_then(Value::as_str)
    }

    /// The `shape` as non-negative integers.
    ///
    /// Integral floats such as `4096.0` are accepted. Anything else fails.
    pub fn shape(&self) -> Result<Vec<u64>, TensorError> {
        let raw = self
            .fields
            .get("shape")
            .and_then(Value::as_array)
            .ok_or(TensorError::InvalidShape)?;

        raw.iter()
            .enumerate()
            .map(|(index, dim)| {
                dimension(dim).ok_or_else(|| TensorError::InvalidDimension {
                    index,
                    value: dim.to_string(),
                })
            })
            .collect()
    }

    /// Resolve shape and dtype into a [`TensorSummary`].
    ///
    /// A missing dtype is summarized with an empty label and the default
    /// width of 4 bytes.
    pub fn summarize(&self) -> Result<TensorSummary, TensorError> {
        let shape = self.shape()?;
        let params = param_count(&shape).ok_or(TensorError::Overflow)?;
        let dtype = self.dtype().unwrap_or_default().to_string();
        let size_bytes = params
            .checked_mul(bytes_per_param(&dtype))
            .ok_or(TensorError::Overflow)?;

        Ok(TensorSummary {
            name: self.name.to_string(),
            shape,
            dtype,
            size_bytes,
        })
    }
}

fn dimension(value: &Value) -> Option<u64> {
    if let Some(dim) = value.as_u64() {
        return Some(dim);
    }
    let float = value.as_f64()?;
    (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64)
        .then_some(float as u64)
}

/// Product of all dimensions. An empty shape is a scalar with one parameter.
fn param_count(shape: &[u64]) -> Option<u64> {
    shape.iter().try_fold(1u64, |acc, &dim| acc.checked_mul(dim))
}

/// A resolved tensor: shape, dtype label and size in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorSummary {
    pub name: String,
    pub shape: Vec<u64>,
    pub dtype: String,
    pub size_bytes: u64,
}

impl TensorSummary {
    /// Number of scalar parameters.
    #[must_use]
    pub fn params(&self) -> u64 {
        // Checked in `summarize`.
        param_count(&self.shape).unwrap_or(u64::MAX)
    }
}
