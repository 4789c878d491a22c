use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Uint8,
    Int64,
    Float32,
    Float64,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::Uint8 => "uint8",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub fn size(&self) -> usize {
        match self {
            DType::Uint8 => 1,
            DType::Float32 => 4,
            DType::Int64 | DType::Float64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported dtype: {0}")]
pub struct UnknownDType(pub String);

impl FromStr for DType {
    type Err = UnknownDType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uint8" => Ok(DType::Uint8),
            "int64" => Ok(DType::Int64),
            "float32" => Ok(DType::Float32),
            "float64" => Ok(DType::Float64),
            other => Err(UnknownDType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArrayError {
    #[error("shape {shape:?} with dtype {dtype} needs {expected} bytes, got {actual}")]
    LengthMismatch {
        shape: Vec<usize>,
        dtype: DType,
        expected: usize,
        actual: usize,
    },
    #[error("array has dtype {actual}, expected {expected}")]
    WrongDType { expected: DType, actual: DType },
}

/// Row-major array payload. Multi-byte elements are stored little-endian.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    dtype: DType,
    data: Vec<u8>,
}

impl NdArray {
    pub fn from_bytes(shape: Vec<usize>, dtype: DType, data: Vec<u8>) -> Result<Self, ArrayError> {
        let expected = shape.iter().product::<usize>() * dtype.size();
        if data.len() != expected {
            return Err(ArrayError::LengthMismatch {
                shape,
                dtype,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, dtype, data })
    }

    pub fn from_f32(shape: Vec<usize>, values: &[f32]) -> Result<Self, ArrayError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(shape, DType::Float32, data)
    }

    pub fn from_u8(shape: Vec<usize>, values: Vec<u8>) -> Result<Self, ArrayError> {
        Self::from_bytes(shape, DType::Uint8, values)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn to_f32_vec(&self) -> Result<Vec<f32>, ArrayError> {
        match self.dtype {
            DType::Float32 => Ok(self
                .data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()),
            DType::Float64 => Ok(self
                .data
                .chunks_exact(8)
                .map(|c| {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(c);
                    f64::from_le_bytes(buf) as f32
                })
                .collect()),
            DType::Uint8 => Ok(self.data.iter().map(|&b| b as f32).collect()),
            actual => Err(ArrayError::WrongDType {
                expected: DType::Float32,
                actual,
            }),
        }
    }
}
