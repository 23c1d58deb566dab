//! Core value types for cloudpipe
//!
//! # Main Types
//!
//! - [`DataType`] - Numeric storage type of a point dimension (int8 .. float64)
//! - [`Bounds`] - Axis-aligned 3-D box used by cropping and synthetic readers
//!
//! Values stored in point buffers are little-endian. Every dimension is
//! exchanged as `f64` at the API boundary; integer types round to the nearest
//! value and saturate at the type's range when written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage type of a single point dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    #[default]
    Float64,
}

impl DataType {
    /// Returns the size in bytes of this type
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Uint64 | DataType::Float64 => 8,
        }
    }

    /// Canonical lowercase name, as used in text formats
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Decode a little-endian value into an f64.
    ///
    /// Returns `None` if `bytes` is shorter than [`DataType::size_bytes`].
    pub fn decode_f64(&self, bytes: &[u8]) -> Option<f64> {
        if bytes.len() < self.size_bytes() {
            return None;
        }

        Some(match self {
            DataType::Int8 => bytes[0] as i8 as f64,
            DataType::Uint8 => bytes[0] as f64,
            DataType::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            DataType::Uint16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            DataType::Int32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            DataType::Uint32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            DataType::Float32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            DataType::Int64 => i64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as f64,
            DataType::Uint64 => u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as f64,
            DataType::Float64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        })
    }

    /// Encode `value` little-endian into the front of `out`.
    ///
    /// Returns `false` (and writes nothing) if `out` is too short.
    pub fn encode_f64(&self, value: f64, out: &mut [u8]) -> bool {
        let size = self.size_bytes();
        if out.len() < size {
            return false;
        }

        // `as` casts from f64 saturate, NaN maps to zero.
        let rounded = value.round();
        match self {
            DataType::Int8 => out[..size].copy_from_slice(&(rounded as i8).to_le_bytes()),
            DataType::Uint8 => out[..size].copy_from_slice(&(rounded as u8).to_le_bytes()),
            DataType::Int16 => out[..size].copy_from_slice(&(rounded as i16).to_le_bytes()),
            DataType::Uint16 => out[..size].copy_from_slice(&(rounded as u16).to_le_bytes()),
            DataType::Int32 => out[..size].copy_from_slice(&(rounded as i32).to_le_bytes()),
            DataType::Uint32 => out[..size].copy_from_slice(&(rounded as u32).to_le_bytes()),
            DataType::Int64 => out[..size].copy_from_slice(&(rounded as i64).to_le_bytes()),
            DataType::Uint64 => out[..size].copy_from_slice(&(rounded as u64).to_le_bytes()),
            DataType::Float32 => out[..size].copy_from_slice(&(value as f32).to_le_bytes()),
            DataType::Float64 => out[..size].copy_from_slice(&value.to_le_bytes()),
        }
        true
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" | "i8" => Ok(DataType::Int8),
            "int16" | "i16" => Ok(DataType::Int16),
            "int32" | "i32" => Ok(DataType::Int32),
            "int64" | "i64" => Ok(DataType::Int64),
            "uint8" | "u8" => Ok(DataType::Uint8),
            "uint16" | "u16" => Ok(DataType::Uint16),
            "uint32" | "u32" => Ok(DataType::Uint32),
            "uint64" | "u64" => Ok(DataType::Uint64),
            "float32" | "f32" | "float" => Ok(DataType::Float32),
            "float64" | "f64" | "double" => Ok(DataType::Float64),
            other => Err(format!("unknown data type '{}'", other)),
        }
    }
}

/// Axis-aligned 3-D bounding box.
///
/// Containment is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn new(minx: f64, miny: f64, minz: f64, maxx: f64, maxy: f64, maxz: f64) -> Self {
        Self {
            min: [minx, miny, minz],
            max: [maxx, maxy, maxz],
        }
    }

    /// True if any axis has `min > max`.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.min[0]
            && x <= self.max[0]
            && y >= self.min[1]
            && y <= self.max[1]
            && z >= self.min[2]
            && z <= self.max[2]
    }

    /// Extent along each axis.
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0)
    }
}

/// Canonical form: `([minx, maxx], [miny, maxy], [minz, maxz])`
impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "([{}, {}], [{}, {}], [{}, {}])",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2]
        )
    }
}

impl FromStr for Bounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("bounds '{}' must be wrapped in parentheses", s.trim()))?;

        let mut ranges = Vec::with_capacity(3);
        let mut rest = inner.trim();
        while !rest.is_empty() {
            let open = rest
                .strip_prefix('[')
                .ok_or_else(|| format!("expected '[' in bounds '{}'", s.trim()))?;
            let close = open
                .find(']')
                .ok_or_else(|| format!("unterminated range in bounds '{}'", s.trim()))?;

            let (lo, hi) = open[..close]
                .split_once(',')
                .ok_or_else(|| format!("range '[{}]' needs two values", &open[..close]))?;
            let lo: f64 = lo
                .trim()
                .parse()
                .map_err(|_| format!("invalid number '{}' in bounds", lo.trim()))?;
            let hi: f64 = hi
                .trim()
                .parse()
                .map_err(|_| format!("invalid number '{}' in bounds", hi.trim()))?;
            ranges.push((lo, hi));

            rest = open[close + 1..].trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
        }

        match ranges.as_slice() {
            [(minx, maxx), (miny, maxy), (minz, maxz)] => {
                Ok(Bounds::new(*minx, *miny, *minz, *maxx, *maxy, *maxz))
            }
            _ => Err(format!(
                "bounds '{}' must have exactly 3 ranges, found {}",
                s.trim(),
                ranges.len()
            )),
        }
    }
}
