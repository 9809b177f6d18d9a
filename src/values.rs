//! Dynamically typed parameter values for the elementwise samplers.
//!
//! Parameters are either a scalar or a one-dimensional array. Arrays keep their element
//! type so that integer arrays can be rejected instead of silently converted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DistError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Double,
    Long,
    Int,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Double => "double",
            DType::Long => "long",
            DType::Int => "int",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Values<'a> {
    Scalar(f64),
    Doubles(&'a [f64]),
    Longs(&'a [i64]),
    Ints(&'a [i32]),
}

impl<'a> Values<'a> {
    pub fn dtype(&self) -> DType {
        match self {
            Values::Scalar(_) | Values::Doubles(_) => DType::Double,
            Values::Longs(_) => DType::Long,
            Values::Ints(_) => DType::Int,
        }
    }

    /// Number of elements, or `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            Values::Scalar(_) => None,
            Values::Doubles(vals) => Some(vals.len()),
            Values::Longs(vals) => Some(vals.len()),
            Values::Ints(vals) => Some(vals.len()),
        }
    }

    /// View the values as doubles, rejecting integer arrays.
    pub fn as_doubles(&self) -> Result<Doubles<'a>> {
        match *self {
            Values::Scalar(val) => Ok(Doubles::Scalar(val)),
            Values::Doubles(vals) => Ok(Doubles::Slice(vals)),
            Values::Longs(_) | Values::Ints(_) => Err(DistError::DTypeMismatch {
                expected: DType::Double,
                got: self.dtype(),
            }),
        }
    }
}

impl From<f64> for Values<'_> {
    fn from(val: f64) -> Self {
        Values::Scalar(val)
    }
}

impl From<i64> for Values<'_> {
    fn from(val: i64) -> Self {
        Values::Scalar(val as f64)
    }
}

impl From<i32> for Values<'_> {
    fn from(val: i32) -> Self {
        Values::Scalar(val.into())
    }
}

impl<'a> From<&'a [f64]> for Values<'a> {
    fn from(vals: &'a [f64]) -> Self {
        Values::Doubles(vals)
    }
}

impl<'a> From<&'a mut [f64]> for Values<'a> {
    fn from(vals: &'a mut [f64]) -> Self {
        Values::Doubles(vals)
    }
}

impl<'a> From<&'a Vec<f64>> for Values<'a> {
    fn from(vals: &'a Vec<f64>) -> Self {
        Values::Doubles(vals)
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for Values<'a> {
    fn from(vals: &'a [f64; N]) -> Self {
        Values::Doubles(vals)
    }
}

impl<'a> From<&'a [i64]> for Values<'a> {
    fn from(vals: &'a [i64]) -> Self {
        Values::Longs(vals)
    }
}

impl<'a> From<&'a Vec<i64>> for Values<'a> {
    fn from(vals: &'a Vec<i64>) -> Self {
        Values::Longs(vals)
    }
}

impl<'a, const N: usize> From<&'a [i64; N]> for Values<'a> {
    fn from(vals: &'a [i64; N]) -> Self {
        Values::Longs(vals)
    }
}

impl<'a> From<&'a [i32]> for Values<'a> {
    fn from(vals: &'a [i32]) -> Self {
        Values::Ints(vals)
    }
}

impl<'a> From<&'a Vec<i32>> for Values<'a> {
    fn from(vals: &'a Vec<i32>) -> Self {
        Values::Ints(vals)
    }
}

impl<'a, const N: usize> From<&'a [i32; N]> for Values<'a> {
    fn from(vals: &'a [i32; N]) -> Self {
        Values::Ints(vals)
    }
}

/// Parameter values that passed the element type check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Doubles<'a> {
    Scalar(f64),
    Slice(&'a [f64]),
}

impl Doubles<'_> {
    pub fn len(&self) -> Option<usize> {
        match self {
            Doubles::Scalar(_) => None,
            Doubles::Slice(vals) => Some(vals.len()),
        }
    }

    /// Element `i` under broadcasting: scalars repeat.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        match self {
            Doubles::Scalar(val) => *val,
            Doubles::Slice(vals) => vals[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let (scalar, slice) = match self {
            Doubles::Scalar(val) => (Some(*val), &[][..]),
            Doubles::Slice(vals) => (None, *vals),
        };
        scalar.into_iter().chain(slice.iter().copied())
    }
}

/// Length of the broadcast of two parameter sets, `None` if both are scalars.
pub(crate) fn broadcast_len(left: &Doubles, right: &Doubles) -> Result<Option<usize>> {
    match (left.len(), right.len()) {
        (None, None) => Ok(None),
        (Some(n), None) | (None, Some(n)) => Ok(Some(n)),
        (Some(n), Some(m)) if n == m => Ok(Some(n)),
        (Some(n), Some(m)) => Err(DistError::ShapeMismatch { left: n, right: m }),
    }
}

/// Output of an elementwise sampler, shaped like the broadcast of its inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Sample {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Sample::Scalar(val) => Some(*val),
            Sample::Vector(_) => None,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Sample::Scalar(val) => std::slice::from_ref(val),
            Sample::Vector(vals) => vals,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        match self {
            Sample::Scalar(val) => vec![val],
            Sample::Vector(vals) => vals,
        }
    }
}
