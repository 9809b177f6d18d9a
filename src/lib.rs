//! Random variate generators used by spatial occupancy models.
//!
//! - [`DenseMultivariateNormal`]: normal draws from a dense covariance matrix.
//! - [`GaussianMarkovRandomField`]: normal draws from a precision matrix.
//! - [`PolyaGamma`]: PG(h, z) draws for logistic data augmentation.
//!
//! The matrix samplers may reuse the caller's matrix as scratch space for the
//! Cholesky factor, which is controlled by their `overwrite` argument.

pub(crate) mod devroye;
pub(crate) mod error;
pub(crate) mod gmrf;
pub(crate) mod linalg;
pub(crate) mod mvnorm;
pub(crate) mod polyagamma;
pub(crate) mod values;

pub use error::{DistError, Result};
pub use gmrf::GaussianMarkovRandomField;
pub use mvnorm::{DenseMultivariateNormal, MvnSettings};
pub use polyagamma::{Method, PolyaGamma, PolyaGammaSettings, DEVROYE_MAX_SHAPE};
pub use values::{DType, Doubles, Sample, Values};
