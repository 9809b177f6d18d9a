use faer::{Col, Mat};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    linalg::{check_inputs, cholesky, lower_factor},
};

/// Settings shared by the matrix parameterized samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MvnSettings {
    /// Allow the sampler to replace the input matrix by its Cholesky factor
    /// instead of factorizing a copy.
    pub overwrite: bool,
}

impl Default for MvnSettings {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

pub(crate) fn standard_normal_col<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Col<f64> {
    Col::from_fn(n, |_| rng.sample(StandardNormal))
}

/// Multivariate normal sampler parameterized by a dense covariance matrix.
///
/// Draws are computed as `mean + L z`, where `L` is the lower Cholesky
/// factor of the covariance and `z` is standard normal.
#[derive(Debug, Clone)]
pub struct DenseMultivariateNormal<R: Rng = SmallRng> {
    rng: R,
    settings: MvnSettings,
}

impl DenseMultivariateNormal<SmallRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl Default for DenseMultivariateNormal<SmallRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> DenseMultivariateNormal<R> {
    pub fn new(rng: R) -> Self {
        Self::with_settings(rng, MvnSettings::default())
    }

    pub fn with_settings(rng: R, settings: MvnSettings) -> Self {
        Self { rng, settings }
    }

    pub fn settings(&self) -> MvnSettings {
        self.settings
    }

    /// Draw one variate from `N(mean, cov)`.
    ///
    /// If `overwrite_cov` is set, `cov` holds its lower Cholesky factor
    /// afterwards. Otherwise it is left untouched.
    pub fn rvs(
        &mut self,
        mean: &[f64],
        cov: &mut Mat<f64>,
        overwrite_cov: bool,
    ) -> Result<Col<f64>> {
        check_inputs(mean, cov, "covariance")?;
        let factor = lower_factor(cov, overwrite_cov, "covariance")?;

        let z = standard_normal_col(&mut self.rng, mean.len());
        let draw = &*factor * &z;
        Ok(Col::from_fn(mean.len(), |i| mean[i] + draw[i]))
    }

    /// Like [`rvs`](Self::rvs), overwriting according to the sampler settings.
    pub fn rvs_default(&mut self, mean: &[f64], cov: &mut Mat<f64>) -> Result<Col<f64>> {
        let overwrite = self.settings.overwrite;
        self.rvs(mean, cov, overwrite)
    }

    /// Draw `num_draws` independent variates, one per column.
    ///
    /// The covariance is factorized once and never modified.
    pub fn rvs_many(
        &mut self,
        mean: &[f64],
        cov: &Mat<f64>,
        num_draws: usize,
    ) -> Result<Mat<f64>> {
        check_inputs(mean, cov, "covariance")?;
        let factor = cholesky(cov, "covariance")?;

        let n = mean.len();
        let z = Mat::<f64>::from_fn(n, num_draws, |_, _| self.rng.sample(StandardNormal));
        let draws = &factor * &z;
        Ok(Mat::from_fn(n, num_draws, |i, j| mean[i] + draws[(i, j)]))
    }
}
