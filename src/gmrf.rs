use faer::{Col, Mat};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    error::Result,
    linalg::{
        check_inputs, cholesky_solve_in_place, lower_factor, solve_lower_in_place,
        solve_lower_transposed_in_place,
    },
    mvnorm::{standard_normal_col, MvnSettings},
};

/// Gaussian Markov random field sampler parameterized by a precision matrix.
///
/// With `Q = L Lᵀ`, a draw is `mean + v` where `Lᵀ v = z` for standard
/// normal `z`, so that the draw has covariance `Q⁻¹` without inverting `Q`.
#[derive(Debug, Clone)]
pub struct GaussianMarkovRandomField<R: Rng = SmallRng> {
    rng: R,
    settings: MvnSettings,
}

impl GaussianMarkovRandomField<SmallRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl Default for GaussianMarkovRandomField<SmallRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> GaussianMarkovRandomField<R> {
    pub fn new(rng: R) -> Self {
        Self::with_settings(rng, MvnSettings::default())
    }

    pub fn with_settings(rng: R, settings: MvnSettings) -> Self {
        Self { rng, settings }
    }

    pub fn settings(&self) -> MvnSettings {
        self.settings
    }

    /// Draw one variate from `N(mean, prec⁻¹)`.
    ///
    /// If `overwrite_prec` is set, `prec` holds its lower Cholesky factor
    /// afterwards. Otherwise it is left untouched.
    pub fn rvs(
        &mut self,
        mean: &[f64],
        prec: &mut Mat<f64>,
        overwrite_prec: bool,
    ) -> Result<Col<f64>> {
        check_inputs(mean, prec, "precision")?;
        let factor = lower_factor(prec, overwrite_prec, "precision")?;
        Ok(self.draw(mean, &factor))
    }

    /// Like [`rvs`](Self::rvs), overwriting according to the sampler settings.
    pub fn rvs_default(&mut self, mean: &[f64], prec: &mut Mat<f64>) -> Result<Col<f64>> {
        let overwrite = self.settings.overwrite;
        self.rvs(mean, prec, overwrite)
    }

    /// Draw from the canonical parameterization `N(prec⁻¹ b, prec⁻¹)`.
    ///
    /// This is the form full conditionals take in conjugate Gibbs updates,
    /// the mean never has to be formed explicitly.
    pub fn rvs_canonical(
        &mut self,
        b: &[f64],
        prec: &mut Mat<f64>,
        overwrite_prec: bool,
    ) -> Result<Col<f64>> {
        check_inputs(b, prec, "precision")?;
        let factor = lower_factor(prec, overwrite_prec, "precision")?;

        let mut draw = Col::from_fn(b.len(), |i| b[i]);
        solve_lower_in_place(&factor, &mut draw);
        let z = standard_normal_col(&mut self.rng, b.len());
        draw.iter_mut().zip(z.iter()).for_each(|(w, z)| *w += z);
        solve_lower_transposed_in_place(&factor, &mut draw);
        Ok(draw)
    }

    /// Draw from `N(mean, prec⁻¹)` conditioned on the elements summing to zero.
    ///
    /// The unconstrained draw `x` is corrected by kriging:
    /// `x - prec⁻¹1 (1ᵀprec⁻¹1)⁻¹ 1ᵀx`.
    pub fn rvs_sum_to_zero(
        &mut self,
        mean: &[f64],
        prec: &mut Mat<f64>,
        overwrite_prec: bool,
    ) -> Result<Col<f64>> {
        check_inputs(mean, prec, "precision")?;
        let factor = lower_factor(prec, overwrite_prec, "precision")?;
        let mut draw = self.draw(mean, &factor);

        let mut correction = Col::<f64>::from_fn(mean.len(), |_| 1f64);
        cholesky_solve_in_place(&factor, &mut correction);
        let scale = draw.iter().sum::<f64>() / correction.iter().sum::<f64>();
        draw.iter_mut()
            .zip(correction.iter())
            .for_each(|(x, c)| *x -= c * scale);
        Ok(draw)
    }

    fn draw(&mut self, mean: &[f64], factor: &Mat<f64>) -> Col<f64> {
        let mut draw = standard_normal_col(&mut self.rng, mean.len());
        solve_lower_transposed_in_place(factor, &mut draw);
        draw.iter_mut().zip(mean).for_each(|(x, m)| *x += m);
        draw
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use faer::Mat;

    use super::*;
    use crate::{
        error::DistError,
        linalg::{cholesky, tests::random_spd},
    };

    #[test]
    fn draw_has_mean_dimension() {
        let mut dist = GaussianMarkovRandomField::from_seed(3);
        let mut prec = random_spd(5, 4);
        let draw = dist.rvs(&[0.; 5], &mut prec, true).unwrap();
        assert_eq!(draw.nrows(), 5);
    }

    #[test]
    fn overwrite_flag_controls_mutation() {
        let mut dist = GaussianMarkovRandomField::from_seed(8);
        let prec = random_spd(5, 12);

        let mut prec_copy = prec.clone();
        dist.rvs(&[0.; 5], &mut prec_copy, false).unwrap();
        assert_eq!(prec_copy, prec);

        dist.rvs(&[0.; 5], &mut prec_copy, true).unwrap();
        assert_ne!(prec_copy, prec);
    }

    #[test]
    fn failed_factorization_without_overwrite_leaves_input_alone() {
        let mut dist = GaussianMarkovRandomField::from_seed(0);
        let mut prec = Mat::<f64>::zeros(3, 3);
        prec[(0, 0)] = 4.;
        prec[(1, 0)] = 1.;
        let original = prec.clone();

        let err = dist.rvs(&[0.; 3], &mut prec, false).unwrap_err();
        assert_eq!(err, DistError::NotPositiveDefinite { name: "precision" });
        assert_eq!(prec, original);

        let err = dist.rvs(&[0.; 3], &mut prec, true).unwrap_err();
        assert_eq!(err, DistError::NotPositiveDefinite { name: "precision" });
    }

    #[test]
    fn overwritten_precision_holds_factor() {
        let mut dist = GaussianMarkovRandomField::from_seed(4);
        let prec = random_spd(4, 2);
        let mut reused = prec.clone();
        dist.rvs_sum_to_zero(&[0.; 4], &mut reused, true).unwrap();
        assert_eq!(reused, cholesky(&prec, "precision").unwrap());
    }

    #[test]
    fn dimension_mismatch_is_caught_before_overwriting() {
        let mut dist = GaussianMarkovRandomField::from_seed(0);
        let prec = random_spd(3, 3);
        let mut reused = prec.clone();
        let err = dist.rvs_canonical(&[1.; 2], &mut reused, true).unwrap_err();
        assert_eq!(
            err,
            DistError::DimensionMismatch {
                name: "precision",
                expected: 2,
                got: 3
            }
        );
        assert_eq!(reused, prec);
    }

    #[test]
    fn covariance_is_inverse_precision() {
        let mut dist = GaussianMarkovRandomField::from_seed(21);
        let mut prec = Mat::<f64>::zeros(2, 2);
        prec[(0, 0)] = 4.;
        prec[(1, 1)] = 0.25;

        let n = 20_000;
        let draws: Vec<_> = (0..n)
            .map(|_| dist.rvs(&[0., 10.], &mut prec.clone(), true).unwrap())
            .collect();
        let mean1 = draws.iter().map(|d| d[1]).sum::<f64>() / n as f64;
        let var0 = draws.iter().map(|d| d[0] * d[0]).sum::<f64>() / n as f64;
        let var1 = draws.iter().map(|d| (d[1] - mean1).powi(2)).sum::<f64>() / n as f64;
        assert_abs_diff_eq!(mean1, 10., epsilon = 0.1);
        assert_abs_diff_eq!(var0, 0.25, epsilon = 0.02);
        assert_abs_diff_eq!(var1, 4., epsilon = 0.2);
    }

    #[test]
    fn canonical_mean() {
        let mut dist = GaussianMarkovRandomField::from_seed(2);
        let mut prec = Mat::<f64>::zeros(2, 2);
        prec[(0, 0)] = 2.;
        prec[(1, 1)] = 4.;

        let n = 20_000;
        let total = (0..n)
            .map(|_| {
                dist.rvs_canonical(&[2., 2.], &mut prec.clone(), false)
                    .unwrap()
            })
            .fold([0f64; 2], |acc, d| [acc[0] + d[0], acc[1] + d[1]]);
        assert_abs_diff_eq!(total[0] / n as f64, 1., epsilon = 0.03);
        assert_abs_diff_eq!(total[1] / n as f64, 0.5, epsilon = 0.03);
    }

    #[test]
    fn sum_to_zero_constraint() {
        let mut dist = GaussianMarkovRandomField::from_seed(17);
        let prec = random_spd(6, 5);
        for _ in 0..10 {
            let draw = dist
                .rvs_sum_to_zero(&[1., 2., 3., 4., 5., 6.], &mut prec.clone(), true)
                .unwrap();
            let total: f64 = (0..6).map(|i| draw[i]).sum();
            assert_abs_diff_eq!(total, 0., epsilon = 1e-9);
        }
    }
}
