use itertools::izip;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    devroye::{gamma_sum, pg_integer, pg_mean, pg_variance},
    error::{DistError, Result},
    values::{broadcast_len, Doubles, Sample, Values},
};

/// Largest integer shape sampled exactly when [`Method::Auto`] is selected.
const AUTO_DEVROYE_MAX_SHAPE: f64 = 50.;
/// Largest shape accepted by [`Method::Devroye`]. Each draw sums `h` exact
/// PG(1, z) variates, larger shapes belong to [`Method::Gamma`].
pub const DEVROYE_MAX_SHAPE: f64 = 10_000.;
const PAR_CHUNK_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// Exact sampling as a sum of `h` PG(1, z) draws. Requires integer `h`
    /// no larger than [`DEVROYE_MAX_SHAPE`].
    Devroye,
    /// Truncated sum of gamma variates, any `h > 0`.
    Gamma,
    /// Devroye for small integer `h`, Gamma otherwise.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyaGammaSettings {
    pub method: Method,
    /// Number of gamma terms kept by [`Method::Gamma`]
    pub truncation: usize,
}

impl Default for PolyaGammaSettings {
    fn default() -> Self {
        Self {
            method: Method::Auto,
            truncation: 200,
        }
    }
}

impl PolyaGammaSettings {
    fn validate(&self, h: f64) -> Result<()> {
        if !(h.is_finite() && h > 0.) {
            return Err(DistError::InvalidParameter {
                name: "shape",
                value: h,
            });
        }
        if self.method == Method::Devroye && (h.fract() != 0. || h > DEVROYE_MAX_SHAPE) {
            return Err(DistError::InvalidParameter {
                name: "shape",
                value: h,
            });
        }
        if self.truncation == 0 {
            return Err(DistError::InvalidParameter {
                name: "truncation",
                value: 0.,
            });
        }
        Ok(())
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R, h: f64, z: f64) -> Result<f64> {
        let exact = match self.method {
            Method::Devroye => true,
            Method::Gamma => false,
            Method::Auto => h.fract() == 0. && h <= AUTO_DEVROYE_MAX_SHAPE,
        };
        if exact {
            Ok(pg_integer(rng, h as u64, z))
        } else {
            gamma_sum(rng, h, z, self.truncation)
        }
    }
}

/// Polya-Gamma sampler for PG(h, z) with shape `h > 0` and rate (tilt) `z`.
///
/// Parameters broadcast against each other: scalars repeat, arrays must have
/// equal length. Arrays have to hold doubles, integer arrays are rejected.
#[derive(Debug, Clone)]
pub struct PolyaGamma<R: Rng = SmallRng> {
    rng: R,
    settings: PolyaGammaSettings,
}

impl PolyaGamma<SmallRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl Default for PolyaGamma<SmallRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> PolyaGamma<R> {
    pub fn new(rng: R) -> Self {
        Self::with_settings(rng, PolyaGammaSettings::default())
    }

    pub fn with_settings(rng: R, settings: PolyaGammaSettings) -> Self {
        Self { rng, settings }
    }

    pub fn settings(&self) -> PolyaGammaSettings {
        self.settings
    }

    /// Draw random variates, shaped like the broadcast of `shape` and `rate`.
    pub fn rvs<'a, 'b>(
        &mut self,
        shape: impl Into<Values<'a>>,
        rate: impl Into<Values<'b>>,
    ) -> Result<Sample> {
        let (shape, rate) = self.checked(shape.into(), rate.into())?;
        match broadcast_len(&shape, &rate)? {
            None => {
                let (h, z) = (shape.get(0), rate.get(0));
                Ok(Sample::Scalar(self.settings.draw(&mut self.rng, h, z)?))
            }
            Some(n) => {
                let mut out = vec![0f64; n];
                self.fill(&shape, &rate, &mut out)?;
                Ok(Sample::Vector(out))
            }
        }
    }

    /// Draw random variates into `out`.
    ///
    /// `out` must have the broadcast length of the parameters, two scalars
    /// broadcast to any length. Nothing is written if the parameters are invalid.
    pub fn rvs_into<'a, 'b>(
        &mut self,
        shape: impl Into<Values<'a>>,
        rate: impl Into<Values<'b>>,
        out: &mut [f64],
    ) -> Result<()> {
        let (shape, rate) = self.checked(shape.into(), rate.into())?;
        if let Some(n) = broadcast_len(&shape, &rate)? {
            if n != out.len() {
                return Err(DistError::OutputLength {
                    expected: n,
                    got: out.len(),
                });
            }
        }
        self.fill(&shape, &rate, out)
    }

    /// Draw `n` independent variates from PG(shape, rate).
    pub fn rvs_n(&mut self, shape: f64, rate: f64, n: usize) -> Result<Vec<f64>> {
        let mut out = vec![0f64; n];
        self.rvs_into(shape, rate, &mut out)?;
        Ok(out)
    }

    /// Like [`rvs`](Self::rvs), but draws chunks of the output in parallel.
    ///
    /// Each chunk gets its own ChaCha stream derived from a single seed taken
    /// from this sampler, so results do not depend on the number of threads.
    pub fn rvs_par<'a, 'b>(
        &mut self,
        shape: impl Into<Values<'a>>,
        rate: impl Into<Values<'b>>,
    ) -> Result<Sample> {
        let (shape, rate) = self.checked(shape.into(), rate.into())?;
        let Some(n) = broadcast_len(&shape, &rate)? else {
            let (h, z) = (shape.get(0), rate.get(0));
            return Ok(Sample::Scalar(self.settings.draw(&mut self.rng, h, z)?));
        };

        let seed: u64 = self.rng.random();
        let settings = self.settings;
        let mut out = vec![0f64; n];
        out.par_chunks_mut(PAR_CHUNK_SIZE)
            .enumerate()
            .try_for_each(|(chunk, out)| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(chunk as u64);
                let start = chunk * PAR_CHUNK_SIZE;
                out.iter_mut().enumerate().try_for_each(|(i, val)| {
                    *val = settings.draw(&mut rng, shape.get(start + i), rate.get(start + i))?;
                    Ok::<(), DistError>(())
                })
            })?;
        Ok(Sample::Vector(out))
    }

    /// Closed form expectation of PG(shape, rate).
    pub fn mean(shape: f64, rate: f64) -> f64 {
        pg_mean(shape, rate)
    }

    /// Closed form variance of PG(shape, rate).
    pub fn variance(shape: f64, rate: f64) -> f64 {
        pg_variance(shape, rate)
    }

    fn checked<'a, 'b>(
        &self,
        shape: Values<'a>,
        rate: Values<'b>,
    ) -> Result<(Doubles<'a>, Doubles<'b>)> {
        let shape = shape.as_doubles()?;
        let rate = rate.as_doubles()?;
        for h in shape.iter() {
            self.settings.validate(h)?;
        }
        if let Some(z) = rate.iter().find(|z| !z.is_finite()) {
            return Err(DistError::InvalidParameter {
                name: "rate",
                value: z,
            });
        }
        Ok((shape, rate))
    }

    fn fill(&mut self, shape: &Doubles, rate: &Doubles, out: &mut [f64]) -> Result<()> {
        let n = out.len();
        for (out, h, z) in izip!(
            out.iter_mut(),
            (0..n).map(|i| shape.get(i)),
            (0..n).map(|i| rate.get(i)),
        ) {
            *out = self.settings.draw(&mut self.rng, h, z)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::values::DType;

    #[test]
    fn scalar_draw_is_positive() {
        let mut dist = PolyaGamma::from_seed(0);
        let out = dist.rvs(1, 1).unwrap();
        assert!(out.as_scalar().unwrap() > 0.);
    }

    #[test]
    fn vectors_and_scalars_broadcast() {
        let mut dist = PolyaGamma::from_seed(1);
        let a = [1.; 5];
        assert_eq!(dist.rvs(&a, 0.5).unwrap().len(), 5);
        assert_eq!(dist.rvs(2., &a).unwrap().len(), 5);

        let err = dist.rvs(&a, &[1., 2.]).unwrap_err();
        assert_eq!(err, DistError::ShapeMismatch { left: 5, right: 2 });
    }

    #[test]
    fn output_length_is_checked() {
        let mut dist = PolyaGamma::from_seed(2);
        let mut out = [0f64; 3];
        let err = dist.rvs_into(&[1., 1.], 0., &mut out).unwrap_err();
        assert_eq!(err, DistError::OutputLength { expected: 2, got: 3 });
        assert_eq!(out, [0.; 3]);

        dist.rvs_into(1., 0., &mut out).unwrap();
        assert!(out.iter().all(|&x| x > 0.));
    }

    #[test]
    fn invalid_parameters() {
        let mut dist = PolyaGamma::from_seed(3);
        assert_eq!(
            dist.rvs(0., 1.).unwrap_err(),
            DistError::InvalidParameter {
                name: "shape",
                value: 0.
            }
        );
        assert!(matches!(
            dist.rvs(1., f64::NAN),
            Err(DistError::InvalidParameter { name: "rate", .. })
        ));

        let longs = [1i64, 2];
        assert_eq!(
            dist.rvs(1., &longs).unwrap_err(),
            DistError::DTypeMismatch {
                expected: DType::Double,
                got: DType::Long
            }
        );

        let mut exact = PolyaGamma::with_settings(
            SmallRng::seed_from_u64(0),
            PolyaGammaSettings {
                method: Method::Devroye,
                ..Default::default()
            },
        );
        assert!(exact.rvs(1.5, 0.).is_err());
        assert_eq!(
            exact.rvs(1e12, 0.).unwrap_err(),
            DistError::InvalidParameter {
                name: "shape",
                value: 1e12
            }
        );
        assert_eq!(
            exact.rvs_n(DEVROYE_MAX_SHAPE + 1., 1., 4).unwrap_err(),
            DistError::InvalidParameter {
                name: "shape",
                value: DEVROYE_MAX_SHAPE + 1.
            }
        );
        assert!(exact.rvs(3., 0.).is_ok());
        assert!(exact.rvs(3., 0.).is_ok());
    }

    #[test]
    fn closed_form_variance_handles_large_rates() {
        let large = PolyaGamma::<SmallRng>::variance(1., 1000.);
        assert!(large.is_finite());
        assert!((large - 0.5e-9).abs() / 0.5e-9 < 1e-6);
        assert_eq!(large, PolyaGamma::<SmallRng>::variance(1., -1000.));
        assert!(PolyaGamma::<SmallRng>::variance(1., 720.).is_finite());
        assert!(PolyaGamma::<SmallRng>::mean(1., 1000.).is_finite());
    }

    #[test]
    fn parallel_draws_are_reproducible() {
        let shape = vec![1.; 1000];
        let a = PolyaGamma::from_seed(7).rvs_par(&shape, 0.3).unwrap();
        let b = PolyaGamma::from_seed(7).rvs_par(&shape, 0.3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1000);
        assert!(a.as_slice().iter().all(|&x| x > 0.));
    }

    #[test]
    fn methods_agree_in_mean() {
        let n = 20_000;
        let (h, z) = (3., 2.);
        for method in [Method::Devroye, Method::Gamma] {
            let settings = PolyaGammaSettings {
                method,
                ..Default::default()
            };
            let mut dist = PolyaGamma::with_settings(SmallRng::seed_from_u64(5), settings);
            let draws = dist.rvs_n(h, z, n).unwrap();
            let mean = draws.iter().sum::<f64>() / n as f64;
            let expected = PolyaGamma::<SmallRng>::mean(h, z);
            assert!((mean - expected).abs() / expected < 0.03, "{method:?}: {mean}");
        }
    }

    proptest! {
        #[test]
        fn draws_are_positive_and_finite(h in 0.1f64..20., z in -30f64..30., seed in any::<u64>()) {
            let mut dist = PolyaGamma::from_seed(seed);
            let out = dist.rvs(h, z).unwrap().as_scalar().unwrap();
            prop_assert!(out.is_finite());
            prop_assert!(out > 0.);
        }
    }
}
