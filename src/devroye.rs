//! Kernels for Polya-Gamma variates.
//!
//! `pg1` draws exactly from PG(1, z) with the alternating series method of
//! Devroye as adapted by Polson, Scott and Windle (2013). `gamma_sum` uses
//! the truncated representation
//! `PG(h, z) = 1/(2π²) Σ g_k / ((k - 1/2)² + z²/(4π²))`, `g_k ~ Gamma(h, 1)`.

use std::f64::consts::{FRAC_2_PI, PI, SQRT_2};

use rand::Rng;
use rand_distr::{Distribution, Exp1, Gamma, StandardNormal};
use statrs::function::erf::erfc;

use crate::error::{DistError, Result};

/// Switch point between the exponential and inverse Gaussian proposals.
const TRUNC: f64 = 0.64;
const PI_SQ: f64 = PI * PI;
const PI2_SQ_RECIP: f64 = 1.0 / (2.0 * PI_SQ);

#[inline]
fn ln_norm_cdf(x: f64) -> f64 {
    (0.5 * erfc(-x / SQRT_2)).ln()
}

/// Coefficient `a_n(x)` of the alternating series for the PG(1, 0) density
/// (in the scaled variable `4 ω`).
fn series_coef(n: u32, x: f64) -> f64 {
    let k = (n as f64 + 0.5) * PI;
    if x > TRUNC {
        k * (-0.5 * k * k * x).exp()
    } else if x > 0. {
        let half = n as f64 + 0.5;
        let expnt = -1.5 * ((0.5 * PI).ln() + x.ln()) + k.ln() - 2.0 * half * half / x;
        expnt.exp()
    } else {
        0.
    }
}

/// Probability of proposing from the truncated exponential part.
fn exponential_mass(z: f64) -> f64 {
    let fz = PI_SQ / 8. + 0.5 * z * z;
    let root = TRUNC.recip().sqrt();
    let b = root * (TRUNC * z - 1.);
    let a = -root * (TRUNC * z + 1.);

    let x0 = fz.ln() + fz * TRUNC;
    let xb = x0 - z + ln_norm_cdf(b);
    let xa = x0 + z + ln_norm_cdf(a);

    let q_div_p = 2. * FRAC_2_PI * (xb.exp() + xa.exp());
    (1. + q_div_p).recip()
}

/// Inverse Gaussian IG(1/z, 1) truncated to `(0, TRUNC]`.
fn truncated_inv_gauss<R: Rng + ?Sized>(rng: &mut R, z: f64) -> f64 {
    let mu = z.recip();
    if mu > TRUNC {
        loop {
            let mut e1: f64 = rng.sample(Exp1);
            let mut e2: f64 = rng.sample(Exp1);
            while e1 * e1 > 2. * e2 / TRUNC {
                e1 = rng.sample(Exp1);
                e2 = rng.sample(Exp1);
            }
            let x = TRUNC / (1. + TRUNC * e1).powi(2);
            let alpha = (-0.5 * z * z * x).exp();
            if rng.random::<f64>() <= alpha {
                return x;
            }
        }
    }

    loop {
        let norm: f64 = rng.sample(StandardNormal);
        let y = norm * norm;
        let mu_y = mu * y;
        let mut x = mu + 0.5 * mu * mu_y - 0.5 * mu * (4. * mu_y + mu_y * mu_y).sqrt();
        if rng.random::<f64>() > mu / (mu + x) {
            x = mu * mu / x;
        }
        if x <= TRUNC {
            return x;
        }
    }
}

/// Exact draw from PG(1, z).
pub(crate) fn pg1<R: Rng + ?Sized>(rng: &mut R, z: f64) -> f64 {
    let z = 0.5 * z.abs();
    let fz = PI_SQ / 8. + 0.5 * z * z;
    let mass = exponential_mass(z);

    loop {
        let x = if rng.random::<f64>() < mass {
            let e: f64 = rng.sample(Exp1);
            TRUNC + e / fz
        } else {
            truncated_inv_gauss(rng, z)
        };

        let mut s = series_coef(0, x);
        let y = rng.random::<f64>() * s;
        let mut n = 0;
        loop {
            n += 1;
            if n % 2 == 1 {
                s -= series_coef(n, x);
                if y <= s {
                    return 0.25 * x;
                }
            } else {
                s += series_coef(n, x);
                if y > s {
                    break;
                }
            }
        }
    }
}

/// Exact draw from PG(h, z) for integer `h` as a sum of PG(1, z) draws.
pub(crate) fn pg_integer<R: Rng + ?Sized>(rng: &mut R, h: u64, z: f64) -> f64 {
    (0..h).map(|_| pg1(rng, z)).sum()
}

/// Approximate draw from PG(h, z) using `terms` gamma variates.
///
/// The expected value of the dropped tail is added back, so the draw
/// has the exact mean.
pub(crate) fn gamma_sum<R: Rng + ?Sized>(
    rng: &mut R,
    h: f64,
    z: f64,
    terms: usize,
) -> Result<f64> {
    let gamma = Gamma::new(h, 1.).map_err(|_| DistError::InvalidParameter {
        name: "shape",
        value: h,
    })?;
    let c2 = (z / (2. * PI)).powi(2);

    let mut sum = 0.;
    let mut expected_head = 0.;
    for k in 1..=terms {
        let half = k as f64 - 0.5;
        let den = half * half + c2;
        sum += gamma.sample(rng) / den;
        expected_head += h / den;
    }

    let tail = (pg_mean(h, z) - expected_head * PI2_SQ_RECIP).max(0.);
    Ok(sum * PI2_SQ_RECIP + tail)
}

pub(crate) fn pg_mean(h: f64, z: f64) -> f64 {
    if z.abs() < 1e-8 {
        0.25 * h
    } else {
        h / (2. * z) * (0.5 * z).tanh()
    }
}

/// `h (sinh z - z) / (4 z³ cosh²(z/2))`, rewritten in terms of `e^{-|z|}`
/// so that it stays finite for large rates.
pub(crate) fn pg_variance(h: f64, z: f64) -> f64 {
    let z = z.abs();
    if z < 1e-4 {
        return h / 24.;
    }
    let decay = (-z).exp();
    let num = -(-2. * z).exp_m1() - 2. * z * decay;
    let den = (1. + decay).powi(2);
    h / (2. * z.powi(3)) * num / den
}
