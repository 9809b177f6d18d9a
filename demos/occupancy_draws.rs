//! One sweep of the latent variable updates of a spatial occupancy model:
//! Polya-Gamma auxiliaries for the logistic regression, a conjugate draw of
//! the coefficients and a sum-to-zero draw of an ICAR-like spatial effect.

use anyhow::Context;
use faer::Mat;
use occu_dists::{DenseMultivariateNormal, GaussianMarkovRandomField, PolyaGamma};

fn main() -> anyhow::Result<()> {
    let num_sites = 8;
    let mut pg = PolyaGamma::from_seed(1);
    let mut mvn = DenseMultivariateNormal::from_seed(2);
    let mut gmrf = GaussianMarkovRandomField::from_seed(3);

    let linear_predictor: Vec<f64> = (0..num_sites).map(|i| 0.3 * i as f64 - 1.).collect();
    let omega = pg
        .rvs(1., &linear_predictor)
        .context("Could not draw Polya-Gamma auxiliaries")?;
    println!("omega: {:?}", omega.as_slice());

    let mut cov = Mat::<f64>::from_fn(2, 2, |i, j| if i == j { 1. } else { 0.25 });
    let beta = mvn
        .rvs(&[0.5, -0.2], &mut cov, false)
        .context("Could not draw coefficients")?;
    println!("beta: [{}, {}]", beta[0], beta[1]);

    // Path graph precision with a small ridge to make it proper.
    let mut prec = Mat::<f64>::from_fn(num_sites, num_sites, |i, j| {
        let degree = if i == 0 || i == num_sites - 1 { 1. } else { 2. };
        if i == j {
            degree + 0.01
        } else if i.abs_diff(j) == 1 {
            -1.
        } else {
            0.
        }
    });
    let eta = gmrf
        .rvs_sum_to_zero(&vec![0.; num_sites], &mut prec, true)
        .context("Could not draw spatial effects")?;
    let total: f64 = (0..num_sites).map(|i| eta[i]).sum();
    println!("spatial effect sum: {total:.2e}");
    Ok(())
}
