use std::borrow::Cow;

use faer::{
    dyn_stack::{MemBuffer, MemStack},
    linalg::{
        cholesky::llt::factor::{cholesky_in_place, cholesky_in_place_scratch},
        triangular_solve::{solve_lower_triangular_in_place, solve_upper_triangular_in_place},
    },
    Col, Mat, MatRef, Par,
};

use crate::error::{DistError, Result};

pub(crate) fn check_square(mat: &Mat<f64>, name: &'static str) -> Result<usize> {
    let (rows, cols) = (mat.nrows(), mat.ncols());
    if rows != cols {
        return Err(DistError::NotSquare { name, rows, cols });
    }
    Ok(rows)
}

pub(crate) fn check_dim(expected: usize, got: usize, name: &'static str) -> Result<()> {
    if expected != got {
        return Err(DistError::DimensionMismatch {
            name,
            expected,
            got,
        });
    }
    Ok(())
}

pub(crate) fn check_finite(vals: &[f64], name: &'static str) -> Result<()> {
    if vals.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(DistError::NonFinite { name })
    }
}

fn mat_all_finite(mat: &MatRef<f64>) -> bool {
    let mut ok = true;
    faer::zip!(mat).for_each(|faer::unzip!(val)| ok &= val.is_finite());
    ok
}

/// Validate a mean vector against a square matrix parameter, before anything is factorized.
pub(crate) fn check_inputs(mean: &[f64], mat: &Mat<f64>, name: &'static str) -> Result<()> {
    check_finite(mean, "mean")?;
    let dim = check_square(mat, name)?;
    check_dim(mean.len(), dim, name)?;
    if !mat_all_finite(&mat.as_ref()) {
        return Err(DistError::NonFinite { name });
    }
    Ok(())
}

/// Replace `mat` by its lower Cholesky factor, zeroing the strict upper triangle.
///
/// Only the lower triangle of `mat` is read. On failure `mat` holds a
/// partially factorized matrix.
pub(crate) fn factor_in_place(mat: &mut Mat<f64>, name: &'static str) -> Result<()> {
    let dim = check_square(mat, name)?;
    if !mat_all_finite(&mat.as_ref()) {
        return Err(DistError::NonFinite { name });
    }

    let par = Par::Seq;
    let mut buf = MemBuffer::new(cholesky_in_place_scratch::<f64>(dim, par, Default::default()));
    let stack = MemStack::new(&mut buf);
    cholesky_in_place(mat.as_mut(), Default::default(), par, stack, Default::default())
        .map_err(|_| DistError::NotPositiveDefinite { name })?;

    for j in 1..dim {
        mat.col_mut(j).subrows_mut(0, j).fill(0f64);
    }
    Ok(())
}

/// Lower Cholesky factor of `mat`, leaving `mat` untouched.
pub(crate) fn cholesky(mat: &Mat<f64>, name: &'static str) -> Result<Mat<f64>> {
    let mut factor = mat.clone();
    factor_in_place(&mut factor, name)?;
    Ok(factor)
}

/// Lower Cholesky factor of `mat`, computed in the storage of `mat` itself
/// if `overwrite` is set and in a copy otherwise.
pub(crate) fn lower_factor<'a>(
    mat: &'a mut Mat<f64>,
    overwrite: bool,
    name: &'static str,
) -> Result<Cow<'a, Mat<f64>>> {
    if overwrite {
        factor_in_place(mat, name)?;
        Ok(Cow::Borrowed(&*mat))
    } else {
        Ok(Cow::Owned(cholesky(mat, name)?))
    }
}

/// Solve `L x = b` in place.
pub(crate) fn solve_lower_in_place(l: &Mat<f64>, x: &mut Col<f64>) {
    solve_lower_triangular_in_place(l.as_ref(), x.as_mut().as_mat_mut(), Par::Seq);
}

/// Solve `Lᵀ x = b` in place.
pub(crate) fn solve_lower_transposed_in_place(l: &Mat<f64>, x: &mut Col<f64>) {
    solve_upper_triangular_in_place(l.transpose(), x.as_mut().as_mat_mut(), Par::Seq);
}

/// Solve `L Lᵀ x = b` in place.
pub(crate) fn cholesky_solve_in_place(l: &Mat<f64>, x: &mut Col<f64>) {
    solve_lower_in_place(l, x);
    solve_lower_transposed_in_place(l, x);
}
