//! Triangular solve kernels.
//!
//! Both kernels work in place on a matrix right-hand side, and report exact
//! singularity through their return value instead of panicking: a singular
//! triangular factor is a legitimate runtime outcome, not a programming
//! error. Callers are expected to check the flag.

use crate::{MatMut, MatRef, RealField};
use assert2::assert as fancy_assert;
use reborrow::*;

/// Solves `triangular_upper × X = rhs` in place, storing the result in `rhs`.
///
/// `triangular_upper` is interpreted as an upper triangular matrix (diagonal
/// included). Its strictly lower triangular part is not accessed.
///
/// Returns `true` on success. If some diagonal element is exactly zero, the
/// matrix is singular and no solution exists: the function returns `false`
/// and `rhs` is left untouched.
///
/// # Panics
///
/// Panics if `triangular_upper` is not a square matrix, or if its dimension
/// doesn't match `rhs.nrows()`.
#[track_caller]
pub fn solve_upper_triangular_in_place<T: RealField>(
    triangular_upper: MatRef<'_, T>,
    rhs: MatMut<'_, T>,
) -> bool {
    fancy_assert!(triangular_upper.nrows() == triangular_upper.ncols());
    fancy_assert!(rhs.nrows() == triangular_upper.ncols());

    let n = triangular_upper.nrows();
    let k = rhs.ncols();

    for i in 0..n {
        if *triangular_upper.get(i, i) == T::zero() {
            return false;
        }
    }

    let mut rhs = rhs;
    for i in (0..n).rev() {
        let d_inv = (unsafe { *triangular_upper.get_unchecked(i, i) }).inv();
        for j in 0..k {
            let mut acc = unsafe { *rhs.rb().get_unchecked(i, j) };
            for d in (i + 1)..n {
                acc = acc
                    - unsafe {
                        *triangular_upper.get_unchecked(i, d) * *rhs.rb().get_unchecked(d, j)
                    };
            }
            unsafe { *rhs.rb_mut().get_unchecked(i, j) = acc * d_inv };
        }
    }

    true
}

/// Solves `triangular_lower × X = rhs` in place, storing the result in `rhs`.
///
/// `triangular_lower` is interpreted as a lower triangular matrix (diagonal
/// included). Its strictly upper triangular part is not accessed, so a
/// transposed view of an upper triangular matrix is a valid argument.
///
/// Returns `true` on success. If some diagonal element is exactly zero, the
/// matrix is singular and no solution exists: the function returns `false`
/// and `rhs` is left untouched.
///
/// # Panics
///
/// Panics if `triangular_lower` is not a square matrix, or if its dimension
/// doesn't match `rhs.nrows()`.
#[track_caller]
pub fn solve_lower_triangular_in_place<T: RealField>(
    triangular_lower: MatRef<'_, T>,
    rhs: MatMut<'_, T>,
) -> bool {
    fancy_assert!(triangular_lower.nrows() == triangular_lower.ncols());
    fancy_assert!(rhs.nrows() == triangular_lower.ncols());

    let n = triangular_lower.nrows();
    let k = rhs.ncols();

    for i in 0..n {
        if *triangular_lower.get(i, i) == T::zero() {
            return false;
        }
    }

    let mut rhs = rhs;
    for i in 0..n {
        let d_inv = (unsafe { *triangular_lower.get_unchecked(i, i) }).inv();
        for j in 0..k {
            let mut acc = unsafe { *rhs.rb().get_unchecked(i, j) };
            for d in 0..i {
                acc = acc
                    - unsafe {
                        *triangular_lower.get_unchecked(i, d) * *rhs.rb().get_unchecked(d, j)
                    };
            }
            unsafe { *rhs.rb_mut().get_unchecked(i, j) = acc * d_inv };
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mul::matmul;
    use crate::Mat;
    use assert_approx_eq::assert_approx_eq;
    use rand::prelude::*;

    fn random_upper_triangular(n: usize, rng: &mut StdRng) -> Mat<f64> {
        Mat::with_dims(n, n, |i, j| {
            if i == j {
                1.0 + rng.gen::<f64>()
            } else if j > i {
                rng.gen::<f64>() - 0.5
            } else {
                // garbage below the diagonal, must never be read
                f64::NAN
            }
        })
    }

    #[test]
    fn upper_solve() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in [1, 2, 3, 5, 8] {
            let t = random_upper_triangular(n, &mut rng);
            let x_expected = Mat::with_dims(n, 2, |_, _| rng.gen::<f64>() - 0.5);

            let mut rhs = Mat::zeros(n, 2);
            let mut t_clean = t.clone();
            for j in 0..n {
                for i in (j + 1)..n {
                    t_clean[(i, j)] = 0.0;
                }
            }
            matmul(
                rhs.as_mut(),
                t_clean.as_ref(),
                x_expected.as_ref(),
                None,
                1.0,
            );

            let ok = solve_upper_triangular_in_place(t.as_ref(), rhs.as_mut());
            assert!(ok);
            for i in 0..n {
                for j in 0..2 {
                    assert_approx_eq!(rhs[(i, j)], x_expected[(i, j)], 1e-10);
                }
            }
        }
    }

    #[test]
    fn lower_solve_through_transposed_view() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = 4;
        let t = random_upper_triangular(n, &mut rng);
        let x_expected = Mat::with_dims(n, 1, |_, _| rng.gen::<f64>() - 0.5);

        // rhs = tᵀ × x
        let mut rhs = Mat::zeros(n, 1);
        let mut t_clean = t.clone();
        for j in 0..n {
            for i in (j + 1)..n {
                t_clean[(i, j)] = 0.0;
            }
        }
        matmul(
            rhs.as_mut(),
            t_clean.as_ref().transpose(),
            x_expected.as_ref(),
            None,
            1.0,
        );

        let ok = solve_lower_triangular_in_place(t.as_ref().transpose(), rhs.as_mut());
        assert!(ok);
        for i in 0..n {
            assert_approx_eq!(rhs[(i, 0)], x_expected[(i, 0)], 1e-10);
        }
    }

    #[test]
    fn singular_factor_is_reported() {
        let t = Mat::with_dims(3, 3, |i, j| {
            if i == 1 && j == 1 {
                0.0
            } else if j >= i {
                1.0
            } else {
                0.0
            }
        });
        let rhs_orig = Mat::with_dims(3, 1, |i, _| i as f64);
        let mut rhs = rhs_orig.clone();

        assert!(!solve_upper_triangular_in_place(t.as_ref(), rhs.as_mut()));
        assert!(rhs == rhs_orig);

        assert!(!solve_lower_triangular_in_place(
            t.as_ref().transpose(),
            rhs.as_mut()
        ));
        assert!(rhs == rhs_orig);
    }
}
