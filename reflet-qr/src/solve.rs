//! Solves linear systems through the compact QR representation, without
//! forming an explicit inverse (or an explicit Q).

use crate::Condition;
use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use reflet_core::householder::{
    apply_householder_sequence_on_the_left, apply_householder_sequence_on_the_left_req,
};
use reflet_core::solve::{solve_lower_triangular_in_place, solve_upper_triangular_in_place};
use reflet_core::{temp_mat_req, MatMut, MatRef, RealField};

/// Returns the stack requirements for [`solve`].
pub fn solve_req<T: 'static>(
    qr_nrows: usize,
    qr_ncols: usize,
    rhs_ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        temp_mat_req::<T>(Ord::max(qr_nrows, qr_ncols), rhs_ncols)?,
        apply_householder_sequence_on_the_left_req::<T>(rhs_ncols)?,
    ])
}

/// Returns the stack requirements for [`solve_transpose`].
pub fn solve_transpose_req<T: 'static>(
    qr_nrows: usize,
    qr_ncols: usize,
    rhs_ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    solve_req::<T>(qr_nrows, qr_ncols, rhs_ncols)
}

/// Given the compact QR representation of an m×n matrix A with m ≥ n, finds
/// the X that minimizes `‖A × X − rhs‖₂` column by column, and stores it in
/// `dst`. When A is square this is the exact solution of `A × X = rhs`.
///
/// If R is singular, [`Condition`] is returned and the contents of `dst` are
/// unspecified.
///
/// The computation never reads `dst`'s previous contents: the right-hand side
/// is first copied into an independently owned scratch buffer taken from
/// `stack`, which is released again on every path out of this function.
///
/// # Panics
///
/// - Panics if `factors.nrows() < factors.ncols()`.
/// - Panics if the number of coefficients doesn't match the reflector count
/// of `factors`.
/// - Panics if `rhs.nrows() != factors.nrows()`.
/// - Panics if `dst` doesn't have `factors.ncols()` rows and `rhs.ncols()`
/// columns.
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`solve_req`]).
#[track_caller]
pub fn solve<T: RealField>(
    dst: MatMut<'_, T>,
    factors: MatRef<'_, T>,
    householder_coeffs: &[T],
    rhs: MatRef<'_, T>,
    stack: DynStack<'_>,
) -> Result<(), Condition> {
    let m = factors.nrows();
    let n = factors.ncols();
    let k = rhs.ncols();
    fancy_assert!(m >= n);
    fancy_assert!(householder_coeffs.len() == n);
    fancy_assert!(rhs.nrows() == m);
    fancy_assert!((dst.nrows(), dst.ncols()) == (n, k));

    let (mut x_data, stack) = stack.make_with(Ord::max(m, n) * k, |_| T::zero());
    let mut x = MatMut::from_column_major_slice(&mut x_data, Ord::max(m, n), k);

    for j in 0..k {
        for i in 0..m {
            *x.rb_mut().get(i, j) = *rhs.get(i, j);
        }
    }

    // x ← Qᵀ × x
    apply_householder_sequence_on_the_left(
        x.rb_mut().submatrix(0, 0, m, k),
        factors,
        householder_coeffs,
        true,
        stack,
    );

    // solve R × x = (Qᵀ × rhs), on the top n rows
    let r = factors.submatrix(0, 0, n, n);
    if !solve_upper_triangular_in_place(r, x.rb_mut().submatrix(0, 0, n, k)) {
        return Err(Condition(f64::INFINITY));
    }

    let mut dst = dst;
    for j in 0..k {
        for i in 0..n {
            *dst.rb_mut().get(i, j) = *x.rb().get(i, j);
        }
    }
    Ok(())
}

/// Given the compact QR representation of an m×n matrix A with m ≥ n, finds
/// the minimum norm solution of `Aᵀ × X = rhs`, and stores it in `dst`.
///
/// If R is singular, [`Condition`] is returned and the contents of `dst` are
/// unspecified.
///
/// # Panics
///
/// - Panics if `factors.nrows() < factors.ncols()`.
/// - Panics if the number of coefficients doesn't match the reflector count
/// of `factors`.
/// - Panics if `rhs.nrows() != factors.ncols()`.
/// - Panics if `dst` doesn't have `factors.nrows()` rows and `rhs.ncols()`
/// columns.
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`solve_transpose_req`]).
#[track_caller]
pub fn solve_transpose<T: RealField>(
    dst: MatMut<'_, T>,
    factors: MatRef<'_, T>,
    householder_coeffs: &[T],
    rhs: MatRef<'_, T>,
    stack: DynStack<'_>,
) -> Result<(), Condition> {
    let m = factors.nrows();
    let n = factors.ncols();
    let k = rhs.ncols();
    fancy_assert!(m >= n);
    fancy_assert!(householder_coeffs.len() == n);
    fancy_assert!(rhs.nrows() == n);
    fancy_assert!((dst.nrows(), dst.ncols()) == (m, k));

    let (mut x_data, stack) = stack.make_with(Ord::max(m, n) * k, |_| T::zero());
    let mut x = MatMut::from_column_major_slice(&mut x_data, Ord::max(m, n), k);

    for j in 0..k {
        for i in 0..n {
            *x.rb_mut().get(i, j) = *rhs.get(i, j);
        }
    }

    // solve Rᵀ × x = rhs on the top n rows, reading Rᵀ through a transposed
    // view of the upper triangle of the factors
    let r = factors.submatrix(0, 0, n, n);
    if !solve_lower_triangular_in_place(r.transpose(), x.rb_mut().submatrix(0, 0, n, k)) {
        return Err(Condition(f64::INFINITY));
    }

    // rows n..m were acquired zeroed and have not been written since: they
    // form the zero extension of the triangular solution to the full height
    // of Q
    // x ← Q × x
    apply_householder_sequence_on_the_left(
        x.rb_mut(),
        factors,
        householder_coeffs,
        false,
        stack,
    );

    let mut dst = dst;
    for j in 0..k {
        for i in 0..m {
            *dst.rb_mut().get(i, j) = *x.rb().get(i, j);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{qr_in_place, qr_in_place_req};
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::{DynStack, GlobalMemBuffer};
    use rand::prelude::*;
    use reflet_core::mul::matmul;
    use reflet_core::Mat;

    macro_rules! make_stack {
        ($req: expr) => {
            DynStack::new(&mut GlobalMemBuffer::new($req.unwrap()))
        };
    }

    fn factorize(mat: &Mat<f64>) -> (Mat<f64>, Vec<f64>) {
        let (m, n) = (mat.nrows(), mat.ncols());
        let mut factors = mat.clone();
        let mut coeffs = vec![0.0; Ord::min(m, n)];
        qr_in_place(
            factors.as_mut(),
            &mut coeffs,
            make_stack!(qr_in_place_req::<f64>(m, n)),
        );
        (factors, coeffs)
    }

    // inverse of the 2×2 gram matrix aᵀa, for closed form reference solutions
    fn gram_inverse_2x2(a: &Mat<f64>) -> Mat<f64> {
        let mut gram = Mat::zeros(2, 2);
        matmul(
            gram.as_mut(),
            a.as_ref().transpose(),
            a.as_ref(),
            None,
            1.0,
        );
        let det = gram[(0, 0)] * gram[(1, 1)] - gram[(0, 1)] * gram[(1, 0)];
        Mat::with_dims(2, 2, |i, j| {
            let cofactor = match (i, j) {
                (0, 0) => gram[(1, 1)],
                (1, 1) => gram[(0, 0)],
                (0, 1) => -gram[(0, 1)],
                _ => -gram[(1, 0)],
            };
            cofactor / det
        })
    }

    #[test]
    fn least_squares_matches_normal_equations() {
        let a = Mat::with_dims(4, 2, |i, j| ((2 * i + 3 * j + 1) % 5) as f64 + 0.5);
        let b = Mat::with_dims(4, 1, |i, _| [1.0, -2.0, 0.5, 3.0][i]);
        let (factors, coeffs) = factorize(&a);

        let mut x = Mat::zeros(2, 1);
        solve(
            x.as_mut(),
            factors.as_ref(),
            &coeffs,
            b.as_ref(),
            make_stack!(solve_req::<f64>(4, 2, 1)),
        )
        .unwrap();

        // x_ref = (aᵀa)⁻¹ × aᵀ × b
        let gram_inv = gram_inverse_2x2(&a);
        let mut atb = Mat::zeros(2, 1);
        matmul(atb.as_mut(), a.as_ref().transpose(), b.as_ref(), None, 1.0);
        let mut x_ref = Mat::zeros(2, 1);
        matmul(x_ref.as_mut(), gram_inv.as_ref(), atb.as_ref(), None, 1.0);

        for i in 0..2 {
            assert_approx_eq!(x[(i, 0)], x_ref[(i, 0)], 1e-10);
        }
    }

    #[test]
    fn square_system_is_solved_exactly() {
        let mut rng = StdRng::seed_from_u64(0);
        let n = 5;
        let a = Mat::with_dims(n, n, |_, _| rng.gen::<f64>() - 0.5);
        let x_expected = Mat::with_dims(n, 3, |_, _| rng.gen::<f64>() - 0.5);
        let mut b = Mat::zeros(n, 3);
        matmul(b.as_mut(), a.as_ref(), x_expected.as_ref(), None, 1.0);

        let (factors, coeffs) = factorize(&a);
        let mut x = Mat::zeros(n, 3);
        solve(
            x.as_mut(),
            factors.as_ref(),
            &coeffs,
            b.as_ref(),
            make_stack!(solve_req::<f64>(n, n, 3)),
        )
        .unwrap();

        for i in 0..n {
            for j in 0..3 {
                assert_approx_eq!(x[(i, j)], x_expected[(i, j)], 1e-9);
            }
        }
    }

    #[test]
    fn transpose_solve_finds_the_minimum_norm_solution() {
        // aᵀ is 2×4: the system aᵀ × x = b is under-determined
        let a = Mat::with_dims(4, 2, |i, j| ((3 * i + j) % 5) as f64 + 1.0);
        let b = Mat::with_dims(2, 1, |i, _| [2.0, -1.0][i]);
        let (factors, coeffs) = factorize(&a);

        let mut x = Mat::zeros(4, 1);
        solve_transpose(
            x.as_mut(),
            factors.as_ref(),
            &coeffs,
            b.as_ref(),
            make_stack!(solve_transpose_req::<f64>(4, 2, 1)),
        )
        .unwrap();

        // the solution satisfies aᵀ × x = b
        let mut residual = Mat::zeros(2, 1);
        matmul(
            residual.as_mut(),
            a.as_ref().transpose(),
            x.as_ref(),
            None,
            1.0,
        );
        for i in 0..2 {
            assert_approx_eq!(residual[(i, 0)], b[(i, 0)], 1e-10);
        }

        // and matches the closed form minimum norm solution a × (aᵀa)⁻¹ × b
        let gram_inv = gram_inverse_2x2(&a);
        let mut tmp = Mat::zeros(2, 1);
        matmul(tmp.as_mut(), gram_inv.as_ref(), b.as_ref(), None, 1.0);
        let mut x_ref = Mat::zeros(4, 1);
        matmul(x_ref.as_mut(), a.as_ref(), tmp.as_ref(), None, 1.0);

        for i in 0..4 {
            assert_approx_eq!(x[(i, 0)], x_ref[(i, 0)], 1e-10);
        }
    }

    #[test]
    fn singular_factor_reports_a_conditioning_failure() {
        // rank deficient: the middle column is identically zero
        let a = Mat::with_dims(4, 3, |i, j| if j == 1 { 0.0 } else { (i + j) as f64 + 1.0 });
        let b = Mat::with_dims(4, 1, |i, _| i as f64);
        let (factors, coeffs) = factorize(&a);

        let mut x = Mat::zeros(3, 1);
        let result = solve(
            x.as_mut(),
            factors.as_ref(),
            &coeffs,
            b.as_ref(),
            make_stack!(solve_req::<f64>(4, 3, 1)),
        );
        let err = result.unwrap_err();
        assert!(err.0.is_infinite());

        let mut x = Mat::zeros(4, 1);
        let b = Mat::with_dims(3, 1, |i, _| i as f64);
        let result = solve_transpose(
            x.as_mut(),
            factors.as_ref(),
            &coeffs,
            b.as_ref(),
            make_stack!(solve_transpose_req::<f64>(4, 3, 1)),
        );
        assert!(result.is_err());
    }

    #[test]
    #[should_panic]
    fn mismatched_rhs_panics() {
        let a = Mat::with_dims(4, 2, |i, j| (i + j) as f64);
        let (factors, coeffs) = factorize(&a);

        // rhs must have 4 rows, not 2
        let b = Mat::with_dims(2, 1, |_, _| 1.0);
        let mut x = Mat::zeros(2, 1);
        let _ = solve(
            x.as_mut(),
            factors.as_ref(),
            &coeffs,
            b.as_ref(),
            make_stack!(solve_req::<f64>(4, 2, 1)),
        );
    }
}
