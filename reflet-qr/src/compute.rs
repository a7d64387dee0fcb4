//! Computes the QR factorization in place, as a compact representation.

use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use reflet_core::householder::{
    apply_householder_on_the_left, apply_householder_on_the_left_req, make_householder_in_place,
};
use reflet_core::{MatMut, RealField};

/// Returns the stack requirements for performing a QR factorization with the
/// given dimensions.
#[inline]
pub fn qr_in_place_req<T: 'static>(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    let _ = nrows;
    apply_householder_on_the_left_req::<T>(ncols)
}

/// Computes the QR factorization of `matrix`, overwriting it with the compact
/// representation: the factor R in the upper trapezoid, and the essential
/// parts of the successive Householder reflectors in the columns below the
/// diagonal. The reflector coefficients are stored in `householder_coeffs`.
///
/// The factorization always exists and this function cannot fail numerically,
/// even when `matrix` is singular; rank deficiency only shows up later, as a
/// zero diagonal element of R.
///
/// # Panics
///
/// - Panics if `householder_coeffs.len()` isn't the minimum of the number of
/// rows and the number of columns of `matrix`.
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`qr_in_place_req`]).
#[track_caller]
pub fn qr_in_place<T: RealField>(
    matrix: MatMut<'_, T>,
    householder_coeffs: &mut [T],
    stack: DynStack<'_>,
) {
    let m = matrix.nrows();
    let n = matrix.ncols();
    let size = Ord::min(m, n);

    fancy_assert!(householder_coeffs.len() == size);

    let mut matrix = matrix;
    let mut stack = stack;

    for k in 0..size {
        let mat_rem = matrix.rb_mut().submatrix(k, k, m - k, n - k);
        let (first_col, last_cols) = mat_rem.split_at_col(1);
        let (mut head, mut tail) = first_col.col(0).split_at(1);

        let mut tail_squared_norm = T::zero();
        for i in 0..tail.nrows() {
            let e = *tail.rb().get(i);
            tail_squared_norm = tail_squared_norm + e * e;
        }

        let (tau, beta) =
            make_householder_in_place(tail.rb_mut(), *head.rb().get(0), tail_squared_norm);

        householder_coeffs[k] = tau;
        *head.rb_mut().get(0) = beta;

        if last_cols.ncols() > 0 {
            apply_householder_on_the_left(last_cols, tail.rb(), tau, stack.rb_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::{DynStack, GlobalMemBuffer};
    use rand::prelude::*;
    use reflet_core::householder::{
        apply_householder_sequence_on_the_left, apply_householder_sequence_on_the_left_req,
    };
    use reflet_core::mul::matmul;
    use reflet_core::Mat;

    macro_rules! make_stack {
        ($req: expr) => {
            DynStack::new(&mut GlobalMemBuffer::new($req.unwrap()))
        };
    }

    fn reconstruct_factors(factors: &Mat<f64>, coeffs: &[f64]) -> (Mat<f64>, Mat<f64>) {
        let m = factors.nrows();
        let n = factors.ncols();

        let r = Mat::with_dims(m, n, |i, j| if j >= i { factors[(i, j)] } else { 0.0 });

        // q = H₀ × H₁ × … × Hₖ₋₁ × I
        let mut q = Mat::with_dims(m, m, |i, j| if i == j { 1.0 } else { 0.0 });
        apply_householder_sequence_on_the_left(
            q.as_mut(),
            factors.as_ref(),
            coeffs,
            false,
            make_stack!(apply_householder_sequence_on_the_left_req::<f64>(m)),
        );

        (q, r)
    }

    #[test]
    fn factorization_reconstructs_input() {
        let mut rng = StdRng::seed_from_u64(0);
        for (m, n) in [(2, 2), (4, 2), (4, 4), (7, 5), (10, 10)] {
            let mat = Mat::with_dims(m, n, |_, _| rng.gen::<f64>() - 0.5);
            let size = Ord::min(m, n);

            let mut factors = mat.clone();
            let mut coeffs = vec![0.0; size];
            qr_in_place(
                factors.as_mut(),
                &mut coeffs,
                make_stack!(qr_in_place_req::<f64>(m, n)),
            );

            let (q, r) = reconstruct_factors(&factors, &coeffs);

            let mut reconstructed = Mat::zeros(m, n);
            matmul(reconstructed.as_mut(), q.as_ref(), r.as_ref(), None, 1.0);
            for i in 0..m {
                for j in 0..n {
                    assert_approx_eq!(reconstructed[(i, j)], mat[(i, j)], 1e-10);
                }
            }

            let mut qtq = Mat::zeros(m, m);
            matmul(
                qtq.as_mut(),
                q.as_ref().transpose(),
                q.as_ref(),
                None,
                1.0,
            );
            for i in 0..m {
                for j in 0..m {
                    assert_approx_eq!(qtq[(i, j)], if i == j { 1.0 } else { 0.0 }, 1e-10);
                }
            }
        }
    }

    #[test]
    fn factorization_of_singular_matrix_succeeds() {
        // the middle column is zero; the factorization must still complete,
        // leaving a zero on the diagonal of R
        let mat = Mat::with_dims(4, 3, |i, j| if j == 1 { 0.0 } else { (i + j) as f64 + 1.0 });
        let mut factors = mat.clone();
        let mut coeffs = vec![0.0; 3];
        qr_in_place(
            factors.as_mut(),
            &mut coeffs,
            make_stack!(qr_in_place_req::<f64>(4, 3)),
        );

        assert_approx_eq!(factors[(1, 1)], 0.0, 1e-12);

        let (q, r) = reconstruct_factors(&factors, &coeffs);
        let mut reconstructed = Mat::zeros(4, 3);
        matmul(reconstructed.as_mut(), q.as_ref(), r.as_ref(), None, 1.0);
        for i in 0..4 {
            for j in 0..3 {
                assert_approx_eq!(reconstructed[(i, j)], mat[(i, j)], 1e-10);
            }
        }
    }
}
