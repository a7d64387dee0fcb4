//! Extracts the explicit factors out of the compact QR representation.

use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use reflet_core::mul::{matmul, rank1_update};
use reflet_core::{ColMut, MatMut, MatRef, RealField};

/// Extracts the upper trapezoidal factor R out of the QR representation, and
/// stores it in `dst`.
///
/// The numeric content of R is read through a read-only borrow of the upper
/// trapezoid of `factors`; the entries below the diagonal are set to explicit
/// zeros.
///
/// # Panics
///
/// Panics if `dst` doesn't have the same shape as `factors`.
#[track_caller]
pub fn extract_r<T: RealField>(dst: MatMut<'_, T>, factors: MatRef<'_, T>) {
    fancy_assert!((dst.nrows(), dst.ncols()) == (factors.nrows(), factors.ncols()));

    let mut dst = dst;
    for j in 0..factors.ncols() {
        for i in 0..factors.nrows() {
            *dst.rb_mut().get(i, j) = if j >= i { *factors.get(i, j) } else { T::zero() };
        }
    }
}

/// Returns the stack requirements for extracting the orthogonal factor of a
/// QR representation with `nrows` rows.
pub fn extract_q_req<T: 'static>(nrows: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        // reflector as a full matrix
        reflet_core::temp_mat_req::<T>(nrows, nrows)?,
        // copy of the accumulator
        reflet_core::temp_mat_req::<T>(nrows, nrows)?,
        // defining vector of the reflector
        reflet_core::temp_mat_req::<T>(nrows, 1)?,
    ])
}

/// Builds the explicit m×m orthogonal factor Q out of the QR representation,
/// and stores it in `dst`.
///
/// The accumulation starts from the identity and multiplies the reflectors
/// back in on the right, in ascending index order. The reflectors do not
/// commute, so the order and the multiplication side must not be changed.
///
/// This reconstruction costs a full rank-1 update and an m×m product per
/// reflector. It is meant for inspection and debugging rather than for hot
/// paths; the solve routines never form Q explicitly.
///
/// # Panics
///
/// - Panics if `dst` isn't a square matrix with `factors.nrows()` rows.
/// - Panics if the number of coefficients doesn't match the reflector count
/// of `factors`.
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`extract_q_req`]).
#[track_caller]
pub fn extract_q<T: RealField>(
    dst: MatMut<'_, T>,
    factors: MatRef<'_, T>,
    householder_coeffs: &[T],
    stack: DynStack<'_>,
) {
    let m = factors.nrows();
    let size = householder_coeffs.len();
    fancy_assert!((dst.nrows(), dst.ncols()) == (m, m));
    fancy_assert!(size == Ord::min(m, factors.ncols()));

    let mut dst = dst;
    for j in 0..m {
        for i in 0..m {
            *dst.rb_mut().get(i, j) = if i == j { T::one() } else { T::zero() };
        }
    }

    let (mut h_data, stack) = stack.make_with(m * m, |_| T::zero());
    let (mut q_data, stack) = stack.make_with(m * m, |_| T::zero());
    let (mut v_data, _) = stack.make_with(m, |_| T::zero());
    let mut h = MatMut::from_column_major_slice(&mut h_data, m, m);
    let mut q_copy = MatMut::from_column_major_slice(&mut q_data, m, m);
    let mut v = ColMut::from_slice(&mut v_data);

    for k in 0..size {
        // h = I
        for j in 0..m {
            for i in 0..m {
                *h.rb_mut().get(i, j) = if i == j { T::one() } else { T::zero() };
            }
        }

        // v = k-th reflector: zeros above k, an implicit one at k, and the
        // essential part below
        for i in 0..k {
            *v.rb_mut().get(i) = T::zero();
        }
        *v.rb_mut().get(k) = T::one();
        for i in (k + 1)..m {
            *v.rb_mut().get(i) = *factors.get(i, k);
        }

        // h = I - tau × v × vᵀ
        rank1_update(h.rb_mut(), v.rb(), v.rb(), -householder_coeffs[k]);

        // dst = dst × h
        for j in 0..m {
            for i in 0..m {
                *q_copy.rb_mut().get(i, j) = *dst.rb().get(i, j);
            }
        }
        matmul(dst.rb_mut(), q_copy.rb(), h.rb(), None, T::one());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{qr_in_place, qr_in_place_req};
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::{DynStack, GlobalMemBuffer};
    use rand::prelude::*;
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

    #[test]
    fn extracted_factors_multiply_back() {
        let mut rng = StdRng::seed_from_u64(0);
        for (m, n) in [(3, 3), (4, 2), (6, 5), (8, 8)] {
            let mat = Mat::with_dims(m, n, |_, _| rng.gen::<f64>() - 0.5);
            let (factors, coeffs) = factorize(&mat);

            let mut r = Mat::zeros(m, n);
            extract_r(r.as_mut(), factors.as_ref());
            for j in 0..n {
                for i in (j + 1)..m {
                    assert_eq!(r[(i, j)], 0.0);
                }
            }

            let mut q = Mat::zeros(m, m);
            extract_q(
                q.as_mut(),
                factors.as_ref(),
                &coeffs,
                make_stack!(extract_q_req::<f64>(m)),
            );

            let mut reconstructed = Mat::zeros(m, n);
            matmul(reconstructed.as_mut(), q.as_ref(), r.as_ref(), None, 1.0);
            for i in 0..m {
                for j in 0..n {
                    assert_approx_eq!(reconstructed[(i, j)], mat[(i, j)], 1e-10);
                }
            }
        }
    }

    #[test]
    fn extracted_q_is_orthogonal() {
        let mut rng = StdRng::seed_from_u64(1);
        let (m, n) = (6, 4);
        let mat = Mat::with_dims(m, n, |_, _| rng.gen::<f64>() - 0.5);
        let (factors, coeffs) = factorize(&mat);

        let mut q = Mat::zeros(m, m);
        extract_q(
            q.as_mut(),
            factors.as_ref(),
            &coeffs,
            make_stack!(extract_q_req::<f64>(m)),
        );

        let mut qtq = Mat::zeros(m, m);
        matmul(qtq.as_mut(), q.as_ref().transpose(), q.as_ref(), None, 1.0);
        for i in 0..m {
            for j in 0..m {
                assert_approx_eq!(qtq[(i, j)], if i == j { 1.0 } else { 0.0 }, 1e-10);
            }
        }
    }
}
