//! Householder reflector kernels.
//!
//! An elementary reflector is represented by its *essential part* `v` (the
//! part below the implicit leading `1.0`) together with a scalar coefficient
//! `tau`, so that the full reflector is `H = I - tau × [1; v] × [1; v]ᵀ`.

use crate::mul::{matmul, rank1_update};
use crate::{temp_mat_req, ColMut, ColRef, MatMut, MatRef, RealField};
use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;

/// Builds the Householder reflector that maps the vector `[head; tail]` to
/// `[beta; 0]`, where `tail` is passed through `essential` and
/// `tail_squared_norm` holds its squared norm.
///
/// `essential` is overwritten with the essential part of the reflector, and
/// the pair `(tau, beta)` is returned.
///
/// If the input vector has an exactly zero norm, the returned coefficient is
/// zero, which encodes the identity reflector. A reflector always exists, so
/// this kernel cannot fail.
pub fn make_householder_in_place<T: RealField>(
    essential: ColMut<'_, T>,
    head: T,
    tail_squared_norm: T,
) -> (T, T) {
    let norm = (head * head + tail_squared_norm).sqrt();
    if norm == T::zero() {
        return (T::zero(), head);
    }

    // signed_norm carries the sign of head, so head + signed_norm cannot
    // cancel
    let signed_norm = if head < T::zero() { -norm } else { norm };
    let head_with_beta = head + signed_norm;
    let inv = head_with_beta.inv();

    let mut essential = essential;
    for i in 0..essential.nrows() {
        let e = essential.rb_mut().get(i);
        *e = *e * inv;
    }

    let two = T::one() + T::one();
    let tau = two / (T::one() + tail_squared_norm * inv * inv);
    (tau, -signed_norm)
}

/// Returns the stack requirements for applying a reflector to a matrix with
/// `ncols` columns.
#[inline]
pub fn apply_householder_on_the_left_req<T: 'static>(
    ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    temp_mat_req::<T>(ncols, 1)
}

/// Multiplies `matrix` in place on the left by the reflector described by
/// `essential` and `householder_coeff`.
///
/// # Panics
///
/// Panics if `matrix.nrows() != essential.nrows() + 1`.
#[track_caller]
pub fn apply_householder_on_the_left<T: RealField>(
    matrix: MatMut<'_, T>,
    essential: ColRef<'_, T>,
    householder_coeff: T,
    stack: DynStack<'_>,
) {
    fancy_assert!(matrix.nrows() == 1 + essential.nrows());
    let n = matrix.ncols();
    let tau = householder_coeff;

    if matrix.nrows() == 1 {
        let factor = T::one() - tau;
        let mut matrix = matrix;
        for j in 0..n {
            let e = matrix.rb_mut().get(0, j);
            *e = *e * factor;
        }
        return;
    }

    let (first_row, last_rows) = matrix.split_at_row(1);
    let mut first_row = first_row;
    let mut last_rows = last_rows;

    // tmp = [1; v]ᵀ × matrix, as a column vector
    let (mut tmp, _) = stack.make_with(n, |j| *first_row.rb().get(0, j));
    let mut tmp = ColMut::from_slice(&mut tmp);
    matmul(
        tmp.rb_mut().as_2d(),
        last_rows.rb().transpose(),
        essential.as_2d(),
        Some(T::one()),
        T::one(),
    );

    // matrix -= tau × [1; v] × tmpᵀ
    for j in 0..n {
        let e = first_row.rb_mut().get(0, j);
        *e = *e - tau * *tmp.rb().get(j);
    }
    rank1_update(last_rows.rb_mut(), essential, tmp.rb(), -tau);
}

/// Returns the stack requirements for applying a reflector sequence to a
/// matrix with `ncols` columns.
#[inline]
pub fn apply_householder_sequence_on_the_left_req<T: 'static>(
    ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    apply_householder_on_the_left_req::<T>(ncols)
}

/// Multiplies `matrix` in place on the left by the sequence of reflectors
/// stored in the columns of `essentials` (essential parts below the diagonal)
/// and in `householder_coeffs`.
///
/// The factorization kernels compose the reflectors as
/// `Q = H₀ × H₁ × … × Hₖ₋₁`. With `forward = true` the reflectors are applied
/// in ascending index order, which computes `Qᵀ × matrix`; with
/// `forward = false` they are applied in descending order, which computes
/// `Q × matrix`.
///
/// # Panics
///
/// Panics if `matrix.nrows() != essentials.nrows()`, or if the number of
/// coefficients doesn't match the reflector count of `essentials`.
#[track_caller]
pub fn apply_householder_sequence_on_the_left<T: RealField>(
    matrix: MatMut<'_, T>,
    essentials: MatRef<'_, T>,
    householder_coeffs: &[T],
    forward: bool,
    stack: DynStack<'_>,
) {
    let m = essentials.nrows();
    let size = householder_coeffs.len();
    fancy_assert!(size == Ord::min(m, essentials.ncols()));
    fancy_assert!(matrix.nrows() == m);

    let n = matrix.ncols();
    let mut matrix = matrix;
    let mut stack = stack;

    if forward {
        for k in 0..size {
            let essential = essentials.col(k).split_at(k + 1).1;
            apply_householder_on_the_left(
                matrix.rb_mut().submatrix(k, 0, m - k, n),
                essential,
                householder_coeffs[k],
                stack.rb_mut(),
            );
        }
    } else {
        for k in (0..size).rev() {
            let essential = essentials.col(k).split_at(k + 1).1;
            apply_householder_on_the_left(
                matrix.rb_mut().submatrix(k, 0, m - k, n),
                essential,
                householder_coeffs[k],
                stack.rb_mut(),
            );
        }
    }
}
