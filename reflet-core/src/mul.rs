//! Matrix multiplication kernels.
//!
//! These are deliberately plain, allocation-free loops: the decompositions
//! built on top of them treat them as opaque and only rely on their
//! mathematical contract.

use crate::{ColRef, MatMut, MatRef, RealField};
use assert2::assert as fancy_assert;
use reborrow::*;

/// Computes `acc = alpha * acc + beta * lhs * rhs`.
///
/// Passing `None` for `alpha` is equivalent to `alpha = 0.0`, except that the
/// previous contents of `acc` are never read, so they may be left
/// uninitialized by the caller.
///
/// # Panics
///
/// Panics if the matrix dimensions are not compatible:
/// - `acc.nrows() == lhs.nrows()`,
/// - `acc.ncols() == rhs.ncols()`,
/// - `lhs.ncols() == rhs.nrows()`.
#[track_caller]
pub fn matmul<T: RealField>(
    acc: MatMut<'_, T>,
    lhs: MatRef<'_, T>,
    rhs: MatRef<'_, T>,
    alpha: Option<T>,
    beta: T,
) {
    fancy_assert!(acc.nrows() == lhs.nrows());
    fancy_assert!(acc.ncols() == rhs.ncols());
    fancy_assert!(lhs.ncols() == rhs.nrows());

    let m = acc.nrows();
    let n = acc.ncols();
    let depth = lhs.ncols();

    let mut acc = acc;
    for j in 0..n {
        for i in 0..m {
            let mut dot = T::zero();
            for d in 0..depth {
                // SAFETY: i < m, d < depth, j < n, checked above
                dot = dot + unsafe { *lhs.get_unchecked(i, d) * *rhs.get_unchecked(d, j) };
            }
            let dst = unsafe { acc.rb_mut().get_unchecked(i, j) };
            *dst = match alpha {
                Some(alpha) => alpha * *dst + beta * dot,
                None => beta * dot,
            };
        }
    }
}

/// Computes `acc += alpha * lhs * rhs.transpose()`, where `lhs` and `rhs` are
/// column vectors.
///
/// # Panics
///
/// Panics if `acc.nrows() != lhs.nrows()` or `acc.ncols() != rhs.nrows()`.
#[track_caller]
pub fn rank1_update<T: RealField>(
    acc: MatMut<'_, T>,
    lhs: ColRef<'_, T>,
    rhs: ColRef<'_, T>,
    alpha: T,
) {
    fancy_assert!(acc.nrows() == lhs.nrows());
    fancy_assert!(acc.ncols() == rhs.nrows());

    let m = acc.nrows();
    let n = acc.ncols();

    let mut acc = acc;
    for j in 0..n {
        let w = alpha * unsafe { *rhs.get_unchecked(j) };
        for i in 0..m {
            let dst = unsafe { acc.rb_mut().get_unchecked(i, j) };
            *dst = *dst + unsafe { *lhs.get_unchecked(i) } * w;
        }
    }
}
