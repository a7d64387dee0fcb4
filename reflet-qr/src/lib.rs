//! The QR decomposition factors a matrix $A$ into the product
//! $$A = QR,$$
//! where $Q$ is an orthogonal matrix (represented as a sequence of Householder
//! reflectors), and $R$ is an upper trapezoidal matrix.
//!
//! The factorization is stored compactly: the factored matrix holds $R$ in
//! its upper trapezoid and the reflectors' essential parts below the
//! diagonal, next to a vector of reflector coefficients. The explicit factors
//! are only formed on demand, and the solve routines never form them at all.
//!
//! Given the factorization of an m×n matrix A and a right-hand side B, the
//! solve routines compute one of four solutions:
//!
//! | shape | operation         | solution                                   |
//! |-------|-------------------|--------------------------------------------|
//! | m ≥ n | `solve`           | minimize ‖A × X − B‖₂                      |
//! | m < n | `solve`           | minimum norm solution of A × X = B         |
//! | m ≥ n | `solve_transpose` | minimum norm solution of Aᵀ × X = B        |
//! | m < n | `solve_transpose` | minimize ‖Aᵀ × X − B‖₂                     |
//!
//! The factorization itself requires m ≥ n (solve a transposed system for the
//! wide cases of the table).
//!
//! # Example
//!
//! ```
//! use reflet_core::Mat;
//! use reflet_qr::Qr;
//!
//! let a = Mat::with_dims(3, 2, |i, j| (i * 2 + j) as f64);
//! let qr = Qr::new(a.as_ref());
//!
//! // least squares solution of a × x ≈ b
//! let b = vec![1.0, 0.0, 1.0];
//! let mut x = Vec::new();
//! qr.solve_vec_into(&b, &mut x).unwrap();
//! assert_eq!(x.len(), 2);
//! ```

use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, GlobalMemBuffer};
use reflet_core::{Mat, MatMut, MatRef, RealField};
use thiserror::Error;

pub mod compute;
pub mod extract;
pub mod solve;

/// Error signaling that a triangular factor was exactly or numerically
/// singular, so that no reliable solution could be produced.
///
/// The contained value is an estimate of the condition number of the factor;
/// an exactly singular factor is reported as `f64::INFINITY`. This is an
/// expected outcome for rank-deficient inputs, not a programming error:
/// callers are expected to check for it.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("matrix is singular or near-singular, with condition number {0:.4e}")]
pub struct Condition(pub f64);

/// The compact QR factorization of a matrix, together with the reflector
/// coefficients.
///
/// The two parts are produced together by [`Qr::new`] and are immutable
/// afterwards: downstream consumers read the representation through
/// [`Qr::factors`] and [`Qr::householder_coeffs`] but can never write through
/// it.
#[derive(Debug, Clone)]
pub struct Qr<T: 'static> {
    factors: Mat<T>,
    coeffs: Vec<T>,
}

impl<T: RealField> Qr<T> {
    /// Computes the QR factorization of `matrix`, which must have at least as
    /// many rows as columns. The input is copied; the factorization does not
    /// alias it.
    ///
    /// The factorization always exists, even for singular inputs; singularity
    /// is only detected later, when solving.
    ///
    /// # Panics
    ///
    /// Panics if `matrix.nrows() < matrix.ncols()`.
    #[track_caller]
    pub fn new(matrix: MatRef<'_, T>) -> Self {
        let m = matrix.nrows();
        let n = matrix.ncols();
        fancy_assert!(m >= n);

        let mut factors = Mat::with_dims(m, n, |i, j| matrix[(i, j)]);
        let mut coeffs = vec![T::zero(); n];

        let mut mem = GlobalMemBuffer::new(compute::qr_in_place_req::<T>(m, n).unwrap());
        compute::qr_in_place(factors.as_mut(), &mut coeffs, DynStack::new(&mut mem));

        Self { factors, coeffs }
    }

    /// Returns the number of rows of the factored matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.factors.nrows()
    }

    /// Returns the number of columns of the factored matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.factors.ncols()
    }

    /// Returns a view over the compact factorization: R in the upper
    /// trapezoid, reflector essential parts below the diagonal.
    #[inline]
    pub fn factors(&self) -> MatRef<'_, T> {
        self.factors.as_ref()
    }

    /// Returns the Householder reflector coefficients.
    #[inline]
    pub fn householder_coeffs(&self) -> &[T] {
        &self.coeffs
    }

    /// Extracts the m×n upper trapezoidal factor R into `dst`.
    ///
    /// `dst` is resized to m×n; its storage is reused when already large
    /// enough, so repeated extractions into the same destination don't
    /// allocate.
    pub fn compute_r_into(&self, dst: &mut Mat<T>) {
        dst.resize_with(self.nrows(), self.ncols(), |_, _| T::zero());
        extract::extract_r(dst.as_mut(), self.factors.as_ref());
    }

    /// Returns the m×n upper trapezoidal factor R.
    pub fn compute_r(&self) -> Mat<T> {
        let mut r = Mat::new();
        self.compute_r_into(&mut r);
        r
    }

    /// Builds the explicit m×m orthogonal factor Q into `dst`.
    ///
    /// `dst` is resized to m×m, with the same storage reuse as
    /// [`Qr::compute_r_into`]. See [`extract::extract_q`] for the cost of the
    /// explicit reconstruction.
    pub fn compute_q_into(&self, dst: &mut Mat<T>) {
        let m = self.nrows();
        dst.resize_with(m, m, |_, _| T::zero());

        let mut mem = GlobalMemBuffer::new(extract::extract_q_req::<T>(m).unwrap());
        extract::extract_q(
            dst.as_mut(),
            self.factors.as_ref(),
            &self.coeffs,
            DynStack::new(&mut mem),
        );
    }

    /// Returns the explicit m×m orthogonal factor Q.
    pub fn compute_q(&self) -> Mat<T> {
        let mut q = Mat::new();
        self.compute_q_into(&mut q);
        q
    }

    /// Finds the X minimizing `‖A × X − rhs‖₂` column by column, and stores it
    /// in `dst`, resized to n×k.
    ///
    /// If R is singular, [`Condition`] is returned and the contents of `dst`
    /// are unspecified.
    ///
    /// # Panics
    ///
    /// Panics if `rhs.nrows()` doesn't match the row count of the factored
    /// matrix.
    #[track_caller]
    pub fn solve_into(&self, rhs: MatRef<'_, T>, dst: &mut Mat<T>) -> Result<(), Condition> {
        let k = rhs.ncols();
        dst.resize_with(self.ncols(), k, |_, _| T::zero());

        let mut mem = GlobalMemBuffer::new(
            solve::solve_req::<T>(self.nrows(), self.ncols(), k).unwrap(),
        );
        solve::solve(
            dst.as_mut(),
            self.factors.as_ref(),
            &self.coeffs,
            rhs,
            DynStack::new(&mut mem),
        )
    }

    /// Finds the minimum norm solution of `Aᵀ × X = rhs`, and stores it in
    /// `dst`, resized to m×k.
    ///
    /// If R is singular, [`Condition`] is returned and the contents of `dst`
    /// are unspecified.
    ///
    /// # Panics
    ///
    /// Panics if `rhs.nrows()` doesn't match the column count of the factored
    /// matrix.
    #[track_caller]
    pub fn solve_transpose_into(
        &self,
        rhs: MatRef<'_, T>,
        dst: &mut Mat<T>,
    ) -> Result<(), Condition> {
        let k = rhs.ncols();
        dst.resize_with(self.nrows(), k, |_, _| T::zero());

        let mut mem = GlobalMemBuffer::new(
            solve::solve_transpose_req::<T>(self.nrows(), self.ncols(), k).unwrap(),
        );
        solve::solve_transpose(
            dst.as_mut(),
            self.factors.as_ref(),
            &self.coeffs,
            rhs,
            DynStack::new(&mut mem),
        )
    }

    /// Single column variant of [`Qr::solve_into`]: resizes `dst` to length n,
    /// reinterprets both vectors as single column matrices sharing the same
    /// storage, and delegates.
    #[track_caller]
    pub fn solve_vec_into(&self, rhs: &[T], dst: &mut Vec<T>) -> Result<(), Condition> {
        dst.resize(self.ncols(), T::zero());

        let rhs = MatRef::from_column_major_slice(rhs, rhs.len(), 1);
        let n = dst.len();
        let dst = MatMut::from_column_major_slice(dst.as_mut_slice(), n, 1);

        let mut mem = GlobalMemBuffer::new(
            solve::solve_req::<T>(self.nrows(), self.ncols(), 1).unwrap(),
        );
        solve::solve(
            dst,
            self.factors.as_ref(),
            &self.coeffs,
            rhs,
            DynStack::new(&mut mem),
        )
    }

    /// Single column variant of [`Qr::solve_transpose_into`]: resizes `dst` to
    /// length m, reinterprets both vectors as single column matrices sharing
    /// the same storage, and delegates.
    #[track_caller]
    pub fn solve_transpose_vec_into(&self, rhs: &[T], dst: &mut Vec<T>) -> Result<(), Condition> {
        dst.resize(self.nrows(), T::zero());

        let rhs = MatRef::from_column_major_slice(rhs, rhs.len(), 1);
        let m = dst.len();
        let dst = MatMut::from_column_major_slice(dst.as_mut_slice(), m, 1);

        let mut mem = GlobalMemBuffer::new(
            solve::solve_transpose_req::<T>(self.nrows(), self.ncols(), 1).unwrap(),
        );
        solve::solve_transpose(
            dst,
            self.factors.as_ref(),
            &self.coeffs,
            rhs,
            DynStack::new(&mut mem),
        )
    }
}
