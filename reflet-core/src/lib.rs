//! `reflet` core module.
//!
//! This module contains:
//! - definitions of the dense matrix structures ([`Mat`], [`MatRef`], [`MatMut`]),
//! - matrix multiplication kernels,
//! - triangular matrix solve kernels,
//! - Householder reflector kernels.
//!
//! Kernels that need scratch memory follow a two-phase protocol: a `*_req`
//! function reports the required workspace as a [`StackReq`], and the kernel
//! itself executes inside a caller-provided [`dyn_stack::DynStack`]. This lets
//! callers amortize allocations across calls, or substitute an arena of their
//! own.

#![warn(rust_2018_idioms)]

use assert2::assert as fancy_assert;
use core::fmt;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub};
use core::ptr::NonNull;
use dyn_stack::{SizeOverflow, StackReq};
use reborrow::*;

pub mod householder;
pub mod mul;
pub mod solve;

/// Trait that describes a real number field.
///
/// # Note
///
/// The implementation currently implies [`Copy`], but this may be replaced by
/// [`Clone`] in a future version of this library.
pub trait RealField:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + PartialOrd
    + Send
    + Sync
    + Debug
    + 'static
{
    /// Returns the value representing `0.0`.
    fn zero() -> Self;
    /// Returns the value representing `1.0`.
    fn one() -> Self;
    /// Returns the multiplicative inverse of the number.
    fn inv(self) -> Self;
    /// Returns the square root of the number.
    fn sqrt(self) -> Self;
    /// Returns the absolute value of the number.
    fn abs(self) -> Self;
}

impl RealField for f32 {
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline(always)]
    fn inv(self) -> Self {
        1.0 / self
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        self.sqrt()
    }

    #[inline(always)]
    fn abs(self) -> Self {
        self.abs()
    }
}

impl RealField for f64 {
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline(always)]
    fn inv(self) -> Self {
        1.0 / self
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        self.sqrt()
    }

    #[inline(always)]
    fn abs(self) -> Self {
        self.abs()
    }
}

struct MatrixSliceBase<T> {
    ptr: NonNull<T>,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
}
struct VecSliceBase<T> {
    ptr: NonNull<T>,
    len: usize,
    stride: isize,
}
impl<T> Copy for MatrixSliceBase<T> {}
impl<T> Clone for MatrixSliceBase<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VecSliceBase<T> {}
impl<T> Clone for VecSliceBase<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

/// Matrix view with general row and column strides.
///
/// A view borrows storage owned elsewhere. It has no independent ownership and
/// cannot be resized; in particular, a `MatRef` aliasing another matrix's
/// buffer can never be used to mutate it.
pub struct MatRef<'a, T> {
    base: MatrixSliceBase<T>,
    _marker: PhantomData<&'a T>,
}

/// Mutable matrix view with general row and column strides.
///
/// For usage examples, see [`MatRef`].
pub struct MatMut<'a, T> {
    base: MatrixSliceBase<T>,
    _marker: PhantomData<&'a mut T>,
}

/// Column vector view with general row stride.
pub struct ColRef<'a, T> {
    base: VecSliceBase<T>,
    _marker: PhantomData<&'a T>,
}

/// Mutable column vector view with general row stride.
pub struct ColMut<'a, T> {
    base: VecSliceBase<T>,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Sync> Sync for MatRef<'_, T> {}
unsafe impl<T: Sync> Send for MatRef<'_, T> {}
unsafe impl<T: Sync> Sync for MatMut<'_, T> {}
unsafe impl<T: Send> Send for MatMut<'_, T> {}
unsafe impl<T: Sync> Sync for ColRef<'_, T> {}
unsafe impl<T: Sync> Send for ColRef<'_, T> {}
unsafe impl<T: Sync> Sync for ColMut<'_, T> {}
unsafe impl<T: Send> Send for ColMut<'_, T> {}

impl<'a, T> Copy for MatRef<'a, T> {}
impl<'a, T> Copy for ColRef<'a, T> {}

impl<'a, T> Clone for MatRef<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, T> Clone for ColRef<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'b, 'a, T> Reborrow<'b> for MatRef<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        *self
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for MatRef<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        *self
    }
}

impl<'b, 'a, T> Reborrow<'b> for MatMut<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for MatMut<'a, T> {
    type Target = MatMut<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}

impl<'b, 'a, T> Reborrow<'b> for ColRef<'a, T> {
    type Target = ColRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        *self
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for ColRef<'a, T> {
    type Target = ColRef<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        *self
    }
}

impl<'b, 'a, T> Reborrow<'b> for ColMut<'a, T> {
    type Target = ColRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for ColMut<'a, T> {
    type Target = ColMut<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> MatRef<'a, T> {
    /// Returns a matrix view from the given arguments.
    /// `ptr`: pointer to the first element of the matrix.
    /// `nrows`: number of rows of the matrix.
    /// `ncols`: number of columns of the matrix.
    /// `row_stride`: offset between the first elements of two successive rows.
    /// `col_stride`: offset between the first elements of two successive columns.
    ///
    /// # Safety
    ///
    /// `ptr` must be non null and properly aligned for type `T`.
    /// For each `i < nrows` and `j < ncols`,
    /// `ptr.offset(i as isize * row_stride + j as isize * col_stride)` must
    /// point to a valid initialized object of type `T`, unless memory pointing
    /// to that address is never accessed.
    /// The referenced memory must not be mutated during the lifetime `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *const T,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            base: MatrixSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr as *mut T),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a view over a matrix stored in `slice` in column major order,
    /// with dimensions `(nrows, ncols)`. The view shares the storage of
    /// `slice`; no copy takes place.
    ///
    /// # Panics
    ///
    /// Panics if `slice.len()` doesn't match the given dimensions.
    ///
    /// # Example
    ///
    /// ```
    /// use reflet_core::MatRef;
    ///
    /// let data = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    /// let m = MatRef::from_column_major_slice(&data, 2, 3);
    ///
    /// assert_eq!(m[(0, 0)], 0.0);
    /// assert_eq!(m[(1, 0)], 1.0);
    /// assert_eq!(m[(0, 2)], 4.0);
    /// ```
    #[track_caller]
    #[inline]
    pub fn from_column_major_slice(slice: &'a [T], nrows: usize, ncols: usize) -> Self {
        fancy_assert!(slice.len() == nrows * ncols);
        unsafe { Self::from_raw_parts(slice.as_ptr(), nrows, ncols, 1, nrows as isize) }
    }

    /// Returns a pointer to the first (top left) element of the matrix.
    #[inline]
    pub fn as_ptr(self) -> *const T {
        self.base.ptr.as_ptr()
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.base.ncols
    }

    /// Returns the offset between the first elements of two successive rows.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.row_stride
    }

    /// Returns the offset between the first elements of two successive columns.
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.base.col_stride
    }

    /// Returns a pointer to the element at position (i, j), with no bound
    /// checks.
    #[inline]
    pub fn ptr_at(self, i: usize, j: usize) -> *const T {
        self.base
            .ptr
            .as_ptr()
            .wrapping_offset(i as isize * self.base.row_stride)
            .wrapping_offset(j as isize * self.base.col_stride)
    }

    /// Returns a reference to the element at position (i, j), with no bound
    /// checks.
    ///
    /// # Safety
    ///
    /// Requires `i < self.nrows()` and `j < self.ncols()`. Otherwise the
    /// behavior is undefined.
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize, j: usize) -> &'a T {
        &*self.ptr_at(i, j)
    }

    /// Returns a reference to the element at position (i, j).
    ///
    /// # Panics
    ///
    /// Requires `i < self.nrows()` and `j < self.ncols()`. Otherwise the
    /// function panics.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize, j: usize) -> &'a T {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        unsafe { self.get_unchecked(i, j) }
    }

    /// Splits the matrix horizontally at the `i`-th row into two parts: the
    /// rows before `i`, and the rows from `i` onwards.
    ///
    /// # Panics
    ///
    /// Requires `i <= self.nrows()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn split_at_row(self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let nrows = self.nrows();
        let ncols = self.ncols();
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe {
            (
                Self::from_raw_parts(self.as_ptr(), i, ncols, rs, cs),
                Self::from_raw_parts(self.ptr_at(i, 0), nrows - i, ncols, rs, cs),
            )
        }
    }

    /// Splits the matrix vertically at the `j`-th column into two parts: the
    /// columns before `j`, and the columns from `j` onwards.
    ///
    /// # Panics
    ///
    /// Requires `j <= self.ncols()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn split_at_col(self, j: usize) -> (Self, Self) {
        fancy_assert!(j <= self.ncols());
        let nrows = self.nrows();
        let ncols = self.ncols();
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe {
            (
                Self::from_raw_parts(self.as_ptr(), nrows, j, rs, cs),
                Self::from_raw_parts(self.ptr_at(0, j), nrows, ncols - j, rs, cs),
            )
        }
    }

    /// Returns the `j`-th column of the matrix.
    ///
    /// # Panics
    ///
    /// Requires `j < self.ncols()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn col(self, j: usize) -> ColRef<'a, T> {
        fancy_assert!(j < self.ncols());
        unsafe { ColRef::from_raw_parts(self.ptr_at(0, j), self.nrows(), self.row_stride()) }
    }

    /// Returns the transpose of the matrix: a view over the same storage with
    /// the roles of the rows and the columns exchanged. No copy takes place.
    #[inline]
    pub fn transpose(self) -> MatRef<'a, T> {
        unsafe {
            MatRef::from_raw_parts(
                self.as_ptr(),
                self.ncols(),
                self.nrows(),
                self.col_stride(),
                self.row_stride(),
            )
        }
    }

    /// Returns a view over the submatrix starting at position `(i, j)`, with
    /// dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    ///
    /// Requires that the submatrix fits in the original matrix. Otherwise the
    /// function panics.
    #[track_caller]
    #[inline]
    pub fn submatrix(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        fancy_assert!(i <= self.nrows());
        fancy_assert!(j <= self.ncols());
        fancy_assert!(nrows <= self.nrows() - i);
        fancy_assert!(ncols <= self.ncols() - j);
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe { Self::from_raw_parts(self.ptr_at(i, j), nrows, ncols, rs, cs) }
    }
}

impl<'a, T> MatMut<'a, T> {
    /// Returns a mutable matrix view from the given arguments.
    ///
    /// # Safety
    ///
    /// Same requirements as [`MatRef::from_raw_parts`], with the addition that
    /// the referenced memory must not be accessed through any other alias
    /// during the lifetime `'a`, and that distinct positions of the view must
    /// not overlap in memory.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            base: MatrixSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a mutable view over a matrix stored in `slice` in column major
    /// order, with dimensions `(nrows, ncols)`. The view shares the storage of
    /// `slice`; no copy takes place.
    ///
    /// # Panics
    ///
    /// Panics if `slice.len()` doesn't match the given dimensions.
    #[track_caller]
    #[inline]
    pub fn from_column_major_slice(slice: &'a mut [T], nrows: usize, ncols: usize) -> Self {
        fancy_assert!(slice.len() == nrows * ncols);
        unsafe { Self::from_raw_parts(slice.as_mut_ptr(), nrows, ncols, 1, nrows as isize) }
    }

    /// Returns a mutable pointer to the first (top left) element of the
    /// matrix.
    #[inline]
    pub fn as_ptr(self) -> *mut T {
        self.base.ptr.as_ptr()
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.base.ncols
    }

    /// Returns the offset between the first elements of two successive rows.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.row_stride
    }

    /// Returns the offset between the first elements of two successive columns.
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.base.col_stride
    }

    /// Returns a mutable pointer to the element at position (i, j), with no
    /// bound checks.
    #[inline]
    pub fn ptr_at(self, i: usize, j: usize) -> *mut T {
        self.base
            .ptr
            .as_ptr()
            .wrapping_offset(i as isize * self.base.row_stride)
            .wrapping_offset(j as isize * self.base.col_stride)
    }

    /// Returns a mutable reference to the element at position (i, j), with no
    /// bound checks.
    ///
    /// # Safety
    ///
    /// Requires `i < self.nrows()` and `j < self.ncols()`. Otherwise the
    /// behavior is undefined.
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize, j: usize) -> &'a mut T {
        &mut *self.ptr_at(i, j)
    }

    /// Returns a mutable reference to the element at position (i, j).
    ///
    /// # Panics
    ///
    /// Requires `i < self.nrows()` and `j < self.ncols()`. Otherwise the
    /// function panics.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize, j: usize) -> &'a mut T {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        unsafe { self.get_unchecked(i, j) }
    }

    /// Splits the matrix horizontally at the `i`-th row into two parts: the
    /// rows before `i`, and the rows from `i` onwards.
    ///
    /// # Panics
    ///
    /// Requires `i <= self.nrows()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn split_at_row(self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let nrows = self.nrows();
        let ncols = self.ncols();
        let rs = self.row_stride();
        let cs = self.col_stride();
        let top = self.base.ptr.as_ptr();
        let bot = top.wrapping_offset(i as isize * rs);
        unsafe {
            (
                Self::from_raw_parts(top, i, ncols, rs, cs),
                Self::from_raw_parts(bot, nrows - i, ncols, rs, cs),
            )
        }
    }

    /// Splits the matrix vertically at the `j`-th column into two parts: the
    /// columns before `j`, and the columns from `j` onwards.
    ///
    /// # Panics
    ///
    /// Requires `j <= self.ncols()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn split_at_col(self, j: usize) -> (Self, Self) {
        fancy_assert!(j <= self.ncols());
        let nrows = self.nrows();
        let ncols = self.ncols();
        let rs = self.row_stride();
        let cs = self.col_stride();
        let left = self.base.ptr.as_ptr();
        let right = left.wrapping_offset(j as isize * cs);
        unsafe {
            (
                Self::from_raw_parts(left, nrows, j, rs, cs),
                Self::from_raw_parts(right, nrows, ncols - j, rs, cs),
            )
        }
    }

    /// Returns the `j`-th column of the matrix.
    ///
    /// # Panics
    ///
    /// Requires `j < self.ncols()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn col(self, j: usize) -> ColMut<'a, T> {
        fancy_assert!(j < self.ncols());
        let nrows = self.nrows();
        let rs = self.row_stride();
        let ptr = self.ptr_at(0, j);
        unsafe { ColMut::from_raw_parts(ptr, nrows, rs) }
    }

    /// Returns the transpose of the matrix: a view over the same storage with
    /// the roles of the rows and the columns exchanged. No copy takes place.
    #[inline]
    pub fn transpose(self) -> MatMut<'a, T> {
        let nrows = self.nrows();
        let ncols = self.ncols();
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe { MatMut::from_raw_parts(self.as_ptr(), ncols, nrows, cs, rs) }
    }

    /// Returns a mutable view over the submatrix starting at position `(i, j)`,
    /// with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    ///
    /// Requires that the submatrix fits in the original matrix. Otherwise the
    /// function panics.
    #[track_caller]
    #[inline]
    pub fn submatrix(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        fancy_assert!(i <= self.nrows());
        fancy_assert!(j <= self.ncols());
        fancy_assert!(nrows <= self.nrows() - i);
        fancy_assert!(ncols <= self.ncols() - j);
        let rs = self.row_stride();
        let cs = self.col_stride();
        let ptr = self.ptr_at(i, j);
        unsafe { Self::from_raw_parts(ptr, nrows, ncols, rs, cs) }
    }
}

impl<'a, T> ColRef<'a, T> {
    /// Returns a column vector view from the given arguments.
    ///
    /// # Safety
    ///
    /// Same requirements as [`MatRef::from_raw_parts`], for a single column of
    /// `nrows` elements separated by `row_stride`.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *const T, nrows: usize, row_stride: isize) -> Self {
        Self {
            base: VecSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr as *mut T),
                len: nrows,
                stride: row_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a column vector view sharing the storage of `slice`.
    #[inline]
    pub fn from_slice(slice: &'a [T]) -> Self {
        unsafe { Self::from_raw_parts(slice.as_ptr(), slice.len(), 1) }
    }

    /// Returns the number of rows of the vector.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.len
    }

    /// Returns the offset between two successive elements of the vector.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.stride
    }

    /// Returns a pointer to the element at position `i`, with no bound checks.
    #[inline]
    pub fn ptr_at(self, i: usize) -> *const T {
        self.base
            .ptr
            .as_ptr()
            .wrapping_offset(i as isize * self.base.stride)
    }

    /// Returns a reference to the element at position `i`, with no bound
    /// checks.
    ///
    /// # Safety
    ///
    /// Requires `i < self.nrows()`. Otherwise the behavior is undefined.
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize) -> &'a T {
        &*self.ptr_at(i)
    }

    /// Returns a reference to the element at position `i`.
    ///
    /// # Panics
    ///
    /// Requires `i < self.nrows()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize) -> &'a T {
        fancy_assert!(i < self.nrows());
        unsafe { self.get_unchecked(i) }
    }

    /// Splits the vector at the `i`-th element into two parts: the elements
    /// before `i`, and the elements from `i` onwards.
    ///
    /// # Panics
    ///
    /// Requires `i <= self.nrows()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn split_at(self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let len = self.nrows();
        let stride = self.row_stride();
        unsafe {
            (
                Self::from_raw_parts(self.ptr_at(0), i, stride),
                Self::from_raw_parts(self.ptr_at(i), len - i, stride),
            )
        }
    }

    /// Returns a matrix view over the same storage, with `self.nrows()` rows
    /// and one column.
    #[inline]
    pub fn as_2d(self) -> MatRef<'a, T> {
        unsafe { MatRef::from_raw_parts(self.ptr_at(0), self.nrows(), 1, self.row_stride(), 0) }
    }
}

impl<'a, T> ColMut<'a, T> {
    /// Returns a mutable column vector view from the given arguments.
    ///
    /// # Safety
    ///
    /// Same requirements as [`MatMut::from_raw_parts`], for a single column of
    /// `nrows` elements separated by `row_stride`.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *mut T, nrows: usize, row_stride: isize) -> Self {
        Self {
            base: VecSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr),
                len: nrows,
                stride: row_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a mutable column vector view sharing the storage of `slice`.
    #[inline]
    pub fn from_slice(slice: &'a mut [T]) -> Self {
        let len = slice.len();
        unsafe { Self::from_raw_parts(slice.as_mut_ptr(), len, 1) }
    }

    /// Returns the number of rows of the vector.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.len
    }

    /// Returns the offset between two successive elements of the vector.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.stride
    }

    /// Returns a mutable pointer to the element at position `i`, with no bound
    /// checks.
    #[inline]
    pub fn ptr_at(self, i: usize) -> *mut T {
        self.base
            .ptr
            .as_ptr()
            .wrapping_offset(i as isize * self.base.stride)
    }

    /// Returns a mutable reference to the element at position `i`, with no
    /// bound checks.
    ///
    /// # Safety
    ///
    /// Requires `i < self.nrows()`. Otherwise the behavior is undefined.
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize) -> &'a mut T {
        &mut *self.ptr_at(i)
    }

    /// Returns a mutable reference to the element at position `i`.
    ///
    /// # Panics
    ///
    /// Requires `i < self.nrows()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize) -> &'a mut T {
        fancy_assert!(i < self.nrows());
        unsafe { self.get_unchecked(i) }
    }

    /// Splits the vector at the `i`-th element into two parts: the elements
    /// before `i`, and the elements from `i` onwards.
    ///
    /// # Panics
    ///
    /// Requires `i <= self.nrows()`. Otherwise the function panics.
    #[track_caller]
    #[inline]
    pub fn split_at(self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let len = self.nrows();
        let stride = self.row_stride();
        let head = self.base.ptr.as_ptr();
        let tail = head.wrapping_offset(i as isize * stride);
        unsafe {
            (
                Self::from_raw_parts(head, i, stride),
                Self::from_raw_parts(tail, len - i, stride),
            )
        }
    }

    /// Returns a mutable matrix view over the same storage, with
    /// `self.nrows()` rows and one column.
    #[inline]
    pub fn as_2d(self) -> MatMut<'a, T> {
        let nrows = self.nrows();
        let stride = self.row_stride();
        let ptr = self.ptr_at(0);
        unsafe { MatMut::from_raw_parts(ptr, nrows, 1, stride, 0) }
    }
}

impl<'a, T> Index<(usize, usize)> for MatRef<'a, T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        self.get(i, j)
    }
}

impl<'a, T> Index<(usize, usize)> for MatMut<'a, T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        self.rb().get(i, j)
    }
}

impl<'a, T> IndexMut<(usize, usize)> for MatMut<'a, T> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        self.rb_mut().get(i, j)
    }
}

/// Returns the stack requirements for creating a temporary matrix with the
/// given dimensions.
#[inline]
pub fn temp_mat_req<T: 'static>(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    let len = nrows.checked_mul(ncols).ok_or(SizeOverflow)?;
    StackReq::try_new::<T>(len)
}

/// Owning matrix structure stored in column major format.
///
/// The columns are stored contiguously, one after the other, with no padding
/// in between.
pub struct Mat<T: 'static> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

impl<T: 'static> Default for Mat<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Mat<T> {
    /// Returns a new matrix with dimensions `(0, 0)`. This does not allocate.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            nrows: 0,
            ncols: 0,
        }
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns a view over the matrix.
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, T> {
        unsafe {
            MatRef::from_raw_parts(
                self.data.as_ptr(),
                self.nrows,
                self.ncols,
                1,
                self.nrows as isize,
            )
        }
    }

    /// Returns a mutable view over the matrix.
    #[inline]
    pub fn as_mut(&mut self) -> MatMut<'_, T> {
        unsafe {
            MatMut::from_raw_parts(
                self.data.as_mut_ptr(),
                self.nrows,
                self.ncols,
                1,
                self.nrows as isize,
            )
        }
    }
}

impl<T: RealField> Mat<T> {
    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with the
    /// provided function.
    ///
    /// # Example
    ///
    /// ```
    /// use reflet_core::Mat;
    ///
    /// let m = Mat::with_dims(2, 3, |i, j| (i + 10 * j) as f64);
    ///
    /// assert_eq!(m[(1, 2)], 21.0);
    /// ```
    #[inline]
    pub fn with_dims(nrows: usize, ncols: usize, f: impl FnMut(usize, usize) -> T) -> Self {
        let mut this = Self::new();
        this.resize_with(nrows, ncols, f);
        this
    }

    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with
    /// zeros.
    #[inline]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::with_dims(nrows, ncols, |_, _| T::zero())
    }

    /// Resizes the matrix in place to dimensions `(nrows, ncols)`, and fills
    /// every element with the provided function.
    ///
    /// The backing storage is reused whenever its capacity is already
    /// sufficient, so that repeatedly resizing to the same (or a smaller)
    /// shape performs no allocation. Otherwise new storage is allocated.
    pub fn resize_with(
        &mut self,
        nrows: usize,
        ncols: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) {
        let len = match nrows.checked_mul(ncols) {
            Some(len) => len,
            None => panic!("capacity overflow"),
        };
        self.data.clear();
        self.data.reserve(len);
        for j in 0..ncols {
            for i in 0..nrows {
                self.data.push(f(i, j));
            }
        }
        self.nrows = nrows;
        self.ncols = ncols;
    }
}

impl<T: Clone> Clone for Mat<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: PartialEq> PartialEq for Mat<T> {
    fn eq(&self, other: &Self) -> bool {
        self.nrows == other.nrows && self.ncols == other.ncols && self.data == other.data
    }
}

impl<T: Debug> Debug for Mat<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct DebugRow<'a, T: 'static>(&'a Mat<T>, usize);

        impl<T: Debug> Debug for DebugRow<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut row = f.debug_list();
                for j in 0..self.0.ncols {
                    row.entry(&self.0[(self.1, j)]);
                }
                row.finish()
            }
        }

        let mut rows = f.debug_list();
        for i in 0..self.nrows {
            rows.entry(&DebugRow(self, i));
        }
        rows.finish()
    }
}

impl<T: 'static> Index<(usize, usize)> for Mat<T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        fancy_assert!(i < self.nrows);
        fancy_assert!(j < self.ncols);
        &self.data[i + j * self.nrows]
    }
}

impl<T: 'static> IndexMut<(usize, usize)> for Mat<T> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        fancy_assert!(i < self.nrows);
        fancy_assert!(j < self.ncols);
        &mut self.data[i + j * self.nrows]
    }
}
