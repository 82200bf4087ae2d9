//! Multiply-accumulate kernel providers.
//!
//! Filters and convolutions spend nearly all their time in two inner loops:
//! a straight dot product and a dot product against a reversed slice. The
//! [`Kernels`] trait is the seam where an optimized backend plugs in; the
//! filter functions take the provider as a type parameter (`fir_with::<K>`)
//! and the plain entry points use [`Generic`].
//!
//! Accumulation is wrapping `i64`. Wrapping addition is associative, so every
//! provider returns bit-identical sums whatever order it adds the products in.

use lib_fixed::{Fixed, Word};

/// Inner loops shared by filters and convolutions.
///
/// Both slices must have the same length.
pub trait Kernels {
    /// `sum(a[i] * b[i])` of the raw values.
    fn dot<W: Word, const F: u32>(a: &[Fixed<W, F>], b: &[Fixed<W, F>]) -> i64;

    /// `sum(a[i] * b[len - 1 - i])` of the raw values.
    fn dot_reversed<W: Word, const F: u32>(a: &[Fixed<W, F>], b: &[Fixed<W, F>]) -> i64;
}

#[inline(always)]
fn product<W: Word, const F: u32>(a: Fixed<W, F>, b: Fixed<W, F>) -> i64 {
    a.raw().to_i64() * b.raw().to_i64()
}

/// One product per iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Generic;

impl Kernels for Generic {
    fn dot<W: Word, const F: u32>(a: &[Fixed<W, F>], b: &[Fixed<W, F>]) -> i64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(0i64, |acc, (&x, &y)| acc.wrapping_add(product(x, y)))
    }

    fn dot_reversed<W: Word, const F: u32>(a: &[Fixed<W, F>], b: &[Fixed<W, F>]) -> i64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter().rev())
            .fold(0i64, |acc, (&x, &y)| acc.wrapping_add(product(x, y)))
    }
}

/// Four independent accumulators over 4-wide chunks, then the remainder.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unrolled;

impl Kernels for Unrolled {
    fn dot<W: Word, const F: u32>(a: &[Fixed<W, F>], b: &[Fixed<W, F>]) -> i64 {
        debug_assert_eq!(a.len(), b.len());
        let mut acc = [0i64; 4];
        let a_chunks = a.chunks_exact(4);
        let b_chunks = b.chunks_exact(4);
        let (a_tail, b_tail) = (a_chunks.remainder(), b_chunks.remainder());

        for (x, y) in a_chunks.zip(b_chunks) {
            acc[0] = acc[0].wrapping_add(product(x[0], y[0]));
            acc[1] = acc[1].wrapping_add(product(x[1], y[1]));
            acc[2] = acc[2].wrapping_add(product(x[2], y[2]));
            acc[3] = acc[3].wrapping_add(product(x[3], y[3]));
        }

        let tail = Generic::dot(a_tail, b_tail);
        acc.iter().fold(tail, |sum, &part| sum.wrapping_add(part))
    }

    fn dot_reversed<W: Word, const F: u32>(a: &[Fixed<W, F>], b: &[Fixed<W, F>]) -> i64 {
        debug_assert_eq!(a.len(), b.len());
        let mut acc = [0i64; 4];
        let a_chunks = a.chunks_exact(4);
        let b_chunks = b.rchunks_exact(4);
        let (a_tail, b_tail) = (a_chunks.remainder(), b_chunks.remainder());

        // Chunk j of `a` pairs with the j-th chunk from the end of `b`,
        // walked backwards.
        for (x, y) in a_chunks.zip(b_chunks) {
            acc[0] = acc[0].wrapping_add(product(x[0], y[3]));
            acc[1] = acc[1].wrapping_add(product(x[1], y[2]));
            acc[2] = acc[2].wrapping_add(product(x[2], y[1]));
            acc[3] = acc[3].wrapping_add(product(x[3], y[0]));
        }

        let tail = Generic::dot_reversed(a_tail, b_tail);
        acc.iter().fold(tail, |sum, &part| sum.wrapping_add(part))
    }
}
