//! Park–Miller pseudo-random generation.
//!
//! The generator is the multiplicative congruential recurrence
//! `seed = seed * 16807` on a wrapping 32-bit signed integer; the output is
//! the top bits of the state read as a Q-format value in `[-1, 1)`.
//!
//! State lives in a [`ParkMiller`] value owned by the caller. For a single
//! stream shared between threads use [`SharedParkMiller`].

use lib_fixed::{Fixed, Word};
use std::sync::{Mutex, MutexGuard};

/// Seed used by [`ParkMiller::new`].
pub const DEFAULT_SEED: i32 = 123_456_789;

const MULTIPLIER: i32 = 16_807;

/// Park–Miller generator state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParkMiller {
    /// Current state, never zero.
    seed: i32,

    /// Values drawn since construction or the last reseed.
    count: u64,
}

impl Default for ParkMiller {
    fn default() -> Self {
        Self::new()
    }
}

impl ParkMiller {
    /// Create a generator at [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create a generator at `seed`; zero is replaced by 1.
    pub fn with_seed(seed: i32) -> Self {
        Self {
            seed: if seed == 0 { 1 } else { seed },
            count: 0,
        }
    }

    /// Restart the sequence at `seed`; zero is replaced by 1.
    pub fn reseed(&mut self, seed: i32) {
        *self = Self::with_seed(seed);
    }

    /// Current state.
    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// Values drawn so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Advance and return the full 32-bit state.
    #[inline]
    pub fn next_raw(&mut self) -> i32 {
        self.seed = self.seed.wrapping_mul(MULTIPLIER);
        self.count += 1;
        self.seed
    }

    /// Advance and return a value in `[-1, 1)`.
    ///
    /// The state is shifted so its sign bit lands on the format's `2^0`
    /// position: Q1.15 keeps the top 16 bits, Q1.31 the whole state.
    #[inline]
    pub fn next<W: Word, const F: u32>(&mut self) -> Fixed<W, F> {
        let raw = self.next_raw() >> (31 - F.min(31));
        Fixed::wrapping_from_raw(raw as i64)
    }

    /// Fill `out` with consecutive values.
    pub fn fill<W: Word, const F: u32>(&mut self, out: &mut [Fixed<W, F>]) {
        for slot in out.iter_mut() {
            *slot = self.next();
        }
    }
}

/// A [`ParkMiller`] behind a mutex, one sequence for all callers.
#[derive(Debug, Default)]
pub struct SharedParkMiller {
    inner: Mutex<ParkMiller>,
}

impl SharedParkMiller {
    pub fn new(generator: ParkMiller) -> Self {
        Self {
            inner: Mutex::new(generator),
        }
    }

    // Poisoning cannot leave the state half-written.
    fn lock(&self) -> MutexGuard<'_, ParkMiller> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn reseed(&self, seed: i32) {
        self.lock().reseed(seed);
    }

    pub fn next_raw(&self) -> i32 {
        self.lock().next_raw()
    }

    pub fn next<W: Word, const F: u32>(&self) -> Fixed<W, F> {
        self.lock().next()
    }

    /// Fill `out` under a single lock, so the block is contiguous in the sequence.
    pub fn fill<W: Word, const F: u32>(&self, out: &mut [Fixed<W, F>]) {
        self.lock().fill(out);
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ParkMiller {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_fixed::{Q12, Q15, Q31};
    use std::sync::Arc;
    use std::thread;

    const REFERENCE: [i32; 6] = [
        469_048_755,
        2_037_437_125,
        -568_491_133,
        1_671_761_269,
        -384_402_349,
        -1_019_466_459,
    ];

    #[test]
    fn test_reference_sequence_raw() {
        let mut rng = ParkMiller::new();
        let drawn: Vec<i32> = (0..6).map(|_| rng.next_raw()).collect();
        assert_eq!(drawn, REFERENCE);
        assert_eq!(rng.count(), 6);
    }

    #[test]
    fn test_reference_sequence_q15() {
        let mut rng = ParkMiller::new();
        let drawn: Vec<i16> = (0..6).map(|_| rng.next::<i16, 15>().raw()).collect();
        assert_eq!(drawn, vec![7157, 31088, -8675, 25509, -5866, -15556]);
    }

    #[test]
    fn test_reference_sequence_q31_is_the_state() {
        let mut rng = ParkMiller::new();
        let mut out = [Q31::ZERO; 6];
        rng.fill(&mut out);
        let raw: Vec<i32> = out.iter().map(|q| q.raw()).collect();
        assert_eq!(raw, REFERENCE);
    }

    #[test]
    fn test_q12_output_spans_unit_range() {
        let mut rng = ParkMiller::new();
        assert_eq!(rng.next::<i16, 12>(), Q12::from_raw(894));
        for _ in 0..1000 {
            let v = rng.next::<i16, 12>();
            assert!(v >= Q12::q(-1.0) && v < Q12::q(1.0));
        }
    }

    #[test]
    fn test_zero_seed_is_replaced() {
        let mut rng = ParkMiller::with_seed(0);
        assert_eq!(rng.seed(), 1);
        assert_eq!(rng.next_raw(), 16_807);
        assert_eq!(rng.next_raw(), 282_475_249);

        rng.reseed(0);
        assert_eq!(rng.seed(), 1);
        assert_eq!(rng.count(), 0);
    }

    #[test]
    fn test_reseed_restarts_sequence() {
        let mut rng = ParkMiller::new();
        let first: Vec<Q15> = (0..4).map(|_| rng.next()).collect();
        rng.reseed(DEFAULT_SEED);
        let again: Vec<Q15> = (0..4).map(|_| rng.next()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_shared_generator_hands_out_each_value_once() {
        let shared = Arc::new(SharedParkMiller::new(ParkMiller::new()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || (0..250).map(|_| shared.next_raw()).collect::<Vec<_>>())
            })
            .collect();

        let mut drawn: Vec<i32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        let mut reference = ParkMiller::new();
        let mut expected: Vec<i32> = (0..1000).map(|_| reference.next_raw()).collect();

        drawn.sort_unstable();
        expected.sort_unstable();
        assert_eq!(drawn, expected);
        assert_eq!(shared.snapshot().count(), 1000);
    }
}
