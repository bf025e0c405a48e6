//! Randomness used to decide whether a write triggers retention cleanup.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of uniform integers for the cleanup draw
pub trait RandomSource: Send + Sync {
    /// Draw an integer in `1..=upper`. `upper` is never zero.
    fn draw(&self, upper: u32) -> u32;
}

/// Thread-local RNG from `rand`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self, upper: u32) -> u32 {
        rand::rng().random_range(1..=upper.max(1))
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// An empty sequence always draws `upper`.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    values: Vec<u32>,
    next: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            next: AtomicUsize::new(0),
        }
    }

    /// How many draws have been made so far
    pub fn draws(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }
}

impl RandomSource for SequenceRandom {
    fn draw(&self, upper: u32) -> u32 {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        if self.values.is_empty() {
            return upper;
        }
        self.values[index % self.values.len()]
    }
}

impl<T: RandomSource + ?Sized> RandomSource for std::sync::Arc<T> {
    fn draw(&self, upper: u32) -> u32 {
        (**self).draw(upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_stays_in_range() {
        let random = ThreadRandom;
        for _ in 0..1000 {
            let value = random.draw(7);
            assert!((1..=7).contains(&value));
        }
        assert_eq!(random.draw(1), 1);
    }

    #[test]
    fn test_sequence_wraps_around() {
        let random = SequenceRandom::new(vec![3, 9]);
        assert_eq!(random.draw(100), 3);
        assert_eq!(random.draw(100), 9);
        assert_eq!(random.draw(100), 3);
        assert_eq!(random.draws(), 3);
    }

    #[test]
    fn test_empty_sequence_draws_upper_bound() {
        let random = SequenceRandom::default();
        assert_eq!(random.draw(100), 100);
    }
}
