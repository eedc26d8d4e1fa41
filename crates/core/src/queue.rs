//! Next-piece queue - one pending kind, refilled as soon as it is taken
//!
//! Two randomizers are available:
//!
//! - `Uniform` (default): every draw is an independent uniform pick over the
//!   seven kinds, so repeats and droughts are possible.
//! - `SevenBag`: each bag holds one of each kind, shuffled, and is drained
//!   before the next bag is generated.
//!
//! Both are driven by a seeded `StdRng`, so a given seed always yields the
//! same sequence.

use arrayvec::ArrayVec;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::types::PieceKind;

/// How the next piece is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Randomizer {
    #[default]
    Uniform,
    SevenBag,
}

impl Randomizer {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uniform" => Some(Randomizer::Uniform),
            "bag" | "sevenbag" | "7bag" => Some(Randomizer::SevenBag),
            _ => None,
        }
    }
}

/// Single-slot lookahead generator
#[derive(Debug, Clone)]
pub struct NextQueue {
    randomizer: Randomizer,
    rng: StdRng,
    /// Remaining kinds of the current bag, drawn from the back
    bag: ArrayVec<PieceKind, 7>,
    pending: PieceKind,
}

impl NextQueue {
    pub fn new(seed: u64, randomizer: Randomizer) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bag = ArrayVec::new();
        let pending = draw(randomizer, &mut rng, &mut bag);
        Self {
            randomizer,
            rng,
            bag,
            pending,
        }
    }

    /// The pending kind
    pub fn peek(&self) -> PieceKind {
        self.pending
    }

    /// Take the pending kind and draw its replacement
    pub fn consume_and_refill(&mut self) -> PieceKind {
        let next = draw(self.randomizer, &mut self.rng, &mut self.bag);
        std::mem::replace(&mut self.pending, next)
    }
}

fn draw(randomizer: Randomizer, rng: &mut StdRng, bag: &mut ArrayVec<PieceKind, 7>) -> PieceKind {
    match randomizer {
        Randomizer::Uniform => PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())],
        Randomizer::SevenBag => loop {
            if let Some(kind) = bag.pop() {
                break kind;
            }
            bag.extend(PieceKind::ALL);
            bag.shuffle(rng);
        },
    }
}

impl Default for NextQueue {
    fn default() -> Self {
        Self::new(1, Randomizer::Uniform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(queue: &mut NextQueue, n: usize) -> Vec<PieceKind> {
        (0..n).map(|_| queue.consume_and_refill()).collect()
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = NextQueue::new(42, Randomizer::Uniform);
        let mut b = NextQueue::new(42, Randomizer::Uniform);
        assert_eq!(take(&mut a, 50), take(&mut b, 50));
    }

    #[test]
    fn test_peek_matches_consume() {
        let mut queue = NextQueue::new(7, Randomizer::Uniform);
        for _ in 0..20 {
            let peeked = queue.peek();
            assert_eq!(queue.consume_and_refill(), peeked);
        }
    }

    #[test]
    fn test_uniform_covers_all_kinds() {
        let mut queue = NextQueue::new(3, Randomizer::Uniform);
        let drawn = take(&mut queue, 500);
        for kind in PieceKind::ALL {
            assert!(drawn.contains(&kind), "{:?} never drawn", kind);
        }
    }

    #[test]
    fn test_seven_bag_yields_each_kind_once_per_bag() {
        let mut queue = NextQueue::new(99, Randomizer::SevenBag);
        for _ in 0..4 {
            let mut bag = take(&mut queue, 7);
            bag.sort_by_key(|k| k.id());
            let mut all = PieceKind::ALL.to_vec();
            all.sort_by_key(|k| k.id());
            assert_eq!(bag, all);
        }
    }

    #[test]
    fn test_randomizer_from_str() {
        assert_eq!(Randomizer::from_str("Uniform"), Some(Randomizer::Uniform));
        assert_eq!(Randomizer::from_str("bag"), Some(Randomizer::SevenBag));
        assert_eq!(Randomizer::from_str("nope"), None);
    }
}
