//! Selection policies: pluggable strategies deciding, at each hole, which
//! production to apply.
//!
//! A policy sees the candidates in the grammar's canonical order and returns
//! an index into that list; the builder records exactly that index, so any
//! policy-driven run is replayable through relative-index replay.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::grammar::Production;

/// Read-only view of the hole a policy is choosing for.
#[derive(Debug, Clone, Copy)]
pub struct HoleView<'a> {
    pub symbol: &'a str,
    pub path: &'a [usize],
}

impl HoleView<'_> {
    /// Depth of the hole: the length of its path.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Decides which candidate production fills the current hole.
pub trait ChoicePolicy {
    /// Returns an index into `candidates`. Candidates are never empty.
    fn choose(&mut self, candidates: &[&Production], hole: &HoleView<'_>) -> usize;
}

/// Any `FnMut(&[&Production], &HoleView) -> usize` is a policy.
impl<F> ChoicePolicy for F
where
    F: FnMut(&[&Production], &HoleView<'_>) -> usize,
{
    fn choose(&mut self, candidates: &[&Production], hole: &HoleView<'_>) -> usize {
        self(candidates, hole)
    }
}

/// Picks uniformly among the candidates.
#[derive(Debug, Clone)]
pub struct UniformRandom<R: Rng> {
    rng: R,
}

impl UniformRandom<Xoshiro256StarStar> {
    /// Seeded with the crate's default deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> UniformRandom<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ChoicePolicy for UniformRandom<R> {
    fn choose(&mut self, candidates: &[&Production], _hole: &HoleView<'_>) -> usize {
        self.rng.gen_range(0..candidates.len())
    }
}

/// Depth-banded policy: below `min_depth` only candidates that branch into
/// at least one nonterminal are considered; once the next level would exceed
/// `max_depth`, only fully terminal candidates are. Within the band, and
/// whenever a restriction would eliminate every candidate, the base policy
/// sees the unrestricted list (fail open, not fatal).
#[derive(Debug, Clone)]
pub struct DepthBounded<P> {
    min_depth: usize,
    max_depth: usize,
    base: P,
}

impl DepthBounded<UniformRandom<Xoshiro256StarStar>> {
    /// Depth band over the default uniform policy.
    pub fn seeded(min_depth: usize, max_depth: usize, seed: u64) -> Self {
        Self::new(min_depth, max_depth, UniformRandom::seeded(seed))
    }
}

impl<P: ChoicePolicy> DepthBounded<P> {
    pub fn new(min_depth: usize, max_depth: usize, base: P) -> Self {
        Self {
            min_depth,
            max_depth,
            base,
        }
    }
}

impl<P: ChoicePolicy> ChoicePolicy for DepthBounded<P> {
    fn choose(&mut self, candidates: &[&Production], hole: &HoleView<'_>) -> usize {
        let depth = hole.depth();
        let mut kept: Vec<usize> = (0..candidates.len()).collect();

        if depth < self.min_depth {
            let branching: Vec<usize> = kept
                .iter()
                .copied()
                .filter(|&i| candidates[i].expansion.iter().any(|s| !s.is_terminal()))
                .collect();
            if !branching.is_empty() {
                kept = branching;
            }
        }
        if depth + 1 > self.max_depth {
            let terminal: Vec<usize> = kept
                .iter()
                .copied()
                .filter(|&i| candidates[i].expansion.iter().all(|s| s.is_terminal()))
                .collect();
            if !terminal.is_empty() {
                kept = terminal;
            }
        }

        let restricted: Vec<&Production> = kept.iter().map(|&i| candidates[i]).collect();
        let picked = self.base.choose(&restricted, hole);
        // Map back into the unrestricted list so the recorded encoding never
        // changes. An out-of-range base choice is passed through for the
        // builder to reject.
        kept.get(picked).copied().unwrap_or(candidates.len())
    }
}
