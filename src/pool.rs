//! Fractal symbol pool.
//!
//! The pool is a multiset of [`SymbolId`]s in which the multiplicity of an id
//! is its sampling weight. It is built from one uniform permutation `P` of the
//! universe by repeatedly keeping the leading `fraction` of the previous
//! prefix and re-including it:
//!
//! ```text
//! s0 = N, s(i+1) = floor(fraction * s(i))      while s(i) > 1 and s(i+1) > 0
//! pool = P[..s_k] ++ ... ++ P[..s_1] ++ P      then shuffled once
//! ```
//!
//! Ids near the front of `P` survive every truncation and end up with a
//! multiplicity of `1 + k`; ids past `s_1` appear exactly once. With
//! `fraction = 0.3` this gives the familiar "70/30" popularity skew, repeated
//! at every scale.

use rand::{Rng, seq::SliceRandom};
use rand_distr::{Distribution, Uniform};
use tracing::{debug, info};

use crate::{
    config::validate_pool_params,
    errors::ConfigError,
    symbol::{SymbolId, universe},
};

/// Successive prefix lengths `s_1, s_2, ...` kept by the truncation loop.
///
/// Depends only on `(fraction, initial_count)`. Stops as soon as a step would
/// not shrink the prefix, so out-of-range fractions terminate too.
pub fn truncation_levels(fraction: f64, initial_count: usize) -> Vec<usize> {
    let mut levels = Vec::new();
    let mut cur = initial_count;
    while cur > 1 {
        let k = (fraction * cur as f64).floor() as usize;
        if k == 0 || k >= cur {
            break;
        }
        cur = k;
        levels.push(k);
    }
    levels
}

/// Final pool length for `(fraction, initial_count)`: `N + sum(levels)`.
pub fn pool_len(fraction: f64, initial_count: usize) -> usize {
    initial_count + truncation_levels(fraction, initial_count).iter().sum::<usize>()
}

/// Weighted sampling pool over a universe of `SYM1..=SYM<N>`.
#[derive(Debug, Clone)]
pub struct SymbolPool {
    entries: Vec<SymbolId>,
    unique: u32,
    levels: Vec<usize>,
}

impl SymbolPool {
    /// Builds the fractal pool for `initial_count` symbols.
    ///
    /// All randomness (the initial permutation and the final shuffle) comes
    /// from `rng`, so a seeded generator reproduces the same pool.
    ///
    /// # Errors
    /// [`ConfigError::FractionOutOfRange`] unless `0 < fraction < 1`, and
    /// [`ConfigError::EmptyUniverse`] when `initial_count` is zero.
    pub fn build<R: Rng + ?Sized>(
        fraction: f64,
        initial_count: u32,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        validate_pool_params(fraction, initial_count)?;

        let mut permutation: Vec<SymbolId> = universe(initial_count).collect();
        permutation.shuffle(rng);

        let levels = truncation_levels(fraction, permutation.len());
        let total = permutation.len() + levels.iter().sum::<usize>();
        debug!(?levels, total, "truncation levels");

        // Each pass prepends its prefix, so the shortest (last) prefix ends up first.
        let mut entries = Vec::with_capacity(total);
        for &k in levels.iter().rev() {
            entries.extend_from_slice(&permutation[..k]);
        }
        entries.extend_from_slice(&permutation);
        entries.shuffle(rng);

        info!(
            unique = initial_count,
            pool_len = entries.len(),
            passes = levels.len(),
            "built symbol pool"
        );
        Ok(SymbolPool {
            entries,
            unique: initial_count,
            levels,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the symbol universe `N`.
    pub fn unique_count(&self) -> u32 {
        self.unique
    }

    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn as_slice(&self) -> &[SymbolId] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<SymbolId> {
        self.entries.get(index).copied()
    }

    /// Uniform distribution over pool positions, for hot loops that sample repeatedly.
    pub fn index_distribution(&self) -> Result<Uniform<usize>, ConfigError> {
        Uniform::new(0, self.entries.len()).map_err(|e| ConfigError::Distribution(e.to_string()))
    }

    /// Draws one symbol; an id with multiplicity `m` comes up with probability `m / len`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SymbolId {
        self.entries[rng.random_range(0..self.entries.len())]
    }

    /// Draws one symbol using a prebuilt [`index_distribution`](Self::index_distribution).
    #[inline]
    pub fn sample_with<R: Rng + ?Sized>(&self, index: &Uniform<usize>, rng: &mut R) -> SymbolId {
        self.entries[index.sample(rng)]
    }

    /// Multiplicity of every symbol, indexed by [`SymbolId::index`].
    pub fn multiplicities(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.unique as usize];
        for id in &self.entries {
            counts[id.index()] += 1;
        }
        counts
    }

    /// The `n` most heavily weighted symbols, ties broken by rank.
    pub fn top(&self, n: usize) -> Vec<(SymbolId, u32)> {
        let mut ranked: Vec<(SymbolId, u32)> = universe(self.unique)
            .zip(self.multiplicities())
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_levels_trace_for_four_symbols() {
        assert_eq!(truncation_levels(0.5, 4), vec![2, 1]);
        assert_eq!(pool_len(0.5, 4), 7);
    }

    #[test]
    fn test_pool_len_matches_recurrence_for_default_universe() {
        assert_eq!(
            truncation_levels(0.3, 70_000),
            vec![21_000, 6_300, 1_890, 567, 170, 51, 15, 4, 1]
        );
        assert_eq!(pool_len(0.3, 70_000), 99_998);

        let pool = SymbolPool::build(0.3, 70_000, &mut rng()).unwrap();
        assert_eq!(pool.len(), 99_998);
    }

    #[test]
    fn test_small_fraction_stops_when_prefix_would_be_empty() {
        // 0.3 * 3 = 0.9 -> k = 0 on the second pass
        assert_eq!(truncation_levels(0.3, 10), vec![3]);
        assert_eq!(pool_len(0.3, 10), 13);
        assert!(truncation_levels(0.01, 50).is_empty());
    }

    #[test]
    fn test_degenerate_fractions_terminate() {
        assert!(truncation_levels(1.0, 100).is_empty());
        assert!(truncation_levels(0.0, 100).is_empty());
        assert!(truncation_levels(f64::NAN, 100).is_empty());
    }

    #[test]
    fn test_every_symbol_survives() {
        let pool = SymbolPool::build(0.5, 1_000, &mut rng()).unwrap();
        assert_eq!(pool.len(), pool_len(0.5, 1_000));
        assert!(pool.multiplicities().iter().all(|&m| m >= 1));
        assert!(pool.as_slice().iter().all(|id| id.rank() >= 1 && id.rank() <= 1_000));
    }

    #[test]
    fn test_multiplicity_histogram_follows_levels() {
        let pool = SymbolPool::build(0.5, 1_000, &mut rng()).unwrap();
        let counts = pool.multiplicities();
        // exactly levels[j] ids survive pass j, so that many have multiplicity > j + 1
        for (j, &level) in pool.levels().iter().enumerate() {
            let above = counts.iter().filter(|&&m| m as usize > j + 1).count();
            assert_eq!(above, level, "pass {}", j);
        }
        let max = *counts.iter().max().unwrap() as usize;
        assert_eq!(max, pool.levels().len() + 1);
    }

    #[test]
    fn test_single_symbol_pool() {
        let pool = SymbolPool::build(0.3, 1, &mut rng()).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(0).unwrap().to_string(), "SYM1");
        assert!(pool.levels().is_empty());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        for f in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(matches!(
                SymbolPool::build(f, 10, &mut rng()),
                Err(ConfigError::FractionOutOfRange(_))
            ));
        }
        assert!(matches!(
            SymbolPool::build(0.3, 0, &mut rng()),
            Err(ConfigError::EmptyUniverse)
        ));
    }

    #[test]
    fn test_same_seed_same_pool() {
        let a = SymbolPool::build(0.3, 500, &mut rng()).unwrap();
        let b = SymbolPool::build(0.3, 500, &mut rng()).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_top_is_sorted_by_weight() {
        let pool = SymbolPool::build(0.5, 64, &mut rng()).unwrap();
        let top = pool.top(5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(top[0].1 as usize, pool.levels().len() + 1);
    }
}
