use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::{config::validate_walk_params, errors::ConfigError, symbol::SymbolId};

/// Inclusive price corridor `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: i64,
    pub max: i64,
}

impl PriceBounds {
    /// Distance from `min` to `max`. Fits in `u64` for any pair of `i64` bounds.
    pub fn width(&self) -> u64 {
        self.max.abs_diff(self.min)
    }

    pub fn contains(&self, price: i64) -> bool {
        (self.min..=self.max).contains(&price)
    }
}

/// One step of the bounded walk with the draws already made.
///
/// A candidate that leaves the corridor is pushed back in by the full `|delta|`
/// measured from the edge it crossed (`min + |delta|` or `max - |delta|`),
/// not mirrored by the overshoot.
#[inline]
pub fn step(last: i64, delta: i64, negative: bool, bounds: PriceBounds) -> i64 {
    let magnitude = delta.abs();
    // a step past the i64 range has left the corridor as well
    let candidate = if negative {
        last.checked_sub(magnitude)
    } else {
        last.checked_add(magnitude)
    };
    let next = match candidate {
        None if negative => bounds.min + magnitude,
        None => bounds.max - magnitude,
        Some(c) if c < bounds.min => bounds.min + magnitude,
        Some(c) if c > bounds.max => bounds.max - magnitude,
        Some(c) => c,
    };
    debug_assert!(
        bounds.contains(next),
        "bounce left the corridor: last={last} delta={delta} next={next} bounds={bounds:?}"
    );
    next
}

/// Random part of the walk: delta magnitude and a fair sign.
#[derive(Debug, Clone)]
pub struct PriceWalk {
    bounds: PriceBounds,
    delta: Uniform<i64>,
    sign: Bernoulli,
    start: Uniform<i64>,
}

impl PriceWalk {
    pub fn new(bounds: PriceBounds, delta_min: i64, delta_max: i64) -> Result<Self, ConfigError> {
        validate_walk_params(bounds, delta_min, delta_max)?;
        let dist_err = |e: rand::distr::uniform::Error| ConfigError::Distribution(e.to_string());
        Ok(Self {
            bounds,
            delta: Uniform::new_inclusive(delta_min, delta_max).map_err(dist_err)?,
            sign: Bernoulli::new(0.5).map_err(|e| ConfigError::Distribution(e.to_string()))?,
            start: Uniform::new_inclusive(bounds.min, bounds.max).map_err(dist_err)?,
        })
    }

    pub fn bounds(&self) -> PriceBounds {
        self.bounds
    }

    /// Draws delta, then sign, and applies [`step`].
    #[inline]
    pub fn next_price<R: Rng + ?Sized>(&self, last: i64, rng: &mut R) -> i64 {
        let delta = self.delta.sample(rng);
        let negative = self.sign.sample(rng);
        step(last, delta, negative, self.bounds)
    }

    fn initial_price<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.start.sample(rng)
    }
}

/// Current price of every symbol in the universe.
///
/// Prices live in a dense table indexed by [`SymbolId::index`]; the table is
/// sized once and never shrinks during a run.
#[derive(Debug, Clone)]
pub struct PriceState {
    prices: Vec<i64>,
    walk: PriceWalk,
}

impl PriceState {
    /// Gives each of the `universe` symbols an independent uniform starting price.
    pub fn initialize<R: Rng + ?Sized>(universe: u32, walk: PriceWalk, rng: &mut R) -> Self {
        let prices = (0..universe).map(|_| walk.initial_price(rng)).collect();
        Self { prices, walk }
    }

    /// Advances `symbol` by one walk step and returns its new price.
    ///
    /// # Panics
    /// If `symbol` is outside the universe this state was initialized for.
    #[inline]
    pub fn update<R: Rng + ?Sized>(&mut self, symbol: SymbolId, rng: &mut R) -> i64 {
        let slot = &mut self.prices[symbol.index()];
        *slot = self.walk.next_price(*slot, rng);
        *slot
    }

    pub fn price(&self, symbol: SymbolId) -> Option<i64> {
        self.prices.get(symbol.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn bounds(&self) -> PriceBounds {
        self.walk.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::universe;
    use rand::{SeedableRng, rngs::StdRng};

    const BOUNDS: PriceBounds = PriceBounds { min: 50, max: 500 };

    #[test]
    fn test_bounce_off_floor_re_adds_delta() {
        // 50 - 3 = 47 < 50 -> 50 + 3
        assert_eq!(step(50, 3, true, BOUNDS), 53);
    }

    #[test]
    fn test_bounce_off_ceiling_subtracts_delta() {
        // 500 + 4 = 504 > 500 -> 500 - 4
        assert_eq!(step(500, 4, false, BOUNDS), 496);
    }

    #[test]
    fn test_bounce_is_not_a_mirror() {
        // overshoot is 1, but the full delta is re-added
        assert_eq!(step(52, 3, true, BOUNDS), 53);
        assert_eq!(step(499, 5, false, BOUNDS), 495);
    }

    #[test]
    fn test_interior_step_is_plain_addition() {
        assert_eq!(step(100, 5, false, BOUNDS), 105);
        assert_eq!(step(100, 5, true, BOUNDS), 95);
        assert_eq!(step(53, 3, true, BOUNDS), 50);
        assert_eq!(step(497, 3, false, BOUNDS), 500);
    }

    #[test]
    fn test_step_at_the_edges_of_i64() {
        let full = PriceBounds { min: i64::MIN, max: i64::MAX };
        assert_eq!(full.width(), u64::MAX);
        assert_eq!(step(i64::MAX - 1, 5, false, full), i64::MAX - 5);
        assert_eq!(step(i64::MIN + 2, 5, true, full), i64::MIN + 5);
        assert_eq!(step(i64::MAX, 5, true, full), i64::MAX - 5);
    }

    #[test]
    fn test_walk_over_full_i64_corridor() {
        let full = PriceBounds { min: i64::MIN, max: i64::MAX };
        let walk = PriceWalk::new(full, 0, i64::MAX).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let mut state = PriceState::initialize(8, walk, &mut rng);
        assert_eq!(state.bounds(), full);
        for s in universe(8).cycle().take(10_000) {
            state.update(s, &mut rng);
        }
    }

    #[test]
    fn test_walk_stays_in_tight_corridor() {
        // delta_max == width is the tightest valid corridor
        let bounds = PriceBounds { min: 10, max: 15 };
        let walk = PriceWalk::new(bounds, 1, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut price = 10;
        for _ in 0..50_000 {
            price = walk.next_price(price, &mut rng);
            assert!(bounds.contains(price), "price {} escaped", price);
        }
    }

    #[test]
    fn test_walk_moves_every_step() {
        let walk = PriceWalk::new(BOUNDS, 1, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut price = 250;
        for _ in 0..1_000 {
            let next = walk.next_price(price, &mut rng);
            let moved = (next - price).abs();
            assert!((1..=5).contains(&moved));
            price = next;
        }
    }

    #[test]
    fn test_walk_rejects_delta_wider_than_corridor() {
        let err = PriceWalk::new(PriceBounds { min: 0, max: 3 }, 1, 5).unwrap_err();
        assert!(matches!(err, ConfigError::DeltaExceedsCorridor { .. }));
    }

    #[test]
    fn test_initialize_and_update_single_symbol() {
        let walk = PriceWalk::new(BOUNDS, 1, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = PriceState::initialize(100, walk, &mut rng);
        assert_eq!(state.len(), 100);
        assert!(universe(100).all(|s| BOUNDS.contains(state.price(s).unwrap())));

        let before: Vec<i64> = universe(100).map(|s| state.price(s).unwrap()).collect();
        let target = SymbolId::from_rank(17).unwrap();
        let new_price = state.update(target, &mut rng);
        assert_eq!(state.price(target), Some(new_price));
        for s in universe(100).filter(|&s| s != target) {
            assert_eq!(state.price(s), Some(before[s.index()]));
        }
    }

    #[test]
    fn test_price_outside_universe_is_none() {
        let walk = PriceWalk::new(BOUNDS, 1, 5).unwrap();
        let state = PriceState::initialize(3, walk, &mut StdRng::seed_from_u64(1));
        assert!(state.price(SymbolId::from_rank(4).unwrap()).is_none());
    }
}
