//! Trade stream generator.
//!
//! Drives the production loop that turns a [`SymbolPool`] and a [`PriceState`]
//! into an ordered tape of [`TradeRecord`]s.
//!
//! ## Per tick
//! For `t = 1..=num_trades`, in this exact draw order:
//! 1. Draw a pool index uniformly in `[0, pool_len)` and take that symbol.
//!    Because the pool repeats popular symbols, this realizes the fractal skew.
//! 2. Advance that symbol's price one bounded walk step (delta, then sign).
//! 3. Draw a quantity uniformly in `[min_qty, max_qty]`.
//! 4. Emit `TradeRecord { symbol, sequence: t, quantity, price }` to the sink.
//!
//! The loop is single threaded: one RNG threads through every draw and
//! `sequence` is global, so the output is fully determined by the seed.
//! Nothing is retried. The first sink failure aborts the run.
//!
//! # Usage
//! [`run`] does everything from a [`GenConfig`]. Use [`TapeGenerator`] directly
//! to supply your own RNG or sink.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::{GenConfig, QuantityRange},
    errors::{ConfigError, GenError, SinkError},
    pool::SymbolPool,
    price::{PriceState, PriceWalk},
    sink::{CsvSink, TradeSink},
    trade::TradeRecord,
};

/// What a finished run reports back.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub trades: u64,
    pub pool_len: usize,
    pub unique_symbols: u32,
    pub levels: Vec<usize>,
    pub output: String,
    pub elapsed_secs: f64,
    pub trades_per_sec: f64,
}

/// Owns everything one run mutates: the pool, the price table and the
/// quantity distribution. Consumed by [`TapeGenerator::generate`], so the
/// price state cannot outlive or be shared across runs.
#[derive(Debug)]
pub struct TapeGenerator {
    pool: SymbolPool,
    prices: PriceState,
    index: Uniform<usize>,
    quantity: Uniform<u64>,
    num_trades: u64,
    progress_every: u64,
}

impl TapeGenerator {
    /// Validates `cfg`, builds the pool and seeds every symbol's price, in that order.
    pub fn new<R: Rng + ?Sized>(cfg: &GenConfig, rng: &mut R) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let pool = SymbolPool::build(cfg.fractal_fraction, cfg.initial_unique_count, rng)?;
        let walk = PriceWalk::new(cfg.price_bounds(), cfg.price_delta_min, cfg.price_delta_max)?;
        let prices = PriceState::initialize(pool.unique_count(), walk, rng);
        Ok(Self::from_parts(pool, prices, cfg.quantity(), cfg.num_trades)?
            .with_progress_every(cfg.progress_every))
    }

    /// Assembles a generator from a prebuilt pool and price table.
    ///
    /// # Errors
    /// [`ConfigError::NoTrades`] for zero trades, [`ConfigError::QuantityBounds`]
    /// for an inverted quantity range, [`ConfigError::PriceTableTooSmall`] when
    /// `prices` does not cover every symbol in `pool`.
    pub fn from_parts(
        pool: SymbolPool,
        prices: PriceState,
        quantity: QuantityRange,
        num_trades: u64,
    ) -> Result<Self, ConfigError> {
        if num_trades < 1 {
            return Err(ConfigError::NoTrades);
        }
        if quantity.min > quantity.max {
            return Err(ConfigError::QuantityBounds {
                min: quantity.min,
                max: quantity.max,
            });
        }
        if prices.len() < pool.unique_count() as usize {
            return Err(ConfigError::PriceTableTooSmall {
                prices: prices.len(),
                unique: pool.unique_count(),
            });
        }
        let index = pool.index_distribution()?;
        let quantity = Uniform::new_inclusive(quantity.min, quantity.max)
            .map_err(|e| ConfigError::Distribution(e.to_string()))?;
        Ok(Self {
            pool,
            prices,
            index,
            quantity,
            num_trades,
            progress_every: 0,
        })
    }

    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    pub fn pool(&self) -> &SymbolPool {
        &self.pool
    }

    pub fn prices(&self) -> &PriceState {
        &self.prices
    }

    pub fn num_trades(&self) -> u64 {
        self.num_trades
    }

    /// Produces the trade for `sequence`, advancing the chosen symbol's price.
    #[inline]
    pub fn tick<R: Rng + ?Sized>(&mut self, sequence: u64, rng: &mut R) -> TradeRecord {
        let symbol = self.pool.sample_with(&self.index, rng);
        let price = self.prices.update(symbol, rng);
        let quantity = self.quantity.sample(rng);
        TradeRecord {
            symbol,
            sequence,
            quantity,
            price,
        }
    }

    /// Writes all `num_trades` records to `sink` and returns how many were written.
    ///
    /// # Errors
    /// The first [`SinkError`] stops the loop; records already handed to the sink stay there.
    pub fn generate<S, R>(mut self, sink: &mut S, rng: &mut R) -> Result<u64, SinkError>
    where
        S: TradeSink + ?Sized,
        R: Rng + ?Sized,
    {
        info!(trades = self.num_trades, pool_len = self.pool.len(), "generating trades");
        sink.begin()?;
        for t in 1..=self.num_trades {
            let record = self.tick(t, rng);
            sink.emit(&record)?;
            if self.progress_every > 0 && t % self.progress_every == 0 {
                info!("generated {} trades", t);
            }
        }
        sink.finish()?;
        Ok(self.num_trades)
    }
}

/// Seed for the run: the configured one, or a fresh random seed.
pub fn resolve_seed(cfg: &GenConfig) -> u64 {
    cfg.seed.unwrap_or_else(|| rand::rng().random())
}

/// Runs a full generation into `sink` with an RNG seeded from `seed`.
pub fn run_with_sink<S: TradeSink + ?Sized>(
    cfg: &GenConfig,
    seed: u64,
    sink: &mut S,
) -> Result<RunSummary, GenError> {
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let generator = TapeGenerator::new(cfg, &mut rng)?;
    let pool_len = generator.pool().len();
    let unique_symbols = generator.pool().unique_count();
    let levels = generator.pool().levels().to_vec();
    let bounds = generator.prices().bounds();
    debug!(
        planned = generator.num_trades(),
        min_price = bounds.min,
        max_price = bounds.max,
        "generator ready"
    );

    let trades = generator.generate(sink, &mut rng)?;
    let elapsed = start.elapsed();
    Ok(RunSummary {
        seed,
        trades,
        pool_len,
        unique_symbols,
        levels,
        output: cfg.output.to_string(),
        elapsed_secs: elapsed.as_secs_f64(),
        trades_per_sec: rate(trades, elapsed),
    })
}

/// Validates `cfg`, opens its output and writes the whole tape.
///
/// Configuration problems are reported before the output is created.
pub fn run(cfg: &GenConfig) -> Result<RunSummary, GenError> {
    cfg.validate()?;
    let seed = resolve_seed(cfg);
    info!(seed, output = %cfg.output, "starting trade tape run");
    let mut sink = CsvSink::open(&cfg.output, cfg.batch_bytes)?;
    let summary = run_with_sink(cfg, seed, &mut sink)?;
    info!(
        trades = summary.trades,
        elapsed_secs = summary.elapsed_secs,
        trades_per_sec = summary.trades_per_sec as u64,
        "done, tape saved to {}",
        summary.output
    );
    Ok(summary)
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}
