use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, price::PriceBounds};

/// Where the tape goes: `-` is stdout, anything else a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl FromStr for Destination {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("output destination must not be empty".to_string()),
            "-" => Ok(Destination::Stdout),
            path => Ok(Destination::File(PathBuf::from(path))),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout => f.write_str("-"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl TryFrom<String> for Destination {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Destination> for String {
    fn from(d: Destination) -> Self {
        d.to_string()
    }
}

/// Inclusive bounds for trade quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRange {
    pub min: u64,
    pub max: u64,
}

impl QuantityRange {
    pub fn contains(&self, qty: u64) -> bool {
        (self.min..=self.max).contains(&qty)
    }
}

/// Every knob of a generation run.
///
/// Defaults reproduce the reference workload: 10M trades over a 70k-symbol
/// universe with a 0.3 fractal fraction, prices walking in `[50, 500]` by
/// 1..=5 per trade and quantities in `[100, 10000]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    pub num_trades: u64,
    pub initial_unique_count: u32,
    pub fractal_fraction: f64,
    pub min_price: i64,
    pub max_price: i64,
    pub min_qty: u64,
    pub max_qty: u64,
    pub price_delta_min: i64,
    pub price_delta_max: i64,
    pub output: Destination,
    /// Fixed seed for a reproducible tape; a fresh one is drawn (and logged) when unset.
    pub seed: Option<u64>,
    /// Log a progress line every this many trades; 0 disables it.
    pub progress_every: u64,
    /// Size of the write batch handed to the output, in bytes.
    pub batch_bytes: usize,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            num_trades: 10_000_000,
            initial_unique_count: 70_000,
            fractal_fraction: 0.3,
            min_price: 50,
            max_price: 500,
            min_qty: 100,
            max_qty: 10_000,
            price_delta_min: 1,
            price_delta_max: 5,
            output: Destination::File(PathBuf::from("data/trade.csv")),
            seed: None,
            progress_every: 1_000_000,
            batch_bytes: 1 << 16,
        }
    }
}

impl GenConfig {
    /// Reads a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = serde_json::from_str(&raw)?;
        Ok(cfg)
    }

    pub fn price_bounds(&self) -> PriceBounds {
        PriceBounds {
            min: self.min_price,
            max: self.max_price,
        }
    }

    pub fn quantity(&self) -> QuantityRange {
        QuantityRange {
            min: self.min_qty,
            max: self.max_qty,
        }
    }

    /// Checks every precondition of a run. Nothing is generated or opened
    /// until this passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pool_params(self.fractal_fraction, self.initial_unique_count)?;
        if self.num_trades < 1 {
            return Err(ConfigError::NoTrades);
        }
        if self.min_qty > self.max_qty {
            return Err(ConfigError::QuantityBounds {
                min: self.min_qty,
                max: self.max_qty,
            });
        }
        validate_walk_params(
            self.price_bounds(),
            self.price_delta_min,
            self.price_delta_max,
        )
    }
}

pub fn validate_pool_params(fraction: f64, initial_count: u32) -> Result<(), ConfigError> {
    // NaN fails the range check as well
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(ConfigError::FractionOutOfRange(fraction));
    }
    if initial_count < 1 {
        return Err(ConfigError::EmptyUniverse);
    }
    Ok(())
}

/// A bounce moves a price `|delta|` inside the corridor from the edge it
/// crossed, which only stays in bounds when `delta_max <= max - min`.
pub fn validate_walk_params(
    bounds: PriceBounds,
    delta_min: i64,
    delta_max: i64,
) -> Result<(), ConfigError> {
    if bounds.min >= bounds.max {
        return Err(ConfigError::PriceBounds {
            min: bounds.min,
            max: bounds.max,
        });
    }
    if delta_min > delta_max {
        return Err(ConfigError::DeltaBounds {
            min: delta_min,
            max: delta_max,
        });
    }
    if delta_min < 0 {
        return Err(ConfigError::NegativeDelta(delta_min));
    }
    let width = bounds.width();
    if delta_max.unsigned_abs() > width {
        return Err(ConfigError::DeltaExceedsCorridor { delta_max, width });
    }
    Ok(())
}
