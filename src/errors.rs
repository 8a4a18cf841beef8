use std::{io, path::PathBuf};

use thiserror::Error;

/// Rejected generator settings. Raised before any output is created.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("fractal fraction must lie strictly between 0 and 1, got {0}")]
    FractionOutOfRange(f64),

    #[error("initial unique symbol count must be at least 1")]
    EmptyUniverse,

    #[error("number of trades must be at least 1")]
    NoTrades,

    #[error("min price {min} must be below max price {max}")]
    PriceBounds { min: i64, max: i64 },

    #[error("min quantity {min} must not exceed max quantity {max}")]
    QuantityBounds { min: u64, max: u64 },

    #[error("min price delta {min} must not exceed max price delta {max}")]
    DeltaBounds { min: i64, max: i64 },

    #[error("price delta must be non-negative, got {0}")]
    NegativeDelta(i64),

    #[error("max price delta {delta_max} exceeds the price corridor width {width}")]
    DeltaExceedsCorridor { delta_max: i64, width: u64 },

    #[error("price table covers {prices} symbols but the pool has {unique}")]
    PriceTableTooSmall { prices: usize, unique: u32 },

    #[error("invalid sampling range: {0}")]
    Distribution(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The output destination refused a write. Always fatal for the run.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to open output {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write trades up to sequence {sequence}: {source}")]
    Write {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to flush output: {0}")]
    Flush(#[source] io::Error),
}

#[derive(Error, Debug)]
pub enum GenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
