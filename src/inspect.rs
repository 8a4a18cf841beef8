//! Reads a generated tape back and checks it against the output contract:
//! exact header, `time` running `1, 2, 3, ...` without gaps, well-formed
//! symbols and, optionally, prices and quantities inside configured bounds.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use thiserror::Error;
use tracing::debug;

use crate::{
    config::QuantityRange,
    price::PriceBounds,
    symbol::SymbolId,
    trade::{HEADER, TradeRecord},
};

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("failed to open tape: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed tape: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected header `{found}`, expected `{}`", HEADER.join(","))]
    BadHeader { found: String },

    #[error("line {line}: expected time {expected}, found {found}")]
    SequenceGap { line: u64, expected: u64, found: u64 },

    #[error("line {line}: price {price} outside [{}, {}]", .bounds.min, .bounds.max)]
    PriceOutOfBounds {
        line: u64,
        price: i64,
        bounds: PriceBounds,
    },

    #[error("line {line}: quantity {quantity} outside [{}, {}]", .range.min, .range.max)]
    QuantityOutOfBounds {
        line: u64,
        quantity: u64,
        range: QuantityRange,
    },
}

/// Optional bounds to enforce while reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct InspectOptions {
    pub price: Option<PriceBounds>,
    pub quantity: Option<QuantityRange>,
}

/// Aggregates of a tape that passed every check.
#[derive(Debug, Clone, Default)]
pub struct TapeReport {
    pub rows: u64,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_qty: Option<u64>,
    pub max_qty: Option<u64>,
    pub counts: HashMap<SymbolId, u64>,
}

impl TapeReport {
    pub fn unique_symbols(&self) -> usize {
        self.counts.len()
    }

    /// Most traded symbols, ties broken by rank.
    pub fn top(&self, n: usize) -> Vec<(SymbolId, u64)> {
        let mut ranked: Vec<(SymbolId, u64)> =
            self.counts.iter().map(|(&s, &c)| (s, c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Share of all trades taken by the `n` most traded symbols.
    pub fn top_share(&self, n: usize) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        let top: u64 = self.top(n).iter().map(|(_, c)| c).sum();
        top as f64 / self.rows as f64
    }

    fn record(&mut self, t: &TradeRecord) {
        self.rows += 1;
        self.min_price = Some(self.min_price.map_or(t.price, |p| p.min(t.price)));
        self.max_price = Some(self.max_price.map_or(t.price, |p| p.max(t.price)));
        self.min_qty = Some(self.min_qty.map_or(t.quantity, |q| q.min(t.quantity)));
        self.max_qty = Some(self.max_qty.map_or(t.quantity, |q| q.max(t.quantity)));
        *self.counts.entry(t.symbol).or_insert(0) += 1;
    }
}

/// Streams and validates a tape from any reader.
pub fn inspect_reader<R: Read>(reader: R, opts: InspectOptions) -> Result<TapeReport, InspectError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?;
    if headers.iter().ne(HEADER.iter().copied()) {
        return Err(InspectError::BadHeader {
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut report = TapeReport::default();
    for (i, row) in rdr.deserialize::<TradeRecord>().enumerate() {
        let t = row?;
        // header is line 1
        let line = i as u64 + 2;
        let expected = i as u64 + 1;
        if t.sequence != expected {
            return Err(InspectError::SequenceGap {
                line,
                expected,
                found: t.sequence,
            });
        }
        if let Some(bounds) = opts.price.filter(|b| !b.contains(t.price)) {
            return Err(InspectError::PriceOutOfBounds {
                line,
                price: t.price,
                bounds,
            });
        }
        if let Some(range) = opts.quantity.filter(|r| !r.contains(t.quantity)) {
            return Err(InspectError::QuantityOutOfBounds {
                line,
                quantity: t.quantity,
                range,
            });
        }
        report.record(&t);
    }
    debug!(rows = report.rows, unique = report.unique_symbols(), "tape inspected");
    Ok(report)
}

pub fn inspect_path(path: impl AsRef<Path>, opts: InspectOptions) -> Result<TapeReport, InspectError> {
    let file = File::open(path)?;
    inspect_reader(BufReader::new(file), opts)
}
