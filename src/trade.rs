use serde::{Deserialize, Serialize};

use crate::symbol::SymbolId;

/// Column names of the tape, in order.
pub const HEADER: [&str; 4] = ["stocksymbol", "time", "quantity", "price"];

/// One synthetic trade.
///
/// # Fields
/// - `symbol`: the traded symbol, written as `SYM<rank>`.
/// - `sequence`: 1-based emission index, written in the `time` column. Strictly
///   increasing with no gaps across a run.
/// - `quantity`: shares traded.
/// - `price`: the symbol's price right after this trade's walk step.
///
/// Serde names follow the tape header so a tape can be read straight back
/// with `csv::Reader::deserialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "stocksymbol")]
    pub symbol: SymbolId,
    #[serde(rename = "time")]
    pub sequence: u64,
    pub quantity: u64,
    pub price: i64,
}
