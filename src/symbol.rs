use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Every symbol on the tape is this prefix followed by its rank.
pub const SYMBOL_PREFIX: &str = "SYM";

/// Identifier of one symbol in the generated universe.
///
/// Ids are the 1-based ranks `1..=N` assigned when the universe is built, so
/// they double as dense indices (`rank - 1`) into per-symbol state.
/// On the tape and in JSON a symbol is always the string `SYM<rank>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolId(u32);

impl SymbolId {
    /// Returns `None` for rank 0; ranks start at 1.
    pub fn from_rank(rank: u32) -> Option<Self> {
        (rank > 0).then_some(SymbolId(rank))
    }

    pub fn rank(self) -> u32 {
        self.0
    }

    /// Zero-based slot for dense per-symbol tables.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

/// The ids `SYM1..=SYM<size>` in rank order.
pub fn universe(size: u32) -> impl Iterator<Item = SymbolId> + Clone {
    (1..=size).map(SymbolId)
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SYMBOL_PREFIX, self.0)
    }
}

impl FromStr for SymbolId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(SYMBOL_PREFIX)
            .and_then(|rank| rank.parse::<u32>().ok())
            .and_then(SymbolId::from_rank)
            .ok_or_else(|| format!("invalid symbol: `{}`", s))
    }
}

impl TryFrom<String> for SymbolId {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SymbolId> for String {
    fn from(id: SymbolId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix_and_rank() {
        let id = SymbolId::from_rank(42).unwrap();
        assert_eq!(id.to_string(), "SYM42");
        assert_eq!(id.index(), 41);
    }

    #[test]
    fn parse_round_trips_display() {
        for id in universe(25) {
            assert_eq!(id.to_string().parse::<SymbolId>().unwrap(), id);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("SYM0".parse::<SymbolId>().is_err());
        assert!("SYM".parse::<SymbolId>().is_err());
        assert!("sym3".parse::<SymbolId>().is_err());
        assert!("SYM-3".parse::<SymbolId>().is_err());
        let e = "BTC-USD".parse::<SymbolId>().unwrap_err();
        assert!(e.contains("invalid symbol"));
    }

    #[test]
    fn rank_zero_is_not_a_symbol() {
        assert!(SymbolId::from_rank(0).is_none());
    }

    #[test]
    fn universe_is_dense_and_ordered() {
        let ids: Vec<u32> = universe(4).map(SymbolId::rank).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(universe(0).count(), 0);
    }

    #[test]
    fn serde_symbol_is_string() {
        let id = SymbolId::from_rank(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"SYM7\"");
        let back: SymbolId = serde_json::from_str("\"SYM7\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<SymbolId>("7").is_err());
    }
}
