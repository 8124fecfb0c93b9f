use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "long",
            TradeSide::Short => "short",
        }
    }

    pub fn opposite(&self) -> TradeSide {
        match self {
            TradeSide::Long => TradeSide::Short,
            TradeSide::Short => TradeSide::Long,
        }
    }
}

/// Whether a deal opens or closes (part of) a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealEntry {
    Open,
    Close,
}

/// One raw fill from the broker's deal history.
///
/// Opening legs carry zero realized profit; the closing leg of a position
/// carries the round trip's profit, swap, and commission. `side` is the
/// direction of the fill itself, so a closing leg's side is opposite to the
/// position it closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealEvent {
    pub ticket: u64,
    /// Groups the opening and closing legs of one position.
    pub position_id: u64,
    pub symbol: String,
    pub side: TradeSide,
    pub volume: Decimal,
    pub price: Decimal,
    pub time: DateTime<Utc>,
    pub profit: Decimal,
    pub swap: Decimal,
    pub commission: Decimal,
    pub entry: DealEntry,
}

/// A normalized closed trade, assembled from a position's opening and
/// closing legs. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Ticket of the closing deal, kept for traceability only.
    pub ticket: u64,
    pub symbol: String,
    /// Direction of the position (not of the closing fill).
    pub side: TradeSide,
    pub volume: Decimal,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open_price: Decimal,
    pub close_price: Decimal,
    pub profit: Decimal,
    pub swap: Decimal,
    pub commission: Decimal,
}

impl TradeRecord {
    /// Realized result including financing and commission. Commission is
    /// stored signed (conventionally negative), so this is a plain sum.
    pub fn net_result(&self) -> Decimal {
        self.profit + self.swap + self.commission
    }

    pub fn is_winner(&self) -> bool {
        self.net_result() > Decimal::ZERO
    }
}

/// One sample of account value over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}
