pub mod ledger;
pub mod lifecycle;

pub use ledger::{Account, ClosedTrade, Ledger, LedgerState, OpenRequest, TAKER_FEE_RATE};
pub use lifecycle::{
    advance_trail, clamp_leverage, effective_risk_pct, liquidation_price, position_margin,
    TrailAdvance,
};
