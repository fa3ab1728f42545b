//! Trading logic.
//!
//! - `symbol_cache`: wholesale-replaced futures pair metadata and its refresh timer
//! - `executor`: turns buy signals into leveraged longs with a take-profit

mod executor;
mod symbol_cache;

pub use executor::{OrderExecutor, PositionOutcome};
pub use symbol_cache::{spawn_symbol_refresh, SymbolCache};
