//! Shared utilities.

pub mod decimal;
pub mod shutdown;

pub use decimal::{round_half_up, round_to_tick};
pub use shutdown::shutdown_requested;
