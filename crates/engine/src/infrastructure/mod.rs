//! Infrastructure: capability ports and the default adapters behind them.

pub mod dice;
pub mod memory;
pub mod notify;
pub mod ports;
