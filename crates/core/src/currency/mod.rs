//! Multi-currency handling and exchange rates.

pub mod conversion;
pub mod error;
pub mod exchange;
pub mod lookup;
pub mod resolver;

#[cfg(test)]
mod props;

pub use conversion::{convert_amount, convert_to_local, round_local};
pub use error::RateError;
pub use exchange::ExchangeRateRow;
pub use lookup::{RateLookup, RateSnapshot, RateTable};
pub use resolver::{ExchangeRateResolver, RateSource};
