pub mod http;
pub mod registry;
pub mod traits;

// API source implementations
pub mod coingecko;
pub mod exchangerate;
