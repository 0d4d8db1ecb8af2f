pub mod currency;
pub mod rates;
pub mod timestamp;
pub mod user;
pub mod wallet;
