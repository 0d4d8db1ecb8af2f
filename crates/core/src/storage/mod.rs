pub mod atomic;
pub mod database;
pub mod password;
pub mod rates;
