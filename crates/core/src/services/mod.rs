pub mod actions;
pub mod portfolio_service;
pub mod rates_view;
pub mod resolver;
pub mod scheduler;
pub mod updater;
pub mod user_service;
