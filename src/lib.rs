// Library exports for stock_warroom

pub mod config;
pub mod db;
pub mod features;
pub mod kdj;
pub mod macd;
pub mod model;
pub mod pipeline;
pub mod ranking;
pub mod revenue;
pub mod rolling;
pub mod scan;
pub mod stock_db;
pub mod strategy;
pub mod watchlist;
pub mod weekly;
