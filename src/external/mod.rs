pub mod market_provider;
pub mod yahoo;
