pub mod cli;
pub mod config;
pub mod errors;
pub mod generate;
pub mod inspect;
pub mod pool;
pub mod price;
pub mod sink;
pub mod symbol;
pub mod trade;
pub mod utils;
