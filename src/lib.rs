pub mod config;
pub mod constants;
pub mod inference;
pub mod logging;
pub mod workers;
