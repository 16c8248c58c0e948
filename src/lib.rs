pub mod config;
pub mod forecast;
pub mod output;
pub mod publish;
pub mod telemetry;
pub mod tiles;
