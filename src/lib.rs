pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod types;

// Domain data shapes shared across layers
pub mod domain;
