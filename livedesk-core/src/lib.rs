pub mod models;
pub mod codec;
pub mod fabric;
pub mod cache;
pub mod service;
pub mod config;
pub mod error;
pub mod logging;
pub mod bootstrap;
pub mod resilience;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, FailurePolicy, Result};
pub use cache::StreamCache;
