//! Bootstrap for the livedesk console
//!
//! This module handles:
//! - Configuration loading
//! - Service construction and wiring

pub mod config;
pub mod services;

pub use config::load_config;
pub use services::{init_services, Services};
