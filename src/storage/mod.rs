//! Storage Layer
//!
//! Configuration file loading and the read-only corridor data cache.

pub mod config;
pub mod corridors;

pub use config::ConfigService;
pub use corridors::CorridorStore;
