//! Core types and shared functionality for reelrate.
//!
//! This crate provides:
//! - Rating data model
//! - Persistent rating store with memory and SQLite backends
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use config::{AppConfig, ConfigError, SkinConfig};
pub use error::Error;
pub use model::{EmptyRating, Rating, RatingValue};
pub use store::{CacheEntry, CacheLifetime, MemoryBackend, RatingStore, SnapshotBackend, SqliteBackend, StoreDb};
