//! Cache maintenance tools.

pub mod flush;

pub use flush::{CacheFlushParams, flush_impl};
