//! Persistent dependency-fingerprint cache (spec §4.5): skips recipes
//! whose watched resources and dynamic fingerprints haven't changed
//! since their last successful run.

mod book;
mod error;
mod paramhash;
mod skip;
mod store;

pub use book::DependencyBook;
pub use error::CacheError;
pub use paramhash::paramhash;
pub use skip::{decide, SkipDecision};
pub use store::{CacheStats, DependencyCache};
