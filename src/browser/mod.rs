//! Browser abstraction traits and the bounded page pool built on them.

/// Traits describing the browser surface the recorder drives.
pub mod driver;
/// Bounded, reusing pool of prepared pages.
pub mod pool;
