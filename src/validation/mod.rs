//! URL validation
//!
//! Syntax checking, response classification and the probing engine that
//! ties them to the cache.

pub mod classifier;
pub mod engine;
pub mod syntax;

// Re-export commonly used items
pub use classifier::{ContentPolicy, Rejection};
pub use engine::ValidationEngine;
pub use syntax::has_valid_syntax;
