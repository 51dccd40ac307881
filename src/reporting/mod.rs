//! Structured logging
//!
//! Thin wrappers over the `log` facade so call sites stay terse and every
//! component reports the same way.

pub mod logging;
