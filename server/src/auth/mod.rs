//! Caller identification.

mod middleware;

pub use middleware::*;
