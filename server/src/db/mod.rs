//! MySQL persistence.

mod executor;
mod pool;

pub use executor::*;
pub use pool::*;
