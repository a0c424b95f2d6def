//! Request handlers for table access.

mod changes;
mod rows;

pub use changes::*;
pub use rows::*;
