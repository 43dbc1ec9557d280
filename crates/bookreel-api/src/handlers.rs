//! Request handlers.

pub mod health;
pub mod runs;
pub mod stages;

pub use health::*;
pub use runs::*;
pub use stages::*;
