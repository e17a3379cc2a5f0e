//! cmdkit: argument vectors from structured configuration, and the
//! process runner CI scripts feed them to.

pub mod error;
pub mod args;
pub mod cmd;
pub mod render;
#[cfg(feature = "exec")]
pub mod exec;
pub mod prelude;
pub mod macros;

pub use error::{CommandError, Result};
