//! Shared primitives for the Mantel distance-correlation crates.
//!
//! - **Error types** — [`MantelError`] and [`Result`] for structured error handling
//! - **Traits** — [`Summarizable`] for one-line descriptions of results

pub mod error;
pub mod traits;

pub use error::{MantelError, Result};
pub use traits::*;
