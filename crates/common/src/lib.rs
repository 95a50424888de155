//! Shared error definitions used across the pocmon crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
