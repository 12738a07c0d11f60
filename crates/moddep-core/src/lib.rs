//! moddep Core
//!
//! Core types, error taxonomy and configuration shared by the moddep crates.

pub mod config;
pub mod error;
pub mod location;
pub mod types;

pub use error::{Error, ErrorKind, Failures, Result};
pub use location::Location;
pub use types::*;
