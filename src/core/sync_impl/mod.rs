//! Synchronous units of logic.
//!
//! This module contains the traits a blocking unit implements, one per kind:
//! - [`TransformLogic`] consumes a value and produces one
//! - [`SinkLogic`] consumes a value and produces nothing
//! - [`SourceLogic`] produces a value from nothing
//!
//! Plain closures implement these traits, so most registrations never name them.

pub mod unit;

pub use unit::{SinkLogic, SourceLogic, TransformLogic};

/// The error type units report their own failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a unit of logic returns.
pub type UnitResult<T> = Result<T, BoxError>;
