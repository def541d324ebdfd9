//! Asynchronous units of logic.
//!
//! Mirrors [`sync_impl`](crate::core::sync_impl) with async/await support:
//! - [`AsyncTransformLogic`], [`AsyncSinkLogic`] and [`AsyncSourceLogic`] for
//!   hand-written units
//! - [`AsyncFn`] to lift an `async` closure into any of the three
//!
//! Registrations backed by async logic are driven with
//! [`Invoker::invoke_async`](crate::core::invoker::Invoker::invoke_async).

pub mod unit;

pub use unit::{AsyncFn, AsyncSinkLogic, AsyncSourceLogic, AsyncTransformLogic};
