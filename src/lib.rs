//! # fncatalog
//!
//! An in-process function invocation runtime: a concurrent catalog of named
//! units of logic that can be looked up, composed with `a|b|c` keys, and
//! invoked with content negotiation.
//!
//! ## Features
//!
//! - **Three kinds of unit**: transforms (one in, one out), sinks (one in) and
//!   sources (one out), each blocking or async
//! - **Explicit type descriptors**: every registration declares its input and
//!   output shapes; `unknown` shapes pass payloads through untouched
//! - **Composition**: `lookup("words|uppercase|logger")` validates and builds
//!   a pipeline, cached per key and evicted when a participant changes
//! - **Negotiation**: raw bytes are decoded using the declared content type or
//!   by sniffing, and results are encoded for the caller's `accept`
//! - **No globals**: a catalog is an ordinary value you construct and share
//!
//! ## Quick Start
//!
//! ```rust
//! use fncatalog::prelude::*;
//!
//! let catalog = FunctionCatalog::new();
//! catalog
//!     .register(
//!         "uppercase",
//!         Registration::transform(Shape::String, Shape::String, |v: Value| {
//!             Ok(v.to_string().to_uppercase().into())
//!         }),
//!     )
//!     .unwrap();
//!
//! let uppercase = catalog.lookup("uppercase").unwrap();
//! let out = catalog.invoker().invoke(&uppercase, "hello", None).unwrap();
//! assert_eq!(out, Some(Value::from("HELLO")));
//! ```
//!
//! ## Module Organization
//!
//! - [`sync_impl`]: Blocking unit traits
//! - [`async_impl`]: Async unit traits and the [`AsyncFn`] closure adapter
//! - [`prelude`]: Commonly used types and traits (import with `use fncatalog::prelude::*`)
//! - [`async_prelude`]: The prelude plus the async unit traits

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use crate::core::{FunctionUnit, Logic};
pub use crate::core::{async_impl, sync_impl};

// Catalog and composition
pub use crate::core::catalog::FunctionCatalog;
pub use crate::core::composition::{SEPARATOR, is_composed};
pub use crate::core::config::{CatalogConfig, RegistrationPolicy};
pub use crate::core::registration::Registration;

// Types
pub use crate::core::descriptor::{Kind, Shape, TypeDescriptor};
pub use crate::core::message::{ACCEPT, CONTENT_TYPE, Message};
pub use crate::core::value::Value;

// Invocation
pub use crate::core::conversion::{
    APPLICATION_JSON, APPLICATION_OCTET_STREAM, MediaType, TEXT_PLAIN, coerce,
};
pub use crate::core::invoker::Invoker;

// Units
pub use crate::core::async_impl::{AsyncFn, AsyncSinkLogic, AsyncSourceLogic, AsyncTransformLogic};
pub use crate::core::sync_impl::{BoxError, SinkLogic, SourceLogic, TransformLogic, UnitResult};

// Errors, introspection and telemetry
pub use crate::core::error::{CatalogError, Result};
pub use crate::core::introspection::FunctionInfo;
pub use crate::core::telemetry::{InvocationTrace, MemoryTelemetry, Outcome, Telemetry};

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// The main prelude: everything needed to register, compose and invoke.
///
/// # Example
/// ```rust
/// use fncatalog::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        BoxError,
        CatalogConfig,
        CatalogError,
        // Catalog
        FunctionCatalog,
        FunctionInfo,
        FunctionUnit,
        Invoker,
        Kind,
        MemoryTelemetry,
        Message,
        Registration,
        RegistrationPolicy,
        Shape,
        SinkLogic,
        SourceLogic,
        Telemetry,
        // Units
        TransformLogic,
        TypeDescriptor,
        UnitResult,
        Value,
    };
}

/// Prelude for async units.
///
/// # Example
/// ```rust
/// use fncatalog::async_prelude::*;
/// ```
pub mod async_prelude {
    pub use super::prelude::*;
    pub use super::{AsyncFn, AsyncSinkLogic, AsyncSourceLogic, AsyncTransformLogic};
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
