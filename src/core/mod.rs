pub mod async_impl;
pub mod catalog;
pub mod composition;
pub mod config;
pub mod conversion;
pub mod descriptor;
pub mod error;
pub mod introspection;
pub mod invoker;
pub mod message;
pub mod registration;
pub mod sync_impl;
pub mod telemetry;
pub mod value;

use async_impl::{AsyncSinkLogic, AsyncSourceLogic, AsyncTransformLogic};
use descriptor::Kind;
use std::fmt;
use std::sync::Arc;
use sync_impl::{SinkLogic, SourceLogic, TransformLogic};

/// The general unit-of-logic enum. One variant per kind, each backed by
/// blocking or async logic.
#[derive(Clone)]
pub enum FunctionUnit {
    Transform(Logic<dyn TransformLogic, dyn AsyncTransformLogic>),
    Sink(Logic<dyn SinkLogic, dyn AsyncSinkLogic>),
    Source(Logic<dyn SourceLogic, dyn AsyncSourceLogic>),
}

/// Blocking or async backing for one [`FunctionUnit`] variant.
pub enum Logic<S: ?Sized, A: ?Sized> {
    Sync(Arc<S>),
    Async(Arc<A>),
}

impl<S: ?Sized, A: ?Sized> Clone for Logic<S, A> {
    fn clone(&self) -> Self {
        match self {
            Logic::Sync(logic) => Logic::Sync(Arc::clone(logic)),
            Logic::Async(logic) => Logic::Async(Arc::clone(logic)),
        }
    }
}

impl<S: ?Sized, A: ?Sized> Logic<S, A> {
    pub fn is_async(&self) -> bool {
        matches!(self, Logic::Async(_))
    }
}

impl FunctionUnit {
    pub fn transform<L: TransformLogic>(logic: L) -> Self {
        FunctionUnit::Transform(Logic::Sync(Arc::new(logic)))
    }

    pub fn sink<L: SinkLogic>(logic: L) -> Self {
        FunctionUnit::Sink(Logic::Sync(Arc::new(logic)))
    }

    pub fn source<L: SourceLogic>(logic: L) -> Self {
        FunctionUnit::Source(Logic::Sync(Arc::new(logic)))
    }

    pub fn async_transform<L: AsyncTransformLogic>(logic: L) -> Self {
        FunctionUnit::Transform(Logic::Async(Arc::new(logic)))
    }

    pub fn async_sink<L: AsyncSinkLogic>(logic: L) -> Self {
        FunctionUnit::Sink(Logic::Async(Arc::new(logic)))
    }

    pub fn async_source<L: AsyncSourceLogic>(logic: L) -> Self {
        FunctionUnit::Source(Logic::Async(Arc::new(logic)))
    }

    pub fn kind(&self) -> Kind {
        match self {
            FunctionUnit::Transform(_) => Kind::Transform,
            FunctionUnit::Sink(_) => Kind::Sink,
            FunctionUnit::Source(_) => Kind::Source,
        }
    }

    pub fn is_async(&self) -> bool {
        match self {
            FunctionUnit::Transform(logic) => logic.is_async(),
            FunctionUnit::Sink(logic) => logic.is_async(),
            FunctionUnit::Source(logic) => logic.is_async(),
        }
    }
}

impl fmt::Debug for FunctionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_async() { "async" } else { "sync" };
        write!(f, "FunctionUnit({} {})", mode, self.kind())
    }
}
