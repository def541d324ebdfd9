use crate::core::FunctionUnit;
use crate::core::async_impl::{AsyncFn, AsyncSinkLogic, AsyncSourceLogic, AsyncTransformLogic};
use crate::core::descriptor::{Kind, Shape, TypeDescriptor};
use crate::core::error::{CatalogError, Result};
use crate::core::sync_impl::UnitResult;
use crate::core::value::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An immutable pairing of a unit of logic with its [`TypeDescriptor`].
///
/// Plain registrations are created by the caller and handed to the catalog,
/// which stamps the name they are stored under. Derived registrations are
/// built by the composition resolver and hold the ordered stages of a pipeline.
pub struct Registration {
    name: String,
    descriptor: TypeDescriptor,
    body: Body,
}

pub(crate) enum Body {
    Unit(FunctionUnit),
    Pipeline(Vec<Arc<Registration>>),
}

impl Registration {
    /// Pairs a unit with a descriptor, rejecting a descriptor of another kind.
    pub fn new(unit: FunctionUnit, descriptor: TypeDescriptor) -> Result<Self> {
        if unit.kind() != descriptor.kind() {
            return Err(CatalogError::InvalidDescriptor {
                unit: unit.kind(),
                descriptor: descriptor.kind(),
            });
        }
        Ok(Self::from_parts(unit, descriptor))
    }

    fn from_parts(unit: FunctionUnit, descriptor: TypeDescriptor) -> Self {
        Self {
            name: String::new(),
            descriptor,
            body: Body::Unit(unit),
        }
    }

    /// A blocking transform from a closure.
    pub fn transform<F>(input: Shape, output: Shape, f: F) -> Self
    where
        F: Fn(Value) -> UnitResult<Value> + Send + Sync + 'static,
    {
        Self::from_parts(
            FunctionUnit::transform(f),
            TypeDescriptor::transform(input, output),
        )
    }

    /// A blocking sink from a closure.
    pub fn sink<F>(input: Shape, f: F) -> Self
    where
        F: Fn(Value) -> UnitResult<()> + Send + Sync + 'static,
    {
        Self::from_parts(FunctionUnit::sink(f), TypeDescriptor::sink(input))
    }

    /// A blocking source from a closure.
    pub fn source<F>(output: Shape, f: F) -> Self
    where
        F: Fn() -> UnitResult<Value> + Send + Sync + 'static,
    {
        Self::from_parts(FunctionUnit::source(f), TypeDescriptor::source(output))
    }

    /// An async transform from a closure returning a future.
    pub fn async_transform<F, Fut>(input: Shape, output: Shape, f: F) -> Self
    where
        AsyncFn<F>: AsyncTransformLogic,
        F: Fn(Value) -> Fut,
        Fut: Future<Output = UnitResult<Value>>,
    {
        Self::from_parts(
            FunctionUnit::async_transform(AsyncFn(f)),
            TypeDescriptor::transform(input, output),
        )
    }

    /// An async sink from a closure returning a future.
    pub fn async_sink<F, Fut>(input: Shape, f: F) -> Self
    where
        AsyncFn<F>: AsyncSinkLogic,
        F: Fn(Value) -> Fut,
        Fut: Future<Output = UnitResult<()>>,
    {
        Self::from_parts(
            FunctionUnit::async_sink(AsyncFn(f)),
            TypeDescriptor::sink(input),
        )
    }

    /// An async source from a closure returning a future.
    pub fn async_source<F, Fut>(output: Shape, f: F) -> Self
    where
        AsyncFn<F>: AsyncSourceLogic,
        F: Fn() -> Fut,
        Fut: Future<Output = UnitResult<Value>>,
    {
        Self::from_parts(
            FunctionUnit::async_source(AsyncFn(f)),
            TypeDescriptor::source(output),
        )
    }

    pub(crate) fn pipeline(
        key: String,
        descriptor: TypeDescriptor,
        stages: Vec<Arc<Registration>>,
    ) -> Self {
        Self {
            name: key,
            descriptor,
            body: Body::Pipeline(stages),
        }
    }

    pub(crate) fn named(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    /// The name this registration was first stored under, or the composed key
    /// for a derived pipeline. Empty until registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> Kind {
        self.descriptor.kind()
    }

    /// The unit of a plain registration; `None` for a pipeline.
    pub fn unit(&self) -> Option<&FunctionUnit> {
        match &self.body {
            Body::Unit(unit) => Some(unit),
            Body::Pipeline(_) => None,
        }
    }

    pub fn is_composed(&self) -> bool {
        matches!(self.body, Body::Pipeline(_))
    }

    /// The plain registrations invoked, in order. A plain registration is its
    /// own single stage.
    pub fn stages(&self) -> Vec<&Registration> {
        match &self.body {
            Body::Unit(_) => vec![self],
            Body::Pipeline(stages) => stages.iter().flat_map(|stage| stage.stages()).collect(),
        }
    }

    /// True when any stage needs [`Invoker::invoke_async`](crate::core::invoker::Invoker::invoke_async).
    pub fn is_async(&self) -> bool {
        self.stages()
            .iter()
            .any(|stage| stage.unit().is_some_and(FunctionUnit::is_async))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("stages", &self.stages().len())
            .finish()
    }
}
