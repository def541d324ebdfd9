use crate::core::sync_impl::UnitResult;
use crate::core::value::Value;

use async_trait::async_trait;
use std::future::Future;

/// An asynchronous unit with one input and one output.
#[async_trait]
pub trait AsyncTransformLogic: Send + Sync + 'static {
    async fn apply(&self, input: Value) -> UnitResult<Value>;
}

/// An asynchronous unit with one input and no output.
#[async_trait]
pub trait AsyncSinkLogic: Send + Sync + 'static {
    async fn accept(&self, input: Value) -> UnitResult<()>;
}

/// An asynchronous unit with no input and one output.
#[async_trait]
pub trait AsyncSourceLogic: Send + Sync + 'static {
    async fn supply(&self) -> UnitResult<Value>;
}

/// Wraps a closure returning a future so it can serve as an async unit.
///
/// The closure's signature picks the kind: `Fn(Value) -> Future<Output = UnitResult<Value>>`
/// is a transform, `Fn(Value) -> Future<Output = UnitResult<()>>` a sink and
/// `Fn() -> Future<Output = UnitResult<Value>>` a source.
pub struct AsyncFn<F>(pub F);

#[async_trait]
impl<F, Fut> AsyncTransformLogic for AsyncFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = UnitResult<Value>> + Send + 'static,
{
    async fn apply(&self, input: Value) -> UnitResult<Value> {
        (self.0)(input).await
    }
}

#[async_trait]
impl<F, Fut> AsyncSinkLogic for AsyncFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = UnitResult<()>> + Send + 'static,
{
    async fn accept(&self, input: Value) -> UnitResult<()> {
        (self.0)(input).await
    }
}

#[async_trait]
impl<F, Fut> AsyncSourceLogic for AsyncFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = UnitResult<Value>> + Send + 'static,
{
    async fn supply(&self) -> UnitResult<Value> {
        (self.0)().await
    }
}
