use crate::core::sync_impl::UnitResult;
use crate::core::value::Value;

/// A unit with one input and one output.
pub trait TransformLogic: Send + Sync + 'static {
    fn apply(&self, input: Value) -> UnitResult<Value>;
}

/// A unit with one input and no output.
pub trait SinkLogic: Send + Sync + 'static {
    fn accept(&self, input: Value) -> UnitResult<()>;
}

/// A unit with no input and one output.
pub trait SourceLogic: Send + Sync + 'static {
    fn supply(&self) -> UnitResult<Value>;
}

impl<F> TransformLogic for F
where
    F: Fn(Value) -> UnitResult<Value> + Send + Sync + 'static,
{
    fn apply(&self, input: Value) -> UnitResult<Value> {
        self(input)
    }
}

impl<F> SinkLogic for F
where
    F: Fn(Value) -> UnitResult<()> + Send + Sync + 'static,
{
    fn accept(&self, input: Value) -> UnitResult<()> {
        self(input)
    }
}

impl<F> SourceLogic for F
where
    F: Fn() -> UnitResult<Value> + Send + Sync + 'static,
{
    fn supply(&self) -> UnitResult<Value> {
        self()
    }
}
