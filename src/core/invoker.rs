use crate::core::conversion::{self, MediaType};
use crate::core::error::{CatalogError, Result};
use crate::core::message::Message;
use crate::core::registration::Registration;
use crate::core::sync_impl::UnitResult;
use crate::core::telemetry::{InvocationTrace, Outcome, Telemetry};
use crate::core::value::Value;
use crate::core::{FunctionUnit, Logic};

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Drives a resolved [`Registration`]: negotiates the input, runs every stage
/// in order and shapes the output for the caller.
///
/// The invoker never touches the catalog, so a slow unit cannot hold up
/// registration or lookup. Each stage runs at most once per call; failures
/// are reported, never retried.
#[derive(Clone, Default)]
pub struct Invoker {
    telemetry: Option<Arc<dyn Telemetry>>,
    default_accept: Option<String>,
}

impl Invoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an [`InvocationTrace`] for every call.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Output content type for messages without an `accept` header.
    pub fn with_default_accept(mut self, content_type: impl Into<String>) -> Self {
        self.default_accept = Some(content_type.into());
        self
    }

    /// Invokes a blocking registration with a raw or typed payload.
    ///
    /// Returns the typed output of the last stage, or `None` for sinks.
    /// Registrations with any async stage are refused before a stage runs.
    pub fn invoke(
        &self,
        registration: &Registration,
        payload: impl Into<Value>,
        content_type: Option<&str>,
    ) -> Result<Option<Value>> {
        let started = Instant::now();
        let result = if registration.is_async() {
            Err(CatalogError::invocation(
                registration.name(),
                "contains async stages, use invoke_async",
            ))
        } else {
            self.drive(registration, payload.into(), content_type)
        };
        self.record(registration, started, &result);
        result
    }

    /// Like [`invoke`](Self::invoke), reading `content-type` and `accept` from
    /// the message and encoding the output accordingly.
    pub fn invoke_message(
        &self,
        registration: &Registration,
        message: Message,
    ) -> Result<Option<Message>> {
        let accept = message.accept().map(str::to_string);
        let content_type = message.content_type().map(str::to_string);
        let output = self.invoke(registration, message.into_payload(), content_type.as_deref())?;
        self.respond(output, accept.as_deref())
    }

    /// Invokes any registration, awaiting async stages and running blocking
    /// ones inline on the calling task.
    pub async fn invoke_async(
        &self,
        registration: &Registration,
        message: Message,
    ) -> Result<Option<Message>> {
        let accept = message.accept().map(str::to_string);
        let content_type = message.content_type().map(str::to_string);

        let started = Instant::now();
        let result = self
            .drive_async(registration, message.into_payload(), content_type.as_deref())
            .await;
        self.record(registration, started, &result);

        self.respond(result?, accept.as_deref())
    }

    fn drive(
        &self,
        registration: &Registration,
        payload: Value,
        content_type: Option<&str>,
    ) -> Result<Option<Value>> {
        let stages = registration.stages();
        let mut payload = Some(payload);
        let mut carried = None;

        for (position, stage) in stages.iter().enumerate() {
            let input = match payload.take() {
                Some(payload) => admit(stage, payload, content_type)?,
                None => hand_off(stages[position - 1], stage, carried.take())?,
            };
            carried = call(stage, input)?;
        }
        Ok(carried)
    }

    async fn drive_async(
        &self,
        registration: &Registration,
        payload: Value,
        content_type: Option<&str>,
    ) -> Result<Option<Value>> {
        let stages = registration.stages();
        let mut payload = Some(payload);
        let mut carried = None;

        for (position, stage) in stages.iter().enumerate() {
            let input = match payload.take() {
                Some(payload) => admit(stage, payload, content_type)?,
                None => hand_off(stages[position - 1], stage, carried.take())?,
            };
            carried = call_async(stage, input).await?;
        }
        Ok(carried)
    }

    fn respond(&self, output: Option<Value>, accept: Option<&str>) -> Result<Option<Message>> {
        let Some(value) = output else {
            return Ok(None);
        };
        let accept = accept
            .or(self.default_accept.as_deref())
            .filter(|accept| accept.trim() != "*/*");

        let Some(content_type) = accept else {
            let media = MediaType::for_value(&value);
            return Ok(Some(Message::new(value).with_content_type(media.as_str())));
        };
        let media = MediaType::parse(content_type).ok_or_else(|| CatalogError::UnsupportedMediaType {
            content_type: Some(content_type.to_string()),
            shape: value.shape(),
        })?;
        let encoded = conversion::encode(value, media)?;
        Ok(Some(Message::new(encoded).with_content_type(media.as_str())))
    }

    fn record<T>(&self, registration: &Registration, started: Instant, result: &Result<T>) {
        let elapsed = started.elapsed();
        log::debug!(
            "Invoked '{}' ({} stage(s)) in {:?}",
            registration.name(),
            registration.stages().len(),
            elapsed
        );

        let Some(telemetry) = &self.telemetry else {
            return;
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        telemetry.record(InvocationTrace {
            id: Uuid::new_v4(),
            timestamp,
            name: registration.name().to_string(),
            kind: registration.kind(),
            stages: registration.stages().len(),
            duration_micros: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            outcome: match result {
                Ok(_) => Outcome::Success,
                Err(e) => Outcome::Failure(e.to_string()),
            },
        });
    }
}

/// Converts the caller's payload for the first stage. Sources take no input
/// and drop whatever they were handed.
fn admit(stage: &Registration, payload: Value, content_type: Option<&str>) -> Result<Option<Value>> {
    match stage.descriptor().input_shape() {
        Some(shape) => conversion::negotiate(payload, content_type, shape).map(Some),
        None => {
            if !payload.is_empty() {
                log::debug!("Source '{}' ignores the supplied payload", stage.name());
            }
            Ok(None)
        }
    }
}

/// Passes one stage's output to the next, converting only when the declared
/// shapes differ.
fn hand_off(
    previous: &Registration,
    next: &Registration,
    value: Option<Value>,
) -> Result<Option<Value>> {
    let Some(target) = next.descriptor().input_shape() else {
        return Ok(None);
    };
    let Some(value) = value else {
        return Err(CatalogError::invocation(
            next.name(),
            format!("'{}' produced no value to pass on", previous.name()),
        ));
    };
    if previous.descriptor().output_shape() == Some(target) {
        return Ok(Some(value));
    }
    conversion::coerce(value, target).map(Some)
}

fn call(stage: &Registration, input: Option<Value>) -> Result<Option<Value>> {
    let name = stage.name();
    let Some(unit) = stage.unit() else {
        return Err(CatalogError::invocation(name, "not a plain unit"));
    };

    match (unit, input) {
        (FunctionUnit::Transform(Logic::Sync(logic)), Some(input)) => {
            guard(name, || logic.apply(input)).map(Some)
        }
        (FunctionUnit::Sink(Logic::Sync(logic)), Some(input)) => {
            guard(name, || logic.accept(input)).map(|()| None)
        }
        (FunctionUnit::Source(Logic::Sync(logic)), _) => guard(name, || logic.supply()).map(Some),
        (FunctionUnit::Transform(_) | FunctionUnit::Sink(_), None) => {
            Err(CatalogError::invocation(name, "no input to consume"))
        }
        _ => Err(CatalogError::invocation(
            name,
            "async unit must be driven with invoke_async",
        )),
    }
}

async fn call_async(stage: &Registration, input: Option<Value>) -> Result<Option<Value>> {
    let name = stage.name();
    let Some(unit) = stage.unit() else {
        return Err(CatalogError::invocation(name, "not a plain unit"));
    };

    match (unit, input) {
        (FunctionUnit::Transform(Logic::Async(logic)), Some(input)) => {
            settle(name, logic.apply(input)).await.map(Some)
        }
        (FunctionUnit::Sink(Logic::Async(logic)), Some(input)) => {
            settle(name, logic.accept(input)).await.map(|()| None)
        }
        (FunctionUnit::Source(Logic::Async(logic)), _) => {
            settle(name, logic.supply()).await.map(Some)
        }
        (_, input) => call(stage, input),
    }
}

/// Runs a blocking unit, turning its error or panic into an invocation error.
fn guard<T>(name: &str, unit: impl FnOnce() -> UnitResult<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(unit)) {
        Ok(result) => result.map_err(|cause| failed(name, cause.to_string(), cause)),
        Err(payload) => {
            let message = format!("panicked: {}", panic_message(payload.as_ref()));
            Err(failed(name, message.clone(), message.into()))
        }
    }
}

async fn settle<T>(name: &str, unit: impl Future<Output = UnitResult<T>>) -> Result<T> {
    match AssertUnwindSafe(unit).catch_unwind().await {
        Ok(result) => result.map_err(|cause| failed(name, cause.to_string(), cause)),
        Err(payload) => {
            let message = format!("panicked: {}", panic_message(payload.as_ref()));
            Err(failed(name, message.clone(), message.into()))
        }
    }
}

fn failed(name: &str, message: String, cause: crate::core::sync_impl::BoxError) -> CatalogError {
    log::error!("Function '{}' failed: {}", name, message);
    CatalogError::invocation(name, cause)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::composition;
    use crate::core::descriptor::Shape;
    use crate::core::sync_impl::BoxError;
    use crate::core::telemetry::MemoryTelemetry;
    use serde_json::json;
    use std::sync::Mutex;

    fn named(reg: Registration, name: &str) -> Arc<Registration> {
        Arc::new(reg.named(name.to_string()))
    }

    fn char_counter() -> Arc<Registration> {
        named(
            Registration::transform(Shape::String, Shape::Integer, |v: Value| {
                Ok(Value::Integer(v.as_str().unwrap_or_default().chars().count() as i64))
            }),
            "charCounter",
        )
    }

    #[test]
    fn test_raw_bytes_are_negotiated() {
        let out = Invoker::new()
            .invoke(&char_counter(), b"hello".to_vec(), Some("text/plain"))
            .unwrap();
        assert_eq!(out, Some(Value::Integer(5)));
    }

    #[test]
    fn test_stage_outputs_are_converted_when_shapes_differ() {
        let doubler = named(
            Registration::transform(Shape::String, Shape::String, |v: Value| {
                Ok(Value::from(v.to_string().repeat(2)))
            }),
            "doubler",
        );
        let pipeline = composition::compose("charCounter|doubler", vec![char_counter(), doubler]).unwrap();

        let out = Invoker::new().invoke(&pipeline, "abc", None).unwrap();
        assert_eq!(out, Some(Value::from("33")));
    }

    #[test]
    fn test_source_ignores_payload() {
        let source = named(Registration::source(Shape::String, || Ok("fresh".into())), "words");
        let out = Invoker::new().invoke(&source, "ignored", None).unwrap();
        assert_eq!(out, Some(Value::from("fresh")));
    }

    #[test]
    fn test_unit_error_becomes_invocation_error() {
        let failing = named(
            Registration::transform(Shape::Unknown, Shape::Unknown, |_: Value| {
                Err::<Value, BoxError>("boom".into())
            }),
            "failing",
        );
        match Invoker::new().invoke(&failing, "x", None).unwrap_err() {
            CatalogError::Invocation { name, cause } => {
                assert_eq!(name, "failing");
                assert_eq!(cause.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panic_becomes_invocation_error() {
        let panicking = named(
            Registration::transform(Shape::Unknown, Shape::Unknown, |_: Value| -> UnitResult<Value> {
                panic!("kaboom")
            }),
            "panicking",
        );
        let err = Invoker::new().invoke(&panicking, "x", None).unwrap_err();
        assert!(err.to_string().contains("kaboom"));
    }

    #[test]
    fn test_sync_invoke_rejects_async_units() {
        let reg = named(
            Registration::async_transform(Shape::Unknown, Shape::Unknown, |v: Value| async move {
                Ok::<_, BoxError>(v)
            }),
            "later",
        );
        let err = Invoker::new().invoke(&reg, "x", None).unwrap_err();
        assert!(matches!(err, CatalogError::Invocation { .. }));
    }

    #[test]
    fn test_sync_invoke_refuses_before_running_earlier_stages() {
        let calls = Arc::new(Mutex::new(0));
        let counted = Arc::clone(&calls);
        let audit = named(
            Registration::transform(Shape::String, Shape::String, move |v: Value| {
                *counted.lock().unwrap() += 1;
                Ok(v)
            }),
            "audit",
        );
        let store = named(
            Registration::async_sink(Shape::String, |_: Value| async { Ok::<(), BoxError>(()) }),
            "store",
        );
        let pipeline = composition::compose("audit|store", vec![audit, store]).unwrap();

        let err = Invoker::new().invoke(&pipeline, "x", None).unwrap_err();
        assert!(matches!(err, CatalogError::Invocation { ref name, .. } if name == "audit|store"));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_accept_header_encodes_output() {
        let echo = named(
            Registration::transform(Shape::Structured, Shape::Structured, |v: Value| Ok(v)),
            "echo",
        );
        let reply = Invoker::new()
            .invoke_message(
                &echo,
                Message::new(br#"{"id":7}"#.to_vec())
                    .with_content_type("application/json")
                    .with_accept("application/json"),
            )
            .unwrap()
            .unwrap();
        assert_eq!(reply.content_type(), Some("application/json"));
        assert_eq!(reply.payload(), &Value::Bytes(br#"{"id":7}"#.to_vec()));

        let reply = Invoker::new()
            .invoke_message(&echo, Message::new(json!({"id": 7})))
            .unwrap()
            .unwrap();
        assert_eq!(reply.payload(), &Value::Structured(json!({"id": 7})));
    }

    #[test]
    fn test_unknown_accept_is_unsupported() {
        let reply = Invoker::new().invoke_message(
            &char_counter(),
            Message::new("abc").with_accept("application/xml"),
        );
        assert!(matches!(reply, Err(CatalogError::UnsupportedMediaType { .. })));
    }

    #[test]
    fn test_sink_runs_once_and_returns_nothing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let sink = named(
            Registration::sink(Shape::String, move |v: Value| {
                log.lock().unwrap().push(v);
                Ok(())
            }),
            "logger",
        );
        let reply = Invoker::new()
            .invoke_message(&sink, Message::new("hi").with_accept("text/plain"))
            .unwrap();
        assert!(reply.is_none());
        assert_eq!(seen.lock().unwrap().as_slice(), &[Value::from("hi")]);
    }

    #[test]
    fn test_telemetry_records_outcomes() {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let invoker = Invoker::new().with_telemetry(telemetry.clone());

        invoker.invoke(&char_counter(), "abc", None).unwrap();
        invoker.invoke(&char_counter(), "", None).unwrap_err();

        let traces = telemetry.get_traces();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].name, "charCounter");
        assert_eq!(traces[0].outcome, Outcome::Success);
        assert!(matches!(traces[1].outcome, Outcome::Failure(_)));
        assert_ne!(traces[0].id, traces[1].id);
    }

    #[tokio::test]
    async fn test_async_pipeline_mixes_sync_and_async_stages() {
        let fetch = named(
            Registration::async_source(Shape::String, || async {
                tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
                Ok::<_, BoxError>(Value::from("async words"))
            }),
            "fetch",
        );
        let pipeline = composition::compose("fetch|charCounter", vec![fetch, char_counter()]).unwrap();

        let reply = Invoker::new()
            .invoke_async(&pipeline, Message::new(Vec::<u8>::new()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.payload(), &Value::Integer(11));
        assert_eq!(reply.content_type(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_async_failure_is_wrapped() {
        let reg = named(
            Registration::async_sink(Shape::Unknown, |_: Value| async {
                Err::<(), BoxError>("disk full".into())
            }),
            "store",
        );
        let err = Invoker::new().invoke_async(&reg, Message::new("x")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Invocation { ref name, .. } if name == "store"));
    }
}
