//! Async units registered alongside blocking ones.

use fncatalog::async_prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone)]
struct SlowDoubler;

#[async_trait::async_trait]
impl AsyncTransformLogic for SlowDoubler {
    async fn apply(&self, input: Value) -> UnitResult<Value> {
        tokio::time::sleep(tokio::time::Duration::from_millis(2)).await;
        let n = input.as_i64().ok_or("expected an integer")?;
        Ok(Value::Integer(n * 2))
    }
}

fn catalog() -> FunctionCatalog {
    let catalog = FunctionCatalog::new();
    catalog
        .register(
            "double",
            Registration::new(
                FunctionUnit::async_transform(SlowDoubler),
                TypeDescriptor::transform(Shape::Integer, Shape::Integer),
            )
            .unwrap(),
        )
        .unwrap();
    catalog
        .register(
            "describe",
            Registration::transform(Shape::Integer, Shape::String, |v: Value| {
                Ok(format!("value={v}").into())
            }),
        )
        .unwrap();
    catalog
}

#[tokio::test]
async fn test_async_transform_then_blocking_transform() {
    let catalog = catalog();
    let pipeline = catalog.lookup("double|describe").unwrap();
    assert!(pipeline.is_async());

    let reply = catalog
        .invoker()
        .invoke_async(&pipeline, Message::new("21").with_content_type("text/plain"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.payload(), &Value::from("value=42"));
}

#[tokio::test]
async fn test_blocking_registration_through_async_path() {
    let catalog = catalog();
    let describe = catalog.lookup("describe").unwrap();
    let reply = catalog
        .invoker()
        .invoke_async(&describe, Message::new(Value::Integer(5)).with_accept("application/json"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.payload(), &Value::Bytes(br#""value=5""#.to_vec()));
}

#[test]
fn test_blocking_invoke_refuses_async_pipeline() {
    let catalog = catalog();
    let err = catalog.invoke("double|describe", "1", None).unwrap_err();
    match err {
        CatalogError::Invocation { name, .. } => assert_eq!(name, "double|describe"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_blocking_invoke_runs_nothing_when_a_later_stage_is_async() {
    let catalog = catalog();
    let parsed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&parsed);
    catalog
        .register(
            "parse",
            Registration::transform(Shape::String, Shape::Integer, move |v: Value| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Integer(v.as_str().unwrap_or_default().trim().parse::<i64>()?))
            }),
        )
        .unwrap();

    let err = catalog.invoke("parse|double", "4", None).unwrap_err();
    assert!(matches!(err, CatalogError::Invocation { .. }));
    assert_eq!(parsed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_async_path_runs_each_mixed_stage_once() {
    let catalog = catalog();
    let parsed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&parsed);
    catalog
        .register(
            "parse",
            Registration::transform(Shape::String, Shape::Integer, move |v: Value| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Integer(v.as_str().unwrap_or_default().trim().parse::<i64>()?))
            }),
        )
        .unwrap();

    let pipeline = catalog.lookup("parse|double|describe").unwrap();
    let reply = catalog
        .invoker()
        .invoke_async(&pipeline, Message::new("4"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.payload(), &Value::from("value=8"));
    assert_eq!(parsed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_async_source_into_async_sink() {
    let catalog = FunctionCatalog::new();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);

    catalog
        .register(
            "ticks",
            Registration::async_source(Shape::Integer, || async { Ok::<_, BoxError>(Value::Integer(3)) }),
        )
        .unwrap();
    catalog
        .register(
            "deliver",
            Registration::async_sink(Shape::Integer, move |v: Value| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(v.as_i64().unwrap_or_default() as usize, Ordering::SeqCst);
                    Ok::<_, BoxError>(())
                }
            }),
        )
        .unwrap();

    let pipeline = catalog.lookup("ticks|deliver").unwrap();
    assert_eq!(pipeline.kind(), Kind::Source);
    let reply = catalog
        .invoker()
        .invoke_async(&pipeline, Message::new(Vec::<u8>::new()))
        .await
        .unwrap();

    assert!(reply.is_none());
    assert_eq!(delivered.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_async_path_reports_conversion_failure() {
    let catalog = catalog();
    let double = catalog.lookup("double").unwrap();
    let err = catalog
        .invoker()
        .invoke_async(&double, Message::new(Value::from(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conversion { shape: Shape::Integer, .. }));
}
