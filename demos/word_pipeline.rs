//! A complete example showing how to compose named functions with fncatalog.
//!
//! This example demonstrates:
//! - Registering transforms, a source and a sink under names
//! - Adding an alias for an existing function
//! - Composing them with `|` keys and invoking the resulting pipeline
//! - Content negotiation for raw bytes and `accept` headers
//! - Listing the catalog through `snapshot()`

use fncatalog::prelude::*;

// ============================================================================
// Step 1: Units of logic
// ============================================================================

/// Splits a sentence into a JSON array of words.
struct SplitWords;

impl TransformLogic for SplitWords {
    fn apply(&self, input: Value) -> UnitResult<Value> {
        let words: Vec<serde_json::Value> = input
            .to_string()
            .split_whitespace()
            .map(|word| word.into())
            .collect();
        Ok(Value::Structured(words.into()))
    }
}

/// Counts the entries of a JSON array.
struct CountItems;

impl TransformLogic for CountItems {
    fn apply(&self, input: Value) -> UnitResult<Value> {
        let items = input
            .as_json()
            .and_then(|json| json.as_array())
            .ok_or("expected a JSON array")?;
        Ok(Value::Integer(items.len() as i64))
    }
}

// ============================================================================
// Step 2: Registration
// ============================================================================

fn build_catalog() -> Result<FunctionCatalog, CatalogError> {
    let catalog = FunctionCatalog::new();

    catalog.register(
        "split",
        Registration::new(
            FunctionUnit::transform(SplitWords),
            TypeDescriptor::transform(Shape::String, Shape::Structured),
        )?,
    )?;
    catalog.register(
        "count",
        Registration::new(
            FunctionUnit::transform(CountItems),
            TypeDescriptor::transform(Shape::Structured, Shape::Integer),
        )?,
    )?;
    catalog.register(
        "uppercase",
        Registration::transform(Shape::String, Shape::String, |v: Value| {
            Ok(v.to_string().to_uppercase().into())
        }),
    )?;
    catalog.register_alias("uppercase", "shout")?;
    catalog.register(
        "motd",
        Registration::source(Shape::String, || Ok("composition keeps things small".into())),
    )?;
    catalog.register(
        "print",
        Registration::sink(Shape::String, |v: Value| {
            println!("  [print] {}", v);
            Ok(())
        }),
    )?;

    Ok(catalog)
}

fn main() -> Result<(), CatalogError> {
    println!("=== fncatalog Word Pipeline Example ===\n");

    let catalog = build_catalog()?;
    let invoker = catalog.invoker();

    // --- Example 1: A plain function ---
    println!("--- Example 1: shout ---");
    let shout = catalog.lookup("shout")?;
    println!("  {:?}", invoker.invoke(&shout, "hello", None)?);

    // --- Example 2: A composed function fed raw bytes ---
    println!("\n--- Example 2: uppercase|split|count ---");
    let counter = catalog.lookup("uppercase|split|count")?;
    let reply = invoker.invoke_message(
        &counter,
        Message::new(b"one two three".to_vec())
            .with_content_type("text/plain")
            .with_accept("application/json"),
    )?;
    if let Some(reply) = reply {
        println!("  {} -> {}", reply.content_type().unwrap_or("?"), reply.payload());
    }

    // --- Example 3: A closed pipeline from a source into a sink ---
    println!("\n--- Example 3: motd|uppercase|print ---");
    let closed = catalog.lookup("motd|uppercase|print")?;
    invoker.invoke(&closed, Vec::<u8>::new(), None)?;

    // --- Example 4: A composition that cannot work ---
    println!("\n--- Example 4: print|uppercase ---");
    match catalog.lookup("print|uppercase") {
        Err(e) => println!("  rejected: {}", e),
        Ok(_) => println!("  unexpectedly accepted"),
    }

    println!("\nCatalog:");
    for info in catalog.snapshot() {
        println!(
            "  {:<10} {:<9} {} -> {}",
            info.name,
            info.kind.label(),
            info.input_shape,
            info.output_shape
        );
    }

    println!("\n=== Pipelines completed successfully! ===");
    Ok(())
}
