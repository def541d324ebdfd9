//! Content negotiation and payload conversion.
//!
//! Raw payloads are decoded with a [`MediaType`] picked from the declared
//! content type or, failing that, by sniffing the bytes. Typed values move
//! between shapes with [`coerce`].

use crate::core::descriptor::Shape;
use crate::core::error::{CatalogError, Result};
use crate::core::value::Value;
use std::fmt;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// The content types the catalog knows how to read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Json,
    Text,
    OctetStream,
}

impl MediaType {
    /// Parses a content type, ignoring parameters such as `charset`.
    /// Structured suffixes (`application/vnd.x+json`) count as JSON and any
    /// `text/*` as text.
    pub fn parse(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            APPLICATION_JSON => Some(MediaType::Json),
            APPLICATION_OCTET_STREAM => Some(MediaType::OctetStream),
            other if other.ends_with("+json") => Some(MediaType::Json),
            other if other.starts_with("text/") => Some(MediaType::Text),
            _ => None,
        }
    }

    /// Best-effort inference from the bytes themselves.
    pub fn sniff(raw: &[u8]) -> Self {
        match std::str::from_utf8(raw) {
            Ok(text) if serde_json::from_str::<serde_json::Value>(text).is_ok() => MediaType::Json,
            Ok(_) => MediaType::Text,
            Err(_) => MediaType::OctetStream,
        }
    }

    /// The natural media type to report for a typed value.
    pub fn for_value(value: &Value) -> Self {
        match value {
            Value::Structured(_) => MediaType::Json,
            Value::Bytes(_) => MediaType::OctetStream,
            _ => MediaType::Text,
        }
    }

    /// Whether payloads of this media type can be decoded into `shape`.
    pub fn supports(&self, shape: Shape) -> bool {
        match self {
            MediaType::Json => true,
            MediaType::Text => shape != Shape::Structured,
            MediaType::OctetStream => matches!(shape, Shape::Bytes | Shape::String | Shape::Unknown),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Json => APPLICATION_JSON,
            MediaType::Text => TEXT_PLAIN,
            MediaType::OctetStream => APPLICATION_OCTET_STREAM,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a caller's payload into the shape a unit declared.
pub fn negotiate(payload: Value, declared: Option<&str>, target: Shape) -> Result<Value> {
    if target == Shape::Unknown {
        return Ok(payload);
    }
    if payload.is_empty() {
        return Err(CatalogError::conversion(target, "zero-length payload"));
    }

    let raw = match payload {
        Value::Bytes(bytes) => bytes,
        Value::Text(text) if declared.is_some() => text.into_bytes(),
        typed => return coerce(typed, target),
    };
    let media = select(declared, &raw, target)?;
    decode(&raw, media, target)
}

fn select(declared: Option<&str>, raw: &[u8], target: Shape) -> Result<MediaType> {
    if let Some(content_type) = declared {
        match MediaType::parse(content_type) {
            Some(media) if media.supports(target) => return Ok(media),
            _ => log::warn!(
                "Content type '{}' cannot produce '{}', sniffing the payload instead",
                content_type,
                target
            ),
        }
    }

    let sniffed = MediaType::sniff(raw);
    if sniffed.supports(target) {
        Ok(sniffed)
    } else {
        Err(CatalogError::UnsupportedMediaType {
            content_type: declared.map(str::to_string),
            shape: target,
        })
    }
}

/// Decodes raw bytes of a known media type into `target`.
pub fn decode(raw: &[u8], media: MediaType, target: Shape) -> Result<Value> {
    if target == Shape::Bytes {
        return Ok(Value::Bytes(raw.to_vec()));
    }
    match media {
        MediaType::Json => {
            let json: serde_json::Value =
                serde_json::from_slice(raw).map_err(|e| CatalogError::conversion(target, e))?;
            coerce(Value::Structured(json), target)
        }
        MediaType::Text | MediaType::OctetStream => {
            let text = std::str::from_utf8(raw).map_err(|e| CatalogError::conversion(target, e))?;
            coerce(Value::Text(text.to_string()), target)
        }
    }
}

/// Moves a typed value to another shape. Same-shape and unknown targets are
/// returned untouched.
pub fn coerce(value: Value, target: Shape) -> Result<Value> {
    if target == Shape::Unknown || value.shape() == target {
        return Ok(value);
    }
    if matches!(value, Value::Bytes(_))
        && matches!(target, Shape::Integer | Shape::Number | Shape::Boolean)
    {
        return coerce(coerce(value, Shape::String)?, target);
    }
    let from = value.shape();
    let fail = |detail: String| CatalogError::conversion(target, format!("cannot convert {} {}", from, detail));

    match target {
        Shape::String => match value {
            Value::Bytes(bytes) => String::from_utf8(bytes)
                .map(Value::Text)
                .map_err(|e| CatalogError::conversion(target, e)),
            Value::Structured(serde_json::Value::String(text)) => Ok(Value::Text(text)),
            other => Ok(Value::Text(other.to_string())),
        },
        Shape::Integer => match &value {
            Value::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| CatalogError::conversion(target, e)),
            // 2^63 is exact in f64, so both bounds compare without rounding.
            Value::Number(n) if n.fract() == 0.0 && *n >= -I64_BOUND && *n < I64_BOUND => {
                Ok(Value::Integer(*n as i64))
            }
            Value::Structured(json) => json
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| fail(format!("'{}'", json))),
            other => Err(fail(format!("'{}'", other))),
        },
        Shape::Number => match &value {
            Value::Integer(n) => {
                let number = *n as f64;
                if number < I64_BOUND && number as i64 == *n {
                    Ok(Value::Number(number))
                } else {
                    Err(fail(format!("{} without losing precision", n)))
                }
            }
            Value::Text(text) => text
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|e| CatalogError::conversion(target, e)),
            Value::Structured(json) => json
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| fail(format!("'{}'", json))),
            other => Err(fail(format!("'{}'", other))),
        },
        Shape::Boolean => match &value {
            Value::Text(text) => text
                .trim()
                .parse::<bool>()
                .map(Value::Boolean)
                .map_err(|e| CatalogError::conversion(target, e)),
            Value::Structured(json) => json
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| fail(format!("'{}'", json))),
            other => Err(fail(format!("'{}'", other))),
        },
        Shape::Bytes => match value {
            Value::Text(text) => Ok(Value::Bytes(text.into_bytes())),
            Value::Structured(json) => serde_json::to_vec(&json)
                .map(Value::Bytes)
                .map_err(|e| CatalogError::conversion(target, e)),
            other => Ok(Value::Bytes(other.to_string().into_bytes())),
        },
        Shape::Structured => match value {
            Value::Text(text) => serde_json::from_str(&text)
                .map(Value::Structured)
                .map_err(|e| CatalogError::conversion(target, e)),
            Value::Bytes(bytes) => serde_json::from_slice(&bytes)
                .map(Value::Structured)
                .map_err(|e| CatalogError::conversion(target, e)),
            other => Ok(Value::Structured(other.to_json())),
        },
        Shape::Unknown => Ok(value),
    }
}

/// Serializes a unit's result for the media type the caller asked for.
pub fn encode(value: Value, media: MediaType) -> Result<Value> {
    let shape = value.shape();
    let bytes = match (media, value) {
        (MediaType::Json, Value::Bytes(bytes)) => {
            let text = String::from_utf8(bytes).map_err(|e| CatalogError::conversion(shape, e))?;
            serde_json::to_vec(&text).map_err(|e| CatalogError::conversion(shape, e))?
        }
        (MediaType::Json, other) => {
            serde_json::to_vec(&other.to_json()).map_err(|e| CatalogError::conversion(shape, e))?
        }
        (MediaType::Text, Value::Bytes(bytes)) => {
            std::str::from_utf8(&bytes).map_err(|e| CatalogError::conversion(shape, e))?;
            bytes
        }
        (MediaType::OctetStream, Value::Bytes(bytes)) => bytes,
        (_, other) => other.to_string().into_bytes(),
    };
    Ok(Value::Bytes(bytes))
}
