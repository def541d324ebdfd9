use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role a unit of logic plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// One input, one output.
    #[serde(rename = "FUNCTION")]
    Transform,
    /// One input, no output.
    #[serde(rename = "CONSUMER")]
    Sink,
    /// No input, one output.
    #[serde(rename = "SUPPLIER")]
    Source,
}

impl Kind {
    /// The label reported by introspection.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Transform => "FUNCTION",
            Kind::Sink => "CONSUMER",
            Kind::Source => "SUPPLIER",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Transform => "transform",
            Kind::Sink => "sink",
            Kind::Source => "source",
        })
    }
}

/// A semantic type tag for one side of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    String,
    Integer,
    Number,
    Boolean,
    Bytes,
    Structured,
    /// Undeclared. Payloads pass through untouched.
    Unknown,
}

impl Shape {
    pub fn tag(&self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Integer => "integer",
            Shape::Number => "number",
            Shape::Boolean => "boolean",
            Shape::Bytes => "bytes",
            Shape::Structured => "structured",
            Shape::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Ok(Shape::String),
            "integer" | "int" => Ok(Shape::Integer),
            "number" | "float" => Ok(Shape::Number),
            "boolean" | "bool" => Ok(Shape::Boolean),
            "bytes" => Ok(Shape::Bytes),
            "structured" | "object" | "json" => Ok(Shape::Structured),
            "unknown" | "?" => Ok(Shape::Unknown),
            other => Err(format!("unknown shape '{}'", other)),
        }
    }
}

/// Declared kind and input/output shapes of a unit.
///
/// Sinks carry no output shape and sources carry no input shape; the
/// constructors make any other combination unrepresentable for plain units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct TypeDescriptor {
    kind: Kind,
    input: Option<Shape>,
    output: Option<Shape>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    kind: Kind,
    input: Option<Shape>,
    output: Option<Shape>,
}

impl TryFrom<RawDescriptor> for TypeDescriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match (raw.kind, raw.input, raw.output) {
            (Kind::Transform, Some(input), Some(output)) => Ok(Self::transform(input, output)),
            (Kind::Sink, Some(input), None) => Ok(Self::sink(input)),
            (Kind::Source, None, output) => Ok(Self::derived(Kind::Source, None, output)),
            (kind, input, output) => Err(format!(
                "a {} cannot declare input {} and output {}",
                kind,
                input.map_or("none", |shape| shape.tag()),
                output.map_or("none", |shape| shape.tag())
            )),
        }
    }
}

impl TypeDescriptor {
    pub fn transform(input: Shape, output: Shape) -> Self {
        Self {
            kind: Kind::Transform,
            input: Some(input),
            output: Some(output),
        }
    }

    pub fn sink(input: Shape) -> Self {
        Self {
            kind: Kind::Sink,
            input: Some(input),
            output: None,
        }
    }

    pub fn source(output: Shape) -> Self {
        Self {
            kind: Kind::Source,
            input: None,
            output: Some(output),
        }
    }

    /// A descriptor whose shapes are all unknown.
    pub fn untyped(kind: Kind) -> Self {
        match kind {
            Kind::Transform => Self::transform(Shape::Unknown, Shape::Unknown),
            Kind::Sink => Self::sink(Shape::Unknown),
            Kind::Source => Self::source(Shape::Unknown),
        }
    }

    /// Descriptor of a derived pipeline. A pipeline running from a source into
    /// a sink has neither side.
    pub(crate) fn derived(kind: Kind, input: Option<Shape>, output: Option<Shape>) -> Self {
        Self {
            kind,
            input,
            output,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn input_shape(&self) -> Option<Shape> {
        self.input
    }

    pub fn output_shape(&self) -> Option<Shape> {
        self.output
    }

    /// The input tag, or `none` when the unit takes no input.
    pub fn input_tag(&self) -> &'static str {
        self.input.map_or("none", |shape| shape.tag())
    }

    /// The output tag, or `none` when the unit produces nothing.
    pub fn output_tag(&self) -> &'static str {
        self.output.map_or("none", |shape| shape.tag())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.kind,
            self.input_tag(),
            self.output_tag()
        )
    }
}

impl FromStr for TypeDescriptor {
    type Err = String;

    /// Parses shorthand syntax: `"string -> integer"` for a transform,
    /// `"-> string"` for a source and `"string ->"` for a sink.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("->").collect();
        if parts.len() != 2 {
            return Err("Descriptor must contain exactly one '->'".to_string());
        }
        let (input, output) = (parts[0].trim(), parts[1].trim());

        match (input.is_empty(), output.is_empty()) {
            (false, false) => Ok(Self::transform(input.parse()?, output.parse()?)),
            (false, true) => Ok(Self::sink(input.parse()?)),
            (true, false) => Ok(Self::source(output.parse()?)),
            (true, true) => Err("Descriptor needs an input, an output, or both".to_string()),
        }
    }
}
