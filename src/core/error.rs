use crate::core::descriptor::{Kind, Shape};
use crate::core::sync_impl::BoxError;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("A function named '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("No function named '{name}' is registered")]
    NotFound { name: String },

    #[error("Invalid function name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Descriptor declares a {descriptor} but the unit is a {unit}")]
    InvalidDescriptor { unit: Kind, descriptor: Kind },

    #[error("Invalid composition '{key}' at position {position}: {reason}")]
    InvalidComposition {
        key: String,
        position: usize,
        kind: Option<Kind>,
        reason: String,
    },

    #[error(
        "No conversion from {} to '{shape}'",
        .content_type.as_deref().unwrap_or("an undeclared content type")
    )]
    UnsupportedMediaType {
        content_type: Option<String>,
        shape: Shape,
    },

    #[error("Failed to convert payload to '{shape}': {cause}")]
    Conversion {
        shape: Shape,
        #[source]
        cause: BoxError,
    },

    #[error("Function '{name}' failed: {cause}")]
    Invocation {
        name: String,
        #[source]
        cause: BoxError,
    },

    #[error("Invalid catalog configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl CatalogError {
    pub(crate) fn conversion(shape: Shape, cause: impl Into<BoxError>) -> Self {
        CatalogError::Conversion {
            shape,
            cause: cause.into(),
        }
    }

    pub(crate) fn invocation(name: &str, cause: impl Into<BoxError>) -> Self {
        CatalogError::Invocation {
            name: name.to_string(),
            cause: cause.into(),
        }
    }
}
