//! Validation error types.
//!
//! Errors are collected rather than raised: block validation returns every
//! problem it finds, and stream validation groups them per entry so the
//! editor can point the author at each failing block.

use serde::Serialize;
use thiserror::Error;

use crate::content::reference::ReferenceKind;

/// A single problem found while validating a block instance.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    /// A required sub-field is absent, null, or blank.
    #[error("missing required field '{field}'")]
    MissingRequiredField { field: String },

    /// A sub-field is present but has the wrong shape.
    #[error("invalid value for '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    /// An asset, page, or embed reference was rejected by the resolver.
    #[error("{kind} reference '{reference}' in '{field}' does not resolve")]
    UnresolvableReference {
        field: String,
        kind: ReferenceKind,
        reference: String,
    },

    /// Rich text contains a tag outside the enabled feature set.
    #[error("rich text markup <{tag}> is not allowed")]
    DisallowedMarkup { tag: String },

    /// A stream entry's tag is not one of the declared block types.
    #[error("unknown block type '{tag}'")]
    UnknownBlockType { tag: String },
}

impl ValidationError {
    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// The sub-field this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field }
            | Self::InvalidFieldValue { field, .. }
            | Self::UnresolvableReference { field, .. } => Some(field),
            Self::DisallowedMarkup { .. } | Self::UnknownBlockType { .. } => None,
        }
    }
}

/// Errors for one entry of a content stream.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("entry {index} ({block_type}): {}", summarize(.errors))]
pub struct StreamValidationError {
    /// Zero-based position of the entry in the stream.
    pub index: usize,
    /// The entry's tag as supplied, recognised or not.
    pub block_type: String,
    pub errors: Vec<ValidationError>,
}

/// Every failing entry of a content stream.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(transparent)]
#[error("{} stream entries failed validation", .0.len())]
pub struct StreamErrors(pub Vec<StreamValidationError>);

impl StreamErrors {
    /// Return the number of failing entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no entry failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Failing entries in stream order.
    pub fn iter(&self) -> impl Iterator<Item = &StreamValidationError> {
        self.0.iter()
    }

    /// Errors reported for the entry at `index`, if it failed.
    pub fn for_entry(&self, index: usize) -> Option<&[ValidationError]> {
        self.0
            .iter()
            .find(|e| e.index == index)
            .map(|e| e.errors.as_slice())
    }
}

/// A feature name that is not part of the rich text allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rich text feature '{0}'")]
pub struct UnknownFeature(pub String);

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
