//! Error types for the seeker crate.
//!
//! Evaluating a view never fails. Errors only arise when user-supplied
//! vocabulary (field names, operator names, buckets, expressions) or a lead
//! patch has to be parsed.

use thiserror::Error;

/// Errors that can occur when parsing view vocabulary or applying patches.
#[derive(Debug, Error)]
pub enum SeekerError {
    /// Field name is not part of the lead schema.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Operator name is not part of the operator vocabulary.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Date bucket is not one of `today`, `7d`, `30d`, `90d`.
    #[error("unknown date bucket '{0}' (expected today, 7d, 30d or 90d)")]
    UnknownBucket(String),

    /// Milestone name is not part of the pipeline.
    #[error("unknown pipeline stage '{0}'")]
    UnknownMilestone(String),

    /// Sort direction is neither `asc` nor `desc`.
    #[error("unknown sort direction '{0}' (expected asc or desc)")]
    UnknownDirection(String),

    /// Filter or sort expression could not be split into its parts.
    #[error("invalid expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: &'static str },

    /// Derived fields are computed and cannot be written.
    #[error("field '{0}' is derived and cannot be assigned")]
    DerivedField(&'static str),

    /// Raw value could not be converted to the field's type.
    #[error("invalid value '{value}' for {field_type} field '{field}'")]
    InvalidValue {
        field: &'static str,
        field_type: &'static str,
        value: String,
    },

    /// Patch produced a record that does not match the lead schema.
    #[error("patch does not fit the lead schema: {0}")]
    Patch(#[from] serde_json::Error),
}

/// Result type for seeker operations.
pub type Result<T> = std::result::Result<T, SeekerError>;
