//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy used throughout recspec. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Configuration errors are detected at schema-compilation time and are
//!   fatal; they never surface during construction of a well-declared type.
//! - Validation errors carry the originating field's dot path from the
//!   record root (`$.owner.age`), so nested failures are locatable.
//! - Rule violations carry the declared message or a generated message
//!   naming the failing expression.
//! - The pipeline never swallows errors: it only enriches them (prefixes a
//!   path segment, wraps a foreign failure with a rule's message) before
//!   re-raising. The first error stops the whole operation.

use thiserror::Error;

/// Top-level error type for recspec.
#[derive(Error, Debug)]
pub enum RecspecError {
    /// Malformed schema declaration, detected at compile time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A field's raw value failed type or constraint checking.
    #[error("validation error at `{path}`: {message}")]
    Validation {
        /// Dot path from the record root, e.g. `$.owner.age`.
        path: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A cross-field or single-field invariant failed.
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    /// A value of the wrong structural shape was supplied, e.g. a bare map
    /// where a validated record instance is required. Distinct from
    /// [`RecspecError::Validation`]: structural substitution is never
    /// silently accepted.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// The declared type that was expected.
        expected: String,
        /// The kind of value actually supplied.
        got: String,
    },

    /// A value's runtime kind has no registered encoder.
    #[error("no encoder registered for value of kind `{kind}`")]
    Encode {
        /// Kind name of the offending value.
        kind: String,
    },

    /// A wire value could not be decoded into the target type.
    #[error("cannot decode into `{target}`: {reason}")]
    Decode {
        /// Name of the target type.
        target: String,
        /// Reason the decode failed.
        reason: String,
    },

    /// A runtime failure inside expression evaluation: division by zero,
    /// operand type mismatch, numeric overflow. The rule engine re-wraps
    /// these with the rule's message.
    #[error("expression evaluation error: {0}")]
    Eval(String),

    /// An optional format extension was requested without its adapter.
    #[error("format extension `{0}` is not enabled")]
    ExtensionUnavailable(&'static str),
}

impl RecspecError {
    /// Construct a validation error for the given dot path.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Prefix a field segment onto a validation error's dot path.
    ///
    /// Turns `$.age` into `$.owner.age` when the failure surfaced while
    /// validating the nested `owner` field. Non-validation errors pass
    /// through unchanged.
    pub fn prefix_path(self, segment: &str) -> Self {
        match self {
            Self::Validation { path, message } => {
                let rest = path.strip_prefix('$').unwrap_or(&path);
                Self::Validation {
                    path: format!("$.{segment}{rest}"),
                    message,
                }
            }
            other => other,
        }
    }

    /// Returns true if this is a validation failure (used by the rule
    /// engine to preserve validation errors instead of re-wrapping them).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// A failed invariant: the predicate returned false or raised.
#[derive(Error, Debug)]
#[error("rule violation: {message}")]
pub struct RuleViolation {
    /// The rule's declared message, or a generated message naming the
    /// failing expression.
    pub message: String,
    /// The underlying failure, when the predicate raised instead of
    /// returning false.
    #[source]
    pub source: Option<Box<RecspecError>>,
}

impl RuleViolation {
    /// A violation with no underlying cause (predicate returned false).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A violation wrapping an error raised inside the predicate.
    pub fn wrapping(message: impl Into<String>, source: RecspecError) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
