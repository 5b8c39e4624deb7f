//! # Runtime Value Model
//!
//! [`Value`] is the single runtime representation for every field value in
//! recspec: native scalars, sequences and maps, plus the extended kinds the
//! wire format cannot represent natively (paths, timestamps, fixed-point
//! decimals, compiled patterns, secrets, nested records).
//!
//! Numeric amounts that must be exact use `rust_decimal::Decimal`; `f64` is
//! reserved for genuinely floating quantities.
//!
//! ## Records Are Sealed
//!
//! [`Record`] holds a fully-validated instance: a record type name plus its
//! field values in declaration order. The only construction path is the
//! validation pipeline in `recspec-schema`; a record value in hand is proof
//! that every field constraint and rule held at construction time.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::RecspecError;
use crate::secret::{SecretBytes, SecretString};
use crate::temporal::Timestamp;

/// A compiled text pattern, comparing and rendering by its source string.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: regex::Regex,
}

impl Pattern {
    /// Compile a pattern from its source string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the source is not a valid regex.
    pub fn new(source: impl Into<String>) -> Result<Self, RecspecError> {
        let source = source.into();
        let regex = regex::Regex::new(&source)
            .map_err(|e| RecspecError::Configuration(format!("invalid pattern {source:?}: {e}")))?;
        Ok(Self { source, regex })
    }

    /// The pattern's source string (the wire representation).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Test whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A fully-validated record instance: type name plus field values in
/// declaration order.
///
/// Constructed only by the validation pipeline. Field lookup is by name;
/// iteration follows declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Assemble a record from pipeline-validated parts.
    ///
    /// Not part of the public contract: callers outside the validation
    /// pipeline must construct records through schema construction.
    #[doc(hidden)]
    pub fn from_validated_parts(type_name: String, fields: Vec<(String, Value)>) -> Self {
        Self { type_name, fields }
    }

    /// The record type's name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A runtime field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 text.
    Str(String),
    /// Raw bytes (hex on the wire).
    Bytes(Vec<u8>),
    /// Exact fixed-point decimal.
    Decimal(Decimal),
    /// UTC timestamp.
    Timestamp(Timestamp),
    /// UUID identifier.
    Uuid(Uuid),
    /// Filesystem path.
    Path(PathBuf),
    /// Compiled text pattern.
    Pattern(Pattern),
    /// Opaque secret text.
    Secret(SecretString),
    /// Opaque secret bytes.
    SecretBytes(SecretBytes),
    /// Ordered sequence of values.
    Seq(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
    /// A validated nested record instance.
    Record(Record),
}

impl Value {
    /// Returns a human-readable kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Decimal(_) => "decimal",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Path(_) => "path",
            Value::Pattern(_) => "pattern",
            Value::Secret(_) => "secret",
            Value::SecretBytes(_) => "secret-bytes",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Extract a boolean, or report the actual kind.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract a float (integers widen losslessly for comparison purposes).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Extract text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extract a nested record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Resolve a field by name on a record or map value.
    ///
    /// This is the lookup primitive behind expression field paths: each
    /// path segment is resolved against the current value, failing if the
    /// value has no named fields or the segment is absent.
    pub fn lookup(&self, segment: &str) -> Result<&Value, RecspecError> {
        match self {
            Value::Record(r) => r.get(segment).ok_or_else(|| RecspecError::Decode {
                target: r.type_name().to_string(),
                reason: format!("no field named `{segment}`"),
            }),
            Value::Map(m) => m.get(segment).ok_or_else(|| RecspecError::Decode {
                target: "map".into(),
                reason: format!("no key named `{segment}`"),
            }),
            other => Err(RecspecError::TypeMismatch {
                expected: format!("record with field `{segment}`"),
                got: other.kind().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Pattern(p) => write!(f, "/{}/", p.source()),
            Value::Secret(s) => write!(f, "{s}"),
            Value::SecretBytes(s) => write!(f, "{s}"),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(m) => write!(f, "<map with {} entries>", m.len()),
            Value::Record(r) => write!(f, "<{} instance>", r.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::Path(v)
    }
}

impl From<SecretString> for Value {
    fn from(v: SecretString) -> Self {
        Value::Secret(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}
