//! # Conversion Facade
//!
//! Round trips between validated records and their external
//! representations: a JSON object map, JSON text, and (behind the `yaml`
//! feature) YAML text.
//!
//! Inbound conversion always goes through the schema's construction
//! pipeline, so a decoded instance is as validated as a hand-built one.
//! Nested record fields recurse: the inner object is decoded against the
//! nested schema and constructed through its own pipeline, and any failure
//! path is prefixed on the way out (`$.age` inside the `owner` field
//! surfaces as `$.owner.age`).
//!
//! Foreign serialization errors are translated into [`RecspecError`]
//! variants at the boundary; `serde_json`/`serde_yaml` error types never
//! leak through this API. With the `yaml` feature disabled, the YAML entry
//! points still exist and return `ExtensionUnavailable` instead of
//! vanishing from the API.

use recspec_core::{Record, RecspecError, Timestamp, Value};
use recspec_schema::{CompiledSchema, FieldType};
use tracing::trace;

use crate::registry::CodecRegistry;

/// Encode a record into a JSON object map, field by field in declaration
/// order.
///
/// # Errors
///
/// Returns [`RecspecError::Encode`] when a field value has no wire form.
pub fn to_map(
    codecs: &CodecRegistry,
    record: &Record,
) -> Result<serde_json::Map<String, serde_json::Value>, RecspecError> {
    let mut object = serde_json::Map::new();
    for (name, value) in record.fields() {
        object.insert(name.to_string(), codecs.encode(value)?);
    }
    Ok(object)
}

/// Decode a JSON object map and construct a validated instance.
///
/// # Errors
///
/// - [`RecspecError::Validation`] with a `$.`-rooted dot path for unknown
///   fields and per-field decode failures, including failures inside
///   nested records and sequence elements.
/// - Everything [`CompiledSchema::construct`] can return.
pub fn from_map(
    codecs: &CodecRegistry,
    schema: &CompiledSchema,
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<Record, RecspecError> {
    trace!(schema = %schema.name(), "decoding object map");

    let mut decoded: Vec<(&str, Value)> = Vec::with_capacity(map.len());
    for (key, raw) in map {
        let field = schema.field(key).ok_or_else(|| {
            RecspecError::validation(
                format!("$.{key}"),
                format!("unknown field for {}", schema.name()),
            )
        })?;
        let tz_required = field.spec().constraints().tz == Some(true);
        let value = decode_value(
            codecs,
            schema,
            field.spec().declared_type(),
            tz_required,
            raw,
            key,
        )?;
        decoded.push((key.as_str(), value));
    }

    schema.construct(decoded)
}

/// Decode one wire value into the runtime shape of a declared type,
/// recursing through sequences and nested records. `segment` is the dot
/// path fragment under the record root, e.g. `owner` or `items[2]`.
fn decode_value(
    codecs: &CodecRegistry,
    schema: &CompiledSchema,
    target: &FieldType,
    tz_required: bool,
    raw: &serde_json::Value,
    segment: &str,
) -> Result<Value, RecspecError> {
    match target {
        FieldType::Record(type_name) => {
            let object = raw.as_object().ok_or_else(|| {
                RecspecError::validation(
                    format!("$.{segment}"),
                    format!("expected an object for nested {type_name}"),
                )
            })?;
            let nested = schema.nested(type_name).ok_or_else(|| {
                RecspecError::Configuration(format!(
                    "nested record type '{type_name}' missing from compiled schema"
                ))
            })?;
            from_map(codecs, nested, object)
                .map(Value::Record)
                .map_err(|e| e.prefix_path(segment))
        }
        FieldType::Seq(inner) => {
            let items = raw.as_array().ok_or_else(|| {
                RecspecError::validation(format!("$.{segment}"), "expected an array")
            })?;
            let mut decoded = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let element = format!("{segment}[{i}]");
                decoded.push(decode_value(
                    codecs,
                    schema,
                    inner,
                    tz_required,
                    item,
                    &element,
                )?);
            }
            Ok(Value::Seq(decoded))
        }
        FieldType::Timestamp if tz_required => {
            let text = raw.as_str().ok_or_else(|| {
                RecspecError::validation(
                    format!("$.{segment}"),
                    "expected a timestamp string",
                )
            })?;
            Timestamp::parse_aware(text)
                .map(Value::Timestamp)
                .map_err(|e| RecspecError::validation(format!("$.{segment}"), e.to_string()))
        }
        _ => codecs.decode(target, raw).map_err(|e| match e {
            RecspecError::Decode { target, reason } => RecspecError::validation(
                format!("$.{segment}"),
                format!("cannot decode into {target}: {reason}"),
            ),
            other => other,
        }),
    }
}

/// Encode a record as JSON text.
///
/// # Errors
///
/// Returns [`RecspecError::Encode`] when a field value has no wire form or
/// the document cannot be rendered.
pub fn to_json(
    codecs: &CodecRegistry,
    record: &Record,
    pretty: bool,
) -> Result<String, RecspecError> {
    let object = serde_json::Value::Object(to_map(codecs, record)?);
    let rendered = if pretty {
        serde_json::to_string_pretty(&object)
    } else {
        serde_json::to_string(&object)
    };
    rendered.map_err(|_| RecspecError::Encode {
        kind: "json".to_string(),
    })
}

/// Parse JSON text and construct a validated instance.
///
/// # Errors
///
/// Returns [`RecspecError::Decode`] for malformed JSON or a non-object
/// document, plus everything [`from_map`] can return.
pub fn from_json(
    codecs: &CodecRegistry,
    schema: &CompiledSchema,
    text: &str,
) -> Result<Record, RecspecError> {
    let parsed: serde_json::Value =
        serde_json::from_str(text).map_err(|e| RecspecError::Decode {
            target: "json".to_string(),
            reason: e.to_string(),
        })?;
    let object = parsed.as_object().ok_or_else(|| RecspecError::Decode {
        target: "json".to_string(),
        reason: format!("expected a top-level object for {}", schema.name()),
    })?;
    from_map(codecs, schema, object)
}

/// Encode a record as YAML text.
///
/// # Errors
///
/// Returns [`RecspecError::ExtensionUnavailable`] when the `yaml` feature
/// is disabled, [`RecspecError::Encode`] when a value has no wire form.
#[cfg(feature = "yaml")]
pub fn to_yaml(codecs: &CodecRegistry, record: &Record) -> Result<String, RecspecError> {
    let object = serde_json::Value::Object(to_map(codecs, record)?);
    serde_yaml::to_string(&object).map_err(|_| RecspecError::Encode {
        kind: "yaml".to_string(),
    })
}

/// Encode a record as YAML text.
///
/// # Errors
///
/// Returns [`RecspecError::ExtensionUnavailable`] when the `yaml` feature
/// is disabled, [`RecspecError::Encode`] when a value has no wire form.
#[cfg(not(feature = "yaml"))]
pub fn to_yaml(_codecs: &CodecRegistry, _record: &Record) -> Result<String, RecspecError> {
    Err(RecspecError::ExtensionUnavailable("yaml"))
}

/// Parse YAML text and construct a validated instance.
///
/// # Errors
///
/// Returns [`RecspecError::ExtensionUnavailable`] when the `yaml` feature
/// is disabled, [`RecspecError::Decode`] for malformed YAML or a
/// non-mapping document, plus everything [`from_map`] can return.
#[cfg(feature = "yaml")]
pub fn from_yaml(
    codecs: &CodecRegistry,
    schema: &CompiledSchema,
    text: &str,
) -> Result<Record, RecspecError> {
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| RecspecError::Decode {
            target: "yaml".to_string(),
            reason: e.to_string(),
        })?;
    let wire = yaml_to_wire(&parsed).map_err(|reason| RecspecError::Decode {
        target: "yaml".to_string(),
        reason,
    })?;
    let object = wire.as_object().ok_or_else(|| RecspecError::Decode {
        target: "yaml".to_string(),
        reason: format!("expected a top-level mapping for {}", schema.name()),
    })?;
    from_map(codecs, schema, object)
}

/// Parse YAML text and construct a validated instance.
///
/// # Errors
///
/// Returns [`RecspecError::ExtensionUnavailable`] when the `yaml` feature
/// is disabled, [`RecspecError::Decode`] for malformed YAML or a
/// non-mapping document, plus everything [`from_map`] can return.
#[cfg(not(feature = "yaml"))]
pub fn from_yaml(
    _codecs: &CodecRegistry,
    _schema: &CompiledSchema,
    _text: &str,
) -> Result<Record, RecspecError> {
    Err(RecspecError::ExtensionUnavailable("yaml"))
}

/// Convert a `serde_yaml::Value` tree into the equivalent
/// `serde_json::Value` tree.
///
/// YAML has a richer type system than JSON (tags, non-string keys), but
/// record documents use only the JSON-compatible subset.
#[cfg(feature = "yaml")]
fn yaml_to_wire(yaml: &serde_yaml::Value) -> Result<serde_json::Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(serde_json::Value::Null),
        serde_yaml::Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(serde_json::Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(serde_json::Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<serde_json::Value>, String> =
                seq.iter().map(yaml_to_wire).collect();
            Ok(serde_json::Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key: {other:?}")),
                };
                object.insert(key, yaml_to_wire(v)?);
            }
            Ok(serde_json::Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_wire(&tagged.value),
    }
}
