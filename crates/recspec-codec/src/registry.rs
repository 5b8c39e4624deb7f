//! # Type Codec Registry
//!
//! Encoding turns a runtime [`Value`] into a `serde_json::Value` for the
//! wire; decoding turns a wire value back into the runtime shape a declared
//! [`FieldType`] requires. Both directions consult custom codecs in
//! registration order before falling through to the built-ins, so a caller
//! can override any built-in by registering a more specific codec first.
//!
//! Built-in wire conventions:
//!
//! - secrets encode as the fixed `"******"` placeholder and never round-trip,
//! - timestamps encode as RFC 3339 strings,
//! - decimals encode as integers when their scale is zero, floats otherwise,
//! - bytes encode as lowercase hex strings,
//! - paths, uuids, and patterns encode as their string forms,
//! - sequences, maps, and records recurse element by element.

use std::sync::Arc;

use recspec_core::{Pattern, RecspecError, SecretBytes, SecretString, Timestamp, Value};
use recspec_schema::FieldType;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// Encoder callback: runtime value to wire value.
pub type EncodeFn = Arc<dyn Fn(&Value) -> Result<serde_json::Value, RecspecError> + Send + Sync>;

/// Decoder callback: wire value to runtime value.
pub type DecodeFn =
    Arc<dyn Fn(&serde_json::Value) -> Result<Value, RecspecError> + Send + Sync>;

struct EncoderEntry {
    name: String,
    applies: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    encode: EncodeFn,
}

struct DecoderEntry {
    name: String,
    applies: Arc<dyn Fn(&FieldType) -> bool + Send + Sync>,
    decode: DecodeFn,
}

/// Ordered registry of custom codecs layered over the built-ins.
#[derive(Default)]
pub struct CodecRegistry {
    encoders: Vec<EncoderEntry>,
    decoders: Vec<DecoderEntry>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field(
                "encoders",
                &self.encoders.iter().map(|e| &e.name).collect::<Vec<_>>(),
            )
            .field(
                "decoders",
                &self.decoders.iter().map(|d| &d.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CodecRegistry {
    /// A registry with only the built-in codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom encoder, consulted before the built-ins and before
    /// any encoder registered after it.
    pub fn register_encoder(
        &mut self,
        name: impl Into<String>,
        applies: impl Fn(&Value) -> bool + Send + Sync + 'static,
        encode: impl Fn(&Value) -> Result<serde_json::Value, RecspecError> + Send + Sync + 'static,
    ) {
        self.encoders.push(EncoderEntry {
            name: name.into(),
            applies: Arc::new(applies),
            encode: Arc::new(encode),
        });
    }

    /// Register a custom decoder, consulted before the built-ins and before
    /// any decoder registered after it.
    pub fn register_decoder(
        &mut self,
        name: impl Into<String>,
        applies: impl Fn(&FieldType) -> bool + Send + Sync + 'static,
        decode: impl Fn(&serde_json::Value) -> Result<Value, RecspecError> + Send + Sync + 'static,
    ) {
        self.decoders.push(DecoderEntry {
            name: name.into(),
            applies: Arc::new(applies),
            decode: Arc::new(decode),
        });
    }

    /// Encode a runtime value for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`RecspecError::Encode`] naming the offending kind when no
    /// codec applies, or when a numeric value has no JSON representation.
    pub fn encode(&self, value: &Value) -> Result<serde_json::Value, RecspecError> {
        for entry in &self.encoders {
            if (entry.applies)(value) {
                return (entry.encode)(value);
            }
        }
        self.encode_builtin(value)
    }

    fn encode_builtin(&self, value: &Value) -> Result<serde_json::Value, RecspecError> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(json!(b)),
            Value::Int(i) => Ok(json!(i)),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| RecspecError::Encode {
                    kind: value.kind().to_string(),
                }),
            Value::Str(s) => Ok(json!(s)),
            Value::Bytes(b) => Ok(json!(encode_hex(b))),
            Value::Decimal(d) => encode_decimal(d),
            Value::Timestamp(ts) => Ok(json!(ts.to_iso8601())),
            Value::Uuid(u) => Ok(json!(u.to_string())),
            Value::Path(p) => Ok(json!(p.to_string_lossy())),
            Value::Pattern(p) => Ok(json!(p.source())),
            Value::Secret(s) => Ok(json!(s.obscured())),
            Value::SecretBytes(_) => Ok(json!(recspec_core::secret::OBSCURED)),
            Value::Seq(items) => {
                let mut encoded = Vec::with_capacity(items.len());
                for item in items {
                    encoded.push(self.encode(item)?);
                }
                Ok(serde_json::Value::Array(encoded))
            }
            Value::Map(map) => {
                let mut object = serde_json::Map::new();
                for (key, item) in map {
                    object.insert(key.clone(), self.encode(item)?);
                }
                Ok(serde_json::Value::Object(object))
            }
            Value::Record(record) => {
                let mut object = serde_json::Map::new();
                for (name, item) in record.fields() {
                    object.insert(name.to_string(), self.encode(item)?);
                }
                Ok(serde_json::Value::Object(object))
            }
        }
    }

    /// Decode a wire value into the runtime shape of a declared type.
    ///
    /// Sequences unwrap to their element type and recurse. Nested record
    /// types cannot be decoded here — they need their compiled schema and
    /// are handled by the conversion facade.
    ///
    /// # Errors
    ///
    /// Returns [`RecspecError::Decode`] naming the target type when the
    /// wire value does not fit it.
    pub fn decode(
        &self,
        target: &FieldType,
        raw: &serde_json::Value,
    ) -> Result<Value, RecspecError> {
        for entry in &self.decoders {
            if (entry.applies)(target) {
                return (entry.decode)(raw);
            }
        }
        self.decode_builtin(target, raw)
    }

    fn decode_builtin(
        &self,
        target: &FieldType,
        raw: &serde_json::Value,
    ) -> Result<Value, RecspecError> {
        match target {
            FieldType::Bool => raw
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| decode_error(target, raw, "expected a boolean")),
            FieldType::Int => raw
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| decode_error(target, raw, "expected an integer")),
            FieldType::Float => raw
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| decode_error(target, raw, "expected a number")),
            FieldType::Str => raw
                .as_str()
                .map(|s| Value::Str(s.to_string()))
                .ok_or_else(|| decode_error(target, raw, "expected a string")),
            FieldType::Bytes => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| decode_error(target, raw, "expected a hex string"))?;
                decode_hex(text)
                    .map(Value::Bytes)
                    .map_err(|reason| decode_error(target, raw, &reason))
            }
            FieldType::Decimal => decode_decimal(raw),
            FieldType::Timestamp => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| decode_error(target, raw, "expected a timestamp string"))?;
                Timestamp::parse(text)
                    .map(Value::Timestamp)
                    .map_err(|e| decode_error(target, raw, &e.to_string()))
            }
            FieldType::Uuid => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| decode_error(target, raw, "expected a uuid string"))?;
                Uuid::parse_str(text)
                    .map(Value::Uuid)
                    .map_err(|e| decode_error(target, raw, &e.to_string()))
            }
            FieldType::Path => raw
                .as_str()
                .map(|s| Value::Path(std::path::PathBuf::from(s)))
                .ok_or_else(|| decode_error(target, raw, "expected a path string")),
            FieldType::Pattern => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| decode_error(target, raw, "expected a pattern string"))?;
                Pattern::new(text)
                    .map(Value::Pattern)
                    .map_err(|e| decode_error(target, raw, &e.to_string()))
            }
            // Secrets wrap the raw text without validation; the wire form
            // of an encoded secret is the placeholder, so secrets do not
            // round-trip by design.
            FieldType::Secret => raw
                .as_str()
                .map(|s| Value::Secret(SecretString::new(s)))
                .ok_or_else(|| decode_error(target, raw, "expected a string")),
            FieldType::SecretBytes => raw
                .as_str()
                .map(|s| Value::SecretBytes(SecretBytes::new(s.as_bytes().to_vec())))
                .ok_or_else(|| decode_error(target, raw, "expected a string")),
            FieldType::Seq(inner) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| decode_error(target, raw, "expected an array"))?;
                let mut decoded = Vec::with_capacity(items.len());
                for item in items {
                    decoded.push(self.decode(inner, item)?);
                }
                Ok(Value::Seq(decoded))
            }
            FieldType::Record(name) => Err(RecspecError::Decode {
                target: target.name(),
                reason: format!("nested record '{name}' must be decoded through its schema"),
            }),
        }
    }
}

fn decode_error(target: &FieldType, raw: &serde_json::Value, reason: &str) -> RecspecError {
    RecspecError::Decode {
        target: target.name(),
        reason: format!("{reason} (got {})", json_kind(raw)),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Integer wire form when the decimal has no fractional digits, float
/// otherwise.
fn encode_decimal(d: &Decimal) -> Result<serde_json::Value, RecspecError> {
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Ok(json!(i));
        }
    }
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .ok_or_else(|| RecspecError::Encode {
            kind: "decimal".to_string(),
        })
}

fn decode_decimal(raw: &serde_json::Value) -> Result<Value, RecspecError> {
    let text = match raw {
        // serde_json renders numbers canonically, which is exactly the
        // form rust_decimal parses.
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => return Err(decode_error(&FieldType::Decimal, other, "expected a number")),
    };
    text.parse::<Decimal>()
        .map(Value::Decimal)
        .map_err(|e| decode_error(&FieldType::Decimal, raw, &e.to_string()))
}

/// Lowercase hex rendering of a byte slice.
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Parse a hex string back into bytes.
pub(crate) fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    // Hex is ASCII; checking up front keeps the byte-index slicing below
    // on char boundaries for any input.
    if !text.is_ascii() {
        return Err("hex string contains non-ascii characters".to_string());
    }
    if text.len() % 2 != 0 {
        return Err("hex string has odd length".to_string());
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| format!("invalid hex at offset {i}"))
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Scalar values paired with the field type they decode back through.
    fn round_trippable_scalar() -> impl Strategy<Value = (FieldType, Value)> {
        prop_oneof![
            any::<bool>().prop_map(|b| (FieldType::Bool, Value::Bool(b))),
            any::<i64>().prop_map(|i| (FieldType::Int, Value::Int(i))),
            // NaN has no wire form; infinities are not JSON numbers.
            (-1e12f64..1e12).prop_map(|f| (FieldType::Float, Value::Float(f))),
            "[a-zA-Z0-9_ ]{0,40}".prop_map(|s| (FieldType::Str, Value::Str(s))),
            prop::collection::vec(any::<u8>(), 0..64)
                .prop_map(|b| (FieldType::Bytes, Value::Bytes(b))),
        ]
    }

    proptest! {
        /// Encoding then decoding a scalar through its declared type is the
        /// identity.
        #[test]
        fn scalar_round_trip((target, value) in round_trippable_scalar()) {
            let codecs = CodecRegistry::new();
            let wire = codecs.encode(&value).expect("encodes");
            let back = codecs.decode(&target, &wire).expect("decodes");
            prop_assert_eq!(back, value);
        }

        /// Hex encoding round-trips arbitrary byte strings.
        #[test]
        fn hex_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let encoded = encode_hex(&bytes);
            prop_assert_eq!(decode_hex(&encoded).expect("valid hex"), bytes);
        }

        /// Sequences round-trip element-wise.
        #[test]
        fn seq_round_trip(items in prop::collection::vec(any::<i64>(), 0..16)) {
            let codecs = CodecRegistry::new();
            let value = Value::Seq(items.iter().copied().map(Value::Int).collect());
            let wire = codecs.encode(&value).expect("encodes");
            let back = codecs
                .decode(&FieldType::Seq(Box::new(FieldType::Int)), &wire)
                .expect("decodes");
            prop_assert_eq!(back, value);
        }
    }
}
