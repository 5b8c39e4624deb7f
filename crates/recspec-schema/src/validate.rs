//! # Construction Pipeline
//!
//! [`CompiledSchema::construct`] is the only way a [`Record`] of a compiled
//! type comes into existence. The pipeline runs in a fixed order:
//!
//! 1. unknown and duplicate input fields are rejected,
//! 2. absent fields take their literal default or invoke their factory,
//! 3. field-scoped coercion narrows permissively-typed inputs (strings to
//!    numbers, timestamps, identifiers) — only where the field opted in; a
//!    value that will not narrow falls through to the type check unchanged
//!    rather than failing here; integer-to-float widening is lossless and
//!    always applied,
//! 4. the type check runs; a bare map where a nested record is declared is
//!    a [`RecspecError::TypeMismatch`], never silently accepted,
//! 5. structural constraints run through the field's prebuilt validator,
//! 6. every rule runs against the assembled record in declaration order,
//!    first failure wins,
//! 7. the post-validation hook, if any, runs last.
//!
//! Every validation failure carries a `$.`-rooted dot path to the offending
//! field; failures inside nested records and sequence elements are prefixed
//! as they propagate outward.

use recspec_core::{Record, RecspecError, Timestamp, Value};
use rust_decimal::Decimal;
use tracing::trace;
use uuid::Uuid;

use crate::compile::{CompiledField, CompiledSchema};
use crate::field::FieldType;

/// Whether a value already has the declared type's shape.
///
/// Integer values conform to float fields (lossless widening). A bare map
/// never conforms to a record field; that case is reported separately.
pub(crate) fn value_conforms(declared: &FieldType, value: &Value) -> bool {
    match (declared, value) {
        (FieldType::Bool, Value::Bool(_)) => true,
        (FieldType::Int, Value::Int(_)) => true,
        (FieldType::Float, Value::Float(_) | Value::Int(_)) => true,
        (FieldType::Str, Value::Str(_)) => true,
        (FieldType::Bytes, Value::Bytes(_)) => true,
        (FieldType::Decimal, Value::Decimal(_)) => true,
        (FieldType::Timestamp, Value::Timestamp(_)) => true,
        (FieldType::Uuid, Value::Uuid(_)) => true,
        (FieldType::Path, Value::Path(_)) => true,
        (FieldType::Pattern, Value::Pattern(_)) => true,
        (FieldType::Secret, Value::Secret(_)) => true,
        (FieldType::SecretBytes, Value::SecretBytes(_)) => true,
        (FieldType::Seq(inner), Value::Seq(items)) => {
            items.iter().all(|item| value_conforms(inner, item))
        }
        (FieldType::Record(name), Value::Record(record)) => record.type_name() == name,
        _ => false,
    }
}

impl CompiledSchema {
    /// Construct and fully validate an instance from named input values.
    ///
    /// # Errors
    ///
    /// - [`RecspecError::Validation`] for unknown, duplicate, or missing
    ///   fields, failed coercions, type mismatches other than
    ///   map-for-record, and constraint violations — each at the `$.`-rooted
    ///   path of the offending field.
    /// - [`RecspecError::TypeMismatch`] when a bare map is supplied where a
    ///   nested record instance is declared.
    /// - [`RecspecError::Rule`] when an invariant or the post-validation
    ///   hook fails.
    pub fn construct(&self, raw: Vec<(&str, Value)>) -> Result<Record, RecspecError> {
        let mut supplied: Vec<(String, Option<Value>)> = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            if self.field(name).is_none() {
                return Err(RecspecError::validation(
                    format!("$.{name}"),
                    format!("unknown field for {}", self.name()),
                ));
            }
            if supplied.iter().any(|(n, _)| n == name) {
                return Err(RecspecError::validation(
                    format!("$.{name}"),
                    "field supplied more than once",
                ));
            }
            supplied.push((name.to_string(), Some(value)));
        }

        let mut validated = Vec::with_capacity(self.fields().len());
        for field in self.fields() {
            let provided = supplied
                .iter_mut()
                .find(|(n, _)| n == field.name())
                .and_then(|(_, v)| v.take());

            let value = match provided {
                Some(v) => v,
                None => match self.default_for(field) {
                    Some(v) => v,
                    None => {
                        return Err(RecspecError::validation(
                            format!("$.{}", field.name()),
                            "missing required field",
                        ))
                    }
                },
            };

            let value = self.admit(field, value)?;
            field.check_constraints(&value)?;
            validated.push((field.name().to_string(), value));
        }

        let record = Record::from_validated_parts(self.name().to_string(), validated);

        let view = Value::Record(record.clone());
        for rule in self.rules() {
            rule.check(&view)?;
        }

        if let Some(hook) = self.post_validate_hook() {
            trace!(schema = %self.name(), "running post-validation hook");
            hook(&record).map_err(recspec_core::RuleViolation::new)?;
        }

        Ok(record)
    }

    fn default_for(&self, field: &CompiledField) -> Option<Value> {
        let spec = field.spec();
        if let Some(value) = &spec.default {
            return Some(value.clone());
        }
        spec.default_factory.as_ref().map(|factory| factory())
    }

    /// Coerce, then type-check, one field's value.
    fn admit(&self, field: &CompiledField, value: Value) -> Result<Value, RecspecError> {
        let declared = field.spec().declared_type();
        let value = coerce_value(declared, value, field);
        type_check(declared, &value, &format!("$.{}", field.name()))?;
        Ok(value)
    }
}

/// Report a type mismatch at the most specific path: sequences recurse so
/// the failing element's index appears in the dot path.
fn type_check(declared: &FieldType, value: &Value, path: &str) -> Result<(), RecspecError> {
    if value_conforms(declared, value) {
        return Ok(());
    }

    if let (FieldType::Seq(inner), Value::Seq(items)) = (declared, value) {
        for (i, item) in items.iter().enumerate() {
            type_check(inner, item, &format!("{path}[{i}]"))?;
        }
    }

    // A bare map standing in for a nested record is a structural
    // substitution, reported as its own error kind.
    if record_expected_map_given(declared, value) {
        return Err(RecspecError::TypeMismatch {
            expected: declared.name(),
            got: value.kind().to_string(),
        });
    }

    Err(RecspecError::validation(
        path,
        format!("expected {}, got {}", declared.name(), value.kind()),
    ))
}

fn record_expected_map_given(declared: &FieldType, value: &Value) -> bool {
    match (declared, value) {
        (FieldType::Record(_), Value::Map(_)) => true,
        (FieldType::Seq(inner), Value::Seq(items)) => items
            .iter()
            .any(|item| record_expected_map_given(inner, item)),
        _ => false,
    }
}

/// Apply lossless widening unconditionally and permissive narrowing where
/// the field opted in. A value that will not narrow is returned unchanged;
/// the type check reports it, so a failed coercion never masks the real
/// mismatch.
fn coerce_value(declared: &FieldType, value: Value, field: &CompiledField) -> Value {
    // Lossless widening is not opt-in.
    if let (FieldType::Float, Value::Int(i)) = (declared, &value) {
        return Value::Float(*i as f64);
    }

    let value = match (declared, value) {
        (FieldType::Seq(inner), Value::Seq(items)) => {
            return Value::Seq(
                items
                    .into_iter()
                    .map(|item| coerce_value(inner, item, field))
                    .collect(),
            );
        }
        (_, v) => v,
    };

    if !field.spec().is_coerced() {
        return value;
    }

    match (declared, value) {
        (FieldType::Int, Value::Str(s)) => match s.trim().parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(s),
        },
        (FieldType::Float, Value::Str(s)) => match s.trim().parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::Str(s),
        },
        (FieldType::Decimal, Value::Str(s)) => match s.trim().parse::<Decimal>() {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::Str(s),
        },
        (FieldType::Decimal, Value::Int(i)) => Value::Decimal(Decimal::from(i)),
        (FieldType::Timestamp, Value::Str(s)) => {
            let parsed = if field.spec().constraints().tz == Some(true) {
                Timestamp::parse_aware(&s)
            } else {
                Timestamp::parse(&s)
            };
            match parsed {
                Ok(ts) => Value::Timestamp(ts),
                Err(_) => Value::Str(s),
            }
        }
        (FieldType::Uuid, Value::Str(s)) => match Uuid::parse_str(s.trim()) {
            Ok(u) => Value::Uuid(u),
            Err(_) => Value::Str(s),
        },
        (FieldType::Path, Value::Str(s)) => Value::Path(std::path::PathBuf::from(s)),
        (FieldType::Bool, Value::Str(s)) => match s.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Str(s),
        },
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{SchemaBuilder, SchemaRegistry};
    use crate::expr::{lit, this};
    use crate::field::FieldSpec;
    use crate::rule::Rule;
    use crate::types;
    use std::collections::BTreeMap;

    fn experiment_registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Experiment")
                    .field("trust", types::closed_unit_float())
                    .field("threshold", types::closed_unit_float().default(0.5))
                    .rule(
                        Rule::expr(this().attr("trust").gt(this().attr("threshold")))
                            .message("trust must exceed threshold"),
                    ),
            )
            .expect("compiles");
        registry
    }

    #[test]
    fn test_construct_happy_path() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let record = schema
            .construct(vec![
                ("trust", Value::Float(0.9)),
                ("threshold", Value::Float(0.4)),
            ])
            .expect("valid");
        assert_eq!(record.get("trust"), Some(&Value::Float(0.9)));
    }

    #[test]
    fn test_default_fills_absent_field() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let record = schema
            .construct(vec![("trust", Value::Float(0.9))])
            .expect("valid");
        assert_eq!(record.get("threshold"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_missing_required_field_names_its_path() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let err = schema.construct(vec![]).unwrap_err();
        match err {
            RecspecError::Validation { path, message } => {
                assert_eq!(path, "$.trust");
                assert!(message.contains("missing"));
            }
            other => panic!("expected Validation, got: {other}"),
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let err = schema
            .construct(vec![
                ("trust", Value::Float(0.9)),
                ("bogus", Value::Int(1)),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let err = schema
            .construct(vec![
                ("trust", Value::Float(0.9)),
                ("trust", Value::Float(0.8)),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rule_failure_uses_declared_message() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let err = schema
            .construct(vec![
                ("trust", Value::Float(0.3)),
                ("threshold", Value::Float(0.4)),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("trust must exceed threshold"));
    }

    #[test]
    fn test_constraint_violation_carries_dot_path() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let err = schema
            .construct(vec![("trust", Value::Float(1.5))])
            .unwrap_err();
        match err {
            RecspecError::Validation { path, .. } => assert_eq!(path, "$.trust"),
            other => panic!("expected Validation, got: {other}"),
        }
    }

    #[test]
    fn test_int_widens_to_float_without_opt_in() {
        let registry = experiment_registry();
        let schema = registry.get("Experiment").expect("registered");
        let record = schema
            .construct(vec![("trust", Value::Int(1)), ("threshold", Value::Float(0.4))])
            .expect("widened");
        assert_eq!(record.get("trust"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_string_narrowing_requires_opt_in() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Coerced")
                    .field("age", FieldSpec::new(FieldType::Int).coerce(true))
                    .field("label", FieldSpec::new(FieldType::Int)),
            )
            .expect("compiles");
        let schema = registry.get("Coerced").expect("registered");

        let record = schema
            .construct(vec![
                ("age", Value::Str("42".into())),
                ("label", Value::Int(7)),
            ])
            .expect("coerced");
        assert_eq!(record.get("age"), Some(&Value::Int(42)));

        let err = schema
            .construct(vec![
                ("age", Value::Int(42)),
                ("label", Value::Str("7".into())),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("expected int, got str"));
    }

    #[test]
    fn test_failed_coercion_falls_through_to_the_type_check() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Coerced")
                    .field("age", FieldSpec::new(FieldType::Int).coerce(true)),
            )
            .expect("compiles");
        let schema = registry.get("Coerced").expect("registered");
        let err = schema
            .construct(vec![("age", Value::Str("not a number".into()))])
            .unwrap_err();
        match err {
            RecspecError::Validation { path, message } => {
                assert_eq!(path, "$.age");
                assert!(message.contains("expected int, got str"));
            }
            other => panic!("expected Validation, got: {other}"),
        }
    }

    #[test]
    fn test_timestamp_tz_requirement_rejects_naive_input() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Event")
                    .field(
                        "at",
                        FieldSpec::new(FieldType::Timestamp).coerce(true).tz(true),
                    ),
            )
            .expect("compiles");
        let schema = registry.get("Event").expect("registered");

        assert!(schema
            .construct(vec![("at", Value::Str("2026-08-30T12:00:00+00:00".into()))])
            .is_ok());
        assert!(schema
            .construct(vec![("at", Value::Str("2026-08-30T12:00:00".into()))])
            .is_err());
    }

    #[test]
    fn test_map_for_nested_record_is_type_mismatch() {
        let registry = SchemaRegistry::new();
        registry
            .compile(SchemaBuilder::new("User").field("name", FieldSpec::new(FieldType::Str)))
            .expect("compiles");
        registry
            .compile(
                SchemaBuilder::new("Team")
                    .field("lead", FieldSpec::new(FieldType::Record("User".into()))),
            )
            .expect("compiles");
        let team = registry.get("Team").expect("registered");

        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Value::Str("ada".into()));
        let err = team.construct(vec![("lead", Value::Map(map))]).unwrap_err();
        assert!(matches!(err, RecspecError::TypeMismatch { .. }));

        let user = registry.get("User").expect("registered");
        let lead = user
            .construct(vec![("name", Value::Str("ada".into()))])
            .expect("valid");
        assert!(team.construct(vec![("lead", Value::Record(lead))]).is_ok());
    }

    #[test]
    fn test_sequence_elements_are_coerced_with_indexed_paths() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Batch").field(
                    "ids",
                    FieldSpec::new(FieldType::Seq(Box::new(FieldType::Int))).coerce(true),
                ),
            )
            .expect("compiles");
        let schema = registry.get("Batch").expect("registered");

        let record = schema
            .construct(vec![(
                "ids",
                Value::Seq(vec![Value::Str("1".into()), Value::Str("2".into())]),
            )])
            .expect("coerced");
        assert_eq!(
            record.get("ids"),
            Some(&Value::Seq(vec![Value::Int(1), Value::Int(2)]))
        );

        let err = schema
            .construct(vec![(
                "ids",
                Value::Seq(vec![Value::Str("1".into()), Value::Str("oops".into())]),
            )])
            .unwrap_err();
        match err {
            RecspecError::Validation { path, .. } => assert_eq!(path, "$.ids[1]"),
            other => panic!("expected Validation, got: {other}"),
        }
    }

    #[test]
    fn test_non_sequence_input_for_seq_field_reaches_the_type_check() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Batch").field(
                    "ids",
                    FieldSpec::new(FieldType::Seq(Box::new(FieldType::Int))).coerce(true),
                ),
            )
            .expect("compiles");
        let schema = registry.get("Batch").expect("registered");
        let err = schema
            .construct(vec![("ids", Value::Str("1,2,3".into()))])
            .unwrap_err();
        match err {
            RecspecError::Validation { path, message } => {
                assert_eq!(path, "$.ids");
                assert!(message.contains("got str"));
            }
            other => panic!("expected Validation, got: {other}"),
        }
    }

    #[test]
    fn test_rules_run_in_declaration_order_first_failure_wins() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Ordered")
                    .field("x", FieldSpec::new(FieldType::Int))
                    .rule(Rule::expr(this().attr("x").gt(lit(10))).message("first"))
                    .rule(Rule::expr(this().attr("x").gt(lit(100))).message("second")),
            )
            .expect("compiles");
        let schema = registry.get("Ordered").expect("registered");
        let err = schema.construct(vec![("x", Value::Int(5))]).unwrap_err();
        assert!(err.to_string().contains("first"));
        assert!(!err.to_string().contains("second"));
    }

    #[test]
    fn test_field_bound_rules_run_before_body_rules() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Ordered")
                    .rule(Rule::expr(lit(false)).message("body"))
                    .field(
                        "x",
                        FieldSpec::new(FieldType::Int)
                            .rule_expr(this().gt(lit(10)))
                            .message("bound"),
                    ),
            )
            .expect("compiles");
        let schema = registry.get("Ordered").expect("registered");
        let err = schema.construct(vec![("x", Value::Int(5))]).unwrap_err();
        assert!(err.to_string().contains("bound"));
    }

    #[test]
    fn test_post_validate_runs_after_rules() {
        let registry = SchemaRegistry::new();
        registry
            .compile(
                SchemaBuilder::new("Hooked")
                    .field("x", FieldSpec::new(FieldType::Int))
                    .rule(Rule::expr(this().attr("x").gt(lit(0))).message("rule"))
                    .post_validate(|record| {
                        if record.get("x") == Some(&Value::Int(13)) {
                            return Err("thirteen is not allowed".into());
                        }
                        Ok(())
                    }),
            )
            .expect("compiles");
        let schema = registry.get("Hooked").expect("registered");

        assert!(schema.construct(vec![("x", Value::Int(1))]).is_ok());

        let err = schema.construct(vec![("x", Value::Int(13))]).unwrap_err();
        assert!(err.to_string().contains("thirteen"));

        // The rule fires first; the hook never sees the instance.
        let err = schema.construct(vec![("x", Value::Int(-1))]).unwrap_err();
        assert!(err.to_string().contains("rule"));
    }

    #[test]
    fn test_default_factory_invoked_per_construction() {
        use std::sync::atomic::{AtomicI64, Ordering};
        static NEXT: AtomicI64 = AtomicI64::new(0);

        let registry = SchemaRegistry::new();
        registry
            .compile(SchemaBuilder::new("Counted").field(
                "seq",
                FieldSpec::new(FieldType::Int)
                    .default_factory(|| Value::Int(NEXT.fetch_add(1, Ordering::SeqCst))),
            ))
            .expect("compiles");
        let schema = registry.get("Counted").expect("registered");

        let a = schema.construct(vec![]).expect("valid");
        let b = schema.construct(vec![]).expect("valid");
        assert_ne!(a.get("seq"), b.get("seq"));
    }
}
