//! # Schema Compiler
//!
//! A [`SchemaBuilder`] accumulates one record type's declaration — fields in
//! order, invariant rules, an optional post-validation hook — and is
//! consumed exactly once by [`SchemaRegistry::compile`]. Compilation does
//! all the expensive and fallible work up front:
//!
//! - defaults are checked against declared types,
//! - constraint applicability is checked against declared types,
//! - structural constraints are folded into JSON Schema values and built
//!   into `jsonschema` validators (Draft 2020-12),
//! - nested record references are resolved against the registry,
//! - field-bound inline rules are lifted into the schema's rule list ahead
//!   of the body rules, preserving declaration order within each group.
//!
//! The resulting [`CompiledSchema`] is immutable and shared via `Arc`;
//! repeated compilation of an already-registered name is a no-op that
//! returns the cached schema.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use recspec_core::{Record, RecspecError, Value};
use serde_json::json;
use tracing::debug;

use crate::field::{FieldSpec, FieldType};
use crate::rule::Rule;
use crate::validate::value_conforms;

/// Hook invoked on the fully-validated record, after every rule has passed.
pub type PostValidateHook = Arc<dyn Fn(&Record) -> Result<(), String> + Send + Sync>;

/// Declaration accumulator for one record type.
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, FieldSpec)>,
    rules: Vec<Rule>,
    post_validate: Option<PostValidateHook>,
}

impl SchemaBuilder {
    /// Start a declaration for the record type `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            rules: Vec::new(),
            post_validate: None,
        }
    }

    /// Declare a field. Declaration order is preserved and is the order
    /// fields are validated and serialized in.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Declare a body rule. Body rules run after every field-bound rule,
    /// in declaration order.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Install a hook that runs on the fully-validated record, after all
    /// rules have passed. An `Err(message)` fails construction.
    pub fn post_validate(
        mut self,
        hook: impl Fn(&Record) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.post_validate = Some(Arc::new(hook));
        self
    }
}

/// One field after compilation: its spec plus the prebuilt constraint
/// validator, if the spec carries structural constraints.
pub struct CompiledField {
    name: String,
    spec: FieldSpec,
    schema_json: Option<serde_json::Value>,
    validator: Option<jsonschema::Validator>,
}

impl std::fmt::Debug for CompiledField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledField")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("schema_json", &self.schema_json)
            .finish()
    }
}

impl CompiledField {
    /// The field's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's specification.
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// The folded JSON Schema for this field's constraints, if any.
    pub fn constraint_schema(&self) -> Option<&serde_json::Value> {
        self.schema_json.as_ref()
    }

    /// Run the field's structural constraints against a value that has
    /// already passed the type check.
    ///
    /// # Errors
    ///
    /// Returns [`RecspecError::Validation`] at path `$.<name>` with the
    /// first violation's message.
    pub fn check_constraints(&self, value: &Value) -> Result<(), RecspecError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let projected = project_for_constraints(value);
        if let Some(error) = validator.iter_errors(&projected).next() {
            return Err(RecspecError::validation(
                format!("$.{}", self.name),
                error.to_string(),
            ));
        }
        Ok(())
    }
}

/// Project a value to the JSON shape the constraint validator inspects.
///
/// Only the aspects constraints can observe are carried over: magnitude for
/// numbers, text for strings, element count for bytes and sequences.
fn project_for_constraints(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(i) => json!(i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Decimal(d) => {
            use rust_decimal::prelude::ToPrimitive;
            d.to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }
        Value::Str(s) => json!(s),
        Value::Bytes(b) => json!(b),
        Value::Seq(items) => {
            serde_json::Value::Array(items.iter().map(|_| serde_json::Value::Null).collect())
        }
        _ => serde_json::Value::Null,
    }
}

/// Fold a field's constraints into a JSON Schema value, or `None` when the
/// field has no structurally-checked constraints.
fn fold_constraint_schema(spec: &FieldSpec) -> Option<serde_json::Value> {
    let c = spec.constraints();
    if c.is_structurally_empty() {
        return None;
    }

    let mut schema = serde_json::Map::new();
    match spec.declared_type() {
        t if t.is_numeric() => {
            schema.insert("type".into(), json!("number"));
            if let Some(b) = c.gt {
                schema.insert("exclusiveMinimum".into(), json!(b));
            }
            if let Some(b) = c.ge {
                schema.insert("minimum".into(), json!(b));
            }
            if let Some(b) = c.lt {
                schema.insert("exclusiveMaximum".into(), json!(b));
            }
            if let Some(b) = c.le {
                schema.insert("maximum".into(), json!(b));
            }
            if let Some(n) = c.multiple_of {
                schema.insert("multipleOf".into(), json!(n));
            }
        }
        FieldType::Str => {
            schema.insert("type".into(), json!("string"));
            if let Some(n) = c.min_length {
                schema.insert("minLength".into(), json!(n));
            }
            if let Some(n) = c.max_length {
                schema.insert("maxLength".into(), json!(n));
            }
            if let Some(p) = &c.pattern {
                schema.insert("pattern".into(), json!(p));
            }
        }
        FieldType::Bytes | FieldType::Seq(_) => {
            schema.insert("type".into(), json!("array"));
            if let Some(n) = c.min_length {
                schema.insert("minItems".into(), json!(n));
            }
            if let Some(n) = c.max_length {
                schema.insert("maxItems".into(), json!(n));
            }
        }
        _ => {}
    }

    Some(serde_json::Value::Object(schema))
}

/// A record type after compilation: immutable, shareable, cheap to read.
pub struct CompiledSchema {
    name: String,
    fields: Vec<CompiledField>,
    index: HashMap<String, usize>,
    rules: Vec<Rule>,
    nested: HashMap<String, Arc<CompiledSchema>>,
    post_validate: Option<PostValidateHook>,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("rules", &self.rules.len())
            .field("nested", &self.nested.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CompiledSchema {
    /// The record type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// All rules in evaluation order: field-bound rules first, then body
    /// rules, each group in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The compiled schema for a nested record type referenced by a field.
    pub fn nested(&self, type_name: &str) -> Option<&Arc<CompiledSchema>> {
        self.nested.get(type_name)
    }

    pub(crate) fn post_validate_hook(&self) -> Option<&PostValidateHook> {
        self.post_validate.as_ref()
    }
}

/// Process-wide cache of compiled record types, keyed by name.
///
/// The registry is the only synchronized structure in this crate; once a
/// schema is out of the registry it is read without locking.
pub struct SchemaRegistry {
    inner: RwLock<HashMap<String, Arc<CompiledSchema>>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a previously-compiled schema.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledSchema>> {
        self.inner.read().ok()?.get(name).cloned()
    }

    /// Compile a declaration, register it, and return it.
    ///
    /// Compiling a name that is already registered returns the cached
    /// schema without re-running compilation.
    ///
    /// # Errors
    ///
    /// Returns [`RecspecError::Configuration`] for any declaration defect:
    /// duplicate fields, a default alongside a factory, a default of the
    /// wrong type, constraints that do not apply to the declared type, an
    /// unresolvable nested record reference, or an unbuildable constraint
    /// validator.
    pub fn compile(&self, builder: SchemaBuilder) -> Result<Arc<CompiledSchema>, RecspecError> {
        if let Some(existing) = self.get(&builder.name) {
            return Ok(existing);
        }

        let schema = Arc::new(self.compile_fresh(builder)?);

        let mut guard = self
            .inner
            .write()
            .map_err(|_| RecspecError::Configuration("schema registry lock poisoned".into()))?;
        // A racing compile of the same name may have won; keep the first.
        let entry = guard
            .entry(schema.name.clone())
            .or_insert_with(|| Arc::clone(&schema));
        Ok(Arc::clone(entry))
    }

    fn compile_fresh(&self, builder: SchemaBuilder) -> Result<CompiledSchema, RecspecError> {
        let SchemaBuilder {
            name,
            fields,
            rules: body_rules,
            post_validate,
        } = builder;

        let mut compiled_fields = Vec::with_capacity(fields.len());
        let mut index = HashMap::with_capacity(fields.len());
        let mut bound_rules = Vec::new();
        let mut nested = HashMap::new();

        for (position, (field_name, spec)) in fields.into_iter().enumerate() {
            if index.insert(field_name.clone(), position).is_some() {
                return Err(RecspecError::Configuration(format!(
                    "{name}: duplicate field '{field_name}'"
                )));
            }

            check_default_mechanism(&name, &field_name, &spec)?;
            check_constraint_applicability(&name, &field_name, &spec)?;
            self.resolve_nested(&name, &field_name, spec.declared_type(), &mut nested)?;

            if let Some(predicate) = &spec.inline_predicate {
                let mut rule = Rule::from_predicate(predicate.clone()).bound_to(&field_name);
                if let Some(message) = &spec.inline_message {
                    rule = rule.message(message.clone());
                }
                bound_rules.push(rule);
            } else if spec.inline_message.is_some() {
                return Err(RecspecError::Configuration(format!(
                    "{name}.{field_name}: message declared without a rule"
                )));
            }

            let schema_json = fold_constraint_schema(&spec);
            let validator = match &schema_json {
                Some(schema_value) => {
                    let mut opts = jsonschema::options();
                    opts.with_draft(jsonschema::Draft::Draft202012);
                    Some(opts.build(schema_value).map_err(|e| {
                        RecspecError::Configuration(format!(
                            "{name}.{field_name}: cannot build constraint validator: {e}"
                        ))
                    })?)
                }
                None => None,
            };

            compiled_fields.push(CompiledField {
                name: field_name,
                spec,
                schema_json,
                validator,
            });
        }

        bound_rules.extend(body_rules);

        debug!(
            schema = %name,
            fields = compiled_fields.len(),
            rules = bound_rules.len(),
            "compiled schema"
        );

        Ok(CompiledSchema {
            name,
            fields: compiled_fields,
            index,
            rules: bound_rules,
            nested,
            post_validate,
        })
    }

    /// Resolve record references in a declared type, recursing through
    /// sequence element types.
    fn resolve_nested(
        &self,
        schema_name: &str,
        field_name: &str,
        declared: &FieldType,
        nested: &mut HashMap<String, Arc<CompiledSchema>>,
    ) -> Result<(), RecspecError> {
        match declared {
            FieldType::Record(type_name) => {
                if nested.contains_key(type_name) {
                    return Ok(());
                }
                let schema = self.get(type_name).ok_or_else(|| {
                    RecspecError::Configuration(format!(
                        "{schema_name}.{field_name}: nested record type '{type_name}' \
                         is not registered"
                    ))
                })?;
                nested.insert(type_name.clone(), schema);
                Ok(())
            }
            FieldType::Seq(inner) => self.resolve_nested(schema_name, field_name, inner, nested),
            _ => Ok(()),
        }
    }
}

fn check_default_mechanism(
    schema_name: &str,
    field_name: &str,
    spec: &FieldSpec,
) -> Result<(), RecspecError> {
    if spec.default.is_some() && spec.default_factory.is_some() {
        return Err(RecspecError::Configuration(format!(
            "{schema_name}.{field_name}: default and default_factory are mutually exclusive"
        )));
    }
    if let Some(default) = &spec.default {
        if !value_conforms(spec.declared_type(), default) {
            return Err(RecspecError::Configuration(format!(
                "{schema_name}.{field_name}: default of kind {} does not match declared type {}",
                default.kind(),
                spec.declared_type().name()
            )));
        }
    }
    Ok(())
}

fn check_constraint_applicability(
    schema_name: &str,
    field_name: &str,
    spec: &FieldSpec,
) -> Result<(), RecspecError> {
    let c = spec.constraints();
    let t = spec.declared_type();

    let has_numeric_bound =
        c.gt.is_some() || c.ge.is_some() || c.lt.is_some() || c.le.is_some() || c.multiple_of.is_some();
    if has_numeric_bound && !t.is_numeric() {
        return Err(RecspecError::Configuration(format!(
            "{schema_name}.{field_name}: numeric bounds do not apply to type {}",
            t.name()
        )));
    }

    if (c.min_length.is_some() || c.max_length.is_some()) && !t.is_sized() {
        return Err(RecspecError::Configuration(format!(
            "{schema_name}.{field_name}: length constraints do not apply to type {}",
            t.name()
        )));
    }

    if c.pattern.is_some() && *t != FieldType::Str {
        return Err(RecspecError::Configuration(format!(
            "{schema_name}.{field_name}: pattern does not apply to type {}",
            t.name()
        )));
    }

    if c.tz.is_some() && *t != FieldType::Timestamp {
        return Err(RecspecError::Configuration(format!(
            "{schema_name}.{field_name}: tz does not apply to type {}",
            t.name()
        )));
    }

    Ok(())
}
