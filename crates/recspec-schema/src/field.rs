//! # Field Specifications
//!
//! A [`FieldSpec`] declares everything the compiler needs to know about one
//! field: its element type, its default mechanism (literal XOR factory XOR
//! required), its constraints, an optional inline rule, and whether
//! best-effort coercion is enabled.
//!
//! Constraint applicability is checked at schema-compilation time, not at
//! first use: numeric bounds on a string field, or a pattern on an integer
//! field, are configuration errors before any instance exists.

use std::sync::Arc;

use recspec_core::Value;

use crate::rule::Predicate;

/// The declared element type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// Floating-point number.
    Float,
    /// UTF-8 text.
    Str,
    /// Raw bytes.
    Bytes,
    /// Exact fixed-point decimal.
    Decimal,
    /// UTC timestamp.
    Timestamp,
    /// UUID identifier.
    Uuid,
    /// Filesystem path.
    Path,
    /// Compiled text pattern.
    Pattern,
    /// Opaque secret text.
    Secret,
    /// Opaque secret bytes.
    SecretBytes,
    /// Homogeneous sequence of the given element type.
    Seq(Box<FieldType>),
    /// A nested record type, referenced by name.
    Record(String),
}

impl FieldType {
    /// Human-readable type name for error messages.
    pub fn name(&self) -> String {
        match self {
            FieldType::Bool => "bool".into(),
            FieldType::Int => "int".into(),
            FieldType::Float => "float".into(),
            FieldType::Str => "str".into(),
            FieldType::Bytes => "bytes".into(),
            FieldType::Decimal => "decimal".into(),
            FieldType::Timestamp => "timestamp".into(),
            FieldType::Uuid => "uuid".into(),
            FieldType::Path => "path".into(),
            FieldType::Pattern => "pattern".into(),
            FieldType::Secret => "secret".into(),
            FieldType::SecretBytes => "secret-bytes".into(),
            FieldType::Seq(inner) => format!("seq<{}>", inner.name()),
            FieldType::Record(name) => format!("record {name}"),
        }
    }

    /// True for types that accept numeric bound constraints.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float | FieldType::Decimal)
    }

    /// True for types that accept length constraints.
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            FieldType::Str | FieldType::Bytes | FieldType::Seq(_)
        )
    }
}

/// Recognized constraint options, folded into the field's validated-type
/// descriptor at compile time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Exclusive lower bound.
    pub gt: Option<f64>,
    /// Inclusive lower bound.
    pub ge: Option<f64>,
    /// Exclusive upper bound.
    pub lt: Option<f64>,
    /// Inclusive upper bound.
    pub le: Option<f64>,
    /// Value must be a multiple of this.
    pub multiple_of: Option<f64>,
    /// Minimum length of text, bytes, or a sequence.
    pub min_length: Option<usize>,
    /// Maximum length of text, bytes, or a sequence.
    pub max_length: Option<usize>,
    /// Regex the text must match.
    pub pattern: Option<String>,
    /// Timezone-awareness requirement for temporal fields.
    pub tz: Option<bool>,
    /// Documentation only.
    pub description: Option<String>,
}

impl Constraints {
    /// True when no structurally-checked constraint is present
    /// (`tz` and `description` are not enforced by the structural codec).
    pub fn is_structurally_empty(&self) -> bool {
        self.gt.is_none()
            && self.ge.is_none()
            && self.lt.is_none()
            && self.le.is_none()
            && self.multiple_of.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
    }
}

/// Zero-argument producer invoked per construction when the field is absent.
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Specification of a single field, built with chained setters:
///
/// ```
/// use recspec_schema::field::{FieldSpec, FieldType};
///
/// let age = FieldSpec::new(FieldType::Int).ge(0.0).coerce(true);
/// let name = FieldSpec::new(FieldType::Str).min_length(1);
/// ```
#[derive(Clone)]
pub struct FieldSpec {
    pub(crate) declared: FieldType,
    pub(crate) default: Option<Value>,
    pub(crate) default_factory: Option<DefaultFactory>,
    pub(crate) constraints: Constraints,
    pub(crate) inline_predicate: Option<Predicate>,
    pub(crate) inline_message: Option<String>,
    pub(crate) coerce: bool,
    pub(crate) alias: Option<String>,
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("declared", &self.declared)
            .field("default", &self.default)
            .field("has_factory", &self.default_factory.is_some())
            .field("constraints", &self.constraints)
            .field("inline_rule", &self.inline_predicate.is_some())
            .field("coerce", &self.coerce)
            .finish()
    }
}

impl FieldSpec {
    /// A required field of the given type with no constraints.
    pub fn new(declared: FieldType) -> Self {
        Self {
            declared,
            default: None,
            default_factory: None,
            constraints: Constraints::default(),
            inline_predicate: None,
            inline_message: None,
            coerce: false,
            alias: None,
        }
    }

    /// The declared element type.
    pub fn declared_type(&self) -> &FieldType {
        &self.declared
    }

    /// The folded constraints.
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Whether best-effort coercion is enabled.
    pub fn is_coerced(&self) -> bool {
        self.coerce
    }

    /// Literal default, used when the field is absent at construction.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Default factory, invoked per construction when the field is absent.
    pub fn default_factory(
        mut self,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    /// Inline rule evaluated against this field's value.
    pub fn rule(mut self, f: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.inline_predicate = Some(Predicate::Func(Arc::new(f)));
        self
    }

    /// Inline rule from a symbolic expression; `this()` refers to the
    /// field's value.
    pub fn rule_expr(mut self, expr: impl Into<crate::expr::Expr>) -> Self {
        self.inline_predicate = Some(Predicate::Expr(expr.into()));
        self
    }

    /// Violation message for the inline rule.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inline_message = Some(message.into());
        self
    }

    /// Exclusive lower bound.
    pub fn gt(mut self, bound: f64) -> Self {
        self.constraints.gt = Some(bound);
        self
    }

    /// Inclusive lower bound.
    pub fn ge(mut self, bound: f64) -> Self {
        self.constraints.ge = Some(bound);
        self
    }

    /// Exclusive upper bound.
    pub fn lt(mut self, bound: f64) -> Self {
        self.constraints.lt = Some(bound);
        self
    }

    /// Inclusive upper bound.
    pub fn le(mut self, bound: f64) -> Self {
        self.constraints.le = Some(bound);
        self
    }

    /// Value must be a multiple of `n`.
    pub fn multiple_of(mut self, n: f64) -> Self {
        self.constraints.multiple_of = Some(n);
        self
    }

    /// Minimum length of text, bytes, or a sequence.
    pub fn min_length(mut self, n: usize) -> Self {
        self.constraints.min_length = Some(n);
        self
    }

    /// Maximum length of text, bytes, or a sequence.
    pub fn max_length(mut self, n: usize) -> Self {
        self.constraints.max_length = Some(n);
        self
    }

    /// Regex the text must match.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Timezone-awareness requirement for temporal fields.
    pub fn tz(mut self, required: bool) -> Self {
        self.constraints.tz = Some(required);
        self
    }

    /// Documentation only.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.constraints.description = Some(text.into());
        self
    }

    /// Enable best-effort type narrowing for this field.
    pub fn coerce(mut self, enabled: bool) -> Self {
        self.coerce = enabled;
        self
    }

    /// Alias name. Informational only; field lookup always uses the
    /// declared name.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_field_is_required_and_unconstrained() {
        let f = FieldSpec::new(FieldType::Int);
        assert!(f.default.is_none());
        assert!(f.default_factory.is_none());
        assert!(f.constraints.is_structurally_empty());
        assert!(!f.is_coerced());
    }

    #[test]
    fn test_builder_accumulates_constraints() {
        let f = FieldSpec::new(FieldType::Float).ge(0.0).le(1.0);
        assert_eq!(f.constraints.ge, Some(0.0));
        assert_eq!(f.constraints.le, Some(1.0));
        assert!(!f.constraints.is_structurally_empty());
    }

    #[test]
    fn test_tz_and_description_are_not_structural() {
        let f = FieldSpec::new(FieldType::Timestamp)
            .tz(true)
            .description("creation time");
        assert!(f.constraints.is_structurally_empty());
    }

    #[test]
    fn test_default_factory_produces_fresh_values() {
        use std::sync::atomic::{AtomicI64, Ordering};
        static COUNTER: AtomicI64 = AtomicI64::new(0);
        let f = FieldSpec::new(FieldType::Int)
            .default_factory(|| Value::Int(COUNTER.fetch_add(1, Ordering::SeqCst)));
        let factory = f.default_factory.as_ref().expect("factory set");
        assert_ne!(factory(), factory());
    }

    #[test]
    fn test_type_predicates() {
        assert!(FieldType::Int.is_numeric());
        assert!(FieldType::Decimal.is_numeric());
        assert!(!FieldType::Str.is_numeric());
        assert!(FieldType::Str.is_sized());
        assert!(FieldType::Seq(Box::new(FieldType::Int)).is_sized());
        assert!(!FieldType::Bool.is_sized());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(FieldType::Seq(Box::new(FieldType::Str)).name(), "seq<str>");
        assert_eq!(FieldType::Record("User".into()).name(), "record User");
    }
}
