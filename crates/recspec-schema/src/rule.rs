//! # Rule Engine — Invariant Evaluation
//!
//! A [`Rule`] pairs a predicate (a symbolic expression or an opaque
//! callable) with an optional field binding and an optional message. Rules
//! are created at schema-declaration time, immutable thereafter, and invoked
//! once per validation pass per instance.
//!
//! Evaluation contract:
//!
//! - A bound rule first projects the instance down to the named field's
//!   value; an unbound rule evaluates against the whole instance.
//! - A predicate result of null (no result) or `true` is success; `false`
//!   is failure; any other value is reported as a violation rather than
//!   treated as truthy.
//! - An error raised inside a predicate is caught and re-wrapped with the
//!   rule's message plus the original failure — unless it is already a
//!   validation failure, which is preserved as-is.
//! - On failure the violation carries the declared message or a generated
//!   message referencing the rule's literal expression.

use std::sync::Arc;

use recspec_core::{RecspecError, RuleViolation, Value};
use tracing::trace;

use crate::expr::Expr;

/// A rule's predicate: a symbolic expression or an opaque callable.
///
/// Callables return `Ok(())` on success and `Err(description)` on failure;
/// the description is used when the rule declares no message of its own.
#[derive(Clone)]
pub enum Predicate {
    /// An inert expression tree, evaluated against the subject.
    Expr(Expr),
    /// An opaque callable.
    Func(Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>),
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Expr(e) => write!(f, "Predicate::Expr({e})"),
            Predicate::Func(_) => f.write_str("Predicate::Func(..)"),
        }
    }
}

/// A single invariant: predicate, optional field binding, optional message.
#[derive(Debug, Clone)]
pub struct Rule {
    predicate: Predicate,
    bind: Option<String>,
    message: Option<String>,
}

impl Rule {
    /// A rule from a symbolic expression.
    pub fn expr(expr: impl Into<Expr>) -> Self {
        Self {
            predicate: Predicate::Expr(expr.into()),
            bind: None,
            message: None,
        }
    }

    /// A rule from an opaque callable.
    pub fn func(f: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static) -> Self {
        Self {
            predicate: Predicate::Func(Arc::new(f)),
            bind: None,
            message: None,
        }
    }

    /// A rule from an already-built predicate.
    pub fn from_predicate(predicate: Predicate) -> Self {
        Self {
            predicate,
            bind: None,
            message: None,
        }
    }

    /// Bind the rule to a named field: evaluation projects the instance to
    /// that field's value first.
    pub fn bound_to(mut self, field: impl Into<String>) -> Self {
        self.bind = Some(field.into());
        self
    }

    /// Attach a declared violation message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The field this rule is bound to, if any.
    pub fn bound_field(&self) -> Option<&str> {
        self.bind.as_deref()
    }

    /// Evaluate the rule against an instance.
    ///
    /// # Errors
    ///
    /// Returns [`RecspecError::Rule`] when the predicate fails or raises a
    /// non-validation error; validation errors raised inside the predicate
    /// propagate unchanged.
    pub fn check(&self, instance: &Value) -> Result<(), RecspecError> {
        let subject = match &self.bind {
            Some(field) => match instance.lookup(field) {
                Ok(v) => v,
                Err(err) => return Err(self.wrap_failure(err)),
            },
            None => instance,
        };

        trace!(rule = %self.describe(), "evaluating rule");

        match &self.predicate {
            Predicate::Expr(expr) => match expr.eval(subject) {
                Ok(Value::Null) | Ok(Value::Bool(true)) => Ok(()),
                Ok(Value::Bool(false)) => Err(RuleViolation::new(self.failure_message()).into()),
                Ok(other) => Err(RuleViolation::new(format!(
                    "{}: predicate returned non-boolean result of kind {}",
                    self.failure_message(),
                    other.kind()
                ))
                .into()),
                Err(err) => Err(self.wrap_failure(err)),
            },
            Predicate::Func(f) => match f(subject) {
                Ok(()) => Ok(()),
                Err(description) => Err(RuleViolation::new(
                    self.message.clone().unwrap_or(description),
                )
                .into()),
            },
        }
    }

    /// Re-wrap an error raised during evaluation with this rule's message,
    /// preserving validation failures as-is.
    fn wrap_failure(&self, err: RecspecError) -> RecspecError {
        if err.is_validation() {
            return err;
        }
        RuleViolation::wrapping(self.failure_message(), err).into()
    }

    /// The declared message, or a generated one naming the expression.
    fn failure_message(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match &self.predicate {
            Predicate::Expr(expr) => format!("rule failed: {expr}"),
            Predicate::Func(_) => "rule failed".to_string(),
        }
    }

    /// Short description for trace logging.
    fn describe(&self) -> String {
        match (&self.bind, &self.predicate) {
            (Some(field), Predicate::Expr(e)) => format!("{field}: {e}"),
            (Some(field), Predicate::Func(_)) => format!("{field}: <fn>"),
            (None, Predicate::Expr(e)) => e.to_string(),
            (None, Predicate::Func(_)) => "<fn>".to_string(),
        }
    }
}
