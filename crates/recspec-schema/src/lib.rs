//! # recspec-schema — Schema Compilation & Validation Engine
//!
//! Declare a record type once — field names, element types, constraints,
//! cross-field invariants — and construct instances through a pipeline that
//! coerces, validates, and enforces every declared rule before a usable
//! value escapes.
//!
//! ## Components
//!
//! - [`expr`] — inert symbolic expressions: [`this()`](expr::this) produces
//!   a subject placeholder whose attribute accesses accumulate a field path
//!   and whose operators build expression trees instead of computing results.
//! - [`rule`] — the rule engine: bound and unbound invariants evaluated in
//!   declaration order, first failure wins.
//! - [`field`] — field specifications: declared type, default mechanism,
//!   constraints, inline rule, coercion flag.
//! - [`compile`] — the schema compiler: an explicit [`SchemaBuilder`]
//!   accumulator consumed once per record type, cached by name in a
//!   [`SchemaRegistry`]. Constraints are folded into JSON Schema values and
//!   compiled into `jsonschema` validators at this point, never later.
//! - [`validate`] — the construction pipeline: defaults, field-scoped
//!   coercion, structural validation with `$.`-rooted dot paths, the rule
//!   pass, and the optional post-validation hook.
//! - [`types`] — predefined constrained aliases (positive integers, unit
//!   intervals, email/hex/non-empty strings).
//!
//! ## Concurrency
//!
//! Compilation happens once per record type; the resulting
//! [`CompiledSchema`] is immutable and shared via `Arc`, safe for
//! unsynchronized concurrent reads. Construction owns its working values.
//!
//! ## Crate Policy
//!
//! - Depends only on `recspec-core` internally.
//! - Structural constraint checking is delegated to the `jsonschema` crate;
//!   this crate folds constraints, it does not re-implement them.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod compile;
pub mod expr;
pub mod field;
pub mod rule;
pub mod types;
pub mod validate;

pub use compile::{CompiledField, CompiledSchema, SchemaBuilder, SchemaRegistry};
pub use expr::{lit, this, BinOp, Expr, FieldRef, IntoExpr};
pub use field::{Constraints, FieldSpec, FieldType};
pub use recspec_core::{Record, RecspecError, RuleViolation, Value};
pub use rule::{Predicate, Rule};
