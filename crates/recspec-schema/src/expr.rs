//! # Symbolic Expressions — Inert Invariant Trees
//!
//! A rule author writes a natural-looking comparison between fields and
//! receives an expression tree, not a boolean:
//!
//! ```
//! use recspec_schema::expr::this;
//!
//! let invariant = this().attr("trust").gt(this().attr("threshold"));
//! ```
//!
//! Building an expression never evaluates it. Evaluation is deferred until
//! [`Expr::eval`] is given a concrete subject value; malformed field paths
//! fail there, not at build time.
//!
//! Arithmetic composes through `std::ops` (`+`, `-`, `*`, `/`, `%`).
//! Comparisons use named constructors (`gt`, `ge`, `lt`, `le`, `eq`, `ne`,
//! `is_in`) because Rust comparison operators must return `bool`; the
//! operator-capture trick is scoped to this dedicated expression type and
//! never touches record types themselves.

use recspec_core::{RecspecError, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Binary operator in an expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// containment test
    In,
}

impl BinOp {
    /// The operator's surface syntax, used in generated messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::In => "in",
        }
    }
}

/// An inert expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// A field reference: ordered path of field names resolved against the
    /// subject at evaluation time. The empty path is the subject itself.
    Field(Vec<String>),
    /// A binary operation over two sub-expressions.
    Binary {
        /// The operator.
        op: BinOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
}

/// The subject placeholder: attribute accesses accumulate a field path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    path: Vec<String>,
}

/// Returns the subject placeholder.
pub fn this() -> FieldRef {
    FieldRef { path: Vec::new() }
}

/// Wrap a value as a literal expression.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl FieldRef {
    /// Extend the field path by one attribute.
    pub fn attr(mut self, name: impl Into<String>) -> FieldRef {
        self.path.push(name.into());
        self
    }
}

impl From<FieldRef> for Expr {
    fn from(r: FieldRef) -> Self {
        Expr::Field(r.path)
    }
}

/// Conversion into an expression operand.
///
/// Implemented for expressions, field references, and literal-compatible
/// values, so operands on either side of an operator read naturally.
pub trait IntoExpr {
    /// Convert into an expression node.
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for FieldRef {
    fn into_expr(self) -> Expr {
        Expr::Field(self.path)
    }
}

macro_rules! literal_operands {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoExpr for $ty {
                fn into_expr(self) -> Expr {
                    Expr::Literal(self.into())
                }
            }
        )*
    };
}

literal_operands!(bool, i32, i64, f64, &str, String, Value);

fn binary(op: BinOp, left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left.into_expr()),
        right: Box::new(right.into_expr()),
    }
}

macro_rules! comparison_constructors {
    ($ty:ty) => {
        impl $ty {
            /// `self < rhs`
            pub fn lt(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::Lt, self, rhs)
            }

            /// `self <= rhs`
            pub fn le(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::Le, self, rhs)
            }

            /// `self > rhs`
            pub fn gt(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::Gt, self, rhs)
            }

            /// `self >= rhs`
            pub fn ge(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::Ge, self, rhs)
            }

            /// `self == rhs`
            pub fn eq(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::Eq, self, rhs)
            }

            /// `self != rhs`
            pub fn ne(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::Ne, self, rhs)
            }

            /// `self in rhs` — containment in a sequence, string, or map keys.
            pub fn is_in(self, rhs: impl IntoExpr) -> Expr {
                binary(BinOp::In, self, rhs)
            }
        }
    };
}

comparison_constructors!(Expr);
comparison_constructors!(FieldRef);

macro_rules! arithmetic_ops {
    ($ty:ty) => {
        impl<R: IntoExpr> std::ops::Add<R> for $ty {
            type Output = Expr;
            fn add(self, rhs: R) -> Expr {
                binary(BinOp::Add, self, rhs)
            }
        }

        impl<R: IntoExpr> std::ops::Sub<R> for $ty {
            type Output = Expr;
            fn sub(self, rhs: R) -> Expr {
                binary(BinOp::Sub, self, rhs)
            }
        }

        impl<R: IntoExpr> std::ops::Mul<R> for $ty {
            type Output = Expr;
            fn mul(self, rhs: R) -> Expr {
                binary(BinOp::Mul, self, rhs)
            }
        }

        impl<R: IntoExpr> std::ops::Div<R> for $ty {
            type Output = Expr;
            fn div(self, rhs: R) -> Expr {
                binary(BinOp::Div, self, rhs)
            }
        }

        impl<R: IntoExpr> std::ops::Rem<R> for $ty {
            type Output = Expr;
            fn rem(self, rhs: R) -> Expr {
                binary(BinOp::Rem, self, rhs)
            }
        }
    };
}

arithmetic_ops!(Expr);
arithmetic_ops!(FieldRef);

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Field(path) => {
                f.write_str("this")?;
                for seg in path {
                    write!(f, ".{seg}")?;
                }
                Ok(())
            }
            Expr::Binary { op, left, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
        }
    }
}

impl Expr {
    /// Evaluate the expression against a concrete subject value.
    ///
    /// Field paths resolve by successive lookup; a missing segment is an
    /// error. Binary operators apply native semantics: numeric comparison
    /// and arithmetic, string equality, containment tests. Division by zero
    /// and operand type mismatches are runtime errors, never silent
    /// coercions.
    pub fn eval(&self, subject: &Value) -> Result<Value, RecspecError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Field(path) => {
                let mut current = subject;
                for segment in path {
                    current = current.lookup(segment)?;
                }
                Ok(current.clone())
            }
            Expr::Binary { op, left, right } => {
                let l = left.eval(subject)?;
                let r = right.eval(subject)?;
                apply(*op, &l, &r)
            }
        }
    }
}

/// Apply a binary operator to two evaluated operands.
fn apply(op: BinOp, l: &Value, r: &Value) -> Result<Value, RecspecError> {
    match op {
        BinOp::Lt => compare(op, l, r).map(|o| Value::Bool(o == std::cmp::Ordering::Less)),
        BinOp::Le => compare(op, l, r).map(|o| Value::Bool(o != std::cmp::Ordering::Greater)),
        BinOp::Gt => compare(op, l, r).map(|o| Value::Bool(o == std::cmp::Ordering::Greater)),
        BinOp::Ge => compare(op, l, r).map(|o| Value::Bool(o != std::cmp::Ordering::Less)),
        BinOp::Eq => Ok(Value::Bool(values_equal(l, r))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(l, r))),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => arithmetic(op, l, r),
        BinOp::In => contains(l, r).map(Value::Bool),
    }
}

/// Order two operands, erroring on incomparable kinds.
fn compare(op: BinOp, l: &Value, r: &Value) -> Result<std::cmp::Ordering, RecspecError> {
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Int(b)) => Some(a.cmp(&Decimal::from(*b))),
        (Value::Int(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => match (l.as_float(), r.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        RecspecError::Eval(format!(
            "cannot compare {} {} {}",
            l.kind(),
            op.symbol(),
            r.kind()
        ))
    })
}

/// Equality with numeric widening: `Int(2) == Float(2.0)` holds, and
/// decimals compare numerically against ints and floats, matching the
/// widening `compare` applies for the ordering operators.
fn values_equal(l: &Value, r: &Value) -> bool {
    if l == r {
        return true;
    }
    match (l, r) {
        (Value::Decimal(a), Value::Int(b)) | (Value::Int(b), Value::Decimal(a)) => {
            *a == Decimal::from(*b)
        }
        (Value::Decimal(a), Value::Float(b)) | (Value::Float(b), Value::Decimal(a)) => {
            a.to_f64() == Some(*b)
        }
        _ => match (l.as_float(), r.as_float()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Numeric arithmetic with explicit zero-division and overflow errors.
fn arithmetic(op: BinOp, l: &Value, r: &Value) -> Result<Value, RecspecError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(*b),
                BinOp::Sub => a.checked_sub(*b),
                BinOp::Mul => a.checked_mul(*b),
                BinOp::Div => {
                    if *b == 0 {
                        return Err(RecspecError::Eval("division by zero".into()));
                    }
                    a.checked_div(*b)
                }
                BinOp::Rem => {
                    if *b == 0 {
                        return Err(RecspecError::Eval("division by zero".into()));
                    }
                    a.checked_rem(*b)
                }
                _ => None,
            };
            result.map(Value::Int).ok_or_else(|| {
                RecspecError::Eval(format!("integer overflow in {a} {} {b}", op.symbol()))
            })
        }
        (Value::Decimal(a), Value::Decimal(b)) => decimal_arithmetic(op, *a, *b),
        (Value::Decimal(a), Value::Int(b)) => decimal_arithmetic(op, *a, Decimal::from(*b)),
        (Value::Int(a), Value::Decimal(b)) => decimal_arithmetic(op, Decimal::from(*a), *b),
        _ => match (l.as_float(), r.as_float()) {
            (Some(a), Some(b)) => {
                if matches!(op, BinOp::Div | BinOp::Rem) && b == 0.0 {
                    return Err(RecspecError::Eval("division by zero".into()));
                }
                let result = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    other => {
                        return Err(RecspecError::Eval(format!(
                            "{} is not an arithmetic operator",
                            other.symbol()
                        )))
                    }
                };
                Ok(Value::Float(result))
            }
            _ => Err(RecspecError::Eval(format!(
                "cannot apply {} to {} and {}",
                op.symbol(),
                l.kind(),
                r.kind()
            ))),
        },
    }
}

fn decimal_arithmetic(op: BinOp, a: Decimal, b: Decimal) -> Result<Value, RecspecError> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b.is_zero() {
                return Err(RecspecError::Eval("division by zero".into()));
            }
            a.checked_div(b)
        }
        BinOp::Rem => {
            if b.is_zero() {
                return Err(RecspecError::Eval("division by zero".into()));
            }
            a.checked_rem(b)
        }
        _ => None,
    };
    result.map(Value::Decimal).ok_or_else(|| {
        RecspecError::Eval(format!("decimal overflow in {a} {} {b}", op.symbol()))
    })
}

/// Containment: `needle in haystack` over sequences, strings, and map keys.
fn contains(needle: &Value, haystack: &Value) -> Result<bool, RecspecError> {
    match haystack {
        Value::Seq(items) => Ok(items.iter().any(|item| values_equal(item, needle))),
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(s.contains(sub.as_str())),
            other => Err(RecspecError::Eval(format!(
                "cannot test {} containment in str",
                other.kind()
            ))),
        },
        Value::Map(m) => match needle {
            Value::Str(key) => Ok(m.contains_key(key)),
            other => Err(RecspecError::Eval(format!(
                "cannot test {} containment in map",
                other.kind()
            ))),
        },
        other => Err(RecspecError::Eval(format!(
            "`in` requires a seq, str, or map on the right, got {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recspec_core::Record;

    fn subject() -> Value {
        Value::Record(Record::from_validated_parts(
            "Experiment".into(),
            vec![
                ("trust".into(), Value::Float(0.9)),
                ("threshold".into(), Value::Float(0.4)),
                ("attempts".into(), Value::Int(5)),
                (
                    "owner".into(),
                    Value::Record(Record::from_validated_parts(
                        "User".into(),
                        vec![("age".into(), Value::Int(20))],
                    )),
                ),
            ],
        ))
    }

    #[test]
    fn test_building_does_not_evaluate() {
        // No subject involved; the tree is purely structural.
        let e = this().attr("trust").gt(this().attr("threshold"));
        assert!(matches!(e, Expr::Binary { op: BinOp::Gt, .. }));
    }

    #[test]
    fn test_field_path_resolution() {
        let e: Expr = this().attr("owner").attr("age").into();
        assert_eq!(e.eval(&subject()).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_missing_segment_fails_at_eval() {
        let e: Expr = this().attr("owner").attr("salary").into();
        assert!(e.eval(&subject()).is_err());
    }

    #[test]
    fn test_comparison_float_fields() {
        let e = this().attr("trust").gt(this().attr("threshold"));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));

        let e = this().attr("trust").lt(this().attr("threshold"));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_comparison_int_and_float_mix() {
        let e = this().attr("attempts").ge(lit(5.0));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_equality_with_numeric_widening() {
        let e = this().attr("attempts").eq(lit(5.0));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));
        let e = this().attr("attempts").ne(lit(6));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_equality_widens_decimal_like_ordering() {
        let balance: Decimal = "10".parse().unwrap();
        let subject = Value::Record(Record::from_validated_parts(
            "Account".into(),
            vec![("balance".into(), Value::Decimal(balance))],
        ));

        // `==` and `>=` must agree on numerically-equal operands.
        let eq = this().attr("balance").eq(lit(10));
        assert_eq!(eq.eval(&subject).unwrap(), Value::Bool(true));
        let ge = this().attr("balance").ge(lit(10));
        assert_eq!(ge.eval(&subject).unwrap(), Value::Bool(true));

        let eq_float = this().attr("balance").eq(lit(10.0));
        assert_eq!(eq_float.eval(&subject).unwrap(), Value::Bool(true));
        let ne = this().attr("balance").ne(lit(11));
        assert_eq!(ne.eval(&subject).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_arithmetic_composition() {
        // attempts * 2 - 4 == 6
        let e = (this().attr("attempts") * 2 - 4).eq(lit(6));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let e = this().attr("attempts") / 0;
        let err = e.eval(&subject()).unwrap_err();
        assert!(matches!(err, RecspecError::Eval(_)));
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_rem_by_zero_is_an_error() {
        let e = this().attr("attempts") % 0;
        assert!(e.eval(&subject()).is_err());
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        let e = lit(i64::MAX) + 1;
        let err = e.eval(&subject()).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_type_mismatched_operator_is_an_error() {
        let e = this().attr("owner") + 1;
        assert!(e.eval(&subject()).is_err());
    }

    #[test]
    fn test_containment_in_seq() {
        let e = lit(3).is_in(lit(vec![1i64, 2, 3]));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));
        let e = lit(9).is_in(lit(vec![1i64, 2, 3]));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_containment_in_str() {
        let e = lit("ell").is_in(lit("hello"));
        assert_eq!(e.eval(&subject()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_containment_on_scalar_is_an_error() {
        let e = lit(1).is_in(lit(2));
        assert!(e.eval(&subject()).is_err());
    }

    #[test]
    fn test_display_renders_literal_expression() {
        let e = this().attr("trust").gt(this().attr("threshold"));
        assert_eq!(e.to_string(), "this.trust > this.threshold");
    }

    #[test]
    fn test_display_renders_arithmetic() {
        let e = (this().attr("items") * this().attr("discount")).lt(this().attr("total"));
        assert_eq!(
            e.to_string(),
            "this.items * this.discount < this.total"
        );
    }

    #[test]
    fn test_decimal_comparison() {
        use rust_decimal::Decimal;
        let subject = Value::Record(Record::from_validated_parts(
            "Account".into(),
            vec![("balance".into(), Value::Decimal(Decimal::new(1050, 2)))],
        ));
        let e = this().attr("balance").gt(lit(10));
        assert_eq!(e.eval(&subject).unwrap(), Value::Bool(true));
    }
}
