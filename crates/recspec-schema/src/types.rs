//! Predefined constrained field aliases.
//!
//! Each alias is an ordinary [`FieldSpec`] with constraints pre-applied, so
//! further chaining works the same as on a hand-built spec:
//!
//! ```
//! use recspec_schema::types;
//!
//! let score = types::closed_unit_float().description("model confidence");
//! ```

use crate::field::{FieldSpec, FieldType};

/// Integer strictly greater than zero.
pub fn positive_int() -> FieldSpec {
    FieldSpec::new(FieldType::Int).gt(0.0)
}

/// Integer greater than or equal to zero.
pub fn non_negative_int() -> FieldSpec {
    FieldSpec::new(FieldType::Int).ge(0.0)
}

/// Integer strictly less than zero.
pub fn negative_int() -> FieldSpec {
    FieldSpec::new(FieldType::Int).lt(0.0)
}

/// Integer less than or equal to zero.
pub fn non_positive_int() -> FieldSpec {
    FieldSpec::new(FieldType::Int).le(0.0)
}

/// Float strictly greater than zero.
pub fn positive_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).gt(0.0)
}

/// Float greater than or equal to zero.
pub fn non_negative_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).ge(0.0)
}

/// Float strictly less than zero.
pub fn negative_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).lt(0.0)
}

/// Float less than or equal to zero.
pub fn non_positive_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).le(0.0)
}

/// Float in the closed interval `[0, 1]`.
pub fn closed_unit_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).ge(0.0).le(1.0)
}

/// Float in the open interval `(0, 1)`.
pub fn open_unit_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).gt(0.0).lt(1.0)
}

/// Float in the left-open interval `(0, 1]`.
pub fn left_open_unit_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).gt(0.0).le(1.0)
}

/// Float in the right-open interval `[0, 1)`.
pub fn right_open_unit_float() -> FieldSpec {
    FieldSpec::new(FieldType::Float).ge(0.0).lt(1.0)
}

/// Text containing at least one non-space character.
pub fn non_empty_str() -> FieldSpec {
    FieldSpec::new(FieldType::Str).pattern("^.*[^ ].*$")
}

/// Text shaped like an email address. Deliberately loose: one `@` with
/// non-empty local part and a dotted domain.
pub fn email_str() -> FieldSpec {
    FieldSpec::new(FieldType::Str).pattern("^[^@ ]+@[^@ ]+\\.[^@ ]+$")
}

/// Text consisting solely of hexadecimal digits.
pub fn hex_str() -> FieldSpec {
    FieldSpec::new(FieldType::Str).pattern("^[0-9A-Fa-f]+$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    #[test]
    fn test_integer_aliases_set_expected_bounds() {
        assert_eq!(positive_int().constraints().gt, Some(0.0));
        assert_eq!(non_negative_int().constraints().ge, Some(0.0));
        assert_eq!(negative_int().constraints().lt, Some(0.0));
        assert_eq!(non_positive_int().constraints().le, Some(0.0));
        assert_eq!(*positive_int().declared_type(), FieldType::Int);
    }

    #[test]
    fn test_unit_interval_aliases() {
        let closed = closed_unit_float();
        assert_eq!(closed.constraints().ge, Some(0.0));
        assert_eq!(closed.constraints().le, Some(1.0));

        let open = open_unit_float();
        assert_eq!(open.constraints().gt, Some(0.0));
        assert_eq!(open.constraints().lt, Some(1.0));

        let left = left_open_unit_float();
        assert_eq!(left.constraints().gt, Some(0.0));
        assert_eq!(left.constraints().le, Some(1.0));

        let right = right_open_unit_float();
        assert_eq!(right.constraints().ge, Some(0.0));
        assert_eq!(right.constraints().lt, Some(1.0));
    }

    #[test]
    fn test_string_aliases_carry_patterns() {
        assert_eq!(
            non_empty_str().constraints().pattern.as_deref(),
            Some("^.*[^ ].*$")
        );
        assert_eq!(
            email_str().constraints().pattern.as_deref(),
            Some("^[^@ ]+@[^@ ]+\\.[^@ ]+$")
        );
        assert_eq!(
            hex_str().constraints().pattern.as_deref(),
            Some("^[0-9A-Fa-f]+$")
        );
    }

    #[test]
    fn test_aliases_chain_like_plain_specs() {
        let spec = non_empty_str().max_length(64).description("display name");
        assert_eq!(spec.constraints().max_length, Some(64));
        assert!(spec.constraints().pattern.is_some());
    }
}
