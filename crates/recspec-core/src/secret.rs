//! # Secret Wrappers — Opaque Values That Never Leak
//!
//! [`SecretString`] and [`SecretBytes`] wrap sensitive content so that the
//! default rendering paths — `Debug`, `Display`, and wire encoding — emit a
//! fixed obscured placeholder instead of the underlying content. A dedicated
//! accessor, [`SecretString::expose`], returns the original.
//!
//! ## Security Invariant
//!
//! No trait implementation on these types may reveal the inner value.
//! Serialization via serde writes the placeholder; only an explicit call to
//! `expose()` recovers the content.

use serde::{Serialize, Serializer};

/// The fixed placeholder emitted wherever a secret would otherwise appear.
pub const OBSCURED: &str = "******";

/// A secret text value.
///
/// Equality compares the underlying content (two secrets wrapping the same
/// text are equal), but no rendering path reveals it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap raw text without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the underlying content.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Return the fixed obscured placeholder.
    pub fn obscured(&self) -> &'static str {
        OBSCURED
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretString({OBSCURED:?})")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(OBSCURED)
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(OBSCURED)
    }
}

/// A secret byte-string value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Wrap raw bytes without validation.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }

    /// Return the underlying content.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Return the fixed obscured placeholder.
    pub fn obscured(&self) -> &'static [u8] {
        OBSCURED.as_bytes()
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes({OBSCURED:?})")
    }
}

impl std::fmt::Display for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(OBSCURED)
    }
}

impl Serialize for SecretBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(OBSCURED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose_returns_content() {
        let s = SecretString::new("hunter2");
        assert_eq!(s.expose(), "hunter2");
    }

    #[test]
    fn test_display_is_obscured() {
        let s = SecretString::new("hunter2");
        assert_eq!(format!("{s}"), "******");
    }

    #[test]
    fn test_debug_is_obscured() {
        let s = SecretString::new("hunter2");
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("******"));
    }

    #[test]
    fn test_serde_writes_placeholder() {
        let s = SecretString::new("hunter2");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"******\"");
    }

    #[test]
    fn test_equality_on_content() {
        assert_eq!(SecretString::new("a"), SecretString::new("a"));
        assert_ne!(SecretString::new("a"), SecretString::new("b"));
    }

    #[test]
    fn test_bytes_expose_and_obscure() {
        let b = SecretBytes::new(b"key-material".to_vec());
        assert_eq!(b.expose(), b"key-material");
        assert_eq!(b.obscured(), b"******");
        assert!(!format!("{b:?}").contains("key-material"));
    }
}
