//! # recspec-codec — Wire Representations for Validated Records
//!
//! Turns validated records into external representations and back: a JSON
//! object map, JSON text, and (behind the `yaml` feature, on by default)
//! YAML text.
//!
//! ## Components
//!
//! - [`registry`] — the [`CodecRegistry`](registry::CodecRegistry): built-in
//!   encoders and decoders for every runtime value kind, with custom codecs
//!   layered in front in registration order.
//! - [`convert`] — the conversion facade: [`to_map`](convert::to_map) /
//!   [`from_map`](convert::from_map) and the JSON/YAML text forms. Inbound
//!   conversion constructs instances through the schema pipeline, so a
//!   decoded record is as validated as a hand-built one and nested failures
//!   carry full dot paths (`$.owner.age`).
//!
//! ## Wire Conventions
//!
//! Secrets encode as a fixed `"******"` placeholder and never round-trip.
//! Bytes encode as lowercase hex. Timestamps encode as RFC 3339.
//! Zero-scale decimals encode as integers, fractional ones as floats.
//!
//! ## Crate Policy
//!
//! - Foreign serde errors are translated into `RecspecError` at the
//!   boundary, never leaked.
//! - With the `yaml` feature disabled, the YAML entry points return
//!   `ExtensionUnavailable` instead of disappearing from the API.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod convert;
pub mod registry;

pub use convert::{from_json, from_map, from_yaml, to_json, to_map, to_yaml};
pub use recspec_core::{Record, RecspecError, Value};
pub use registry::{CodecRegistry, DecodeFn, EncodeFn};
