//! # recspec-core — Foundational Types for recspec
//!
//! This crate is the leaf of the recspec workspace. It defines the runtime
//! value model shared by the schema engine and the codec layer, the error
//! taxonomy, secret wrappers, and the UTC-only timestamp type. Every other
//! crate in the workspace depends on `recspec-core`; it depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **One `Value` enum.** Every runtime field value flows through the
//!    [`Value`] model — scalars, sequences, maps, and the extended kinds the
//!    wire format cannot represent natively (paths, timestamps, decimals,
//!    patterns, secrets, nested records).
//!
//! 2. **Exact numerics for amounts.** Fixed-point values use
//!    `rust_decimal::Decimal`, never bare `f64`.
//!
//! 3. **Records are sealed.** A [`Record`] can only be populated through the
//!    validation pipeline; there is no public constructor that bypasses it.
//!
//! 4. **Errors enrich, never swallow.** [`RecspecError`] variants carry dot
//!    paths and rule messages; wrapping adds context and re-raises.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `recspec-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod secret;
pub mod temporal;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::{RecspecError, RuleViolation};
pub use secret::{SecretBytes, SecretString};
pub use temporal::Timestamp;
pub use value::{Pattern, Record, Value};
