//! Redaction of sensitive data in structured log payloads.
//!
//! This crate provides the redactor every loghelpers output surface runs
//! its payload through before serialization.
//!
//! # Key Features
//!
//! - **Key-aware masking**: map entries whose key is in the sensitive set
//!   (matched case-insensitively) are replaced by a fixed token.
//! - **Value patterns**: regexes applied to every string, in order.
//! - **Shape preservation**: sequences and tuples keep length and order.
//! - **Custom representations**: types implementing [`Redact`] decide how they
//!   appear; [`Sensitive`] always appears as the token.
//!
//! # Example
//!
//! ```
//! use lh_redact::Redactor;
//! use serde_json::json;
//!
//! let redactor = Redactor::with_keys(["password"]);
//! let out = redactor.redact(&json!({"username": "user1", "password": "secret"}));
//! assert_eq!(out, json!({"username": "user1", "password": "<redacted>"}));
//! ```

pub mod error;
pub mod patterns;
pub mod redact;
pub mod redactor;

pub use error::{RedactionError, Result};
pub use patterns::{builtin_pattern_strings, BuiltinPattern, BUILTIN_PATTERNS};
pub use redact::{Redact, Sensitive};
pub use redactor::{Redactor, DEFAULT_REDACTION_TOKEN, DEFAULT_SENSITIVE_KEYS};
