//! # cdcsync Codec
//!
//! Values, canonical encoding and checksums for the cdcsync engine.
//!
//! This crate provides:
//! - [`Value`], the closed sum type every monitored entity is read as
//! - Deterministic CBOR encoding, used to persist checksum records
//! - [`Checksum`], the change-detection fingerprint of a value
//!
//! ## Canonical CBOR Rules
//!
//! - Maps are sorted by key (length-first, then bytewise)
//! - Integers use shortest encoding
//! - Floats use the 8-byte form with `-0.0` and NaN normalized
//! - Strings must be UTF-8
//! - No indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use cdcsync_codec::{checksum, from_cbor, to_canonical_cbor, Value};
//!
//! let value = Value::map([("debug", Value::Bool(true))]);
//! let bytes = to_canonical_cbor(&value);
//! let decoded = from_cbor(&bytes).unwrap();
//!
//! assert_eq!(value, decoded);
//! assert_eq!(checksum(&value), checksum(&decoded));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod decoder;
mod encoder;
mod error;
mod value;

pub use checksum::{checksum, Checksum};
pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
