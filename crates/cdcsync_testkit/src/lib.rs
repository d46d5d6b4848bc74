//! # cdcsync Testkit
//!
//! Test utilities for cdcsync.
//!
//! This crate provides:
//! - Fixtures: a read-counting entity source, recording listeners, a
//!   store that can be taken down, temporary file stores
//! - Property-based generators for values and entity sets
//! - Harnesses wiring the constants module to a manual clock
//!
//! ## Usage
//!
//! ```rust
//! use cdcsync_testkit::prelude::*;
//!
//! let harness = ConstantsHarness::new(&["WP_DEBUG"]);
//! harness.set("WP_DEBUG", true);
//! harness.detect();
//! assert_eq!(harness.take_changes().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
