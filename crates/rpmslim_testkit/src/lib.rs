//! # rpmslim Testkit
//!
//! Test utilities for rpmslim.
//!
//! This crate provides:
//! - `FakePulp`, an in-memory Pulp service implementing `PulpApi`
//! - Fixtures for declared-mirror files and seeded mirror pipelines
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rpmslim_testkit::prelude::*;
//!
//! let pulp = FakePulp::new();
//! pulp.seed_mirror("pulp-base-os", "https://example/os", &["bash".into(), "glibc".into()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fake;
pub mod fixtures;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fake::*;
    pub use crate::fixtures::*;
}

pub use fake::*;
pub use fixtures::*;
