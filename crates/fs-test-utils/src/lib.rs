//! Shared test utilities for the fs-utils workspace.
//!
//! A dev-dependency only; never published.
//!
//! # Modules
//!
//! - [`fixture`]: [`FixtureDir`] builder for temporary directory trees

pub mod fixture;

pub use fixture::FixtureDir;
