//! End-to-end tests for the self-replacement pipeline.
//!
//! These drive real processes: a shell script stands in for rcedit and, in
//! the binary tests, the built `exestamp` executable updates a copy of
//! itself. Unix only.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod binary_tests;
mod harness;
mod pipeline_tests;
