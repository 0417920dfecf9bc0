//! # msrun - msbuild/mstest orchestrator
//!
//! msrun launches `msbuild` or `mstest` for the project that owns a source
//! file, streams the tool's output into a raw log, and turns compiler
//! diagnostics into structured [`model::QuickFix`] records an editor can
//! jump to.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build the project owning a file
//! msrun build src/App/Program.cs
//!
//! # Run the test under the cursor (zero-based line/column)
//! msrun test tests/CartTests.cs --mode current-test --line 12 --column 8
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Line classification, process supervision, build/test facade
//! - [`project`] - Project and symbol lookup collaborators
//! - [`config`] - Settings (`msrun.toml`)
//! - [`model`] - Requests and results

/// Output classification, process supervision and the build/test facade.
pub mod build;

/// Settings parsing (`msrun.toml`).
pub mod config;

/// Errors that abort a request.
pub mod error;

/// Request and response types.
pub mod model;

/// Project ownership and symbol resolution.
pub mod project;

/// Terminal output.
pub mod ui;
