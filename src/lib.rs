// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # vtiles deploy
//!
//! Publishing and deployment tooling for versioned vector-tile layers.
//!
//! ## Overview
//!
//! Each tile layer is published to a bucket as an immutable, numbered
//! artifact. A deployment is a named manifest choosing one version of each
//! layer to serve. This crate lets you:
//!
//! - Publish layers under their next version number
//! - Compose deployments from the latest layers, from a previous deployment
//!   with edits, or from an explicit list
//! - Fetch a deployment's artifacts into the layout a tile server reads
//! - Launch a `CloudFormation` stack serving a deployment
//!
//! ## Bucket layout
//!
//! ```text
//! config/<layer>-v<version>.json
//! mbtiles/<layer>-v<version>.mbtiles
//! deployments/<name>.json        {"data": {"<layer>": <version>, ...}}
//! server-<version>.tar.gz
//! ```
//!
//! ## Modules
//!
//! - [`resolver`]: Catalog, manifests and deployment resolution (no I/O)
//! - [`store`]: Object store backends (local, S3) and the tile repository
//! - [`launch`]: Server bundles, template rendering and stack creation
//! - [`config`]: Configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```
//! use vtiles_deploy::resolver::{
//!     Artifact, ArtifactCatalog, DeploymentManifest, DeploymentResolver, ResolutionMode,
//! };
//!
//! let catalog: ArtifactCatalog = [
//!     Artifact::new("roads", 1),
//!     Artifact::new("roads", 2),
//!     Artifact::new("rivers", 1),
//! ]
//! .into_iter()
//! .collect();
//!
//! let previous: DeploymentManifest = [(String::from("roads"), 1)].into_iter().collect();
//! let mode = ResolutionMode::from_previous("vector-tiles-2017-05-01", "", "rivers:1").unwrap();
//!
//! let resolution = DeploymentResolver::new()
//!     .resolve(&catalog, &mode, Some(&previous))
//!     .unwrap();
//!
//! assert_eq!(resolution.manifest.get("roads"), Some(1));
//! assert_eq!(resolution.manifest.get("rivers"), Some(1));
//! assert_eq!(resolution.changes.len(), 2);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod launch;
pub mod resolver;
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeployConfig};
pub use error::{Result, VtilesError};
pub use launch::{ServerVersion, StackLauncher, StackRequest};
pub use resolver::{
    ArtifactCatalog, ConsistencyWarning, DeploymentManifest, DeploymentResolver, LayerChange,
    Resolution, ResolutionMode,
};
pub use store::{LocalObjectStore, ObjectStore, S3ObjectStore, TileRepository};
