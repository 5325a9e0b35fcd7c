//! Object storage for published layers and deployments.
//!
//! This module provides the storage backends (local directory, S3) and the
//! repository that maps tile concepts onto object keys.

mod local;
mod object;
mod repository;
mod s3;

pub use local::LocalObjectStore;
#[cfg(test)]
pub use object::MockObjectStore;
pub use object::{ObjectStore, JSON_CONTENT_TYPE, MBTILES_CONTENT_TYPE};
pub use repository::{FetchReport, LayerSource, TileRepository};
pub use s3::S3ObjectStore;
