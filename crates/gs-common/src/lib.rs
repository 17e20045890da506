//! Common types shared across the GeoServer configuration client crates.

pub mod bbox;
pub mod error;
pub mod identity;

pub use bbox::BoundingBox;
pub use error::{GsError, GsResult};
pub use identity::{parse_names, Identity, ResourceKey};
