//! Client for the GeoServer REST configuration API.
//!
//! Every configuration entity is a [`BoundResource`]: a lazily fetched XML
//! document plus a set of pending local edits, described by a static
//! [`ResourceDescriptor`] that names its fields, their value shapes and its
//! address rules. Saves send only what changed. The [`Catalog`] facade adds
//! listing, lookup, creation, uploads and server level operations on top,
//! with a short lived response cache that every write clears.

pub mod cache;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod convert;
pub mod descriptor;
pub mod entities;
pub mod locator;
pub mod metadata;
pub mod resource;
pub mod retry;
pub mod state;
pub mod transport;
pub mod url;

pub use cache::ResponseCache;
pub use catalog::{Catalog, ListFilter, WorkspaceFilter, FALLBACK_VERSION};
pub use composite::{Attribution, GmlEntry, Watermark};
pub use config::{Auth, CatalogConfig};
pub use convert::{FieldValue, Shape};
pub use descriptor::{FieldDefault, FieldSpec, ResourceDescriptor, WritePolicy};
pub use entities::*;
pub use locator::{Creation, Locator, Scope};
pub use metadata::{DimensionInfo, DynamicDefaultValues, JdbcVirtualTable, MetadataValue, Presentation};
pub use resource::{BoundResource, ResourceStatus};
pub use retry::RetryPolicy;
pub use state::ResourceState;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

pub use gs_common::{BoundingBox, GsError, GsResult, Identity, ResourceKey};
pub use reqwest::{Method, Url};
