//! Test support for gsconfig-rs.
//!
//! [`FakeGeoServer`] is an in-memory REST catalog that plugs into a
//! [`gs_catalog::Catalog`] as its transport. It serves stored documents,
//! computes listings from them and records every request so tests can
//! assert on what went over the wire. [`fixtures`] holds the documents of a
//! small stock data directory.
//!
//! ```ignore
//! use test_utils::FakeGeoServer;
//!
//! let server = FakeGeoServer::seeded();
//! let catalog = server.catalog();
//! let layers = catalog.get_layers(None).await?;
//! ```

pub mod fake_server;
pub mod fixtures;

pub use fake_server::{FakeGeoServer, RecordedRequest, BASE_URL};
