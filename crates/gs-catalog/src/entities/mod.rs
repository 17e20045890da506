//! Entity kinds of the configuration catalog.
//!
//! Each module declares the static descriptors of its kinds and extends
//! [`Catalog`](crate::Catalog) with the operations specific to them.

pub mod layer;
pub mod layergroup;
pub mod resource;
pub mod security;
pub mod service;
pub mod settings;
pub mod store;
pub mod style;
pub mod workspace;

pub use layer::LAYER;
pub use layergroup::{LayerGroupDraft, LAYER_GROUP};
pub use resource::{FeatureTypeList, COVERAGE, FEATURE_TYPE, WMS_LAYER};
pub use security::USER;
pub use service::{OgcService, SERVICE_WCS, SERVICE_WFS, SERVICE_WMS, SERVICE_WMTS};
pub use settings::{CONTACT, COVERAGE_ACCESS, GLOBAL_SETTINGS, JAI, SETTINGS};
pub use store::{
    CoverageStoreCreated, CoverageStoreDraft, MosaicConfigure, StoreKind, UploadData, COVERAGE_STORE,
    DATA_STORE, WMS_STORE,
};
pub use style::{StyleFormat, STYLE};
pub use workspace::{NAMESPACE, WORKSPACE};

use gs_common::{GsError, GsResult};
use gs_xml::XmlBuilder;

use crate::descriptor::ResourceDescriptor;

/// Every addressable descriptor.
pub static ALL_DESCRIPTORS: &[&ResourceDescriptor] = &[
    &WORKSPACE,
    &NAMESPACE,
    &DATA_STORE,
    &COVERAGE_STORE,
    &WMS_STORE,
    &FEATURE_TYPE,
    &COVERAGE,
    &WMS_LAYER,
    &LAYER,
    &LAYER_GROUP,
    &STYLE,
    &SERVICE_WMS,
    &SERVICE_WFS,
    &SERVICE_WCS,
    &SERVICE_WMTS,
    &GLOBAL_SETTINGS,
    &SETTINGS,
    &CONTACT,
    &JAI,
    &COVERAGE_ACCESS,
    &USER,
];

pub(crate) fn render_body(out: &XmlBuilder) -> GsResult<String> {
    out.render().map_err(|e| GsError::InvalidArgument(e.to_string()))
}
