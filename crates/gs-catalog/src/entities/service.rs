//! OGC service settings, global and per workspace.

use std::str::FromStr;

use gs_common::{GsError, GsResult, ResourceKey};

use crate::catalog::{Catalog, ListFilter};
use crate::convert::Shape;
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::resource::BoundResource;

/// Fields every service document has, followed by the service's own.
macro_rules! service_fields {
    ($($extra:expr),* $(,)?) => {
        &[
            FieldSpec::boolean("enabled"),
            FieldSpec::text("name"),
            FieldSpec::text("title"),
            FieldSpec::text("maintainer"),
            FieldSpec::text("abstract").at("abstrct"),
            FieldSpec::text("accessConstraints"),
            FieldSpec::text("fees"),
            FieldSpec::new("versions", Shape::Versions),
            FieldSpec::new("keywords", Shape::StringList),
            FieldSpec::boolean("citeCompliant"),
            FieldSpec::text("onlineResource"),
            FieldSpec::text("schemaBaseURL"),
            FieldSpec::boolean("verbose"),
            FieldSpec::new("workspace", Shape::NamedRef).read_only(),
            $($extra,)*
        ]
    };
}

pub static SERVICE_WMS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "wms",
    locator: Locator::service("wms"),
    write_all: false,
    fields: service_fields![
        FieldSpec::new("metadata", Shape::KeyValue),
        FieldSpec::new("watermark", Shape::Watermark),
        FieldSpec::text("interpolation"),
        FieldSpec::boolean("getFeatureInfoMimeTypeCheckingEnabled"),
        FieldSpec::boolean("dynamicStylingDisabled"),
        FieldSpec::int("maxBuffer"),
        FieldSpec::int("maxRequestMemory"),
        FieldSpec::int("maxRenderingTime"),
        FieldSpec::int("maxRenderingErrors"),
    ],
};

pub static SERVICE_WFS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "wfs",
    locator: Locator::service("wfs"),
    write_all: false,
    fields: service_fields![
        FieldSpec::new("metadataLink", Shape::KeyValue).read_only(),
        FieldSpec::new("gml", Shape::Gml),
        FieldSpec::text("serviceLevel"),
        FieldSpec::int("maxFeatures"),
        FieldSpec::boolean("featureBounding"),
        FieldSpec::boolean("canonicalSchemaLocation"),
        FieldSpec::boolean("encodeFeatureMember"),
        FieldSpec::boolean("hitsIgnoreMaxFeatures"),
    ],
};

pub static SERVICE_WCS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "wcs",
    locator: Locator::service("wcs"),
    write_all: false,
    fields: service_fields![
        FieldSpec::new("metadataLink", Shape::KeyValue).read_only(),
        FieldSpec::boolean("gmlPrefixing"),
        FieldSpec::boolean("latLon"),
        FieldSpec::int("maxInputMemory"),
        FieldSpec::int("maxOutputMemory"),
    ],
};

pub static SERVICE_WMTS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "wmts",
    locator: Locator::service("wmts"),
    write_all: false,
    fields: service_fields![],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OgcService {
    Wms,
    Wfs,
    Wcs,
    Wmts,
}

impl OgcService {
    pub const ALL: [OgcService; 4] = [OgcService::Wms, OgcService::Wfs, OgcService::Wcs, OgcService::Wmts];

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        match self {
            OgcService::Wms => &SERVICE_WMS,
            OgcService::Wfs => &SERVICE_WFS,
            OgcService::Wcs => &SERVICE_WCS,
            OgcService::Wmts => &SERVICE_WMTS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.descriptor().resource_type
    }
}

impl FromStr for OgcService {
    type Err = GsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GsError::InvalidArgument(format!("unknown OGC service {}", s)))
    }
}

impl Catalog {
    /// Settings documents of one service: the global one first, then one per
    /// workspace that overrides it.
    pub async fn get_services(&self, service: OgcService) -> GsResult<Vec<BoundResource>> {
        self.list(service.descriptor(), &ListFilter::all()).await
    }

    /// Handle on the global settings of a service, or a workspace's own.
    pub fn get_service(&self, service: OgcService, workspace: Option<&str>) -> BoundResource {
        let key = ResourceKey::new(service.as_str());
        let key = match workspace.filter(|ws| !ws.is_empty()) {
            Some(ws) => key.in_workspace(ws),
            None => key,
        };
        self.bind(service.descriptor(), key)
    }
}
