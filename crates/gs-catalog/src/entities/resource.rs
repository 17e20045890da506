//! Published resources: feature types, coverages and cascaded WMS layers.

use std::str::FromStr;

use gs_common::{GsError, GsResult, ResourceKey};
use serde_json::Value;
use tracing::info;

use crate::catalog::{Catalog, ListFilter};
use crate::convert::{FieldValue, Shape};
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::metadata::{JdbcVirtualTable, MetadataValue, JDBC_VIRTUAL_TABLE_KEY};
use crate::resource::BoundResource;

use super::store::{COVERAGE_STORE, DATA_STORE, WMS_STORE};

/// Fields every resource kind shares, followed by the kind's own.
macro_rules! resource_fields {
    ($($extra:expr),* $(,)?) => {
        &[
            FieldSpec::text("name"),
            FieldSpec::text("nativeName"),
            FieldSpec::text("title"),
            FieldSpec::text("abstract"),
            FieldSpec::new("keywords", Shape::StringList),
            FieldSpec::text("nativeCRS"),
            FieldSpec::text("srs"),
            FieldSpec::text("projectionPolicy"),
            FieldSpec::new("nativeBoundingBox", Shape::BoundingBox),
            FieldSpec::new("latLonBoundingBox", Shape::BoundingBox),
            FieldSpec::forced_flag("enabled"),
            FieldSpec::forced_flag("advertised"),
            FieldSpec::new("metadata", Shape::Metadata),
            FieldSpec::new("store", Shape::NamedRef).read_only(),
            FieldSpec::new("namespace", Shape::NamedRef).read_only(),
            $($extra,)*
        ]
    };
}

pub static FEATURE_TYPE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "featureType",
    locator: Locator::store(&DATA_STORE, "featuretypes", "featureType"),
    write_all: false,
    fields: resource_fields![
        FieldSpec::new("attributes", Shape::AttributeList).read_only(),
        FieldSpec::int("maxFeatures"),
        FieldSpec::int("numDecimals"),
    ],
};

pub static COVERAGE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "coverage",
    locator: Locator::store(&COVERAGE_STORE, "coverages", "coverage"),
    write_all: false,
    fields: resource_fields![
        FieldSpec::text("nativeFormat"),
        FieldSpec::new("supportedFormats", Shape::StringList).read_only(),
    ],
};

pub static WMS_LAYER: ResourceDescriptor = ResourceDescriptor {
    resource_type: "wmsLayer",
    locator: Locator::store(&WMS_STORE, "wmslayers", "wmsLayer"),
    write_all: false,
    fields: resource_fields![],
};

pub static RESOURCE_DESCRIPTORS: [&ResourceDescriptor; 3] = [&FEATURE_TYPE, &COVERAGE, &WMS_LAYER];

/// Which feature type names a data store listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureTypeList {
    /// Names the store offers that are not yet published.
    #[default]
    Available,
    /// Like `Available`, restricted to names with a geometry.
    AvailableWithGeom,
    /// Names already published.
    Configured,
    /// Available names followed by configured ones.
    All,
}

impl FeatureTypeList {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureTypeList::Available => "available",
            FeatureTypeList::AvailableWithGeom => "available_with_geom",
            FeatureTypeList::Configured => "configured",
            FeatureTypeList::All => "all",
        }
    }
}

impl FromStr for FeatureTypeList {
    type Err = GsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(FeatureTypeList::Available),
            "available_with_geom" => Ok(FeatureTypeList::AvailableWithGeom),
            "configured" => Ok(FeatureTypeList::Configured),
            "all" => Ok(FeatureTypeList::All),
            _ => Err(GsError::InvalidArgument(format!("unknown feature type list {}", s))),
        }
    }
}

/// `{"list": {"string": [..]}}`. An empty listing comes back as `{"list": ""}`
/// and a single name may not be wrapped in an array.
fn available_names(doc: &Value) -> Vec<String> {
    match doc.pointer("/list/string") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Some(Value::String(name)) if !name.is_empty() => vec![name.clone()],
        _ => Vec::new(),
    }
}

/// `{"featureTypes": {"featureType": [{"name": ..}, ..]}}`.
fn configured_names(doc: &Value) -> Vec<String> {
    let entry_name = |entry: &Value| entry.get("name").and_then(Value::as_str).map(str::to_string);
    match doc.pointer("/featureTypes/featureType") {
        Some(Value::Array(items)) => items.iter().filter_map(entry_name).collect(),
        Some(entry @ Value::Object(_)) => entry_name(entry).into_iter().collect(),
        _ => Vec::new(),
    }
}

impl Catalog {
    /// Resources of every kind, filtered by name, store and workspace. Empty
    /// filters select everything.
    pub async fn get_resources(
        &self,
        names: &[&str],
        stores: &[&str],
        workspaces: &[&str],
    ) -> GsResult<Vec<BoundResource>> {
        let mut filter = ListFilter::named(names.iter().copied());
        if !workspaces.is_empty() {
            filter = filter.in_workspaces(workspaces.iter().copied());
        }
        if !stores.is_empty() {
            filter = filter.in_stores(stores.iter().copied());
        }

        let mut resources = Vec::new();
        for descriptor in RESOURCE_DESCRIPTORS.iter().copied() {
            resources.extend(self.list(descriptor, &filter).await?);
        }
        Ok(resources)
    }

    pub async fn get_resource(
        &self,
        name: &str,
        store: Option<&str>,
        workspace: Option<&str>,
    ) -> GsResult<Option<BoundResource>> {
        let stores: Vec<&str> = store.into_iter().collect();
        let workspaces: Vec<&str> = workspace.into_iter().collect();
        Ok(self
            .get_resources(&[name], &stores, &workspaces)
            .await?
            .into_iter()
            .next())
    }

    /// Publish a feature type from a table or file already in `store`.
    ///
    /// With a virtual table the feature type is backed by its SQL instead of
    /// a native table. The returned handle is fetched from the server.
    pub async fn publish_featuretype(
        &self,
        name: &str,
        store: &BoundResource,
        native_crs: &str,
        srs: Option<&str>,
        jdbc_virtual_table: Option<JdbcVirtualTable>,
        native_name: Option<&str>,
    ) -> GsResult<BoundResource> {
        if native_crs.is_empty() {
            return Err(GsError::InvalidArgument("a native CRS is required".to_string()));
        }
        let workspace = store
            .workspace()
            .ok_or_else(|| GsError::InvalidArgument(format!("store {} has no workspace", store.name())))?;

        let mut initial: Vec<(&str, FieldValue)> = vec![
            ("name", name.into()),
            ("title", name.into()),
            ("srs", srs.unwrap_or(native_crs).into()),
            ("nativeCRS", native_crs.into()),
            ("enabled", true.into()),
            ("advertised", true.into()),
        ];
        if let Some(native_name) = native_name.filter(|n| !n.is_empty()) {
            initial.push(("nativeName", native_name.into()));
        }
        if let Some(table) = jdbc_virtual_table {
            let metadata = [(JDBC_VIRTUAL_TABLE_KEY.to_string(), MetadataValue::from(table))]
                .into_iter()
                .collect::<std::collections::BTreeMap<_, _>>();
            initial.push(("metadata", FieldValue::Metadata(metadata)));
        }

        let key = ResourceKey::new(name).in_workspace(workspace).in_store(store.name());
        let mut feature_type = self.unsaved(&FEATURE_TYPE, key, initial)?;
        self.save_expecting(&mut feature_type, &[200, 201, 202]).await?;
        feature_type.fetch().await?;
        info!(feature_type = name, store = store.name(), workspace = workspace, "Published feature type");
        Ok(feature_type)
    }

    /// Names of feature types in a data store, published or not.
    pub async fn list_feature_type_names(
        &self,
        workspace: &str,
        store: &str,
        filter: FeatureTypeList,
    ) -> GsResult<Vec<String>> {
        let fetch = |list: FeatureTypeList| async move {
            let url = self.url_with_query(
                &["workspaces", workspace, "datastores", store, "featuretypes.json"],
                &[("list", list.as_str())],
            )?;
            self.get_json(&url).await
        };

        match filter {
            FeatureTypeList::Available | FeatureTypeList::AvailableWithGeom => match fetch(filter).await {
                Ok(doc) => Ok(available_names(&doc)),
                Err(GsError::MalformedResponse { .. }) => Ok(Vec::new()),
                Err(e) => Err(e),
            },
            FeatureTypeList::Configured => Ok(configured_names(&fetch(filter).await?)),
            FeatureTypeList::All => {
                let mut names = available_names(&fetch(FeatureTypeList::Available).await?);
                names.extend(configured_names(&fetch(FeatureTypeList::Configured).await?));
                Ok(names)
            }
        }
    }

    /// Publish a layer of a cascaded WMS store and return the layer.
    pub async fn create_wmslayer(
        &self,
        workspace: &str,
        store: &str,
        name: &str,
        native_name: Option<&str>,
    ) -> GsResult<Option<BoundResource>> {
        let key = ResourceKey::new(name).in_workspace(workspace).in_store(store);
        let mut layer = self.unsaved(
            &WMS_LAYER,
            key,
            vec![("name", name.into()), ("nativeName", native_name.unwrap_or(name).into())],
        )?;
        self.save(&mut layer).await?;
        self.get_layer(name).await
    }
}
