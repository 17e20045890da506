//! Data, coverage and cascaded WMS stores, plus file uploads into them.
//!
//! Uploads are not transactional: a store created by an upload that later
//! fails is left on the server.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::Bytes;
use gs_common::{GsError, GsResult, ResourceKey};
use reqwest::Method;
use tracing::{debug, info};

use crate::catalog::{Catalog, ListFilter};
use crate::convert::{FieldValue, Shape};
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::resource::BoundResource;
use crate::transport::HttpRequest;

use super::resource::{COVERAGE, FEATURE_TYPE, WMS_LAYER};

pub static DATA_STORE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "dataStore",
    locator: Locator::workspace("datastores", "dataStore"),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::text("description"),
        FieldSpec::text("type"),
        FieldSpec::forced_flag("enabled"),
        FieldSpec::new("workspace", Shape::NamedRef).read_only(),
        FieldSpec::new("connectionParameters", Shape::KeyValue),
    ],
};

pub static COVERAGE_STORE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "coverageStore",
    locator: Locator::workspace("coveragestores", "coverageStore"),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::text("description"),
        FieldSpec::text("type"),
        FieldSpec::forced_flag("enabled"),
        FieldSpec::new("workspace", Shape::NamedRef).read_only(),
        FieldSpec::text("url"),
    ],
};

pub static WMS_STORE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "wmsStore",
    locator: Locator::workspace("wmsstores", "wmsStore"),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::text("description"),
        FieldSpec::text("type"),
        FieldSpec::forced_flag("enabled"),
        FieldSpec::new("workspace", Shape::NamedRef).read_only(),
        FieldSpec::text("capabilitiesURL"),
        FieldSpec::text("user"),
        FieldSpec::text("password"),
        FieldSpec::int("maxConnections"),
        FieldSpec::int("readTimeout"),
        FieldSpec::int("connectTimeout"),
    ],
};

/// Raster formats a coverage store can be created for.
pub const COVERAGE_STORE_TYPES: &[&str] = &[
    "ImageMosaic",
    "GeoTIFF",
    "Gtopo30",
    "WorldImage",
    "AIG",
    "ArcGrid",
    "DTED",
    "EHdr",
    "ERDASImg",
    "ENVIHdr",
    "GeoPackage (mosaic)",
    "NITF",
    "RPFTOC",
    "RST",
    "VRT",
];

/// The three store kinds and the resource kind each one publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Data,
    Coverage,
    Wms,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Data, StoreKind::Coverage, StoreKind::Wms];

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        match self {
            StoreKind::Data => &DATA_STORE,
            StoreKind::Coverage => &COVERAGE_STORE,
            StoreKind::Wms => &WMS_STORE,
        }
    }

    pub fn resource_descriptor(&self) -> &'static ResourceDescriptor {
        match self {
            StoreKind::Data => &FEATURE_TYPE,
            StoreKind::Coverage => &COVERAGE,
            StoreKind::Wms => &WMS_LAYER,
        }
    }

    /// Kind from the collection segment of a store URL, e.g. `datastores`.
    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.descriptor().locator.collection == collection)
    }

    pub fn of(descriptor: &ResourceDescriptor) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.descriptor() == descriptor)
    }
}

/// What an upload sends.
#[derive(Debug, Clone)]
pub enum UploadData {
    /// A zip archive on local disk.
    Archive(PathBuf),
    /// A zip archive already in memory.
    ArchiveBytes(Bytes),
    /// A file or directory path on the server's own filesystem.
    External(String),
}

impl UploadData {
    /// Archives by extension, anything else as a server side path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => UploadData::Archive(path.to_path_buf()),
            _ => UploadData::External(path.to_string_lossy().into_owned()),
        }
    }

    fn is_external(&self) -> bool {
        matches!(self, UploadData::External(_))
    }

    /// Content type and body of the request.
    async fn into_body(self) -> GsResult<(&'static str, Bytes)> {
        match self {
            UploadData::Archive(path) => Ok(("application/zip", read_archive(&path).await?)),
            UploadData::ArchiveBytes(bytes) => Ok(("application/zip", bytes)),
            UploadData::External(path) => Ok(("text/plain", Bytes::from(file_url(&path)))),
        }
    }
}

async fn read_archive(path: &Path) -> GsResult<Bytes> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| GsError::Upload(format!("cannot read {}: {}", path.display(), e)))
}

fn file_url(path: &str) -> String {
    if path.starts_with("file:") {
        path.to_string()
    } else {
        format!("file:{}", path)
    }
}

/// How many coverages a mosaic upload configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MosaicConfigure {
    #[default]
    First,
    None,
    All,
}

impl MosaicConfigure {
    pub fn as_str(&self) -> &'static str {
        match self {
            MosaicConfigure::First => "first",
            MosaicConfigure::None => "none",
            MosaicConfigure::All => "all",
        }
    }
}

impl FromStr for MosaicConfigure {
    type Err = GsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(MosaicConfigure::First),
            "none" => Ok(MosaicConfigure::None),
            "all" => Ok(MosaicConfigure::All),
            _ => Err(GsError::InvalidArgument(format!(
                "configure must be one of first, none, all, not {}",
                s
            ))),
        }
    }
}

/// Parameters of [`Catalog::create_coveragestore`].
#[derive(Debug, Clone)]
pub struct CoverageStoreDraft {
    pub name: String,
    pub workspace: Option<String>,
    /// Raster path; on the server unless `upload` is set.
    pub path: String,
    pub store_type: String,
    pub create_layer: bool,
    pub layer_name: Option<String>,
    pub source_name: Option<String>,
    pub upload: bool,
    pub content_type: String,
    pub overwrite: bool,
}

impl CoverageStoreDraft {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace: None,
            path: path.into(),
            store_type: "GeoTIFF".to_string(),
            create_layer: true,
            layer_name: None,
            source_name: None,
            upload: false,
            content_type: "image/tiff".to_string(),
            overwrite: false,
        }
    }

    pub fn in_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = store_type.into();
        self
    }

    pub fn layer_name(mut self, layer_name: impl Into<String>) -> Self {
        self.layer_name = Some(layer_name.into());
        self
    }

    pub fn source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn without_layer(mut self) -> Self {
        self.create_layer = false;
        self
    }

    pub fn upload(mut self, content_type: impl Into<String>) -> Self {
        self.upload = true;
        self.content_type = content_type.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// File name of the raster without directory or extension.
    fn raster_stem(&self) -> String {
        let path = self.path.strip_prefix("file:").unwrap_or(&self.path);
        Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Outcome of [`Catalog::create_coveragestore`].
#[derive(Debug)]
pub struct CoverageStoreCreated {
    pub store: BoundResource,
    /// The coverage published from the store, when one was requested.
    pub coverage: Option<BoundResource>,
}

impl Catalog {
    /// Stores of every kind, filtered by name and workspace. Empty filters
    /// select everything.
    pub async fn get_stores(&self, names: &[&str], workspaces: &[&str]) -> GsResult<Vec<BoundResource>> {
        let mut filter = ListFilter::named(names.iter().copied());
        if !workspaces.is_empty() {
            filter = filter.in_workspaces(workspaces.iter().copied());
        }

        let mut stores = Vec::new();
        for kind in StoreKind::ALL {
            stores.extend(self.list(kind.descriptor(), &filter).await?);
        }
        Ok(stores)
    }

    /// One store by name. Without a workspace every workspace is searched and
    /// a name found in more than one is an [`GsError::AmbiguousRequest`].
    pub async fn get_store(&self, name: &str, workspace: Option<&str>) -> GsResult<Option<BoundResource>> {
        let workspaces: Vec<&str> = workspace.into_iter().collect();
        let mut stores = self.get_stores(&[name], &workspaces).await?;
        if workspace.is_none() && stores.len() > 1 {
            let found: Vec<String> = stores.iter().map(|s| s.key().qualified_name()).collect();
            return Err(GsError::AmbiguousRequest(format!(
                "store {} exists in several workspaces: {}",
                name,
                found.join(", ")
            )));
        }
        Ok(if stores.is_empty() { None } else { Some(stores.remove(0)) })
    }

    async fn unsaved_store(
        &self,
        kind: StoreKind,
        name: &str,
        workspace: Option<&str>,
        mut initial: Vec<(&str, FieldValue)>,
    ) -> GsResult<BoundResource> {
        let workspace = self.workspace_or_default(workspace).await?;
        initial.insert(0, ("name", name.into()));
        self.unsaved(
            kind.descriptor(),
            ResourceKey::new(name).in_workspace(workspace),
            initial,
        )
    }

    /// Creation handle for a data store. Nothing is sent until it is saved.
    pub async fn create_datastore(&self, name: &str, workspace: Option<&str>) -> GsResult<BoundResource> {
        self.unsaved_store(StoreKind::Data, name, workspace, Vec::new()).await
    }

    /// Creation handle for a coverage store.
    pub async fn create_coveragestore_unsaved(&self, name: &str, workspace: Option<&str>) -> GsResult<BoundResource> {
        self.unsaved_store(StoreKind::Coverage, name, workspace, Vec::new()).await
    }

    /// Creation handle for a cascaded WMS store.
    pub async fn create_wmsstore(
        &self,
        name: &str,
        workspace: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> GsResult<BoundResource> {
        let mut initial: Vec<(&str, FieldValue)> = vec![("type", "WMS".into())];
        if let Some(user) = user {
            initial.push(("user", user.into()));
        }
        if let Some(password) = password {
            initial.push(("password", password.into()));
        }
        self.unsaved_store(StoreKind::Wms, name, workspace, initial).await
    }

    async fn ensure_store_absent(&self, name: &str, workspace: &str, overwrite: bool) -> GsResult<()> {
        if overwrite {
            return Ok(());
        }
        if !self.get_stores(&[name], &[workspace]).await?.is_empty() {
            return Err(GsError::ConflictingData(format!(
                "There is already a store named {} in workspace {}",
                name, workspace
            )));
        }
        Ok(())
    }

    async fn upload(&self, method: Method, url: String, content_type: &str, body: Bytes, expected: &[u16]) -> GsResult<()> {
        debug!(url = %url, bytes = body.len(), "Uploading");
        let request = HttpRequest::new(method, url)
            .accept("application/xml")
            .body(content_type, body);
        self.write(request, expected).await.map(|_| ())
    }

    /// Create a data store from a zipped shapefile.
    pub async fn create_featurestore(
        &self,
        name: &str,
        archive: UploadData,
        workspace: Option<&str>,
        overwrite: bool,
        charset: Option<&str>,
    ) -> GsResult<()> {
        if archive.is_external() {
            return Err(GsError::Upload("a feature store needs a zip archive".to_string()));
        }
        let workspace = self.workspace_or_default(workspace).await?;
        self.ensure_store_absent(name, &workspace, overwrite).await?;

        let query: Vec<(&str, &str)> = charset.filter(|c| !c.is_empty()).map(|c| ("charset", c)).into_iter().collect();
        let url = self.url_with_query(&["workspaces", workspace.as_str(), "datastores", name, "file.shp"], &query)?;
        let (content_type, body) = archive.into_body().await?;
        self.upload(Method::PUT, url, content_type, body, &[201]).await?;
        info!(store = name, workspace = %workspace, "Created feature store");
        Ok(())
    }

    /// Upload another zipped shapefile into an existing data store.
    pub async fn add_data_to_store(
        &self,
        store: &BoundResource,
        name: &str,
        archive: UploadData,
        overwrite: bool,
        charset: Option<&str>,
    ) -> GsResult<()> {
        let workspace = store
            .workspace()
            .ok_or_else(|| GsError::InvalidArgument(format!("store {} has no workspace", store.name())))?;

        let filename = format!("{}.zip", name);
        let mut query: Vec<(&str, &str)> = Vec::new();
        if overwrite {
            query.push(("update", "overwrite"));
        }
        if let Some(charset) = charset.filter(|c| !c.is_empty()) {
            query.push(("charset", charset));
        }
        query.push(("filename", filename.as_str()));
        query.push(("target", "shp"));

        let url = self.url_with_query(&["workspaces", workspace, "datastores", store.name(), "file.shp"], &query)?;
        let (content_type, body) = archive.into_body().await?;
        self.upload(Method::PUT, url, content_type, body, &[201]).await
    }

    /// Create an image mosaic store from a zip archive or a directory on the
    /// server.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_imagemosaic(
        &self,
        name: &str,
        data: UploadData,
        configure: MosaicConfigure,
        workspace: Option<&str>,
        overwrite: bool,
        charset: Option<&str>,
        coverage_name: Option<&str>,
    ) -> GsResult<Option<BoundResource>> {
        let workspace = self.workspace_or_default(workspace).await?;
        self.ensure_store_absent(name, &workspace, overwrite).await?;

        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(charset) = charset.filter(|c| !c.is_empty()) {
            query.push(("charset", charset));
        }
        query.push(("configure", configure.as_str()));
        if let Some(coverage_name) = coverage_name.filter(|c| !c.is_empty()) {
            query.push(("coverageName", coverage_name));
        }

        let method = if data.is_external() { "external.imagemosaic" } else { "file.imagemosaic" };
        let url = self.url_with_query(&["workspaces", workspace.as_str(), "coveragestores", name, method], &query)?;
        let (content_type, body) = data.into_body().await?;
        self.upload(Method::PUT, url, content_type, body, &[201]).await?;
        info!(store = name, workspace = %workspace, "Created image mosaic");

        self.get_store(name, Some(workspace.as_str())).await
    }

    /// Create a coverage store for a raster and, unless disabled, publish a
    /// coverage from it. The two steps are separate writes; a failure in the
    /// second leaves the store in place.
    pub async fn create_coveragestore(&self, draft: CoverageStoreDraft) -> GsResult<CoverageStoreCreated> {
        if !COVERAGE_STORE_TYPES.contains(&draft.store_type.as_str()) {
            return Err(GsError::InvalidArgument(format!(
                "store type must be one of {}",
                COVERAGE_STORE_TYPES.join(", ")
            )));
        }
        if draft.path.is_empty() {
            return Err(GsError::InvalidArgument("a raster path is required".to_string()));
        }

        let workspace = self.workspace_or_default(draft.workspace.as_deref()).await?;
        self.ensure_store_absent(&draft.name, &workspace, draft.overwrite).await?;

        if draft.upload {
            let extension = format!("file.{}", draft.store_type.to_lowercase());
            let url = self.url_with_query(
                &["workspaces", workspace.as_str(), "coveragestores", draft.name.as_str(), extension.as_str()],
                &[("configure", "first"), ("coverageName", draft.name.as_str())],
            )?;
            let body = read_archive(Path::new(&draft.path)).await?;
            self.upload(Method::PUT, url, &draft.content_type, body, &[201]).await?;
        } else {
            let mut store = self
                .unsaved_store(
                    StoreKind::Coverage,
                    &draft.name,
                    Some(workspace.as_str()),
                    vec![("type", draft.store_type.as_str().into()), ("url", file_url(&draft.path).into())],
                )
                .await?;
            self.save(&mut store).await?;

            if draft.create_layer {
                let layer_name = match draft.layer_name.as_deref() {
                    Some(qualified) => qualified.rsplit(':').next().unwrap_or(qualified).to_string(),
                    None => draft.raster_stem(),
                };
                let source_name = draft.source_name.clone().unwrap_or_else(|| draft.raster_stem());

                let key = ResourceKey::new(layer_name.as_str())
                    .in_workspace(workspace.as_str())
                    .in_store(draft.name.as_str());
                let mut coverage = self.unsaved(
                    &COVERAGE,
                    key,
                    vec![("name", layer_name.as_str().into()), ("nativeName", source_name.into())],
                )?;
                self.save_expecting(&mut coverage, &[201]).await?;
                info!(store = %draft.name, coverage = %layer_name, "Created coverage store and coverage");

                return Ok(CoverageStoreCreated {
                    store,
                    coverage: Some(coverage),
                });
            }
        }

        let store = self
            .get_store(&draft.name, Some(workspace.as_str()))
            .await?
            .ok_or_else(|| GsError::Upload(format!("store {} missing after creation", draft.name)))?;
        Ok(CoverageStoreCreated { store, coverage: None })
    }

    // ========================================================================
    // Mosaic granules
    // ========================================================================

    fn coverage_segments<'a>(workspace: &'a str, store: &'a str, coverage: &'a str) -> Vec<&'a str> {
        vec!["workspaces", workspace, "coveragestores", store, "coverages", coverage]
    }

    /// Harvest a granule into an existing mosaic.
    pub async fn add_granule(&self, data: UploadData, store: &str, workspace: &str) -> GsResult<()> {
        let method = if data.is_external() { "external.imagemosaic" } else { "file.imagemosaic" };
        let url = self.url(&["workspaces", workspace, "coveragestores", store, method])?;
        let (content_type, body) = data.into_body().await?;
        self.upload(Method::POST, url, content_type, body, &[202]).await
    }

    pub async fn delete_granule(&self, coverage: &str, store: &str, granule_id: &str, workspace: &str) -> GsResult<()> {
        let granule = format!("{}.json", granule_id);
        let mut segments = Self::coverage_segments(workspace, store, coverage);
        segments.extend(["index", "granules", granule.as_str()]);
        let request = HttpRequest::new(Method::DELETE, self.url(&segments)?)
            .header("Content-Type", "application/json")
            .accept("application/json");
        self.write(request, &[200]).await.map(|_| ())
    }

    /// Granule index of a mosaic coverage, as returned by the server.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_granules(
        &self,
        coverage: &str,
        store: &str,
        workspace: &str,
        filter: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> GsResult<serde_json::Value> {
        let limit = limit.map(|l| l.to_string());
        let offset = offset.map(|o| o.to_string());
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            query.push(("filter", filter));
        }
        if let Some(limit) = limit.as_deref() {
            query.push(("limit", limit));
        }
        if let Some(offset) = offset.as_deref() {
            query.push(("offset", offset));
        }

        let mut segments = Self::coverage_segments(workspace, store, coverage);
        segments.extend(["index", "granules.json"]);
        self.get_json(&self.url_with_query(&segments, &query)?).await
    }

    /// Coverages configured in a mosaic store.
    pub async fn mosaic_coverages(&self, store: &BoundResource) -> GsResult<serde_json::Value> {
        let workspace = store
            .workspace()
            .ok_or_else(|| GsError::InvalidArgument(format!("store {} has no workspace", store.name())))?;
        let url = self.url(&["workspaces", workspace, "coveragestores", store.name(), "coverages.json"])?;
        self.get_json(&url).await
    }

    /// Attribute schema of a mosaic coverage's granule index.
    pub async fn mosaic_coverage_schema(&self, coverage: &str, store: &str, workspace: &str) -> GsResult<serde_json::Value> {
        let mut segments = Self::coverage_segments(workspace, store, coverage);
        segments.push("index.json");
        self.get_json(&self.url(&segments)?).await
    }
}
