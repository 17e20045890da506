//! Catalog Facade: the entry point for reading and writing configuration.
//!
//! Entity specific operations live next to their descriptors under
//! [`entities`](crate::entities); this module holds the generic machinery they
//! share: cached reads, writes with whole-cache invalidation, scoped listing
//! and single entity lookup.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use gs_common::{GsError, GsResult, ResourceKey};
use gs_xml::Element;

use crate::cache::ResponseCache;
use crate::config::CatalogConfig;
use crate::convert::FieldValue;
use crate::descriptor::ResourceDescriptor;
use crate::entities::workspace::WORKSPACE;
use crate::locator::{Locator, Scope};
use crate::resource::BoundResource;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
use crate::url::{build_url, parse_service_url};

/// Version reported by servers too old to expose `/about/version`.
pub const FALLBACK_VERSION: &str = "2.2.x";

const XML: &str = "application/xml";

/// Which workspaces a listing covers.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WorkspaceFilter {
    /// Every workspace, plus the global scope for kinds that have one.
    #[default]
    All,
    /// Only the global scope. Kinds that always live in a workspace treat
    /// this like `All`.
    Global,
    Only(Vec<String>),
}

/// Scope and name filters of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Names to keep; empty keeps everything.
    pub names: Vec<String>,
    pub workspaces: WorkspaceFilter,
    /// Stores to look in; `None` looks in every store of each workspace.
    pub stores: Option<Vec<String>>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_names(names)
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_workspaces<I, S>(mut self, workspaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workspaces = WorkspaceFilter::Only(workspaces.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to one workspace, or to the global scope when `None`.
    pub fn in_workspace(mut self, workspace: Option<&str>) -> Self {
        self.workspaces = match workspace {
            Some(ws) => WorkspaceFilter::Only(vec![ws.to_string()]),
            None => WorkspaceFilter::Global,
        };
        self
    }

    pub fn in_stores<I, S>(mut self, stores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stores = Some(stores.into_iter().map(Into::into).collect());
        self
    }

    /// Filter that selects exactly the entity identified by `key`.
    pub fn for_key(key: &ResourceKey) -> Self {
        let mut filter = Self::named([key.name.clone()]).in_workspace(key.workspace.as_deref());
        if let Some(store) = &key.store {
            filter = filter.in_stores([store.clone()]);
        }
        filter
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|n| n == name)
    }
}

struct CatalogInner {
    service_url: Url,
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    version: OnceCell<String>,
}

/// Client for one server's configuration API.
///
/// Cheap to clone; clones share the transport and response cache.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("service_url", &self.inner.service_url.as_str())
            .finish()
    }
}

impl Catalog {
    /// Build a catalog over HTTP.
    pub fn new(config: &CatalogConfig) -> GsResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        Self::with_transport(&config.service_url, Arc::new(transport), config.cache_ttl())
    }

    /// Build a catalog from `GEOSERVER_*` environment variables.
    pub fn from_env() -> GsResult<Self> {
        Self::new(&CatalogConfig::from_env()?)
    }

    /// Build a catalog over any transport.
    pub fn with_transport(service_url: &str, transport: Arc<dyn Transport>, cache_ttl: Duration) -> GsResult<Self> {
        let service_url = parse_service_url(service_url)?;
        info!(service_url = %service_url, "Catalog client initialized");
        Ok(Self {
            inner: Arc::new(CatalogInner {
                service_url,
                transport,
                cache: ResponseCache::new(cache_ttl),
                version: OnceCell::new(),
            }),
        })
    }

    pub fn service_url(&self) -> &Url {
        &self.inner.service_url
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// URL of `segments` below the service root.
    pub fn url<S: AsRef<str>>(&self, segments: &[S]) -> GsResult<String> {
        build_url::<_, &str, &str>(&self.inner.service_url, segments, &[])
    }

    pub fn url_with_query<S, K, V>(&self, segments: &[S], query: &[(K, V)]) -> GsResult<String>
    where
        S: AsRef<str>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        build_url(&self.inner.service_url, segments, query)
    }

    /// Send a request as is. No status check, no caching.
    pub async fn request(&self, request: HttpRequest) -> GsResult<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "Catalog request");
        self.inner.transport.execute(request).await
    }

    /// Fetch and parse an XML document, through the response cache.
    #[instrument(skip(self))]
    pub async fn get_xml(&self, url: &str) -> GsResult<Element> {
        if let Some(body) = self.inner.cache.get(url).await {
            return parse_document(url, &body);
        }

        let response = self.request(HttpRequest::get(url).accept(XML)).await?;
        if response.status != 200 {
            return Err(GsError::failed_request(response.status, url, response.text()));
        }

        let body = response.text();
        let dom = parse_document(url, &body)?;
        self.inner.cache.insert(url, body).await;
        Ok(dom)
    }

    /// Fetch a JSON document. Not cached.
    pub async fn get_json(&self, url: &str) -> GsResult<serde_json::Value> {
        let response = self
            .request(HttpRequest::get(url).accept("application/json"))
            .await?;
        if response.status != 200 {
            return Err(GsError::failed_request(response.status, url, response.text()));
        }
        serde_json::from_slice(&response.body).map_err(|e| GsError::MalformedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Issue a write. An expected status clears the entire response cache;
    /// anything else is a [`GsError::FailedRequest`].
    pub async fn write(&self, request: HttpRequest, expected: &[u16]) -> GsResult<HttpResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        info!(method = %method, url = %url, "Writing to catalog");

        let response = self.request(request).await?;
        if !expected.contains(&response.status) {
            return Err(GsError::failed_request(response.status, url, response.text()));
        }
        self.inner.cache.invalidate().await;
        Ok(response)
    }

    /// Drop every cached response.
    pub async fn invalidate_cache(&self) {
        self.inner.cache.invalidate().await;
    }

    // ========================================================================
    // Bound resources
    // ========================================================================

    /// Handle on an existing entity. Nothing is fetched until a field is read.
    pub fn bind(&self, descriptor: &'static ResourceDescriptor, key: ResourceKey) -> BoundResource {
        BoundResource::bound(self.clone(), descriptor, key)
    }

    /// Handle on an entity to be created by the next save.
    pub fn unsaved(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: ResourceKey,
        initial: Vec<(&str, FieldValue)>,
    ) -> GsResult<BoundResource> {
        BoundResource::unsaved(self.clone(), descriptor, key, initial)
    }

    /// Write a resource's pending edits: `POST` for creation handles, `PUT`
    /// otherwise. Success clears the resource's edits and the whole cache.
    /// On failure the resource is left as it was.
    pub async fn save(&self, resource: &mut BoundResource) -> GsResult<()> {
        self.save_expecting(resource, &[200, 201]).await
    }

    pub(crate) async fn save_expecting(&self, resource: &mut BoundResource, expected: &[u16]) -> GsResult<()> {
        resource.prepare_save().await?;
        let url = resource.save_url()?;
        let body = resource.message()?;
        debug!(resource_type = resource.resource_type(), url = %url, body = %body, "Saving resource");

        let request = HttpRequest::new(resource.save_method(), url)
            .accept(XML)
            .body(XML, body);
        self.write(request, expected).await?;
        resource.mark_saved();
        Ok(())
    }

    /// Delete a resource. `purge` removes backing files (`true`, `all`,
    /// `metadata`); `recurse` removes dependent entities.
    pub async fn delete(&self, resource: &BoundResource, purge: Option<&str>, recurse: bool) -> GsResult<()> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(purge) = purge {
            query.push(("purge", purge));
        }
        if recurse {
            query.push(("recurse", "true"));
        }

        let segments = resource
            .descriptor()
            .locator
            .identity_segments(resource.key())?;
        let url = self.url_with_query(&segments, &query)?;
        let request = HttpRequest::new(Method::DELETE, url)
            .header("Content-Type", XML)
            .accept(XML);
        self.write(request, &[200]).await?;
        Ok(())
    }

    /// Create `key` with the given values. Fails with
    /// [`GsError::ConflictingData`] before any write when it already exists,
    /// unless `overwrite` is set, in which case the existing entity is updated.
    pub async fn create(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: ResourceKey,
        initial: Vec<(&str, FieldValue)>,
        overwrite: bool,
    ) -> GsResult<BoundResource> {
        let mut resource = match self.check_conflict(descriptor, &key, overwrite).await? {
            Some(mut existing) => {
                for (field, value) in initial {
                    existing.set(field, value)?;
                }
                existing
            }
            None => self.unsaved(descriptor, key, initial)?,
        };
        self.save(&mut resource).await?;
        Ok(resource)
    }

    /// Look `key` up and refuse to go on if it exists and `overwrite` is not set.
    pub(crate) async fn check_conflict(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: &ResourceKey,
        overwrite: bool,
    ) -> GsResult<Option<BoundResource>> {
        let existing = self.get_one(descriptor, key).await?;
        if existing.is_some() && !overwrite {
            return Err(GsError::ConflictingData(format!(
                "There is already a {} named {}",
                descriptor.resource_type, key
            )));
        }
        Ok(existing)
    }

    // ========================================================================
    // Listing
    // ========================================================================

    async fn listing_names(
        &self,
        locator: &Locator,
        workspace: Option<&str>,
        store: Option<&str>,
    ) -> GsResult<Vec<String>> {
        let url = locator.listing_url(&self.inner.service_url, workspace, store)?;
        let doc = self.get_xml(&url).await?;
        Ok(doc
            .find_all(locator.list_element)
            .into_iter()
            .filter_map(|entry| entry.find_text(locator.name_element))
            .map(str::to_string)
            .collect())
    }

    /// Names of every workspace.
    pub async fn workspace_names(&self) -> GsResult<Vec<String>> {
        self.listing_names(&WORKSPACE.locator, None, None).await
    }

    async fn scoped_workspaces(&self, filter: &ListFilter) -> GsResult<Vec<String>> {
        match &filter.workspaces {
            WorkspaceFilter::Only(workspaces) => Ok(workspaces.clone()),
            WorkspaceFilter::All | WorkspaceFilter::Global => self.workspace_names().await,
        }
    }

    async fn optional_workspaces(&self, filter: &ListFilter) -> GsResult<Vec<Option<String>>> {
        Ok(match &filter.workspaces {
            WorkspaceFilter::Global => vec![None],
            WorkspaceFilter::Only(workspaces) => workspaces.iter().cloned().map(Some).collect(),
            WorkspaceFilter::All => std::iter::once(None)
                .chain(self.workspace_names().await?.into_iter().map(Some))
                .collect(),
        })
    }

    /// Every entity of a kind within the filter's scope.
    ///
    /// Issues one listing fetch per scope segment, then filters names in
    /// memory. Scopes that turn out not to exist (a workspace deleted since
    /// it was listed, a store name absent from some workspace) are skipped.
    /// Finding nothing is an empty result, never an error.
    pub async fn list(
        &self,
        descriptor: &'static ResourceDescriptor,
        filter: &ListFilter,
    ) -> GsResult<Vec<BoundResource>> {
        let locator = &descriptor.locator;
        let base = &self.inner.service_url;

        let mut scopes: Vec<(Option<String>, Option<String>)> = Vec::new();
        match locator.scope {
            Scope::Global | Scope::Singleton => scopes.push((None, None)),
            Scope::Embedded => {
                return Err(GsError::InvalidArgument(format!(
                    "{} documents cannot be listed",
                    descriptor.resource_type
                )))
            }
            Scope::Workspace => {
                for ws in self.scoped_workspaces(filter).await? {
                    scopes.push((Some(ws), None));
                }
            }
            Scope::OptionalWorkspace | Scope::Service => {
                for ws in self.optional_workspaces(filter).await? {
                    scopes.push((ws, None));
                }
            }
            Scope::Store(parent) => {
                for ws in self.scoped_workspaces(filter).await? {
                    let stores = match &filter.stores {
                        Some(stores) => stores.clone(),
                        None => match self.listing_names(&parent.locator, Some(ws.as_str()), None).await {
                            Ok(names) => names,
                            Err(e) if is_missing_scope(&e, &ws) => {
                                debug!(workspace = %ws, error = %e, "Skipping missing workspace");
                                continue;
                            }
                            Err(e) => return Err(e),
                        },
                    };
                    for store in stores {
                        scopes.push((Some(ws.clone()), Some(store)));
                    }
                }
            }
        }

        let mut found = Vec::new();
        for (workspace, store) in scopes {
            if matches!(locator.scope, Scope::Service | Scope::Singleton) {
                let key = ResourceKey {
                    name: descriptor.resource_type.to_string(),
                    workspace: workspace.clone(),
                    store: None,
                };
                let url = locator.identity_url(base, &key)?;
                match self.get_xml(&url).await {
                    Ok(dom) => found.push(BoundResource::with_dom(self.clone(), descriptor, key, dom)),
                    Err(e) if workspace.is_some() && e.status().is_some() => {
                        debug!(url = %url, status = ?e.status(), "No workspace specific document");
                    }
                    Err(e) => return Err(e),
                }
                continue;
            }

            let names = match self
                .listing_names(locator, workspace.as_deref(), store.as_deref())
                .await
            {
                Ok(names) => names,
                Err(e) if workspace.as_deref().map_or(false, |ws| is_missing_scope(&e, ws)) => {
                    debug!(workspace = ?workspace, store = ?store, error = %e, "Skipping missing scope");
                    continue;
                }
                Err(e) => return Err(e),
            };

            for name in names.into_iter().filter(|n| filter.matches(n)) {
                let key = ResourceKey {
                    name,
                    workspace: workspace.clone(),
                    store: store.clone(),
                };
                found.push(BoundResource::bound(self.clone(), descriptor, key));
            }
        }

        Ok(found)
    }

    /// The entity identified by `key`, or `None` when it does not exist.
    /// Only transport failures raise.
    pub async fn get_one(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: &ResourceKey,
    ) -> GsResult<Option<BoundResource>> {
        Ok(self
            .list(descriptor, &ListFilter::for_key(key))
            .await?
            .into_iter()
            .next())
    }

    /// Like [`get_one`](Self::get_one), but more than one match is a
    /// [`GsError::AmbiguousRequest`].
    pub async fn get_unique(
        &self,
        descriptor: &'static ResourceDescriptor,
        filter: &ListFilter,
    ) -> GsResult<Option<BoundResource>> {
        let mut found = self.list(descriptor, filter).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            n => Err(GsError::AmbiguousRequest(format!(
                "{} {} entries match {:?}",
                n, descriptor.resource_type, filter.names
            ))),
        }
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// Reload the configuration from disk on the server.
    pub async fn reload(&self) -> GsResult<()> {
        let url = self.url(&["reload"])?;
        self.write(HttpRequest::new(Method::POST, url), &[200]).await?;
        Ok(())
    }

    /// Reset server caches (feature types, stores, authentication).
    pub async fn reset(&self) -> GsResult<()> {
        let url = self.url(&["reset"])?;
        self.write(HttpRequest::new(Method::POST, url), &[200]).await?;
        Ok(())
    }

    /// Server version, fetched once. Servers without a version endpoint
    /// report [`FALLBACK_VERSION`]; an unreachable server is an error.
    pub async fn get_version(&self) -> GsResult<String> {
        let version = self
            .inner
            .version
            .get_or_try_init(|| self.fetch_version())
            .await?;
        Ok(version.clone())
    }

    async fn fetch_version(&self) -> GsResult<String> {
        let url = self.url(&["about", "version.xml"])?;
        let response = self.request(HttpRequest::get(&url).accept(XML)).await?;
        if response.status == 200 {
            if let Ok(dom) = Element::parse(&response.text()) {
                let version = dom
                    .find_all("resource")
                    .into_iter()
                    .find(|r| r.attr("name") == Some("GeoServer"))
                    .and_then(|r| r.find_text("Version"));
                if let Some(version) = version {
                    return Ok(version.to_string());
                }
            }
        }
        debug!(status = response.status, "No version information, assuming an old server");
        Ok(FALLBACK_VERSION.to_string())
    }

    /// Numeric part of the server version, e.g. `2.24` for `2.24-SNAPSHOT`.
    pub async fn get_short_version(&self) -> GsResult<String> {
        Ok(short_version(&self.get_version().await?))
    }
}

fn parse_document(url: &str, body: &str) -> GsResult<Element> {
    Element::parse(body).map_err(|e| GsError::MalformedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn is_missing_scope(err: &GsError, workspace: &str) -> bool {
    err.is_not_found() || err.is_missing_workspace(workspace)
}

pub(crate) fn short_version(version: &str) -> String {
    version
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
