//! In-memory stand-in for the GeoServer REST API.
//!
//! Documents are stored by their path below the REST root, exactly as the
//! catalog addresses them (`workspaces/topp.xml`, `settings`, ...). Listings
//! are computed from the stored documents, so anything created through the
//! catalog shows up in later listings. Every request is recorded.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use gs_catalog::{Catalog, GsError, GsResult, HttpRequest, HttpResponse, Method, Transport, Url};
use gs_xml::Element;

/// REST root the fake answers under.
pub const BASE_URL: &str = "http://localhost:8080/geoserver/rest";

const REST_PATH: &str = "/geoserver/rest/";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Last path segments that name a listable collection.
const COLLECTIONS: &[&str] = &[
    "workspaces",
    "namespaces",
    "datastores",
    "coveragestores",
    "wmsstores",
    "featuretypes",
    "coverages",
    "wmslayers",
    "layers",
    "layergroups",
    "styles",
    "users",
];

/// One request as the fake received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    /// Path below the REST root, without query.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RecordedRequest {
    fn from_request(request: &HttpRequest) -> Self {
        let (path, query) = match Url::parse(&request.url) {
            Ok(url) => {
                let path = url
                    .path()
                    .strip_prefix(REST_PATH)
                    .unwrap_or_else(|| url.path().trim_start_matches('/'))
                    .to_string();
                let query = url.query_pairs().into_owned().collect();
                (path, query)
            }
            Err(_) => (request.url.clone(), Vec::new()),
        };
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            path,
            query,
            headers: request.headers.clone(),
            body: request
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn is_write(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD
    }
}

#[derive(Debug, Default)]
struct ServerState {
    documents: BTreeMap<String, String>,
    default_workspace: Option<String>,
    roles: BTreeSet<String>,
    user_roles: BTreeMap<String, BTreeSet<String>>,
    master_password: String,
    log: Vec<RecordedRequest>,
    injected: VecDeque<u16>,
    refuse: bool,
}

/// Simulated configuration server implementing [`Transport`].
#[derive(Debug, Default)]
pub struct FakeGeoServer {
    state: Mutex<ServerState>,
}

impl FakeGeoServer {
    /// An empty server: no workspaces, no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// A server holding the documents of [`crate::fixtures`].
    pub fn seeded() -> Arc<Self> {
        let server = Self::new();
        crate::fixtures::seed(&server);
        Arc::new(server)
    }

    /// A catalog talking to this server with the default 5 second cache.
    pub fn catalog(self: &Arc<Self>) -> Catalog {
        self.catalog_with_ttl(Duration::from_secs(5))
    }

    pub fn catalog_with_ttl(self: &Arc<Self>, ttl: Duration) -> Catalog {
        let transport: Arc<dyn Transport> = self.clone();
        Catalog::with_transport(BASE_URL, transport, ttl).expect("fake server URL is valid")
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Seeding and inspection
    // ========================================================================

    pub fn put_document(&self, path: &str, body: &str) {
        self.lock().documents.insert(path.to_string(), body.to_string());
    }

    pub fn document(&self, path: &str) -> Option<String> {
        self.lock().documents.get(path).cloned()
    }

    pub fn has_document(&self, path: &str) -> bool {
        self.lock().documents.contains_key(path)
    }

    pub fn remove_document(&self, path: &str) -> Option<String> {
        self.lock().documents.remove(path)
    }

    /// Add a workspace with its namespace.
    pub fn add_workspace(&self, name: &str, uri: &str) {
        let mut state = self.lock();
        state.insert_workspace(name, uri);
    }

    pub fn default_workspace(&self) -> Option<String> {
        self.lock().default_workspace.clone()
    }

    pub fn set_default_workspace(&self, name: &str) {
        self.lock().default_workspace = Some(name.to_string());
    }

    pub fn add_role(&self, role: &str) {
        self.lock().roles.insert(role.to_string());
    }

    pub fn grant_role(&self, user: &str, role: &str) {
        let mut state = self.lock();
        state.roles.insert(role.to_string());
        state
            .user_roles
            .entry(user.to_string())
            .or_default()
            .insert(role.to_string());
    }

    pub fn roles_of(&self, user: &str) -> Vec<String> {
        self.lock()
            .user_roles
            .get(user)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn master_password(&self) -> String {
        self.lock().master_password.clone()
    }

    pub fn set_master_password(&self, password: &str) {
        self.lock().master_password = password.to_string();
    }

    /// Answer the next request with `status` instead of routing it.
    pub fn fail_next(&self, status: u16) {
        self.lock().injected.push_back(status);
    }

    /// While set, every request fails as if the connection was refused.
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse = refuse;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().log.len()
    }

    /// Requests that could change server state.
    pub fn write_count(&self) -> usize {
        self.lock().log.iter().filter(|r| r.is_write()).count()
    }

    /// Requests with the given method and path.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.lock().log.last().cloned()
    }

    /// Most recent request with the given method and path.
    pub fn last_request_matching(&self, method: Method, path: &str) -> Option<RecordedRequest> {
        self.lock()
            .log
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }
}

#[async_trait]
impl Transport for FakeGeoServer {
    async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse> {
        let recorded = RecordedRequest::from_request(&request);
        let mut state = self.lock();
        state.log.push(recorded.clone());

        if state.refuse {
            return Err(GsError::FailedRequest {
                status: None,
                url: request.url,
                body: "Connection refused".to_string(),
            });
        }
        if let Some(status) = state.injected.pop_front() {
            return Ok(HttpResponse::new(status, "Injected failure"));
        }
        Ok(state.route(&recorded))
    }
}

// ============================================================================
// Routing
// ============================================================================

fn respond(status: u16, body: impl Into<String>) -> HttpResponse {
    HttpResponse::new(status, body.into())
}

fn is_upload(segment: &str) -> bool {
    ["file.", "external.", "url."]
        .iter()
        .any(|prefix| segment.starts_with(prefix))
}

fn render(element: &Element) -> String {
    element.to_xml().unwrap_or_default()
}

/// Entry of a listing document: the root element with its name.
fn listing_entry(doc: &Element) -> Element {
    let mut entry = Element::new(doc.name.clone());
    for name in ["name", "userName"] {
        if let Some(text) = doc.find_text(name) {
            entry.children.push(Element::new(name).with_text(text));
        }
    }
    entry
}

impl ServerState {
    fn route(&mut self, request: &RecordedRequest) -> HttpResponse {
        match request.method {
            Method::GET => self.get(&request.path),
            Method::POST => self.post(request),
            Method::PUT => self.put(request),
            Method::DELETE => self.delete(request),
            _ => respond(405, "Method not allowed"),
        }
    }

    fn insert_workspace(&mut self, name: &str, uri: &str) {
        let workspace = Element::new("workspace")
            .with_child(Element::new("name").with_text(name))
            .with_child(Element::new("isolated").with_text("false"));
        let namespace = Element::new("namespace")
            .with_child(Element::new("prefix").with_text(name))
            .with_child(Element::new("uri").with_text(uri));
        self.documents
            .insert(format!("workspaces/{}.xml", name), render(&workspace));
        self.documents
            .insert(format!("namespaces/{}.xml", name), render(&namespace));
        if self.default_workspace.is_none() {
            self.default_workspace = Some(name.to_string());
        }
    }

    /// A path below `workspaces/<ws>/` needs that workspace; one below a
    /// store collection needs the store.
    fn missing_scope(&self, path: &str) -> Option<HttpResponse> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.first() != Some(&"workspaces") || segments.len() < 3 {
            return None;
        }
        let workspace = segments[1];
        if !self.documents.contains_key(&format!("workspaces/{}.xml", workspace)) {
            return Some(respond(404, format!("No such workspace: '{}' found", workspace)));
        }
        if segments.len() >= 5 {
            let store = format!("workspaces/{}/{}/{}.xml", workspace, segments[2], segments[3]);
            if !self.documents.contains_key(&store) {
                return Some(respond(404, format!("No such store: {}", segments[3])));
            }
        }
        None
    }

    fn get(&self, path: &str) -> HttpResponse {
        match path {
            "workspaces/default.xml" => {
                return match &self.default_workspace {
                    Some(name) => {
                        let doc = Element::new("workspace").with_child(Element::new("name").with_text(name));
                        respond(200, render(&doc))
                    }
                    None => respond(404, "No default workspace"),
                }
            }
            "security/roles" => return respond(200, render(&role_list(self.roles.iter()))),
            "security/masterpw.xml" => {
                let doc = Element::new("masterPassword")
                    .with_child(Element::new("oldMasterPassword").with_text(&self.master_password));
                return respond(200, render(&doc));
            }
            _ => {}
        }
        if let Some(user) = path.strip_prefix("security/roles/user/") {
            let roles = self.user_roles.get(user).into_iter().flatten();
            return respond(200, render(&role_list(roles)));
        }

        if let Some(body) = self.documents.get(path) {
            return respond(200, body.clone());
        }
        if let Some(body) = self.unqualified_layer(path) {
            return respond(200, body);
        }
        if let Some(body) = self.style_without_extension(path) {
            return respond(200, body);
        }
        if let Some(response) = self.listing(path) {
            return response;
        }
        self.missing_scope(path)
            .unwrap_or_else(|| respond(404, format!("No such resource: {}", path)))
    }

    /// `layers/states.xml` finds `layers/topp:states.xml`.
    fn unqualified_layer(&self, path: &str) -> Option<String> {
        let name = path.strip_prefix("layers/")?.strip_suffix(".xml")?;
        if name.contains(':') {
            return None;
        }
        let suffix = format!(":{}.xml", name);
        self.documents
            .iter()
            .find(|(p, _)| p.starts_with("layers/") && p.ends_with(&suffix))
            .map(|(_, body)| body.clone())
    }

    /// `styles/population` answers with the stored style body.
    fn style_without_extension(&self, path: &str) -> Option<String> {
        let (parent, name) = path.rsplit_once('/')?;
        if !parent.ends_with("styles") || name.contains('.') {
            return None;
        }
        self.documents.get(&format!("{}.sld", path)).cloned()
    }

    fn listing(&self, path: &str) -> Option<HttpResponse> {
        let (collection, extension) = match path.strip_suffix(".xml") {
            Some(collection) => (collection, ".xml"),
            None => (path.strip_suffix('/')?, ""),
        };
        let last = collection.rsplit('/').next()?;
        if !COLLECTIONS.contains(&last) {
            return None;
        }
        if let Some(missing) = self.missing_scope(collection) {
            return Some(missing);
        }

        let prefix = format!("{}/", collection);
        let mut listing = Element::new(last);
        for (doc_path, body) in &self.documents {
            let Some(rest) = doc_path.strip_prefix(&prefix) else {
                continue;
            };
            if rest.contains('/') || !rest.ends_with(extension) {
                continue;
            }
            if let Ok(doc) = Element::parse(body) {
                listing.children.push(listing_entry(&doc));
            }
        }
        Some(respond(200, render(&listing)))
    }

    fn post(&mut self, request: &RecordedRequest) -> HttpResponse {
        let path = request.path.trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').collect();

        match segments.as_slice() {
            ["reload"] | ["reset"] => return respond(200, ""),
            ["security", "roles", "role", role, "user", user] => {
                self.roles.insert(role.to_string());
                self.user_roles
                    .entry(user.to_string())
                    .or_default()
                    .insert(role.to_string());
                return respond(200, "");
            }
            ["namespaces"] => return self.create_namespace(request),
            _ => {}
        }

        match segments.last() {
            Some(last) if is_upload(last) => match self.missing_scope(path) {
                Some(missing) => missing,
                None => respond(202, ""),
            },
            Some(last) if COLLECTIONS.contains(last) => self.create(path, request),
            _ => respond(405, format!("Cannot POST to {}", path)),
        }
    }

    fn create_namespace(&mut self, request: &RecordedRequest) -> HttpResponse {
        let Some(doc) = request.body.as_deref().and_then(|b| Element::parse(b).ok()) else {
            return respond(400, "Unparseable namespace");
        };
        let (Some(prefix), Some(uri)) = (doc.find_text("prefix"), doc.find_text("uri")) else {
            return respond(400, "Namespace needs a prefix and a URI");
        };
        if self.documents.contains_key(&format!("workspaces/{}.xml", prefix)) {
            return respond(409, format!("Namespace with prefix '{}' already exists", prefix));
        }
        self.insert_workspace(prefix, uri);
        respond(201, prefix.to_string())
    }

    fn create(&mut self, collection: &str, request: &RecordedRequest) -> HttpResponse {
        if let Some(missing) = self.missing_scope(collection) {
            return missing;
        }
        let Some(mut doc) = request.body.as_deref().and_then(|b| Element::parse(b).ok()) else {
            return respond(400, "Unparseable document");
        };
        let name = request
            .query_value("name")
            .or_else(|| doc.find_text("name"))
            .or_else(|| doc.find_text("userName"))
            .map(str::to_string);
        let Some(name) = name else {
            return respond(400, "No name given");
        };

        let extension = if collection.ends_with("users") { "" } else { ".xml" };
        let doc_path = format!("{}/{}{}", collection, name, extension);
        if self.documents.contains_key(&doc_path) {
            return respond(409, format!("Resource named '{}' already exists", name));
        }
        if doc.child("name").is_none() && doc.child("userName").is_none() {
            doc.children.insert(0, Element::new("name").with_text(name.as_str()));
        }
        self.documents.insert(doc_path, render(&doc));

        let segments: Vec<&str> = collection.split('/').collect();
        if let ["workspaces", workspace, _, _, kind] = segments.as_slice() {
            self.publish_layer(workspace, collection, kind, &name);
        }
        respond(201, name)
    }

    /// Configuring a resource publishes a layer for it.
    fn publish_layer(&mut self, workspace: &str, collection: &str, kind: &str, name: &str) {
        let (class, layer_type) = match kind {
            "featuretypes" => ("featureType", "VECTOR"),
            "coverages" => ("coverage", "RASTER"),
            "wmslayers" => ("wmsLayer", "WMS"),
            _ => return,
        };
        let qualified = format!("{}:{}", workspace, name);
        let link = Element::new("atom:link")
            .with_attr("xmlns:atom", ATOM_NS)
            .with_attr("rel", "alternate")
            .with_attr("href", format!("{}/{}/{}.xml", BASE_URL, collection, name))
            .with_attr("type", "application/xml");
        let layer = Element::new("layer")
            .with_child(Element::new("name").with_text(qualified.as_str()))
            .with_child(Element::new("type").with_text(layer_type))
            .with_child(
                Element::new("resource")
                    .with_attr("class", class)
                    .with_child(Element::new("name").with_text(qualified.as_str()))
                    .with_child(link),
            )
            .with_child(Element::new("enabled").with_text("true"));
        self.documents
            .insert(format!("layers/{}.xml", qualified), render(&layer));
    }

    fn put(&mut self, request: &RecordedRequest) -> HttpResponse {
        let path = request.path.as_str();
        let body = request.body.clone().unwrap_or_default();

        match path {
            "workspaces/default.xml" => {
                let name = Element::parse(&body)
                    .ok()
                    .and_then(|doc| doc.find_text("name").map(str::to_string));
                return match name {
                    Some(name) if self.documents.contains_key(&format!("workspaces/{}.xml", name)) => {
                        self.default_workspace = Some(name);
                        respond(200, "")
                    }
                    _ => respond(404, "No such workspace"),
                };
            }
            "security/masterpw.xml" => {
                let Ok(doc) = Element::parse(&body) else {
                    return respond(400, "Unparseable master password change");
                };
                if doc.find_text("oldMasterPassword") != Some(self.master_password.as_str()) {
                    return respond(422, "Wrong master password");
                }
                self.master_password = doc.find_text("newMasterPassword").unwrap_or_default().to_string();
                return respond(200, "");
            }
            "security/self/password.xml" => return respond(200, ""),
            _ => {}
        }

        let segments: Vec<&str> = path.split('/').collect();
        if let Some(last) = segments.last().filter(|last| is_upload(last)) {
            return self.upload(&segments, last);
        }

        let is_xml = request
            .header("Content-Type")
            .map_or(false, |ct| ct == "application/xml" || ct == "text/xml");
        if path.ends_with(".sld") || !is_xml {
            return self.put_style_body(path, body);
        }

        let Some(stored) = self.documents.get(path) else {
            return self
                .missing_scope(path)
                .unwrap_or_else(|| respond(404, format!("No such resource: {}", path)));
        };
        let (Ok(mut current), Ok(update)) = (Element::parse(stored), Element::parse(&body)) else {
            return respond(400, "Unparseable document");
        };
        for child in update.children {
            current.set_child(child);
        }
        self.documents.insert(path.to_string(), render(&current));
        respond(200, "")
    }

    /// A style body lands next to the style document.
    fn put_style_body(&mut self, path: &str, body: String) -> HttpResponse {
        let stem = path
            .strip_suffix(".sld")
            .or_else(|| path.strip_suffix(".xml"))
            .unwrap_or(path);
        if !self.documents.contains_key(&format!("{}.xml", stem)) {
            return respond(404, format!("No such style: {}", stem));
        }
        self.documents.insert(format!("{}.sld", stem), body);
        respond(200, "")
    }

    /// `workspaces/<ws>/<kind>/<store>/file.<ext>` creates the store.
    fn upload(&mut self, segments: &[&str], last: &str) -> HttpResponse {
        let ["workspaces", workspace, kind, store, _] = segments else {
            return respond(404, "Unknown upload target");
        };
        if !self.documents.contains_key(&format!("workspaces/{}.xml", workspace)) {
            return respond(404, format!("No such workspace: '{}' found", workspace));
        }
        let root = match *kind {
            "datastores" => "dataStore",
            "coveragestores" => "coverageStore",
            _ => return respond(405, format!("Cannot upload to {}", kind)),
        };
        let store_type = last.split_once('.').map(|(_, ext)| ext).unwrap_or_default();
        let path = format!("workspaces/{}/{}/{}.xml", workspace, kind, store);
        if !self.documents.contains_key(&path) {
            let doc = Element::new(root)
                .with_child(Element::new("name").with_text(*store))
                .with_child(Element::new("type").with_text(store_type))
                .with_child(Element::new("enabled").with_text("true"))
                .with_child(Element::new("workspace").with_child(Element::new("name").with_text(*workspace)));
            self.documents.insert(path, render(&doc));
        }
        respond(201, "")
    }

    fn delete(&mut self, request: &RecordedRequest) -> HttpResponse {
        let path = request.path.as_str();
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            ["security", "roles", "role", role, "user", user] => {
                if let Some(roles) = self.user_roles.get_mut(*user) {
                    roles.remove(*role);
                }
                return respond(200, "");
            }
            [.., "index", "granules", _] => return respond(200, ""),
            _ => {}
        }

        if self.documents.remove(path).is_none() {
            return respond(404, format!("No such resource: {}", path));
        }
        if request.query_value("recurse") == Some("true") {
            let stem = path.strip_suffix(".xml").unwrap_or(path);
            let prefix = format!("{}/", stem);
            self.documents.retain(|p, _| !p.starts_with(&prefix));
        }
        if let ["workspaces", file] = segments.as_slice() {
            let name = file.strip_suffix(".xml").unwrap_or(*file);
            self.documents.remove(&format!("namespaces/{}.xml", name));
            if self.default_workspace.as_deref() == Some(name) {
                self.default_workspace = None;
            }
        }
        respond(200, "")
    }
}

fn role_list<'a>(roles: impl Iterator<Item = &'a String>) -> Element {
    let mut list = Element::new("roles");
    for role in roles {
        list.children.push(Element::new("role").with_text(role.as_str()));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(server: &FakeGeoServer, path: &str) -> HttpResponse {
        server.lock().route(&RecordedRequest {
            method: Method::GET,
            url: format!("{}/{}", BASE_URL, path),
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        })
    }

    #[test]
    fn test_listing_follows_documents() {
        let server = FakeGeoServer::new();
        server.add_workspace("topp", "http://www.openplans.org/topp");
        server.add_workspace("sf", "http://www.openplans.org/spearfish");

        let listing = get(&server, "workspaces.xml");
        assert_eq!(listing.status, 200);
        assert_eq!(
            listing.text(),
            "<workspaces><workspace><name>sf</name></workspace><workspace><name>topp</name></workspace></workspaces>"
        );
        assert_eq!(get(&server, "workspaces/topp/datastores.xml").text(), "<datastores></datastores>");
    }

    #[test]
    fn test_missing_workspace_and_entity() {
        let server = FakeGeoServer::new();
        let listing = get(&server, "workspaces/nowhere/datastores.xml");
        assert_eq!(listing.status, 404);
        assert!(listing.text().contains("No such workspace"));
        assert_eq!(get(&server, "layers/missing.xml").status, 404);
    }

    #[test]
    fn test_first_workspace_becomes_default() {
        let server = FakeGeoServer::new();
        server.add_workspace("topp", "http://www.openplans.org/topp");
        server.add_workspace("sf", "http://www.openplans.org/spearfish");
        assert_eq!(server.default_workspace().as_deref(), Some("topp"));
    }
}
