//! Bound Resource: a local handle on one remote configuration entity.
//!
//! State machine:
//!
//! ```text
//! Unbound --get/fetch--> Fetched --set/delete--> Dirty --save--> Unbound (refetched lazily)
//!    ^                                                     |
//!    +---------------------------- clear ------------------+
//! ```
//!
//! A handle is either *bound* to an existing identity (saves issue `PUT`) or a
//! *creation* handle for an entity that does not exist yet (saves issue `POST`
//! to the collection endpoint). Which one is fixed when the handle is built.
//!
//! Two handles on the same entity race with last-write-wins semantics: no
//! version check is made before a `PUT`.

use gs_common::{BoundingBox, GsResult, Identity, ResourceKey};
use gs_xml::Element;
use reqwest::Method;

use crate::catalog::Catalog;
use crate::convert::FieldValue;
use crate::descriptor::ResourceDescriptor;
use crate::state::ResourceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Unbound,
    Fetched,
    Dirty,
}

#[derive(Clone)]
pub struct BoundResource {
    catalog: Catalog,
    key: ResourceKey,
    state: ResourceState,
    creation: bool,
}

impl std::fmt::Debug for BoundResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundResource")
            .field("resource_type", &self.resource_type())
            .field("key", &self.key)
            .field("creation", &self.creation)
            .field("status", &self.status())
            .finish()
    }
}

impl BoundResource {
    pub(crate) fn bound(catalog: Catalog, descriptor: &'static ResourceDescriptor, key: ResourceKey) -> Self {
        Self {
            catalog,
            key,
            state: ResourceState::new(descriptor),
            creation: false,
        }
    }

    pub(crate) fn with_dom(
        catalog: Catalog,
        descriptor: &'static ResourceDescriptor,
        key: ResourceKey,
        dom: Element,
    ) -> Self {
        Self {
            catalog,
            key,
            state: ResourceState::from_element(descriptor, dom),
            creation: false,
        }
    }

    /// Creation handle. The given values and the defaults of always-written
    /// fields are pending from the start.
    pub(crate) fn unsaved(
        catalog: Catalog,
        descriptor: &'static ResourceDescriptor,
        key: ResourceKey,
        initial: Vec<(&str, FieldValue)>,
    ) -> GsResult<Self> {
        let mut state = ResourceState::new(descriptor);
        state.pin_forced_defaults();
        for (field, value) in initial {
            state.set(field, value)?;
        }
        Ok(Self {
            catalog,
            key,
            state,
            creation: true,
        })
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.state.descriptor()
    }

    pub fn resource_type(&self) -> &'static str {
        self.descriptor().resource_type
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn workspace(&self) -> Option<&str> {
        self.key.workspace.as_deref()
    }

    pub fn store(&self) -> Option<&str> {
        self.key.store.as_deref()
    }

    pub fn identity(&self) -> Identity {
        Identity::Ref(self.key.clone())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_creation(&self) -> bool {
        self.creation
    }

    pub fn status(&self) -> ResourceStatus {
        if self.state.has_pending_edits() {
            ResourceStatus::Dirty
        } else if self.state.is_fetched() {
            ResourceStatus::Fetched
        } else {
            ResourceStatus::Unbound
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state.has_pending_edits()
    }

    pub fn dirty_fields(&self) -> Vec<&'static str> {
        self.state.dirty_fields()
    }

    /// The raw fetched document, if any.
    pub fn dom(&self) -> Option<&Element> {
        self.state.dom()
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    /// Address of the existing entity.
    pub fn href(&self) -> GsResult<String> {
        self.descriptor()
            .locator
            .identity_url(self.catalog.service_url(), &self.key)
    }

    /// Address a save is sent to.
    pub fn save_url(&self) -> GsResult<String> {
        if self.creation {
            self.descriptor()
                .locator
                .creation_url(self.catalog.service_url(), &self.key)
        } else {
            self.href()
        }
    }

    pub fn save_method(&self) -> Method {
        if self.creation {
            Method::POST
        } else {
            Method::PUT
        }
    }

    /// Fetch the document, replacing any previous snapshot.
    pub async fn fetch(&mut self) -> GsResult<()> {
        let dom = self.catalog.get_xml(&self.href()?).await?;
        self.state.set_dom(dom);
        Ok(())
    }

    /// Fetch unless a snapshot is present. Creation handles have nothing to
    /// fetch.
    pub async fn ensure_fetched(&mut self) -> GsResult<()> {
        if self.creation || self.state.is_fetched() {
            return Ok(());
        }
        self.fetch().await
    }

    /// Effective value of a field. Fetches only if the field has no pending
    /// edit and nothing was fetched yet.
    pub async fn get(&mut self, field: &str) -> GsResult<Option<FieldValue>> {
        self.prepare(field).await?;
        self.state.get(field)
    }

    pub async fn get_str(&mut self, field: &str) -> GsResult<Option<String>> {
        self.prepare(field).await?;
        self.state.get_str(field)
    }

    pub async fn get_bool(&mut self, field: &str) -> GsResult<Option<bool>> {
        self.prepare(field).await?;
        self.state.get_bool(field)
    }

    pub async fn get_int(&mut self, field: &str) -> GsResult<Option<i64>> {
        self.prepare(field).await?;
        self.state.get_int(field)
    }

    pub async fn get_float(&mut self, field: &str) -> GsResult<Option<f64>> {
        self.prepare(field).await?;
        self.state.get_float(field)
    }

    pub async fn get_list(&mut self, field: &str) -> GsResult<Option<Vec<String>>> {
        self.prepare(field).await?;
        self.state.get_list(field)
    }

    pub async fn get_bbox(&mut self, field: &str) -> GsResult<Option<BoundingBox>> {
        self.prepare(field).await?;
        self.state.get_bbox(field)
    }

    async fn prepare(&mut self, field: &str) -> GsResult<()> {
        self.descriptor().field(field)?;
        if !self.state.is_field_dirty(field) {
            self.ensure_fetched().await?;
        }
        Ok(())
    }

    /// Record a local edit. Never fetches.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> GsResult<()> {
        self.state.set(field, value.into())
    }

    /// Record an explicit clear of a field.
    pub fn delete(&mut self, field: &str) -> GsResult<()> {
        self.state.delete(field)
    }

    /// Nested sub-document, fetching the parent first if needed.
    pub async fn nested(&mut self, field: &str) -> GsResult<&mut ResourceState> {
        self.descriptor().field(field)?;
        self.ensure_fetched().await?;
        self.state.nested_mut(field)
    }

    /// Pin every writable field to its current value so the next save writes
    /// the complete document.
    pub async fn dirty_all(&mut self) -> GsResult<()> {
        self.ensure_fetched().await?;
        self.state.dirty_all()
    }

    /// Drop the snapshot and every pending edit.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Clear, then fetch.
    pub async fn refresh(&mut self) -> GsResult<()> {
        self.clear();
        self.fetch().await
    }

    /// The request body a save would send.
    pub fn message(&self) -> GsResult<String> {
        self.state.message()
    }

    /// Write pending edits through the catalog.
    ///
    /// On failure the local state is left untouched so the save can be retried.
    pub async fn save(&mut self) -> GsResult<()> {
        let catalog = self.catalog.clone();
        catalog.save(self).await
    }

    /// Fetch if serializing would otherwise miss always-written values.
    pub(crate) async fn prepare_save(&mut self) -> GsResult<()> {
        if !self.creation && self.state.needs_snapshot() {
            self.fetch().await?;
        }
        Ok(())
    }

    pub(crate) fn mark_saved(&mut self) {
        self.state.mark_saved();
        self.creation = false;
    }

    pub(crate) fn set_dom(&mut self, dom: Element) {
        self.state.set_dom(dom);
    }
}
