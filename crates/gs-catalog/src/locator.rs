//! Locator rules: where an entity lives, where its kind is listed, and where
//! a new one is created.

use gs_common::{GsError, GsResult, ResourceKey};
use reqwest::Url;

use crate::descriptor::ResourceDescriptor;
use crate::url::build_url;

/// Containment context that qualifies an address.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    /// `/<collection>/<name>.<ext>`
    Global,
    /// `/workspaces/<ws>/<collection>/<name>.<ext>`
    Workspace,
    /// Global, or workspace scoped when a workspace is given.
    OptionalWorkspace,
    /// `/workspaces/<ws>/<store collection>/<store>/<collection>/<name>.<ext>`,
    /// the store being described by the referenced descriptor.
    Store(&'static ResourceDescriptor),
    /// `/services/<collection>/settings` or
    /// `/services/<collection>/workspaces/<ws>/settings`
    Service,
    /// A single document at `/<collection>`.
    Singleton,
    /// A sub-document without an address of its own.
    Embedded,
}

/// How a not-yet-existing entity is addressed on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    /// The collection endpoint with `?name=<name>`.
    QueryName,
    /// The collection endpoint; the name travels in the body.
    Collection,
}

#[derive(Debug, Clone, Copy)]
pub struct Locator {
    pub scope: Scope,
    /// Collection path below the scope, possibly several segments.
    pub collection: &'static str,
    pub extension: Option<&'static str>,
    /// Child element of a listing document holding one entry.
    pub list_element: &'static str,
    /// Child of a listing entry holding the entity name.
    pub name_element: &'static str,
    pub creation: Creation,
}

impl Locator {
    const fn base(scope: Scope, collection: &'static str, list_element: &'static str) -> Self {
        Self {
            scope,
            collection,
            extension: Some("xml"),
            list_element,
            name_element: "name",
            creation: Creation::Collection,
        }
    }

    pub const fn global(collection: &'static str, list_element: &'static str) -> Self {
        Self::base(Scope::Global, collection, list_element)
    }

    pub const fn workspace(collection: &'static str, list_element: &'static str) -> Self {
        Self::base(Scope::Workspace, collection, list_element)
    }

    pub const fn optional_workspace(collection: &'static str, list_element: &'static str) -> Self {
        Self::base(Scope::OptionalWorkspace, collection, list_element)
    }

    pub const fn store(
        store: &'static ResourceDescriptor,
        collection: &'static str,
        list_element: &'static str,
    ) -> Self {
        Self::base(Scope::Store(store), collection, list_element)
    }

    pub const fn service(kind: &'static str) -> Self {
        let mut locator = Self::base(Scope::Service, kind, "");
        locator.extension = None;
        locator
    }

    pub const fn singleton(path: &'static str) -> Self {
        let mut locator = Self::base(Scope::Singleton, path, "");
        locator.extension = None;
        locator
    }

    pub const fn embedded() -> Self {
        let mut locator = Self::base(Scope::Embedded, "", "");
        locator.extension = None;
        locator
    }

    pub const fn without_extension(mut self) -> Self {
        self.extension = None;
        self
    }

    pub const fn named_by(mut self, name_element: &'static str) -> Self {
        self.name_element = name_element;
        self
    }

    pub const fn created_by(mut self, creation: Creation) -> Self {
        self.creation = creation;
        self
    }

    fn with_extension(&self, name: &str) -> String {
        match self.extension {
            Some(ext) => format!("{}.{}", name, ext),
            None => name.to_string(),
        }
    }

    fn push_collection(&self, segments: &mut Vec<String>) {
        segments.extend(
            self.collection
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }

    fn require<'a>(&self, what: &str, value: Option<&'a str>) -> GsResult<&'a str> {
        value.filter(|v| !v.is_empty()).ok_or_else(|| {
            GsError::InvalidArgument(format!("{} requires a {} to be addressed", self.collection, what))
        })
    }

    /// Path of the collection endpoint, without extension.
    pub fn collection_segments(&self, workspace: Option<&str>, store: Option<&str>) -> GsResult<Vec<String>> {
        let mut segments = Vec::new();
        match self.scope {
            Scope::Global | Scope::Singleton => {}
            Scope::Workspace => {
                segments.push("workspaces".to_string());
                segments.push(self.require("workspace", workspace)?.to_string());
            }
            Scope::OptionalWorkspace => {
                if let Some(ws) = workspace.filter(|ws| !ws.is_empty()) {
                    segments.push("workspaces".to_string());
                    segments.push(ws.to_string());
                }
            }
            Scope::Store(parent) => {
                segments.push("workspaces".to_string());
                segments.push(self.require("workspace", workspace)?.to_string());
                parent.locator.push_collection(&mut segments);
                segments.push(self.require("store", store)?.to_string());
            }
            Scope::Service => {
                segments.push("services".to_string());
                self.push_collection(&mut segments);
                if let Some(ws) = workspace.filter(|ws| !ws.is_empty()) {
                    segments.push("workspaces".to_string());
                    segments.push(ws.to_string());
                }
                segments.push("settings".to_string());
                return Ok(segments);
            }
            Scope::Embedded => {
                return Err(GsError::InvalidArgument(
                    "embedded documents have no address".to_string(),
                ))
            }
        }
        self.push_collection(&mut segments);
        Ok(segments)
    }

    /// Path of an existing entity.
    pub fn identity_segments(&self, key: &ResourceKey) -> GsResult<Vec<String>> {
        let mut segments = self.collection_segments(key.workspace.as_deref(), key.store.as_deref())?;
        match self.scope {
            Scope::Singleton | Scope::Service => {}
            _ => segments.push(self.with_extension(&key.name)),
        }
        Ok(segments)
    }

    /// Path of a listing document.
    pub fn listing_segments(&self, workspace: Option<&str>, store: Option<&str>) -> GsResult<Vec<String>> {
        let mut segments = self.collection_segments(workspace, store)?;
        match self.extension {
            Some(ext) => {
                if let Some(last) = segments.last_mut() {
                    last.push('.');
                    last.push_str(ext);
                }
            }
            None => segments.push(String::new()),
        }
        Ok(segments)
    }

    pub fn identity_url(&self, base: &Url, key: &ResourceKey) -> GsResult<String> {
        build_url::<_, &str, &str>(base, &self.identity_segments(key)?, &[])
    }

    pub fn listing_url(&self, base: &Url, workspace: Option<&str>, store: Option<&str>) -> GsResult<String> {
        build_url::<_, &str, &str>(base, &self.listing_segments(workspace, store)?, &[])
    }

    /// Address a POST creating `key` is sent to.
    pub fn creation_url(&self, base: &Url, key: &ResourceKey) -> GsResult<String> {
        match self.scope {
            Scope::Singleton | Scope::Service | Scope::Embedded => Err(GsError::InvalidArgument(format!(
                "{} documents cannot be created",
                self.collection
            ))),
            _ => {
                let segments = self.collection_segments(key.workspace.as_deref(), key.store.as_deref())?;
                match self.creation {
                    Creation::QueryName => build_url(base, &segments, &[("name", key.name.as_str())]),
                    Creation::Collection => build_url::<_, &str, &str>(base, &segments, &[]),
                }
            }
        }
    }
}
