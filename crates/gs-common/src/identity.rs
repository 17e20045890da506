//! Identity of remote configuration entities.

use serde::{Deserialize, Serialize};

/// The identity fields that locate one remote entity: its name and the
/// optional workspace and store it is scoped under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceKey {
    pub name: String,
    pub workspace: Option<String>,
    pub store: Option<String>,
}

impl ResourceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace: None,
            store: None,
        }
    }

    pub fn in_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn in_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Parse a qualified name like "topp:states".
    pub fn parse_qualified(s: &str) -> Self {
        match s.split_once(':') {
            Some((ws, name)) => Self::new(name).in_workspace(ws),
            None => Self::new(s),
        }
    }

    /// The workspace-qualified name ("ws:name"), or the bare name.
    pub fn qualified_name(&self) -> String {
        match &self.workspace {
            Some(ws) if !ws.is_empty() => format!("{}:{}", ws, self.name),
            _ => self.name.clone(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.workspace, &self.store) {
            (Some(ws), Some(store)) => write!(f, "{}/{}/{}", ws, store, self.name),
            (Some(ws), None) => write!(f, "{}/{}", ws, self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Either a bare name or a handle on an entity that carries one.
///
/// Catalog operations accept both and normalize once, at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Name(String),
    Ref(ResourceKey),
}

impl Identity {
    pub fn name(&self) -> &str {
        match self {
            Identity::Name(name) => name,
            Identity::Ref(key) => &key.name,
        }
    }

    /// The workspace carried by a handle; bare names carry none.
    pub fn workspace(&self) -> Option<&str> {
        match self {
            Identity::Name(_) => None,
            Identity::Ref(key) => key.workspace.as_deref(),
        }
    }

    pub fn into_key(self) -> ResourceKey {
        match self {
            Identity::Name(name) => ResourceKey::new(name),
            Identity::Ref(key) => key,
        }
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Identity::Name(name.to_string())
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Identity::Name(name)
    }
}

impl From<&String> for Identity {
    fn from(name: &String) -> Self {
        Identity::Name(name.clone())
    }
}

impl From<ResourceKey> for Identity {
    fn from(key: ResourceKey) -> Self {
        Identity::Ref(key)
    }
}

impl From<&ResourceKey> for Identity {
    fn from(key: &ResourceKey) -> Self {
        Identity::Ref(key.clone())
    }
}

/// Split a comma delimited name filter, dropping blanks.
pub fn parse_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
