//! Workspaces and their namespaces.

use gs_common::{GsError, GsResult, ResourceKey};
use gs_xml::XmlBuilder;
use reqwest::Method;
use tracing::info;

use crate::catalog::{Catalog, ListFilter};
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::resource::BoundResource;
use crate::transport::HttpRequest;

use super::render_body;

pub static WORKSPACE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "workspace",
    locator: Locator::global("workspaces", "workspace"),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::boolean("isolated"),
        FieldSpec::boolean("enabled"),
    ],
};

/// A workspace is created through its namespace, which carries the URI.
pub static NAMESPACE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "namespace",
    locator: Locator::global("namespaces", "namespace").named_by("prefix"),
    write_all: false,
    fields: &[
        FieldSpec::text("prefix"),
        FieldSpec::text("uri"),
        FieldSpec::boolean("isolated"),
    ],
};

impl Catalog {
    /// Workspaces, optionally restricted to `names`. Unknown names are
    /// silently absent from the result.
    pub async fn get_workspaces(&self, names: &[&str]) -> GsResult<Vec<BoundResource>> {
        self.list(&WORKSPACE, &ListFilter::named(names.iter().copied())).await
    }

    pub async fn get_workspace(&self, name: &str) -> GsResult<Option<BoundResource>> {
        self.get_one(&WORKSPACE, &ResourceKey::new(name)).await
    }

    /// Create a workspace by posting its namespace.
    pub async fn create_workspace(&self, name: &str, uri: &str) -> GsResult<Option<BoundResource>> {
        let mut namespace = self.unsaved(
            &NAMESPACE,
            ResourceKey::new(name),
            vec![("prefix", name.into()), ("uri", uri.into())],
        )?;
        self.save_expecting(&mut namespace, &[200, 201, 202]).await?;
        info!(workspace = name, uri = uri, "Created workspace");
        self.get_workspace(name).await
    }

    /// The workspace new stores land in when none is named.
    pub async fn get_default_workspace(&self) -> GsResult<BoundResource> {
        let url = self.url(&["workspaces", "default.xml"])?;
        let dom = self.get_xml(&url).await?;
        let name = dom
            .find_text("name")
            .ok_or_else(|| GsError::MalformedResponse {
                url: url.clone(),
                message: "default workspace document has no name".to_string(),
            })?
            .to_string();
        Ok(BoundResource::with_dom(self.clone(), &WORKSPACE, ResourceKey::new(name), dom))
    }

    pub(crate) async fn default_workspace_name(&self) -> GsResult<String> {
        Ok(self.get_default_workspace().await?.name().to_string())
    }

    /// Resolve an optional workspace argument, falling back to the default.
    pub(crate) async fn workspace_or_default(&self, workspace: Option<&str>) -> GsResult<String> {
        match workspace.filter(|ws| !ws.is_empty()) {
            Some(ws) => Ok(ws.to_string()),
            None => self.default_workspace_name().await,
        }
    }

    pub async fn set_default_workspace(&self, name: &str) -> GsResult<()> {
        if self.get_workspace(name).await?.is_none() {
            return Err(GsError::InvalidArgument(format!("no workspace named {}", name)));
        }

        let mut out = XmlBuilder::new();
        out.start("workspace").text_element("name", name).end("workspace");
        let url = self.url(&["workspaces", "default.xml"])?;
        let request = HttpRequest::new(Method::PUT, url).body("application/xml", render_body(&out)?);
        self.write(request, &[200, 201, 202]).await?;
        Ok(())
    }
}
