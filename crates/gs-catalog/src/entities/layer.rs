//! Layers: the published face of a resource, with its styles.

use gs_common::{GsError, GsResult, ResourceKey};
use tracing::debug;

use crate::catalog::{Catalog, ListFilter};
use crate::convert::Shape;
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::resource::BoundResource;
use crate::url::{store_from_href, workspace_from_href};

use super::store::StoreKind;

/// `defaultStyle` and `styles` hold qualified `workspace:name` values for
/// workspace styles and bare names for global ones.
pub static LAYER: ResourceDescriptor = ResourceDescriptor {
    resource_type: "layer",
    locator: Locator::global("layers", "layer"),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::text("path"),
        FieldSpec::text("type").read_only(),
        FieldSpec::new("defaultStyle", Shape::StyleRef),
        FieldSpec::new("styles", Shape::StyleList),
        FieldSpec::new("resource", Shape::NamedRef).read_only(),
        FieldSpec::boolean("opaque"),
        FieldSpec::boolean("queryable"),
        FieldSpec::new("attribution", Shape::Attribution),
        FieldSpec::forced_flag("enabled"),
        FieldSpec::forced_flag("advertised"),
    ],
};

/// Split a layer or resource name into workspace and local name.
fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((ws, local)) => (Some(ws), local),
        None => (None, name),
    }
}

impl Catalog {
    /// Every layer, or only those publishing `resource`. Filtering by resource
    /// fetches each layer.
    pub async fn get_layers(&self, resource: Option<&BoundResource>) -> GsResult<Vec<BoundResource>> {
        let layers = self.list(&LAYER, &ListFilter::all()).await?;
        let Some(resource) = resource else {
            return Ok(layers);
        };

        let mut matching = Vec::new();
        for mut layer in layers {
            match self.layer_resource(&mut layer).await? {
                Some(published) if published.descriptor() == resource.descriptor() && published.key() == resource.key() => {
                    matching.push(layer)
                }
                _ => {}
            }
        }
        Ok(matching)
    }

    /// Layers publishing the resource named `name` (optionally `ws:name`).
    pub async fn get_layers_of(&self, name: &str) -> GsResult<Vec<BoundResource>> {
        let (workspace, local) = split_qualified(name);
        let workspaces: Vec<&str> = workspace.into_iter().collect();
        let resource = self.get_resources(&[local], &[], &workspaces).await?.into_iter().next();
        match resource {
            Some(resource) => self.get_layers(Some(&resource)).await,
            None => Ok(Vec::new()),
        }
    }

    /// A layer by name, fetched. A layer the server does not know is `None`;
    /// any other failure is an error.
    pub async fn get_layer(&self, name: &str) -> GsResult<Option<BoundResource>> {
        let mut layer = self.bind(&LAYER, ResourceKey::new(name));
        match layer.fetch().await {
            Ok(()) => Ok(Some(layer)),
            Err(e) if e.is_not_found() => {
                debug!(layer = name, "No such layer");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The resource a layer publishes, resolved through the link embedded in
    /// the layer document. Fetches the layer if needed.
    pub async fn layer_resource(&self, layer: &mut BoundResource) -> GsResult<Option<BoundResource>> {
        if layer.descriptor() != &LAYER {
            return Err(GsError::InvalidArgument(format!(
                "{} is not a layer",
                layer.resource_type()
            )));
        }
        layer.ensure_fetched().await?;

        let Some(node) = layer.dom().and_then(|dom| dom.find("resource")) else {
            return Ok(None);
        };
        let Some(name) = node.find_text("name") else {
            return Ok(None);
        };
        let href = node.href().ok_or_else(|| GsError::MalformedResponse {
            url: layer.href().unwrap_or_default(),
            message: "layer resource has no link".to_string(),
        })?;

        let (qualifier, local) = split_qualified(name);
        let workspace = qualifier.map(str::to_string).or_else(|| workspace_from_href(href));
        let (kind, store) = store_from_href(href)
            .and_then(|(collection, store)| StoreKind::from_collection(&collection).map(|kind| (kind, store)))
            .ok_or_else(|| GsError::MalformedResponse {
                url: href.to_string(),
                message: "cannot tell the store from the resource link".to_string(),
            })?;
        let Some(workspace) = workspace else {
            return Ok(None);
        };

        let key = ResourceKey::new(local).in_workspace(workspace).in_store(store);
        Ok(Some(self.bind(kind.resource_descriptor(), key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpRequest, HttpResponse, Transport};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    const STATES_LAYER: &str = r#"<layer>
  <name>topp:states</name>
  <type>VECTOR</type>
  <defaultStyle>
    <name>population</name>
  </defaultStyle>
  <resource class="featureType">
    <name>topp:states</name>
    <atom:link xmlns:atom="http://www.w3.org/2005/Atom" rel="alternate"
      href="http://localhost:8080/geoserver/rest/workspaces/topp/datastores/states_shapefile/featuretypes/states.xml"
      type="application/xml"/>
  </resource>
  <enabled>true</enabled>
</layer>"#;

    struct Layers;

    #[async_trait]
    impl Transport for Layers {
        async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse> {
            if request.url.ends_with("/layers/topp:states.xml") {
                Ok(HttpResponse::new(200, STATES_LAYER))
            } else if request.url.contains("/layers/broken") {
                Ok(HttpResponse::new(500, "boom"))
            } else {
                Ok(HttpResponse::new(404, "No such layer"))
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::with_transport("http://localhost:8080/geoserver/rest", Arc::new(Layers), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_layer_absent_vs_failure() {
        let catalog = catalog();
        assert!(catalog.get_layer("topp:states").await.unwrap().is_some());
        assert!(catalog.get_layer("missing").await.unwrap().is_none());
        let err = catalog.get_layer("broken").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_layer_resource_from_link() {
        let catalog = catalog();
        let mut layer = catalog.get_layer("topp:states").await.unwrap().unwrap();
        let resource = catalog.layer_resource(&mut layer).await.unwrap().unwrap();
        assert_eq!(resource.resource_type(), "featureType");
        assert_eq!(resource.name(), "states");
        assert_eq!(resource.workspace(), Some("topp"));
        assert_eq!(resource.store(), Some("states_shapefile"));
        assert_eq!(
            resource.href().unwrap(),
            "http://localhost:8080/geoserver/rest/workspaces/topp/datastores/states_shapefile/featuretypes/states.xml"
        );
    }

    #[tokio::test]
    async fn test_default_style_read() {
        let catalog = catalog();
        let mut layer = catalog.get_layer("topp:states").await.unwrap().unwrap();
        assert_eq!(layer.get_str("defaultStyle").await.unwrap().as_deref(), Some("population"));
        assert_eq!(layer.get_bool("advertised").await.unwrap(), Some(true));
        assert_eq!(layer.get_str("type").await.unwrap().as_deref(), Some("VECTOR"));
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("topp:states"), (Some("topp"), "states"));
        assert_eq!(split_qualified("states"), (None, "states"));
    }
}
