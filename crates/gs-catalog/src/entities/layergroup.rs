//! Layer groups: named, ordered sets of layers rendered together.

use gs_common::{BoundingBox, GsResult, ResourceKey};
use tracing::info;

use crate::catalog::{Catalog, ListFilter};
use crate::convert::{FieldValue, Shape};
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::{Creation, Locator};
use crate::resource::BoundResource;

pub static LAYER_GROUP: ResourceDescriptor = ResourceDescriptor {
    resource_type: "layerGroup",
    locator: Locator::optional_workspace("layergroups", "layerGroup").created_by(Creation::QueryName),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::text("mode"),
        FieldSpec::text("title"),
        FieldSpec::text("abstractTxt"),
        FieldSpec::new("workspace", Shape::NamedRef).read_only(),
        FieldSpec::new("bounds", Shape::BoundingBox),
        FieldSpec::new("layers", Shape::LayerList).at("publishables"),
        FieldSpec::new("styles", Shape::StyleList),
    ],
};

/// Parameters of a new layer group. `layers` and `styles` pair up by index;
/// an empty style name selects the layer's default style.
#[derive(Debug, Clone, Default)]
pub struct LayerGroupDraft {
    pub name: String,
    pub workspace: Option<String>,
    pub layers: Vec<String>,
    pub styles: Vec<String>,
    pub bounds: Option<BoundingBox>,
    pub mode: Option<String>,
    pub title: Option<String>,
    pub abstract_txt: Option<String>,
}

impl LayerGroupDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles = styles.into_iter().map(Into::into).collect();
        self
    }

    pub fn bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// `single`, `named`, `container` or `eo`; any case.
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn abstract_txt(mut self, abstract_txt: impl Into<String>) -> Self {
        self.abstract_txt = Some(abstract_txt.into());
        self
    }

    fn key(&self) -> ResourceKey {
        let key = ResourceKey::new(self.name.as_str());
        match self.workspace.as_deref().filter(|ws| !ws.is_empty()) {
            Some(ws) => key.in_workspace(ws),
            None => key,
        }
    }

    fn into_values(self) -> Vec<(&'static str, FieldValue)> {
        let mut values: Vec<(&'static str, FieldValue)> = vec![
            ("name", self.name.into()),
            ("mode", self.mode.unwrap_or_else(|| "single".to_string()).to_uppercase().into()),
            ("bounds", self.bounds.unwrap_or_else(BoundingBox::world).into()),
            ("layers", self.layers.into()),
            ("styles", self.styles.into()),
        ];
        if let Some(title) = self.title {
            values.push(("title", title.into()));
        }
        if let Some(abstract_txt) = self.abstract_txt {
            values.push(("abstractTxt", abstract_txt.into()));
        }
        values
    }
}

impl Catalog {
    pub async fn get_layergroups(&self, names: &[&str], workspaces: &[&str]) -> GsResult<Vec<BoundResource>> {
        let mut filter = ListFilter::named(names.iter().copied());
        if !workspaces.is_empty() {
            filter = filter.in_workspaces(workspaces.iter().copied());
        }
        self.list(&LAYER_GROUP, &filter).await
    }

    /// A layer group by name. Without a workspace only global groups are
    /// searched.
    pub async fn get_layergroup(&self, name: &str, workspace: Option<&str>) -> GsResult<Option<BoundResource>> {
        let filter = ListFilter::named([name]).in_workspace(workspace);
        self.get_unique(&LAYER_GROUP, &filter).await
    }

    /// A creation handle for a new layer group; nothing is written until it
    /// is saved. Fails with a conflict when the group already exists.
    pub async fn create_layergroup(&self, draft: LayerGroupDraft) -> GsResult<BoundResource> {
        let key = draft.key();
        self.check_conflict(&LAYER_GROUP, &key, false).await?;
        info!(layer_group = %key, layers = draft.layers.len(), "Preparing layer group");
        self.unsaved(&LAYER_GROUP, key, draft.into_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpRequest, HttpResponse, Transport};
    use async_trait::async_trait;
    use gs_common::GsError;
    use std::sync::Arc;
    use std::time::Duration;

    struct Groups;

    #[async_trait]
    impl Transport for Groups {
        async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse> {
            if request.url.ends_with("/rest/layergroups.xml") {
                Ok(HttpResponse::new(
                    200,
                    "<layerGroups><layerGroup><name>base</name></layerGroup></layerGroups>",
                ))
            } else {
                Ok(HttpResponse::new(404, "not found"))
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::with_transport("http://localhost:8080/geoserver/rest", Arc::new(Groups), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_layergroup_defaults() {
        let catalog = catalog();
        let group = catalog
            .create_layergroup(
                LayerGroupDraft::new("overview")
                    .layers(["topp:states", "topp:roads"])
                    .styles(["population", ""])
                    .mode("named"),
            )
            .await
            .unwrap();
        assert!(group.is_creation());
        assert_eq!(
            group.save_url().unwrap(),
            "http://localhost:8080/geoserver/rest/layergroups?name=overview"
        );
        let body = group.message().unwrap();
        assert!(body.starts_with("<layerGroup><name>overview</name><mode>NAMED</mode>"));
        assert!(body.contains("<minx>-180</minx><maxx>180</maxx><miny>-90</miny><maxy>90</maxy>"));
        assert!(body.contains(r#"<crs class="projected">EPSG:4326</crs>"#));
        assert!(body.contains(r#"<publishables><published type="layer"><name>topp:states</name></published>"#));
        assert!(body.contains("<style><name>population</name></style><style></style>"));
    }

    #[tokio::test]
    async fn test_create_layergroup_conflict() {
        let err = catalog()
            .create_layergroup(LayerGroupDraft::new("base"))
            .await
            .unwrap_err();
        assert!(matches!(err, GsError::ConflictingData(_)));
    }

    #[tokio::test]
    async fn test_workspace_group_addressing() {
        let group = catalog()
            .create_layergroup(LayerGroupDraft::new("local").workspace("topp"))
            .await
            .unwrap();
        assert_eq!(
            group.save_url().unwrap(),
            "http://localhost:8080/geoserver/rest/workspaces/topp/layergroups?name=local"
        );
    }
}
