//! Entity operations end to end: stores, resources, layers, styles, layer
//! groups, service and global settings, and uploads.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gs_catalog::{
    Catalog, CoverageStoreDraft, FeatureTypeList, FieldValue, GsError, GsResult, HttpRequest, HttpResponse,
    LayerGroupDraft, Method, MosaicConfigure, OgcService, ResourceKey, StyleFormat, Transport, UploadData,
    WMS_LAYER,
};
use test_utils::{fixtures, FakeGeoServer, BASE_URL};

const ROADS_SLD: &str = r#"<StyledLayerDescriptor version="1.0.0">
  <NamedLayer>
    <Name>roads</Name>
    <UserStyle>
      <Title>Road network</Title>
    </UserStyle>
  </NamedLayer>
</StyledLayerDescriptor>"#;

// ============================================================================
// Stores
// ============================================================================

#[tokio::test]
async fn test_list_stores_of_every_kind() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let stores = catalog.get_stores(&[], &[]).await.unwrap();
    let found: Vec<(&str, String)> = stores
        .iter()
        .map(|s| (s.resource_type(), s.key().qualified_name()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("dataStore", "topp:states_shapefile".to_string()),
            ("coverageStore", "sf:sfdem".to_string()),
        ]
    );

    let in_sf = catalog.get_stores(&[], &["sf"]).await.unwrap();
    assert_eq!(in_sf.len(), 1);
}

#[tokio::test]
async fn test_store_fields() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut store = catalog.get_store("states_shapefile", None).await.unwrap().unwrap();
    assert_eq!(store.workspace(), Some("topp"));
    assert_eq!(store.get_str("type").await.unwrap().as_deref(), Some("Shapefile"));
    assert_eq!(store.get_bool("enabled").await.unwrap(), Some(true));
    assert_eq!(store.get_str("workspace").await.unwrap().as_deref(), Some("topp"));
}

#[tokio::test]
async fn test_store_name_in_two_workspaces_is_ambiguous() {
    let server = FakeGeoServer::seeded();
    server.put_document(
        "workspaces/topp/datastores/sfdem.xml",
        "<dataStore><name>sfdem</name><type>PostGIS</type></dataStore>",
    );
    let catalog = server.catalog();

    let err = catalog.get_store("sfdem", None).await.unwrap_err();
    assert!(matches!(err, GsError::AmbiguousRequest(_)));
    assert!(catalog.get_store("sfdem", Some("sf")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_datastore_in_default_workspace() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut store = catalog.create_datastore("roads", None).await.unwrap();
    assert!(store.is_creation());
    assert_eq!(store.workspace(), Some("topp"));

    store.set("type", "PostGIS").unwrap();
    store.save().await.unwrap();
    assert!(!store.is_creation());

    let post = server.last_request_matching(Method::POST, "workspaces/topp/datastores").unwrap();
    assert_eq!(
        post.body.as_deref(),
        Some("<dataStore><name>roads</name><type>PostGIS</type><enabled>true</enabled></dataStore>")
    );
    assert!(catalog.get_store("roads", Some("topp")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_wms_store_and_layer() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut store = catalog
        .create_wmsstore("remote", Some("topp"), Some("reader"), Some("pw"))
        .await
        .unwrap();
    store.set("capabilitiesURL", "http://maps.example.com/wms?request=GetCapabilities").unwrap();
    store.save().await.unwrap();

    let body = server
        .document("workspaces/topp/wmsstores/remote.xml")
        .unwrap();
    assert!(body.contains("<type>WMS</type>"));
    assert!(body.contains("<user>reader</user>"));

    let mut layer = catalog.create_wmslayer("topp", "remote", "roads", None).await.unwrap().unwrap();
    assert_eq!(layer.get_str("type").await.unwrap().as_deref(), Some("WMS"));
    let created = server
        .document("workspaces/topp/wmsstores/remote/wmslayers/roads.xml")
        .unwrap();
    assert!(created.contains("<nativeName>roads</nativeName>"));
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn test_creation_handle_starts_with_forced_flags_dirty() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let key = ResourceKey::new("basemap").in_workspace("topp").in_store("remote");
    let handle = catalog
        .unsaved(&WMS_LAYER, key, vec![("name", "basemap".into())])
        .unwrap();
    assert!(handle.is_creation());
    assert_eq!(handle.dirty_fields(), vec!["name", "enabled", "advertised"]);
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_list_resources() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let resources = catalog.get_resources(&[], &[], &[]).await.unwrap();
    let kinds: Vec<&str> = resources.iter().map(|r| r.resource_type()).collect();
    assert_eq!(kinds, vec!["featureType", "coverage"]);

    let in_store = catalog.get_resources(&[], &["sfdem"], &["sf"]).await.unwrap();
    assert_eq!(in_store.len(), 1);
    assert_eq!(in_store[0].store(), Some("sfdem"));
}

#[tokio::test]
async fn test_feature_type_fields() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut states = catalog.get_resource("states", None, Some("topp")).await.unwrap().unwrap();
    assert_eq!(states.get_str("title").await.unwrap().as_deref(), Some("USA Population"));
    assert_eq!(states.get_list("keywords").await.unwrap().unwrap().len(), 5);

    let bbox = states.get_bbox("latLonBoundingBox").await.unwrap().unwrap();
    assert_eq!(bbox.coordinates(), [-124.731422, -66.969849, 24.955967, 49.371735]);
    assert_eq!(bbox.crs.as_deref(), Some("EPSG:4326"));
    assert_eq!(states.get_bool("advertised").await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_feature_type_save_forces_visibility_flags() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut states = catalog.get_resource("states", None, None).await.unwrap().unwrap();
    states.set("title", "States").unwrap();
    states.save().await.unwrap();

    let put = server
        .last_request_matching(
            Method::PUT,
            "workspaces/topp/datastores/states_shapefile/featuretypes/states.xml",
        )
        .unwrap();
    assert_eq!(
        put.body.as_deref(),
        Some("<featureType><title>States</title><enabled>true</enabled><advertised>true</advertised></featureType>")
    );
}

#[tokio::test]
async fn test_publish_feature_type() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let store = catalog.get_store("states_shapefile", Some("topp")).await.unwrap().unwrap();
    let mut roads = catalog
        .publish_featuretype("roads", &store, "EPSG:4326", None, None, Some("tiger_roads"))
        .await
        .unwrap();
    assert!(roads.dom().is_some());
    assert_eq!(roads.get_str("nativeName").await.unwrap().as_deref(), Some("tiger_roads"));
    assert_eq!(roads.get_str("srs").await.unwrap().as_deref(), Some("EPSG:4326"));
    assert!(catalog.get_layer("topp:roads").await.unwrap().is_some());
}

#[tokio::test]
async fn test_publish_feature_type_needs_crs() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let store = catalog.get_store("states_shapefile", Some("topp")).await.unwrap().unwrap();
    let err = catalog
        .publish_featuretype("roads", &store, "", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_available_feature_type_names() {
    let server = FakeGeoServer::seeded();
    server.put_document(
        "workspaces/topp/datastores/states_shapefile/featuretypes.json",
        r#"{"list": {"string": ["roads", "rivers"]}}"#,
    );
    let catalog = server.catalog();

    let names = catalog
        .list_feature_type_names("topp", "states_shapefile", FeatureTypeList::Available)
        .await
        .unwrap();
    assert_eq!(names, vec!["roads", "rivers"]);
    let get = server.last_request().unwrap();
    assert_eq!(get.query_value("list"), Some("available"));
}

// ============================================================================
// Layers
// ============================================================================

#[tokio::test]
async fn test_list_layers() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let names: Vec<String> = catalog
        .get_layers(None)
        .await
        .unwrap()
        .iter()
        .map(|l| l.name().to_string())
        .collect();
    assert_eq!(names, vec!["sf:sfdem", "topp:states"]);
}

#[tokio::test]
async fn test_layers_of_resource() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let layers = catalog.get_layers_of("topp:states").await.unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].name(), "topp:states");
    assert!(catalog.get_layers_of("nowhere").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_layer_fields_and_resource() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut layer = catalog.get_layer("states").await.unwrap().unwrap();
    assert_eq!(layer.get_str("defaultStyle").await.unwrap().as_deref(), Some("population"));
    assert_eq!(
        layer.get_list("styles").await.unwrap(),
        Some(vec!["polygon".to_string(), "topp:pophatch".to_string()])
    );
    assert_eq!(layer.get_bool("queryable").await.unwrap(), Some(true));

    let mut resource = catalog.layer_resource(&mut layer).await.unwrap().unwrap();
    assert_eq!(resource.resource_type(), "featureType");
    assert_eq!(resource.store(), Some("states_shapefile"));
    assert_eq!(resource.get_str("title").await.unwrap().as_deref(), Some("USA Population"));
}

#[tokio::test]
async fn test_disable_layer() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut layer = catalog.get_layer("topp:states").await.unwrap().unwrap();
    layer.set("enabled", false).unwrap();
    layer.save().await.unwrap();

    let put = server.last_request_matching(Method::PUT, "layers/topp:states.xml").unwrap();
    assert_eq!(
        put.body.as_deref(),
        Some("<layer><enabled>false</enabled><advertised>true</advertised></layer>")
    );
    let stored = server.document("layers/topp:states.xml").unwrap();
    assert!(stored.contains("<enabled>false</enabled>"));
}

#[tokio::test]
async fn test_change_default_style() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut layer = catalog.get_layer("topp:states").await.unwrap().unwrap();
    layer.set("defaultStyle", "polygon").unwrap();
    layer.save().await.unwrap();

    let put = server.last_request_matching(Method::PUT, "layers/topp:states.xml").unwrap();
    let body = put.body.unwrap();
    assert!(body.starts_with("<layer><defaultStyle><name>polygon</name>"));
    assert!(body.ends_with("<enabled>true</enabled><advertised>true</advertised></layer>"));

    layer.refresh().await.unwrap();
    assert_eq!(layer.get_str("defaultStyle").await.unwrap().as_deref(), Some("polygon"));
}

// ============================================================================
// Styles
// ============================================================================

#[tokio::test]
async fn test_list_styles_across_scopes() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let styles = catalog.get_styles(&[], &[]).await.unwrap();
    let names: Vec<String> = styles.iter().map(|s| s.key().qualified_name()).collect();
    assert_eq!(names, vec!["polygon", "population", "topp:pophatch"]);

    assert!(catalog.get_style("pophatch", None).await.unwrap().is_none());
    assert!(catalog.get_style("pophatch", Some("topp")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_style_document_and_body() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut style = catalog.get_style("population", None).await.unwrap().unwrap();
    assert_eq!(style.get_str("filename").await.unwrap().as_deref(), Some("population.sld"));
    assert_eq!(style.get_str("languageVersion").await.unwrap().as_deref(), Some("1.0.0"));

    assert_eq!(catalog.sld_name(&style).await.unwrap().as_deref(), Some("USA states population"));
    assert_eq!(
        catalog.sld_title(&style).await.unwrap().as_deref(),
        Some("Population in the United States")
    );

    let body = catalog.style_body(&style, StyleFormat::Sld10).await.unwrap();
    assert_eq!(body, fixtures::POPULATION_SLD.as_bytes());
    let get = server.last_request().unwrap();
    assert_eq!(get.header("Accept"), Some(StyleFormat::Sld10.content_type()));
}

#[tokio::test]
async fn test_create_style() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let style = catalog
        .create_style("roads", ROADS_SLD, false, Some("topp"), StyleFormat::Sld10, false)
        .await
        .unwrap();
    assert_eq!(style.workspace(), Some("topp"));

    let post = server.last_request_matching(Method::POST, "workspaces/topp/styles").unwrap();
    assert_eq!(post.query_value("name"), Some("roads"));
    assert!(post.body.unwrap().contains("<filename>roads.sld</filename>"));

    let put = server.last_request_matching(Method::PUT, "workspaces/topp/styles/roads.sld").unwrap();
    assert_eq!(put.header("Content-Type"), Some("application/vnd.ogc.sld+xml"));
    assert_eq!(
        server.document("workspaces/topp/styles/roads.sld").as_deref(),
        Some(ROADS_SLD)
    );
    assert_eq!(catalog.sld_title(&style).await.unwrap().as_deref(), Some("Road network"));
}

/// Answers every PUT with a server error and forwards the rest.
struct RejectPuts(Arc<FakeGeoServer>);

#[async_trait]
impl Transport for RejectPuts {
    async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse> {
        if request.method == Method::PUT {
            return Ok(HttpResponse::new(500, "Error writing style body"));
        }
        self.0.execute(request).await
    }
}

#[tokio::test]
async fn test_style_document_visible_after_body_upload_fails() {
    let server = FakeGeoServer::seeded();
    let catalog = Catalog::with_transport(BASE_URL, Arc::new(RejectPuts(server.clone())), Duration::from_secs(60))
        .unwrap();
    assert!(catalog.get_style("roads", Some("topp")).await.unwrap().is_none());

    let err = catalog
        .create_style("roads", ROADS_SLD, false, Some("topp"), StyleFormat::Sld10, false)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(server.count(Method::POST, "workspaces/topp/styles"), 1);
    assert!(server.has_document("workspaces/topp/styles/roads.xml"));

    let style = catalog.get_style("roads", Some("topp")).await.unwrap();
    assert_eq!(style.map(|s| s.name().to_string()).as_deref(), Some("roads"));
}

#[tokio::test]
async fn test_create_existing_style_conflicts_without_writing() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();
    let writes = server.write_count();

    let err = catalog
        .create_style("population", ROADS_SLD, false, None, StyleFormat::Sld10, false)
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::ConflictingData(_)));
    assert_eq!(server.write_count(), writes);
}

#[tokio::test]
async fn test_overwrite_style_body() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();
    let writes = server.write_count();

    catalog
        .create_style("population", ROADS_SLD, true, None, StyleFormat::Sld10, true)
        .await
        .unwrap();
    assert_eq!(server.write_count(), writes + 1);

    let put = server.last_request().unwrap();
    assert_eq!(put.path, "styles/population.sld");
    assert_eq!(put.query_value("raw"), Some("true"));
    assert_eq!(server.document("styles/population.sld").as_deref(), Some(ROADS_SLD));
}

// ============================================================================
// Layer groups
// ============================================================================

#[tokio::test]
async fn test_layer_group_fields() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    assert_eq!(catalog.get_layergroups(&[], &[]).await.unwrap().len(), 1);

    let mut group = catalog.get_layergroup("tasmania", None).await.unwrap().unwrap();
    assert_eq!(group.get_str("mode").await.unwrap().as_deref(), Some("SINGLE"));
    assert_eq!(
        group.get_list("layers").await.unwrap(),
        Some(vec!["topp:states".to_string(), "sf:sfdem".to_string()])
    );
    let bounds = group.get_bbox("bounds").await.unwrap().unwrap();
    assert_eq!(bounds.min_x, -124.731422);
}

#[tokio::test]
async fn test_create_layer_group() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let draft = LayerGroupDraft::new("usa")
        .layers(["topp:states"])
        .styles(["population"])
        .title("United States");
    let mut group = catalog.create_layergroup(draft).await.unwrap();
    assert!(group.is_creation());
    group.save().await.unwrap();

    let post = server.last_request_matching(Method::POST, "layergroups").unwrap();
    assert_eq!(post.query_value("name"), Some("usa"));
    let body = post.body.unwrap();
    assert!(body.contains("<mode>SINGLE</mode>"));
    assert!(body.contains("<minx>-180</minx>"));
    assert!(catalog.get_layergroup("usa", None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_existing_layer_group_conflicts() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let err = catalog
        .create_layergroup(LayerGroupDraft::new("tasmania"))
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::ConflictingData(_)));
}

// ============================================================================
// Service and global settings
// ============================================================================

#[tokio::test]
async fn test_service_settings() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let wms = catalog.get_services(OgcService::Wms).await.unwrap();
    let scopes: Vec<Option<&str>> = wms.iter().map(|s| s.workspace()).collect();
    assert_eq!(scopes, vec![None, Some("topp")]);

    let mut wfs = catalog.get_service(OgcService::Wfs, None);
    assert_eq!(wfs.get_int("maxFeatures").await.unwrap(), Some(1_000_000));
    assert_eq!(wfs.get_str("serviceLevel").await.unwrap().as_deref(), Some("COMPLETE"));

    let mut topp = catalog.get_service(OgcService::Wms, Some("topp"));
    assert_eq!(topp.get_str("title").await.unwrap().as_deref(), Some("Topp maps"));
}

#[tokio::test]
async fn test_edit_service_settings() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut wms = catalog.get_service(OgcService::Wms, None);
    wms.set("title", "Maps").unwrap();
    wms.set("maxBuffer", FieldValue::Int(50)).unwrap();
    wms.save().await.unwrap();

    let put = server.last_request_matching(Method::PUT, "services/wms/settings").unwrap();
    assert_eq!(
        put.body.as_deref(),
        Some("<wms><title>Maps</title><maxBuffer>50</maxBuffer></wms>")
    );
    assert!(server.document("services/wms/settings").unwrap().contains("<title>Maps</title>"));
}

#[tokio::test]
async fn test_edit_nested_global_settings() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut global = catalog.fetch_global_settings().await.unwrap();
    assert_eq!(global.get_int("updateSequence").await.unwrap(), Some(1203));
    global
        .nested("jai")
        .await
        .unwrap()
        .set("tileThreads", FieldValue::Int(9))
        .unwrap();
    global.save().await.unwrap();

    let stored = server.document("settings").unwrap();
    assert!(stored.contains("<tileThreads>9</tileThreads>"));
    assert!(stored.contains("<memoryCapacity>0.5</memoryCapacity>"));
    assert!(stored.contains("<contactPerson>Claudius Ptolomaeus</contactPerson>"));
}

#[tokio::test]
async fn test_edit_contact() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let mut global = catalog.fetch_global_settings().await.unwrap();
    global
        .nested("settings")
        .await
        .unwrap()
        .nested_mut("contact")
        .unwrap()
        .set("contactPerson", "Eratosthenes".into())
        .unwrap();
    global.save().await.unwrap();

    let put = server.last_request_matching(Method::PUT, "settings").unwrap();
    let body = put.body.unwrap();
    assert!(body.contains("<contactPerson>Eratosthenes</contactPerson>"));
    assert!(body.contains("<addressCity>Alexandria</addressCity>"));
    assert!(!body.contains("<jai>"));
}

// ============================================================================
// Uploads
// ============================================================================

fn write_archive(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"PK\x03\x04shapefile").unwrap();
    path
}

#[tokio::test]
async fn test_create_feature_store_from_archive() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir, "roads.zip");

    catalog
        .create_featurestore("roads", UploadData::from_path(&archive), Some("topp"), false, Some("UTF-8"))
        .await
        .unwrap();

    let put = server.last_request().unwrap();
    assert_eq!(put.path, "workspaces/topp/datastores/roads/file.shp");
    assert_eq!(put.query_value("charset"), Some("UTF-8"));
    assert_eq!(put.header("Content-Type"), Some("application/zip"));
    assert_eq!(put.body.as_deref(), Some("PK\u{3}\u{4}shapefile"));

    let mut store = catalog.get_store("roads", Some("topp")).await.unwrap().unwrap();
    assert_eq!(store.get_str("type").await.unwrap().as_deref(), Some("shp"));
}

#[tokio::test]
async fn test_feature_store_conflict_and_overwrite() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir, "states.zip");

    let err = catalog
        .create_featurestore("states_shapefile", UploadData::from_path(&archive), Some("topp"), false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::ConflictingData(_)));

    catalog
        .create_featurestore("states_shapefile", UploadData::from_path(&archive), Some("topp"), true, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_feature_store_needs_archive() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let err = catalog
        .create_featurestore("roads", UploadData::External("/data/roads".into()), None, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::Upload(_)));

    let err = catalog
        .create_featurestore("roads", UploadData::Archive("/no/such/roads.zip".into()), None, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::Upload(_)));
}

#[tokio::test]
async fn test_add_data_to_store() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir, "counties.zip");

    let store = catalog.get_store("states_shapefile", Some("topp")).await.unwrap().unwrap();
    catalog
        .add_data_to_store(&store, "counties", UploadData::from_path(&archive), true, None)
        .await
        .unwrap();

    let put = server.last_request().unwrap();
    assert_eq!(put.path, "workspaces/topp/datastores/states_shapefile/file.shp");
    assert_eq!(put.query_value("update"), Some("overwrite"));
    assert_eq!(put.query_value("filename"), Some("counties.zip"));
    assert_eq!(put.query_value("target"), Some("shp"));
}

#[tokio::test]
async fn test_create_image_mosaic_from_server_directory() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let store = catalog
        .create_imagemosaic(
            "ndvi",
            UploadData::from_path("/data/mosaics/ndvi"),
            MosaicConfigure::All,
            Some("sf"),
            false,
            None,
            None,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.resource_type(), "coverageStore");

    let put = server
        .last_request_matching(Method::PUT, "workspaces/sf/coveragestores/ndvi/external.imagemosaic")
        .unwrap();
    assert_eq!(put.query_value("configure"), Some("all"));
    assert_eq!(put.header("Content-Type"), Some("text/plain"));
    assert_eq!(put.body.as_deref(), Some("file:/data/mosaics/ndvi"));
}

#[tokio::test]
async fn test_create_coverage_store_with_coverage() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();

    let created = catalog
        .create_coveragestore(CoverageStoreDraft::new("dem", "/data/rasters/dem.tif").in_workspace("sf"))
        .await
        .unwrap();
    assert_eq!(created.store.name(), "dem");
    let coverage = created.coverage.unwrap();
    assert_eq!(coverage.name(), "dem");
    assert_eq!(coverage.store(), Some("dem"));

    let store_doc = server.document("workspaces/sf/coveragestores/dem.xml").unwrap();
    assert!(store_doc.contains("<url>file:/data/rasters/dem.tif</url>"));
    assert!(catalog.get_layer("sf:dem").await.unwrap().is_some());
}

#[tokio::test]
async fn test_coverage_store_type_checked() {
    let server = FakeGeoServer::seeded();
    let catalog = server.catalog();
    let writes = server.write_count();

    let err = catalog
        .create_coveragestore(CoverageStoreDraft::new("dem", "/data/dem.png").store_type("PNG"))
        .await
        .unwrap_err();
    assert!(matches!(err, GsError::InvalidArgument(_)));
    assert_eq!(server.write_count(), writes);
}

#[tokio::test]
async fn test_granules() {
    let server = FakeGeoServer::seeded();
    server.put_document(
        "workspaces/sf/coveragestores/sfdem/coverages/sfdem/index/granules.json",
        r#"{"type": "FeatureCollection", "features": [{"id": "sfdem.1"}]}"#,
    );
    let catalog = server.catalog();

    catalog
        .add_granule(UploadData::from_path("/data/sfdem_2024.tif"), "sfdem", "sf")
        .await
        .unwrap();
    let post = server.last_request().unwrap();
    assert_eq!(post.method, Method::POST);
    assert_eq!(post.path, "workspaces/sf/coveragestores/sfdem/external.imagemosaic");

    let granules = catalog
        .list_granules("sfdem", "sfdem", "sf", Some("ingestion > 2024"), Some(10), None)
        .await
        .unwrap();
    assert_eq!(granules["features"][0]["id"], "sfdem.1");
    let get = server.last_request().unwrap();
    assert_eq!(get.query_value("limit"), Some("10"));
    assert_eq!(get.query_value("filter"), Some("ingestion > 2024"));

    catalog.delete_granule("sfdem", "sfdem", "sfdem.1", "sf").await.unwrap();
    assert_eq!(
        server.last_request().unwrap().path,
        "workspaces/sf/coveragestores/sfdem/coverages/sfdem/index/granules/sfdem.1.json"
    );
}
