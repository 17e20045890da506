use anyhow::{bail, Result};
use gs_catalog::{BoundResource, Catalog};
use serde_json::{json, Value};
use tracing::info;

/// How listings are printed.
pub struct Output {
    pub json: bool,
}

impl Output {
    fn print_resources(&self, resources: &[BoundResource]) -> Result<()> {
        if self.json {
            let rows: Vec<Value> = resources.iter().map(summary).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            for resource in resources {
                println!("{}", resource.key().qualified_name());
            }
        }
        Ok(())
    }
}

fn summary(resource: &BoundResource) -> Value {
    json!({
        "name": resource.name(),
        "workspace": resource.workspace(),
        "store": resource.store(),
        "type": resource.resource_type(),
    })
}

pub async fn version(catalog: &Catalog, out: &Output) -> Result<()> {
    let version = catalog.get_version().await?;
    if out.json {
        println!("{}", json!({ "version": version }));
    } else {
        println!("{}", version);
    }
    Ok(())
}

pub async fn list_workspaces(catalog: &Catalog, out: &Output) -> Result<()> {
    let workspaces = catalog.get_workspaces(&[]).await?;
    out.print_resources(&workspaces)
}

pub async fn create_workspace(catalog: &Catalog, name: &str, uri: &str) -> Result<()> {
    catalog.create_workspace(name, uri).await?;
    info!(workspace = name, uri, "Workspace created");
    Ok(())
}

pub async fn delete_workspace(catalog: &Catalog, name: &str, recurse: bool) -> Result<()> {
    let Some(workspace) = catalog.get_workspace(name).await? else {
        bail!("no workspace named {}", name);
    };
    catalog.delete(&workspace, None, recurse).await?;
    info!(workspace = name, recurse, "Workspace deleted");
    Ok(())
}

pub async fn list_stores(catalog: &Catalog, workspaces: &[String], out: &Output) -> Result<()> {
    let workspaces: Vec<&str> = workspaces.iter().map(String::as_str).collect();
    let stores = catalog.get_stores(&[], &workspaces).await?;
    out.print_resources(&stores)
}

pub async fn list_layers(catalog: &Catalog, resource: Option<&str>, out: &Output) -> Result<()> {
    let layers = match resource {
        Some(name) => catalog.get_layers_of(name).await?,
        None => catalog.get_layers(None).await?,
    };
    out.print_resources(&layers)
}

pub async fn list_layergroups(catalog: &Catalog, workspaces: &[String], out: &Output) -> Result<()> {
    let workspaces: Vec<&str> = workspaces.iter().map(String::as_str).collect();
    let groups = catalog.get_layergroups(&[], &workspaces).await?;
    out.print_resources(&groups)
}

pub async fn list_styles(catalog: &Catalog, workspaces: &[String], out: &Output) -> Result<()> {
    let workspaces: Vec<&str> = workspaces.iter().map(String::as_str).collect();
    let styles = catalog.get_styles(&[], &workspaces).await?;
    out.print_resources(&styles)
}

pub async fn show_settings(catalog: &Catalog, out: &Output) -> Result<()> {
    let settings = catalog.fetch_global_settings().await?;
    let Some(dom) = settings.dom() else {
        bail!("server returned no global settings");
    };
    if out.json {
        let fields = json!({
            "charset": dom.find_text("settings/charset"),
            "verbose": dom.find_text("settings/verbose"),
            "proxyBaseUrl": dom.find_text("settings/proxyBaseUrl"),
            "contactPerson": dom.find_text("settings/contact/contactPerson"),
            "updateSequence": dom.find_text("updateSequence"),
        });
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else {
        println!("{}", dom.to_xml()?);
    }
    Ok(())
}
