//! Styles and their bodies.
//!
//! A style is two things on the server: a small catalog document naming the
//! style and its file, and the body itself (SLD, CSS or a zipped SLD with
//! icons). Creation writes the first with a POST and the second with a PUT.

use std::str::FromStr;

use bytes::Bytes;
use gs_common::{GsError, GsResult, ResourceKey};
use gs_xml::{Element, XmlBuilder};
use reqwest::Method;
use tracing::{debug, info};

use crate::catalog::{Catalog, ListFilter};
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::{Creation, Locator};
use crate::resource::BoundResource;
use crate::transport::HttpRequest;

use super::render_body;

const XML: &str = "application/xml";
const CREATED: [u16; 3] = [200, 201, 202];

pub static STYLE: ResourceDescriptor = ResourceDescriptor {
    resource_type: "style",
    locator: Locator::optional_workspace("styles", "style").created_by(Creation::QueryName),
    write_all: false,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::text("format"),
        FieldSpec::text("filename"),
        FieldSpec::text("languageVersion").at("languageVersion/version").read_only(),
    ],
};

/// Encoding of a style body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleFormat {
    #[default]
    Sld10,
    Sld11,
    Zip10,
    Css10,
}

impl StyleFormat {
    pub const ALL: [StyleFormat; 4] = [
        StyleFormat::Sld10,
        StyleFormat::Sld11,
        StyleFormat::Zip10,
        StyleFormat::Css10,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleFormat::Sld10 => "sld10",
            StyleFormat::Sld11 => "sld11",
            StyleFormat::Zip10 => "zip10",
            StyleFormat::Css10 => "css10",
        }
    }

    /// Content type the body is sent and requested with.
    pub fn content_type(&self) -> &'static str {
        match self {
            StyleFormat::Sld10 => "application/vnd.ogc.sld+xml",
            StyleFormat::Sld11 => "application/vnd.ogc.se+xml",
            StyleFormat::Zip10 => "application/zip",
            StyleFormat::Css10 => "application/vnd.geoserver.geocss+css",
        }
    }
}

impl FromStr for StyleFormat {
    type Err = GsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GsError::InvalidArgument(format!("unsupported style format {}", s)))
    }
}

impl std::fmt::Display for StyleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn style_key(name: &str, workspace: Option<&str>) -> ResourceKey {
    match workspace.filter(|ws| !ws.is_empty()) {
        Some(ws) => ResourceKey::new(name).in_workspace(ws),
        None => ResourceKey::new(name),
    }
}

/// First direct child by local name, ignoring the namespace prefix.
fn sld_child<'a>(node: &'a Element, name: &str) -> Option<&'a Element> {
    node.children.iter().find(|c| c.local_name() == name)
}

/// `Name` or `Title` of a style body: the named layer's, else the user
/// style's.
fn sld_text<'a>(doc: &'a Element, field: &str) -> Option<&'a str> {
    let named_layer = sld_child(doc, "NamedLayer");
    let user_style = named_layer
        .and_then(|layer| sld_child(layer, "UserStyle"))
        .or_else(|| sld_child(doc, "UserLayer").and_then(|layer| sld_child(layer, "UserStyle")));

    named_layer
        .and_then(|layer| sld_child(layer, field))
        .or_else(|| user_style.and_then(|style| sld_child(style, field)))
        .and_then(Element::text)
}

impl Catalog {
    /// Styles filtered by name and workspace. Without workspaces, global
    /// styles and those of every workspace are listed.
    pub async fn get_styles(&self, names: &[&str], workspaces: &[&str]) -> GsResult<Vec<BoundResource>> {
        let mut filter = ListFilter::named(names.iter().copied());
        if !workspaces.is_empty() {
            filter = filter.in_workspaces(workspaces.iter().copied());
        }
        self.list(&STYLE, &filter).await
    }

    /// A style by name. Without a workspace only global styles are searched.
    pub async fn get_style(&self, name: &str, workspace: Option<&str>) -> GsResult<Option<BoundResource>> {
        let filter = ListFilter::named([name]).in_workspace(workspace);
        self.get_unique(&STYLE, &filter).await
    }

    /// Address of a style file: `.sld` for the body, `.xml` for the catalog
    /// document.
    fn style_file_url(&self, key: &ResourceKey, extension: &str, raw: bool) -> GsResult<String> {
        let mut segments: Vec<String> = Vec::new();
        if let Some(ws) = key.workspace.as_deref() {
            segments.push("workspaces".to_string());
            segments.push(ws.to_string());
        }
        segments.push("styles".to_string());
        if extension.is_empty() {
            segments.push(key.name.clone());
        } else {
            segments.push(format!("{}.{}", key.name, extension));
        }
        let query: Vec<(&str, &str)> = if raw { vec![("raw", "true")] } else { Vec::new() };
        self.url_with_query(&segments, &query)
    }

    /// Create a style, or replace the body of an existing one when
    /// `overwrite` is set. `raw` stores the body as sent, without the server
    /// reformatting it.
    pub async fn create_style(
        &self,
        name: &str,
        data: impl Into<Bytes>,
        overwrite: bool,
        workspace: Option<&str>,
        format: StyleFormat,
        raw: bool,
    ) -> GsResult<BoundResource> {
        let data = data.into();
        let key = style_key(name, workspace);
        let existing = self.check_conflict(&STYLE, &key, overwrite).await?;

        if existing.is_none() {
            let mut out = XmlBuilder::new();
            out.start("style")
                .text_element("name", name)
                .text_element("filename", &format!("{}.sld", name))
                .end("style");
            let document = render_body(&out)?;
            let create_url = STYLE.locator.creation_url(self.service_url(), &key)?;
            let post = |accept: &str| {
                HttpRequest::new(Method::POST, create_url.as_str())
                    .accept(accept)
                    .body(XML, document.clone())
            };

            let response = self.request(post("text/plain")).await?;
            if response.status == 406 {
                debug!(style = name, "Plain text refused, creating style with XML accept");
                self.write(post(XML), &CREATED).await?;
            } else if CREATED.contains(&response.status) {
                self.invalidate_cache().await;
            } else {
                return Err(GsError::failed_request(response.status, create_url, response.text()));
            }
        }

        let put = |url: String| {
            HttpRequest::new(Method::PUT, url)
                .accept(XML)
                .body(format.content_type(), data.clone())
        };
        let body_url = self.style_file_url(&key, "sld", raw)?;
        match self.write(put(body_url), &CREATED).await {
            Ok(_) => {}
            Err(e) if e.status().is_some() => {
                debug!(style = name, error = %e, "Body upload refused, retrying on the document address");
                let fallback = self.style_file_url(&key, "xml", raw)?;
                self.write(put(fallback), &CREATED).await?;
            }
            Err(e) => return Err(e),
        }
        self.invalidate_cache().await;

        info!(style = %key, format = %format, "Stored style");
        Ok(existing.unwrap_or_else(|| self.bind(&STYLE, key)))
    }

    /// The style body, requested in `format`.
    pub async fn style_body(&self, style: &BoundResource, format: StyleFormat) -> GsResult<Bytes> {
        let url = self.style_file_url(style.key(), "", false)?;
        let response = self
            .request(HttpRequest::get(url.as_str()).accept(format.content_type()))
            .await?;
        if response.status != 200 {
            return Err(GsError::failed_request(response.status, url, response.text()));
        }
        Ok(response.body)
    }

    async fn sld_document(&self, style: &BoundResource) -> GsResult<Element> {
        let url = self.style_file_url(style.key(), "sld", false)?;
        self.get_xml(&url).await
    }

    /// Name declared inside the SLD body.
    pub async fn sld_name(&self, style: &BoundResource) -> GsResult<Option<String>> {
        let doc = self.sld_document(style).await?;
        Ok(sld_text(&doc, "Name").map(str::to_string))
    }

    /// Title declared inside the SLD body.
    pub async fn sld_title(&self, style: &BoundResource) -> GsResult<Option<String>> {
        let doc = self.sld_document(style).await?;
        Ok(sld_text(&doc, "Title").map(str::to_string))
    }
}
