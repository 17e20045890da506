//! Entity-specific composite field shapes: layer attribution, WMS watermark
//! and WFS GML output settings.

use gs_common::{GsError, GsResult};
use gs_xml::{Element, XmlBuilder};

/// Attribution block of a published layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attribution {
    pub title: Option<String>,
    pub logo_width: Option<u32>,
    pub logo_height: Option<u32>,
    pub href: Option<String>,
    pub logo_url: Option<String>,
    pub logo_type: Option<String>,
}

/// Watermark configuration of the WMS service.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub enabled: bool,
    pub position: Option<String>,
    pub transparency: Option<u32>,
}

/// GML output settings for one WFS version.
#[derive(Debug, Clone, PartialEq)]
pub struct GmlEntry {
    pub version: String,
    pub srs_name_style: Option<String>,
    pub override_gml_attributes: Option<bool>,
}

fn text(node: &Element, path: &str) -> Option<String> {
    node.find_text(path)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(field: &str, node: &Element, path: &str) -> GsResult<Option<u32>> {
    match node.find_text(path).map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| GsError::conversion(field, format!("{} is not an integer: {}", path, raw))),
        None => Ok(None),
    }
}

pub fn read_attribution(field: &str, node: &Element) -> GsResult<Attribution> {
    Ok(Attribution {
        title: text(node, "title"),
        logo_width: number(field, node, "logoWidth")?,
        logo_height: number(field, node, "logoHeight")?,
        href: text(node, "href"),
        logo_url: text(node, "logoURL"),
        logo_type: text(node, "logoType"),
    })
}

pub fn write_attribution(name: &str, attribution: &Attribution, out: &mut XmlBuilder) {
    let width = attribution.logo_width.map(|w| w.to_string());
    let height = attribution.logo_height.map(|h| h.to_string());

    out.start(name);
    out.optional_element("title", attribution.title.as_deref());
    out.optional_element("logoWidth", width.as_deref());
    out.optional_element("logoHeight", height.as_deref());
    out.optional_element("href", attribution.href.as_deref());
    out.optional_element("logoURL", attribution.logo_url.as_deref());
    out.optional_element("logoType", attribution.logo_type.as_deref());
    out.end(name);
}

pub fn read_watermark(field: &str, node: &Element) -> GsResult<Watermark> {
    Ok(Watermark {
        enabled: node.find_text("enabled").map(str::trim) == Some("true"),
        position: text(node, "position"),
        transparency: number(field, node, "transparency")?,
    })
}

pub fn write_watermark(name: &str, watermark: &Watermark, out: &mut XmlBuilder) {
    let transparency = watermark.transparency.map(|t| t.to_string());

    out.start(name);
    out.text_element("enabled", if watermark.enabled { "true" } else { "false" });
    out.optional_element("position", watermark.position.as_deref());
    out.optional_element("transparency", transparency.as_deref());
    out.end(name);
}

pub fn read_gml(node: &Element) -> Vec<GmlEntry> {
    node.find_all("entry")
        .into_iter()
        .map(|entry| GmlEntry {
            version: entry.find_text("version").unwrap_or_default().to_string(),
            srs_name_style: text(entry, "gml/srsNameStyle"),
            override_gml_attributes: entry
                .find_text("gml/overrideGMLAttributes")
                .map(|v| v.trim() == "true"),
        })
        .collect()
}

pub fn write_gml(name: &str, entries: &[GmlEntry], out: &mut XmlBuilder) {
    out.start(name);
    for entry in entries {
        out.start("entry");
        out.text_element("version", &entry.version);
        out.start("gml");
        out.optional_element("srsNameStyle", entry.srs_name_style.as_deref());
        if let Some(flag) = entry.override_gml_attributes {
            out.text_element("overrideGMLAttributes", if flag { "true" } else { "false" });
        }
        out.end("gml");
        out.end("entry");
    }
    out.end(name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribution_skips_absent_parts() {
        let attribution = Attribution {
            title: Some("NOAA".to_string()),
            logo_width: Some(32),
            ..Default::default()
        };
        let mut out = XmlBuilder::new();
        write_attribution("attribution", &attribution, &mut out);
        assert_eq!(
            out.render().unwrap(),
            "<attribution><title>NOAA</title><logoWidth>32</logoWidth></attribution>"
        );
    }

    #[test]
    fn test_attribution_bad_width() {
        let node = Element::parse("<attribution><logoWidth>wide</logoWidth></attribution>").unwrap();
        let err = read_attribution("attribution", &node).unwrap_err();
        assert!(matches!(err, GsError::Conversion { .. }));
    }

    #[test]
    fn test_read_gml_entries() {
        let node = Element::parse(
            "<gml><entry><version>V_11</version><gml><srsNameStyle>URN</srsNameStyle>\
             <overrideGMLAttributes>false</overrideGMLAttributes></gml></entry></gml>",
        )
        .unwrap();
        let entries = read_gml(&node);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, "V_11");
        assert_eq!(entries[0].srs_name_style.as_deref(), Some("URN"));
        assert_eq!(entries[0].override_gml_attributes, Some(false));
    }
}
