//! Field Converter Registry.
//!
//! Every field of a resource descriptor declares a [`Shape`]. The shape picks
//! the reader that turns the field's XML element into a [`FieldValue`] and the
//! writer that emits a value back as XML events. Dispatch is always on the
//! declared shape, never on the runtime type of a decoded value.

use std::collections::BTreeMap;

use gs_common::{BoundingBox, GsError, GsResult};
use gs_xml::{Element, XmlBuilder};

use crate::composite::{self, Attribution, GmlEntry, Watermark};
use crate::descriptor::ResourceDescriptor;
use crate::metadata::{self, MetadataValue};

/// Declared wire shape of a field.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Text,
    /// Literal `"true"` reads as true, anything else as false.
    Bool,
    Int,
    Float,
    /// `<name><string>a</string><string>b</string></name>`
    StringList,
    /// Read-only `<attributes><attribute><name>..</name></attribute></attributes>`
    AttributeList,
    /// `<name><entry key="k">v</entry></name>`
    KeyValue,
    /// Key-value map whose entries may hold structured sub-shapes.
    Metadata,
    /// `minx, maxx, miny, maxy, crs`
    BoundingBox,
    /// `<name><name>n</name></name>`, a reference to another entity by name.
    NamedRef,
    /// `<defaultStyle><name>n</name><workspace>ws</workspace></defaultStyle>`
    StyleRef,
    /// `<styles><style><name>n</name></style>...</styles>`; empty entries allowed.
    StyleList,
    /// `<publishables><published type="layer"><name>n</name></published>...</publishables>`
    LayerList,
    /// `<versions><org.geotools.util.Version><version>1.1.1</version>...</versions>`
    Versions,
    Attribution,
    Watermark,
    Gml,
    /// A sub-document serialized by another descriptor.
    Nested(&'static ResourceDescriptor),
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Text => "text",
            Shape::Bool => "boolean",
            Shape::Int => "integer",
            Shape::Float => "float",
            Shape::StringList => "string list",
            Shape::AttributeList => "attribute list",
            Shape::KeyValue => "key-value map",
            Shape::Metadata => "metadata map",
            Shape::BoundingBox => "bounding box",
            Shape::NamedRef => "named reference",
            Shape::StyleRef => "style reference",
            Shape::StyleList => "style list",
            Shape::LayerList => "layer list",
            Shape::Versions => "version list",
            Shape::Attribution => "attribution",
            Shape::Watermark => "watermark",
            Shape::Gml => "GML settings",
            Shape::Nested(_) => "nested document",
        }
    }

    /// Whether an explicitly unset field of this shape is written as an empty
    /// element. Numeric, boolean and structured scalar shapes have no valid
    /// empty form and are left out instead.
    pub fn clears_with_empty(&self) -> bool {
        !matches!(
            self,
            Shape::Bool
                | Shape::Int
                | Shape::Float
                | Shape::BoundingBox
                | Shape::Attribution
                | Shape::Watermark
                | Shape::Nested(_)
        )
    }

    /// Whether a value can be stored in a field of this shape.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Shape::Text | Shape::NamedRef | Shape::StyleRef, FieldValue::Text(_))
                | (Shape::Bool, FieldValue::Bool(_))
                | (Shape::Int, FieldValue::Int(_))
                | (Shape::Float, FieldValue::Float(_) | FieldValue::Int(_))
                | (
                    Shape::StringList
                        | Shape::AttributeList
                        | Shape::StyleList
                        | Shape::LayerList
                        | Shape::Versions,
                    FieldValue::List(_)
                )
                | (Shape::KeyValue, FieldValue::Map(_))
                | (Shape::Metadata, FieldValue::Metadata(_))
                | (Shape::BoundingBox, FieldValue::BoundingBox(_))
                | (Shape::Attribution, FieldValue::Attribution(_))
                | (Shape::Watermark, FieldValue::Watermark(_))
                | (Shape::Gml, FieldValue::Gml(_))
        )
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Ordered names. In style and layer lists an empty string stands for an
    /// entry without a name.
    List(Vec<String>),
    Map(BTreeMap<String, String>),
    Metadata(BTreeMap<String, MetadataValue>),
    BoundingBox(BoundingBox),
    Attribution(Attribution),
    Watermark(Watermark),
    Gml(Vec<GmlEntry>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_metadata(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        match self {
            FieldValue::Metadata(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bbox(&self) -> Option<&BoundingBox> {
        match self {
            FieldValue::BoundingBox(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(items: Vec<&str>) -> Self {
        FieldValue::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<BTreeMap<String, String>> for FieldValue {
    fn from(map: BTreeMap<String, String>) -> Self {
        FieldValue::Map(map)
    }
}

impl From<BTreeMap<String, MetadataValue>> for FieldValue {
    fn from(map: BTreeMap<String, MetadataValue>) -> Self {
        FieldValue::Metadata(map)
    }
}

impl From<BoundingBox> for FieldValue {
    fn from(b: BoundingBox) -> Self {
        FieldValue::BoundingBox(b)
    }
}

impl From<Attribution> for FieldValue {
    fn from(a: Attribution) -> Self {
        FieldValue::Attribution(a)
    }
}

impl From<Watermark> for FieldValue {
    fn from(w: Watermark) -> Self {
        FieldValue::Watermark(w)
    }
}

impl From<Vec<GmlEntry>> for FieldValue {
    fn from(entries: Vec<GmlEntry>) -> Self {
        FieldValue::Gml(entries)
    }
}

// ============================================================================
// Readers
// ============================================================================

/// Text of a scalar element, trimmed. Blank means absent.
fn scalar_text(node: &Element) -> Option<&str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

/// Qualified style name: `ws:name` when the reference carries a workspace.
fn style_name(node: &Element) -> String {
    let name = node.find_text("name").unwrap_or_default();
    match node.find_text("workspace").filter(|ws| !ws.is_empty()) {
        Some(ws) if !name.contains(':') => format!("{}:{}", ws, name),
        _ => name.to_string(),
    }
}

/// Decode a field element. `Ok(None)` means the element carries no value.
pub fn read(shape: Shape, field: &str, node: &Element) -> GsResult<Option<FieldValue>> {
    let value = match shape {
        Shape::Text => node
            .text()
            .filter(|t| !t.is_empty())
            .map(|t| FieldValue::Text(t.to_string())),
        Shape::Bool => scalar_text(node).map(|t| FieldValue::Bool(t == "true")),
        Shape::Int => match scalar_text(node) {
            Some(raw) => Some(FieldValue::Int(raw.parse().map_err(|_| {
                GsError::conversion(field, format!("not an integer: {}", raw))
            })?)),
            None => None,
        },
        Shape::Float => match scalar_text(node) {
            Some(raw) => Some(FieldValue::Float(raw.parse().map_err(|_| {
                GsError::conversion(field, format!("not a number: {}", raw))
            })?)),
            None => None,
        },
        Shape::StringList => Some(FieldValue::List(
            node.find_all("string")
                .into_iter()
                .filter_map(Element::text)
                .map(str::to_string)
                .collect(),
        )),
        Shape::AttributeList => Some(FieldValue::List(
            node.find_all("attribute/name")
                .into_iter()
                .filter_map(Element::text)
                .map(str::to_string)
                .collect(),
        )),
        Shape::KeyValue => Some(FieldValue::Map(
            node.find_all("entry")
                .into_iter()
                .filter_map(|e| {
                    e.attr("key")
                        .map(|k| (k.to_string(), e.text().unwrap_or_default().to_string()))
                })
                .collect(),
        )),
        Shape::Metadata => Some(FieldValue::Metadata(metadata::read_entries(node)?)),
        Shape::BoundingBox => {
            let corners = ["minx", "maxx", "miny", "maxy"].map(|c| node.find_text(c));
            match corners {
                [Some(min_x), Some(max_x), Some(min_y), Some(max_y)] => Some(FieldValue::BoundingBox(
                    BoundingBox::from_parts(min_x, max_x, min_y, max_y, node.find_text("crs"))
                        .map_err(|e| GsError::conversion(field, e.to_string()))?,
                )),
                _ => None,
            }
        }
        Shape::NamedRef => node
            .find_text("name")
            .filter(|n| !n.is_empty())
            .map(|n| FieldValue::Text(n.to_string())),
        Shape::StyleRef => {
            let name = style_name(node);
            if name.is_empty() {
                None
            } else {
                Some(FieldValue::Text(name))
            }
        }
        Shape::StyleList => Some(FieldValue::List(
            node.find_all("style").into_iter().map(style_name).collect(),
        )),
        Shape::LayerList => Some(FieldValue::List(
            node.children
                .iter()
                .filter(|c| c.name == "published" || c.name == "layer")
                .map(|c| c.find_text("name").unwrap_or_default().to_string())
                .collect(),
        )),
        Shape::Versions => Some(FieldValue::List(
            node.descendants("version")
                .into_iter()
                .filter_map(Element::text)
                .map(str::to_string)
                .collect(),
        )),
        Shape::Attribution => Some(FieldValue::Attribution(composite::read_attribution(field, node)?)),
        Shape::Watermark => Some(FieldValue::Watermark(composite::read_watermark(field, node)?)),
        Shape::Gml => Some(FieldValue::Gml(composite::read_gml(node))),
        Shape::Nested(_) => {
            return Err(GsError::TypeMismatch {
                field: field.to_string(),
                expected: "nested document accessor".to_string(),
            })
        }
    };
    Ok(value)
}

// ============================================================================
// Writers
// ============================================================================

fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((ws, local)) => (Some(ws), local),
        None => (None, name),
    }
}

fn write_style(element: &str, name: &str, out: &mut XmlBuilder) {
    out.start(element);
    if !name.is_empty() {
        let (workspace, local) = split_qualified(name);
        out.text_element("name", local);
        out.optional_element("workspace", workspace);
    }
    out.end(element);
}

fn mismatch(field: &str, shape: Shape) -> GsError {
    GsError::TypeMismatch {
        field: field.to_string(),
        expected: shape.name().to_string(),
    }
}

/// Emit `value` as the element `name`.
pub fn write(shape: Shape, name: &str, value: &FieldValue, out: &mut XmlBuilder) -> GsResult<()> {
    match (shape, value) {
        (Shape::Text, FieldValue::Text(s)) => {
            out.text_element(name, s);
        }
        (Shape::Bool, FieldValue::Bool(b)) => {
            out.text_element(name, if *b { "true" } else { "false" });
        }
        (Shape::Int, FieldValue::Int(i)) => {
            out.text_element(name, &i.to_string());
        }
        (Shape::Float, FieldValue::Float(f)) => {
            out.text_element(name, &f.to_string());
        }
        (Shape::Float, FieldValue::Int(i)) => {
            out.text_element(name, &i.to_string());
        }
        (Shape::StringList, FieldValue::List(words)) => {
            out.start(name);
            for word in words.iter().filter(|w| !w.is_empty()) {
                out.text_element("string", word);
            }
            out.end(name);
        }
        (Shape::AttributeList, FieldValue::List(names)) => {
            out.start(name);
            for attribute in names {
                out.start("attribute");
                out.text_element("name", attribute);
                out.end("attribute");
            }
            out.end(name);
        }
        (Shape::KeyValue, FieldValue::Map(pairs)) => {
            out.start(name);
            for (key, value) in pairs {
                out.start_with("entry", &[("key", key.as_str())]);
                if !value.is_empty() {
                    out.data(value);
                }
                out.end("entry");
            }
            out.end(name);
        }
        (Shape::Metadata, FieldValue::Metadata(entries)) => {
            metadata::write_entries(name, entries, out)?;
        }
        (Shape::BoundingBox, FieldValue::BoundingBox(bbox)) => {
            out.start(name);
            let [min_x, max_x, min_y, max_y] = bbox.coordinates();
            out.text_element("minx", &min_x.to_string());
            out.text_element("maxx", &max_x.to_string());
            out.text_element("miny", &min_y.to_string());
            out.text_element("maxy", &max_y.to_string());
            if let Some(crs) = bbox.crs.as_deref().filter(|c| !c.is_empty()) {
                out.start_with("crs", &[("class", "projected")]);
                out.data(crs);
                out.end("crs");
            }
            out.end(name);
        }
        (Shape::NamedRef, FieldValue::Text(s)) => {
            out.start(name);
            out.text_element("name", s);
            out.end(name);
        }
        (Shape::StyleRef, FieldValue::Text(s)) => write_style(name, s, out),
        (Shape::StyleList, FieldValue::List(styles)) => {
            out.start_with(name, &[("class", "linked-hash-set")]);
            for style in styles {
                write_style("style", style, out);
            }
            out.end(name);
        }
        (Shape::LayerList, FieldValue::List(layers)) => {
            out.start(name);
            for layer in layers {
                out.start_with("published", &[("type", "layer")]);
                if !layer.is_empty() {
                    out.text_element("name", layer);
                }
                out.end("published");
            }
            out.end(name);
        }
        (Shape::Versions, FieldValue::List(versions)) => {
            out.start(name);
            for version in versions {
                out.start("org.geotools.util.Version");
                out.text_element("version", version);
                out.end("org.geotools.util.Version");
            }
            out.end(name);
        }
        (Shape::Attribution, FieldValue::Attribution(a)) => composite::write_attribution(name, a, out),
        (Shape::Watermark, FieldValue::Watermark(w)) => composite::write_watermark(name, w, out),
        (Shape::Gml, FieldValue::Gml(entries)) => composite::write_gml(name, entries, out),
        (shape, _) => return Err(mismatch(name, shape)),
    }
    Ok(())
}
