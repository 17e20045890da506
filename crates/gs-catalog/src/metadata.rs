//! Sub-shapes of the overloaded `metadata` map.
//!
//! The remote schema stores structured values inside `<entry key="...">`
//! elements of a single `metadata` element. Which structure an entry holds is
//! decided by its key, never by a type tag:
//!
//! - `time`, `elevation`, `custom_dimension*` hold a `dimensionInfo`
//! - `DynamicDefaultValues` holds dynamic default value configurations
//! - `JDBC_VIRTUAL_TABLE` holds an SQL view definition
//! - every other key holds plain text

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gs_common::{GsError, GsResult};
use gs_xml::{Element, XmlBuilder};

pub const DYNAMIC_DEFAULT_VALUES_KEY: &str = "DynamicDefaultValues";
pub const JDBC_VIRTUAL_TABLE_KEY: &str = "JDBC_VIRTUAL_TABLE";

/// One value of a metadata map.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Dimension(DimensionInfo),
    DynamicDefaults(DynamicDefaultValues),
    VirtualTable(JdbcVirtualTable),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<DimensionInfo> for MetadataValue {
    fn from(d: DimensionInfo) -> Self {
        MetadataValue::Dimension(d)
    }
}

impl From<DynamicDefaultValues> for MetadataValue {
    fn from(d: DynamicDefaultValues) -> Self {
        MetadataValue::DynamicDefaults(d)
    }
}

impl From<JdbcVirtualTable> for MetadataValue {
    fn from(v: JdbcVirtualTable) -> Self {
        MetadataValue::VirtualTable(v)
    }
}

fn is_dimension_key(key: &str) -> bool {
    key == "time" || key == "elevation" || key.starts_with("custom_dimension")
}

// ============================================================================
// Dimension info
// ============================================================================

/// How a dimension is advertised in capabilities documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    List,
    DiscreteInterval,
    ContinuousInterval,
}

impl Presentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presentation::List => "LIST",
            Presentation::DiscreteInterval => "DISCRETE_INTERVAL",
            Presentation::ContinuousInterval => "CONTINUOUS_INTERVAL",
        }
    }
}

impl FromStr for Presentation {
    type Err = GsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIST" => Ok(Presentation::List),
            "DISCRETE_INTERVAL" => Ok(Presentation::DiscreteInterval),
            "CONTINUOUS_INTERVAL" => Ok(Presentation::ContinuousInterval),
            other => Err(GsError::conversion(
                "presentation",
                format!(
                    "must be one of LIST, DISCRETE_INTERVAL, CONTINUOUS_INTERVAL, got {}",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period units accepted in human readable resolutions, largest last.
const PERIODS: [(&str, f64); 6] = [
    ("seconds", 1.0),
    ("minutes", 60.0),
    ("hours", 3_600.0),
    ("days", 86_400.0),
    ("months", 2_628_000.0),
    ("years", 31_536_000.0),
];

/// Configuration of a time, elevation or custom dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DimensionInfo {
    pub enabled: bool,
    pub presentation: Option<Presentation>,
    pub attribute: Option<String>,
    pub end_attribute: Option<String>,
    /// Resolution in milliseconds.
    pub resolution: Option<i64>,
    pub units: Option<String>,
    pub unit_symbol: Option<String>,
    pub strategy: Option<String>,
    pub reference_value: Option<String>,
    pub nearest_match_enabled: Option<bool>,
}

impl DimensionInfo {
    pub fn enabled(presentation: Presentation) -> Self {
        Self {
            enabled: true,
            presentation: Some(presentation),
            ..Default::default()
        }
    }

    /// Set the resolution from a `"<n> <period>"` string such as `"8 seconds"`.
    pub fn with_resolution(mut self, resolution: &str) -> GsResult<Self> {
        self.resolution = Some(parse_resolution(resolution)?);
        Ok(self)
    }

    /// Resolution as `"<n> <period>"`, using the largest period that fits.
    pub fn resolution_str(&self) -> Option<String> {
        let millis = self.resolution?;
        let seconds = millis as f64 / 1000.0;

        let mut biggest = PERIODS[0];
        for period in PERIODS {
            if seconds < period.1 {
                break;
            }
            biggest = period;
        }

        let value = seconds / biggest.1;
        if value.fract() == 0.0 {
            Some(format!("{} {}", value as i64, biggest.0))
        } else {
            Some(format!("{} {}", value, biggest.0))
        }
    }
}

/// Convert `"<n> <period>"` to milliseconds.
pub fn parse_resolution(resolution: &str) -> GsResult<i64> {
    let invalid = || {
        GsError::conversion(
            "resolution",
            format!("expected \"<n> <period>\", got {:?}", resolution),
        )
    };

    let (value, unit) = resolution.trim().split_once(' ').ok_or_else(invalid)?;
    let value: f64 = value.trim().parse().map_err(|_| invalid())?;
    let unit = unit.trim().to_lowercase();
    let multiplier = PERIODS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, m)| *m)
        .ok_or_else(|| GsError::conversion("resolution", format!("invalid period: {}", unit)))?;

    Ok((value * multiplier * 1000.0) as i64)
}

fn child_text(node: &Element, name: &str) -> Option<String> {
    node.find_text(name).map(str::to_string)
}

fn read_dimension(node: &Element) -> GsResult<DimensionInfo> {
    let presentation = node
        .find_text("presentation")
        .map(Presentation::from_str)
        .transpose()?;
    let resolution = match node.find_text("resolution").map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<i64>().map_err(|_| {
            GsError::conversion("resolution", format!("not an integer: {}", raw))
        })?),
        _ => None,
    };

    Ok(DimensionInfo {
        enabled: node.find_text("enabled").map(str::trim) == Some("true"),
        presentation,
        attribute: child_text(node, "attribute"),
        end_attribute: child_text(node, "endAttribute"),
        resolution,
        units: child_text(node, "units"),
        unit_symbol: child_text(node, "unitSymbol"),
        strategy: child_text(node, "defaultValue/strategy"),
        reference_value: child_text(node, "defaultValue/referenceValue")
            .or_else(|| child_text(node, "referenceValue")),
        nearest_match_enabled: node.find_text("nearestMatchEnabled").map(|v| v.trim() == "true"),
    })
}

fn write_dimension(dimension: &DimensionInfo, out: &mut XmlBuilder) {
    let resolution = dimension.resolution.map(|r| r.to_string());

    out.start("dimensionInfo");
    out.text_element("enabled", bool_text(dimension.enabled));
    out.optional_element("presentation", dimension.presentation.map(|p| p.as_str()));
    out.optional_element("attribute", dimension.attribute.as_deref());
    out.optional_element("endAttribute", dimension.end_attribute.as_deref());
    out.optional_element("resolution", resolution.as_deref());
    out.optional_element("units", dimension.units.as_deref());
    out.optional_element("unitSymbol", dimension.unit_symbol.as_deref());
    if let Some(strategy) = &dimension.strategy {
        out.start("defaultValue");
        out.text_element("strategy", strategy);
        if let Some(reference) = dimension.reference_value.as_deref().filter(|r| !r.is_empty()) {
            out.text_element("referenceValue", reference);
        }
        out.end("defaultValue");
    }
    if let Some(nearest) = dimension.nearest_match_enabled {
        out.text_element("nearestMatchEnabled", bool_text(nearest));
    }
    out.end("dimensionInfo");
}

fn bool_text(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

// ============================================================================
// Dynamic default values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicDefaultConfiguration {
    pub dimension: Option<String>,
    pub policy: Option<String>,
    pub default_value_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicDefaultValues {
    pub configurations: Vec<DynamicDefaultConfiguration>,
}

fn read_dynamic_defaults(node: &Element) -> DynamicDefaultValues {
    DynamicDefaultValues {
        configurations: node
            .find_all("configurations/configuration")
            .into_iter()
            .map(|c| DynamicDefaultConfiguration {
                dimension: child_text(c, "dimension"),
                policy: child_text(c, "policy"),
                default_value_expression: child_text(c, "defaultValueExpression"),
            })
            .collect(),
    }
}

fn write_dynamic_defaults(values: &DynamicDefaultValues, out: &mut XmlBuilder) {
    out.start(DYNAMIC_DEFAULT_VALUES_KEY);
    out.start("configurations");
    for c in &values.configurations {
        out.start("configuration");
        out.optional_element("dimension", c.dimension.as_deref());
        out.optional_element("policy", c.policy.as_deref());
        out.optional_element("defaultValueExpression", c.default_value_expression.as_deref());
        out.end("configuration");
    }
    out.end("configurations");
    out.end(DYNAMIC_DEFAULT_VALUES_KEY);
}

// ============================================================================
// JDBC virtual table
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualTableGeometry {
    pub name: String,
    pub geometry_type: String,
    pub srid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualTableParameter {
    pub name: String,
    pub default_value: Option<String>,
    pub regexp_validator: Option<String>,
}

/// An SQL view published as a feature type.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcVirtualTable {
    pub name: String,
    pub sql: String,
    pub escape_sql: bool,
    pub key_column: Option<String>,
    pub geometry: Option<VirtualTableGeometry>,
    pub parameters: Vec<VirtualTableParameter>,
}

impl JdbcVirtualTable {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            escape_sql: false,
            key_column: None,
            geometry: None,
            parameters: Vec::new(),
        }
    }
}

fn read_virtual_table(node: &Element) -> JdbcVirtualTable {
    let text = |path: &str| node.find_text(path).unwrap_or_default().to_string();

    JdbcVirtualTable {
        name: text("name"),
        sql: text("sql"),
        escape_sql: node.find_text("escapeSql").map(str::trim) == Some("true"),
        key_column: child_text(node, "keyColumn"),
        geometry: node.find("geometry").map(|g| VirtualTableGeometry {
            name: g.find_text("name").unwrap_or_default().to_string(),
            geometry_type: g.find_text("type").unwrap_or_default().to_string(),
            srid: g.find_text("srid").unwrap_or_default().to_string(),
        }),
        parameters: node
            .find_all("parameter")
            .into_iter()
            .map(|p| VirtualTableParameter {
                name: p.find_text("name").unwrap_or_default().to_string(),
                default_value: child_text(p, "defaultValue"),
                regexp_validator: child_text(p, "regexpValidator"),
            })
            .collect(),
    }
}

fn write_virtual_table(table: &JdbcVirtualTable, out: &mut XmlBuilder) {
    out.start("virtualTable");
    out.text_element("name", &table.name);
    out.text_element("sql", &table.sql);
    out.text_element("escapeSql", bool_text(table.escape_sql));
    out.optional_element("keyColumn", table.key_column.as_deref());
    if let Some(g) = &table.geometry {
        out.start("geometry");
        for (name, value) in [("name", &g.name), ("type", &g.geometry_type), ("srid", &g.srid)] {
            if !value.is_empty() {
                out.text_element(name, value);
            }
        }
        out.end("geometry");
    }
    for p in &table.parameters {
        out.start("parameter");
        out.text_element("name", &p.name);
        out.optional_element("defaultValue", p.default_value.as_deref());
        out.optional_element("regexpValidator", p.regexp_validator.as_deref());
        out.end("parameter");
    }
    out.end("virtualTable");
}

// ============================================================================
// Entries
// ============================================================================

/// Read every `entry` child of a metadata element, dispatching on the key.
pub fn read_entries(node: &Element) -> GsResult<BTreeMap<String, MetadataValue>> {
    let mut map = BTreeMap::new();
    for entry in node.find_all("entry") {
        let Some(key) = entry.attr("key") else {
            continue;
        };

        let value = if is_dimension_key(key) {
            entry.child("dimensionInfo").map(read_dimension).transpose()?.map(MetadataValue::Dimension)
        } else if key == DYNAMIC_DEFAULT_VALUES_KEY {
            entry
                .child(DYNAMIC_DEFAULT_VALUES_KEY)
                .map(|n| MetadataValue::DynamicDefaults(read_dynamic_defaults(n)))
        } else if key == JDBC_VIRTUAL_TABLE_KEY {
            entry
                .child("virtualTable")
                .map(|n| MetadataValue::VirtualTable(read_virtual_table(n)))
        } else {
            None
        };

        let value = value.unwrap_or_else(|| MetadataValue::Text(entry.text().unwrap_or_default().to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Write a metadata element with one `entry` per key.
pub fn write_entries(
    name: &str,
    entries: &BTreeMap<String, MetadataValue>,
    out: &mut XmlBuilder,
) -> GsResult<()> {
    out.start(name);
    for (key, value) in entries {
        out.start_with("entry", &[("key", key.as_str())]);
        match value {
            MetadataValue::Text(text) => {
                if !text.is_empty() {
                    out.data(text);
                }
            }
            MetadataValue::Dimension(dimension) if is_dimension_key(key) => {
                write_dimension(dimension, out)
            }
            MetadataValue::DynamicDefaults(values) if key == DYNAMIC_DEFAULT_VALUES_KEY => {
                write_dynamic_defaults(values, out)
            }
            MetadataValue::VirtualTable(table) if key == JDBC_VIRTUAL_TABLE_KEY => {
                write_virtual_table(table, out)
            }
            _ => {
                return Err(GsError::TypeMismatch {
                    field: format!("metadata[{}]", key),
                    expected: "value matching the entry key".to_string(),
                })
            }
        }
        out.end("entry");
    }
    out.end(name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(entries: &BTreeMap<String, MetadataValue>) -> BTreeMap<String, MetadataValue> {
        let mut out = XmlBuilder::new();
        write_entries("metadata", entries, &mut out).unwrap();
        let node = Element::parse(&out.render().unwrap()).unwrap();
        read_entries(&node).unwrap()
    }

    #[test]
    fn test_dispatch_on_key_name() {
        let xml = r#"<metadata>
            <entry key="time"><dimensionInfo><enabled>true</enabled><presentation>LIST</presentation>
                <defaultValue><strategy>MAXIMUM</strategy></defaultValue></dimensionInfo></entry>
            <entry key="cachingEnabled">false</entry>
            <entry key="JDBC_VIRTUAL_TABLE"><virtualTable><name>v</name><sql>select 1</sql>
                <escapeSql>false</escapeSql><geometry><name>geom</name><type>Point</type><srid>4326</srid></geometry>
            </virtualTable></entry>
        </metadata>"#;
        let node = Element::parse(xml).unwrap();
        let entries = read_entries(&node).unwrap();

        match &entries["time"] {
            MetadataValue::Dimension(d) => {
                assert!(d.enabled);
                assert_eq!(d.presentation, Some(Presentation::List));
                assert_eq!(d.strategy.as_deref(), Some("MAXIMUM"));
            }
            other => panic!("expected dimension, got {:?}", other),
        }
        assert_eq!(entries["cachingEnabled"], MetadataValue::Text("false".into()));
        match &entries["JDBC_VIRTUAL_TABLE"] {
            MetadataValue::VirtualTable(v) => {
                assert_eq!(v.sql, "select 1");
                assert_eq!(v.geometry.as_ref().unwrap().geometry_type, "Point");
                assert_eq!(v.geometry.as_ref().unwrap().srid, "4326");
            }
            other => panic!("expected virtual table, got {:?}", other),
        }
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "elevation".to_string(),
            MetadataValue::Dimension(DimensionInfo {
                units: Some("EPSG:5030".into()),
                resolution: Some(8000),
                nearest_match_enabled: Some(false),
                ..DimensionInfo::enabled(Presentation::DiscreteInterval)
            }),
        );
        entries.insert(
            DYNAMIC_DEFAULT_VALUES_KEY.to_string(),
            MetadataValue::DynamicDefaults(DynamicDefaultValues {
                configurations: vec![DynamicDefaultConfiguration {
                    dimension: Some("time".into()),
                    policy: Some("EXPRESSION".into()),
                    default_value_expression: Some("Concatenate('2014','-01','-01')".into()),
                }],
            }),
        );
        entries.insert("kml.regionateFeatureLimit".to_string(), "10".into());

        assert_eq!(roundtrip(&entries), entries);
    }

    #[test]
    fn test_value_must_match_key() {
        let mut entries = BTreeMap::new();
        entries.insert("plain".to_string(), MetadataValue::Dimension(DimensionInfo::default()));
        let mut out = XmlBuilder::new();
        assert!(write_entries("metadata", &entries, &mut out).is_err());
    }

    #[test]
    fn test_invalid_presentation_rejected() {
        let node = Element::parse(
            r#"<metadata><entry key="time"><dimensionInfo><presentation>SOMETIMES</presentation></dimensionInfo></entry></metadata>"#,
        )
        .unwrap();
        assert!(matches!(read_entries(&node), Err(GsError::Conversion { .. })));
    }

    #[test]
    fn test_resolution_conversions() {
        assert_eq!(parse_resolution("8 seconds").unwrap(), 8_000);
        assert_eq!(parse_resolution("1.5 hours").unwrap(), 5_400_000);
        assert!(parse_resolution("8 fortnights").is_err());
        assert!(parse_resolution("eight").is_err());

        let dim = DimensionInfo::enabled(Presentation::List).with_resolution("2 days").unwrap();
        assert_eq!(dim.resolution, Some(172_800_000));
        assert_eq!(dim.resolution_str().as_deref(), Some("2 days"));

        let dim = DimensionInfo {
            resolution: Some(90_000),
            ..Default::default()
        };
        assert_eq!(dim.resolution_str().as_deref(), Some("1.5 minutes"));
    }
}
