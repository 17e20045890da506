//! Local state of one document: the fetched snapshot, pending edits and
//! nested sub-documents.
//!
//! Everything here is pure. Fetching and saving live in
//! [`BoundResource`](crate::resource::BoundResource), which owns one of these.

use std::collections::HashMap;

use gs_common::{BoundingBox, GsError, GsResult};
use gs_xml::{Element, XmlBuilder};

use crate::convert::{self, FieldValue, Shape};
use crate::descriptor::{FieldSpec, ResourceDescriptor, WritePolicy};

/// A pending edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Dirty {
    Set(FieldValue),
    /// Explicitly cleared.
    Unset,
}

#[derive(Debug, Clone)]
pub struct ResourceState {
    descriptor: &'static ResourceDescriptor,
    dom: Option<Element>,
    dirty: HashMap<&'static str, Dirty>,
    nested: HashMap<&'static str, ResourceState>,
}

impl ResourceState {
    pub fn new(descriptor: &'static ResourceDescriptor) -> Self {
        Self {
            descriptor,
            dom: None,
            dirty: HashMap::new(),
            nested: HashMap::new(),
        }
    }

    pub fn from_element(descriptor: &'static ResourceDescriptor, dom: Element) -> Self {
        Self {
            dom: Some(dom),
            ..Self::new(descriptor)
        }
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    pub fn dom(&self) -> Option<&Element> {
        self.dom.as_ref()
    }

    pub fn is_fetched(&self) -> bool {
        self.dom.is_some()
    }

    /// Install a freshly fetched snapshot. Nested documents without pending
    /// edits were derived from the old snapshot and are dropped.
    pub fn set_dom(&mut self, dom: Element) {
        self.dom = Some(dom);
        self.nested.retain(|_, sub| sub.has_pending_edits());
    }

    /// True when this document or any nested document has unsaved edits.
    pub fn has_pending_edits(&self) -> bool {
        !self.dirty.is_empty() || self.nested.values().any(ResourceState::has_pending_edits)
    }

    pub fn is_field_dirty(&self, field: &str) -> bool {
        self.dirty.contains_key(field)
    }

    /// Names of the locally edited fields, in descriptor order.
    pub fn dirty_fields(&self) -> Vec<&'static str> {
        self.descriptor
            .fields
            .iter()
            .filter(|f| self.dirty.contains_key(f.name))
            .map(|f| f.name)
            .collect()
    }

    /// Effective value of a field: the pending edit, else the snapshot, else
    /// the declared default.
    pub fn get(&self, field: &str) -> GsResult<Option<FieldValue>> {
        let spec = self.descriptor.field(field)?;
        if spec.is_nested() {
            return Err(GsError::TypeMismatch {
                field: field.to_string(),
                expected: "nested document accessor".to_string(),
            });
        }

        match self.dirty.get(spec.name) {
            Some(Dirty::Set(value)) => return Ok(Some(value.clone())),
            Some(Dirty::Unset) => return Ok(None),
            None => {}
        }

        let fetched = match self.dom.as_ref().and_then(|dom| dom.find(spec.element)) {
            Some(node) => convert::read(spec.shape, spec.name, node)?,
            None => None,
        };
        Ok(fetched.or_else(|| spec.default.value()))
    }

    pub fn get_str(&self, field: &str) -> GsResult<Option<String>> {
        typed(field, self.get(field)?, "text", |v| match v {
            FieldValue::Text(s) => Ok(s),
            other => Err(other),
        })
    }

    pub fn get_bool(&self, field: &str) -> GsResult<Option<bool>> {
        typed(field, self.get(field)?, "boolean", |v| match v {
            FieldValue::Bool(b) => Ok(b),
            other => Err(other),
        })
    }

    pub fn get_int(&self, field: &str) -> GsResult<Option<i64>> {
        typed(field, self.get(field)?, "integer", |v| match v {
            FieldValue::Int(i) => Ok(i),
            other => Err(other),
        })
    }

    pub fn get_float(&self, field: &str) -> GsResult<Option<f64>> {
        typed(field, self.get(field)?, "float", |v| match v {
            FieldValue::Float(f) => Ok(f),
            FieldValue::Int(i) => Ok(i as f64),
            other => Err(other),
        })
    }

    pub fn get_list(&self, field: &str) -> GsResult<Option<Vec<String>>> {
        typed(field, self.get(field)?, "list", |v| match v {
            FieldValue::List(items) => Ok(items),
            other => Err(other),
        })
    }

    pub fn get_bbox(&self, field: &str) -> GsResult<Option<BoundingBox>> {
        typed(field, self.get(field)?, "bounding box", |v| match v {
            FieldValue::BoundingBox(b) => Ok(b),
            other => Err(other),
        })
    }

    fn writable(&self, field: &str) -> GsResult<&'static FieldSpec> {
        let spec = self.descriptor.field(field)?;
        if !spec.is_writable() {
            return Err(GsError::InvalidArgument(format!(
                "field '{}' of {} is read-only",
                field, self.descriptor.resource_type
            )));
        }
        if spec.is_nested() {
            return Err(GsError::TypeMismatch {
                field: field.to_string(),
                expected: "nested document accessor".to_string(),
            });
        }
        Ok(spec)
    }

    /// Record a pending edit. Never triggers a fetch.
    pub fn set(&mut self, field: &str, value: FieldValue) -> GsResult<()> {
        let spec = self.writable(field)?;
        if !spec.shape.accepts(&value) {
            return Err(GsError::TypeMismatch {
                field: field.to_string(),
                expected: spec.shape.name().to_string(),
            });
        }
        self.dirty.insert(spec.name, Dirty::Set(value));
        Ok(())
    }

    /// Record an explicit clear of a field.
    pub fn delete(&mut self, field: &str) -> GsResult<()> {
        let spec = self.writable(field)?;
        self.dirty.insert(spec.name, Dirty::Unset);
        Ok(())
    }

    /// Mutable view of a nested sub-document, derived from the snapshot on
    /// first access.
    pub fn nested_mut(&mut self, field: &str) -> GsResult<&mut ResourceState> {
        let spec = self.descriptor.field(field)?;
        let Shape::Nested(descriptor) = spec.shape else {
            return Err(GsError::TypeMismatch {
                field: field.to_string(),
                expected: spec.shape.name().to_string(),
            });
        };

        let dom = &self.dom;
        Ok(self.nested.entry(spec.name).or_insert_with(|| {
            match dom.as_ref().and_then(|d| d.find(spec.element)) {
                Some(node) => ResourceState::from_element(descriptor, node.clone()),
                None => ResourceState::new(descriptor),
            }
        }))
    }

    /// Drop the snapshot, all pending edits and nested documents.
    pub fn clear(&mut self) {
        self.dom = None;
        self.dirty.clear();
        self.nested.clear();
    }

    /// Forget pending edits after they were written, along with the snapshot
    /// they were made against.
    pub fn mark_saved(&mut self) {
        self.clear();
    }

    /// Mark always-written fields dirty with their declared defaults. Used
    /// for documents that do not exist on the server yet.
    pub fn pin_forced_defaults(&mut self) {
        for spec in self.descriptor.fields.iter().filter(|f| f.write == WritePolicy::Always) {
            if let Some(value) = spec.default.value() {
                self.dirty.entry(spec.name).or_insert(Dirty::Set(value));
            }
        }
    }

    /// Pin every writable field to its current effective value, so the next
    /// serialization carries the complete document.
    pub fn dirty_all(&mut self) -> GsResult<()> {
        let descriptor = self.descriptor;
        for spec in descriptor.fields.iter().filter(|f| f.is_writable()) {
            if spec.is_nested() {
                self.nested_mut(spec.name)?.dirty_all()?;
                continue;
            }
            if self.dirty.contains_key(spec.name) {
                continue;
            }
            if let Some(value) = self.get(spec.name)? {
                self.dirty.insert(spec.name, Dirty::Set(value));
            }
        }
        Ok(())
    }

    /// Whether serializing needs field values only the server has.
    pub fn needs_snapshot(&self) -> bool {
        if self.dom.is_some() {
            return false;
        }
        self.descriptor.fields.iter().any(|f| {
            f.is_writable()
                && !f.is_nested()
                && !self.dirty.contains_key(f.name)
                && (self.descriptor.write_all || f.write == WritePolicy::Always)
        })
    }

    /// Emit the fields to write, in descriptor order, without the root element.
    pub fn serialize_fields(&self, out: &mut XmlBuilder) -> GsResult<()> {
        for spec in self.descriptor.fields {
            if let Shape::Nested(_) = spec.shape {
                if let Some(sub) = self.nested.get(spec.name) {
                    if sub.has_pending_edits() {
                        out.start(spec.element);
                        sub.serialize_fields(out)?;
                        out.end(spec.element);
                    }
                }
                continue;
            }
            if !spec.is_writable() {
                continue;
            }

            match self.dirty.get(spec.name) {
                Some(Dirty::Set(value)) => convert::write(spec.shape, spec.element, value, out)?,
                Some(Dirty::Unset) => {
                    if spec.write == WritePolicy::Always || spec.shape.clears_with_empty() {
                        out.empty(spec.element);
                    }
                }
                None if spec.write == WritePolicy::Always || self.descriptor.write_all => {
                    if let Some(value) = self.get(spec.name)? {
                        convert::write(spec.shape, spec.element, &value, out)?;
                    }
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Emit the full document under a root element named after the resource type.
    pub fn serialize(&self, out: &mut XmlBuilder) -> GsResult<()> {
        out.start(self.descriptor.resource_type);
        self.serialize_fields(out)?;
        out.end(self.descriptor.resource_type);
        Ok(())
    }

    /// The serialized document as a request body.
    pub fn message(&self) -> GsResult<String> {
        let mut out = XmlBuilder::new();
        self.serialize(&mut out)?;
        out.render().map_err(|e| GsError::InvalidArgument(e.to_string()))
    }
}

fn typed<T>(
    field: &str,
    value: Option<FieldValue>,
    expected: &str,
    extract: impl FnOnce(FieldValue) -> Result<T, FieldValue>,
) -> GsResult<Option<T>> {
    match value {
        None => Ok(None),
        Some(value) => extract(value).map(Some).map_err(|_| GsError::TypeMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldSpec;
    use crate::locator::Locator;

    static CONTACT: ResourceDescriptor = ResourceDescriptor {
        resource_type: "contact",
        locator: Locator::embedded(),
        write_all: true,
        fields: &[FieldSpec::text("contactPerson"), FieldSpec::text("contactEmail")],
    };

    static LAYERISH: ResourceDescriptor = ResourceDescriptor {
        resource_type: "featureType",
        locator: Locator::embedded(),
        write_all: false,
        fields: &[
            FieldSpec::text("name"),
            FieldSpec::text("abstract"),
            FieldSpec::int("maxFeatures"),
            FieldSpec::forced_flag("enabled"),
            FieldSpec::forced_flag("advertised"),
            FieldSpec::new("keywords", Shape::StringList),
            FieldSpec::text("store").at("store/name").read_only(),
            FieldSpec::nested("contact", &CONTACT),
        ],
    };

    const DOC: &str = "<featureType><name>states</name><abstract>old</abstract>\
        <maxFeatures>10</maxFeatures><enabled>false</enabled>\
        <store><name>topp:states_shp</name></store>\
        <contact><contactPerson>Claudius</contactPerson><contactEmail>c@example.com</contactEmail></contact>\
        </featureType>";

    fn fetched() -> ResourceState {
        ResourceState::from_element(&LAYERISH, Element::parse(DOC).unwrap())
    }

    #[test]
    fn test_set_wins_over_snapshot() {
        let mut state = fetched();
        state.set("abstract", "new text".into()).unwrap();
        assert_eq!(state.get_str("abstract").unwrap().as_deref(), Some("new text"));
        assert_eq!(state.dirty_fields(), vec!["abstract"]);
    }

    #[test]
    fn test_pinned_defaults_are_dirty() {
        let mut state = ResourceState::new(&LAYERISH);
        state.set("enabled", false.into()).unwrap();
        state.pin_forced_defaults();
        assert_eq!(state.dirty_fields(), vec!["enabled", "advertised"]);
        assert_eq!(state.get_bool("enabled").unwrap(), Some(false));
        assert_eq!(
            state.message().unwrap(),
            "<featureType><enabled>false</enabled><advertised>true</advertised></featureType>"
        );
    }

    #[test]
    fn test_set_on_unfetched_state() {
        let mut state = ResourceState::new(&LAYERISH);
        state.set("maxFeatures", 5.into()).unwrap();
        assert_eq!(state.get_int("maxFeatures").unwrap(), Some(5));
        assert!(!state.is_fetched());
    }

    #[test]
    fn test_defaults_and_snapshot_values() {
        let state = fetched();
        assert_eq!(state.get_bool("enabled").unwrap(), Some(false));
        assert_eq!(state.get_bool("advertised").unwrap(), Some(true));
        assert_eq!(state.get_str("store").unwrap().as_deref(), Some("topp:states_shp"));
        assert_eq!(state.get_list("keywords").unwrap(), None);
    }

    #[test]
    fn test_delete_reads_absent_and_writes_empty() {
        let mut state = fetched();
        state.delete("abstract").unwrap();
        state.delete("maxFeatures").unwrap();
        assert_eq!(state.get("abstract").unwrap(), None);
        let xml = state.message().unwrap();
        assert!(xml.contains("<abstract></abstract>"));
        assert!(!xml.contains("maxFeatures"));
    }

    #[test]
    fn test_forced_flags_written_with_effective_values() {
        let state = fetched();
        assert_eq!(
            state.message().unwrap(),
            "<featureType><enabled>false</enabled><advertised>true</advertised></featureType>"
        );

        let state = ResourceState::new(&LAYERISH);
        assert_eq!(
            state.message().unwrap(),
            "<featureType><enabled>true</enabled><advertised>true</advertised></featureType>"
        );
    }

    #[test]
    fn test_partial_serialization_in_descriptor_order() {
        let mut state = fetched();
        state.set("keywords", vec!["usa", "census"].into()).unwrap();
        state.set("abstract", "changed".into()).unwrap();
        assert_eq!(
            state.message().unwrap(),
            "<featureType><abstract>changed</abstract><enabled>false</enabled><advertised>true</advertised>\
             <keywords><string>usa</string><string>census</string></keywords></featureType>"
        );
    }

    #[test]
    fn test_nested_written_only_when_edited() {
        let mut state = fetched();
        assert!(!state.message().unwrap().contains("contact"));

        state
            .nested_mut("contact")
            .unwrap()
            .set("contactEmail", "king@example.com".into())
            .unwrap();
        let xml = state.message().unwrap();
        assert!(xml.contains(
            "<contact><contactPerson>Claudius</contactPerson><contactEmail>king@example.com</contactEmail></contact>"
        ));
        assert!(state.has_pending_edits());
    }

    #[test]
    fn test_rejections() {
        let mut state = fetched();
        assert!(matches!(state.set("nope", "x".into()), Err(GsError::UnknownField { .. })));
        assert!(matches!(
            state.set("maxFeatures", "ten".into()),
            Err(GsError::TypeMismatch { .. })
        ));
        assert!(matches!(state.set("store", "x".into()), Err(GsError::InvalidArgument(_))));
        assert!(state.get("contact").is_err());
    }

    #[test]
    fn test_conversion_error_surfaces_on_get() {
        let dom = Element::parse("<featureType><maxFeatures>many</maxFeatures></featureType>").unwrap();
        let state = ResourceState::from_element(&LAYERISH, dom);
        assert!(matches!(state.get("maxFeatures"), Err(GsError::Conversion { .. })));
    }

    #[test]
    fn test_dirty_all_pins_everything() {
        let mut state = fetched();
        state.dirty_all().unwrap();
        let xml = state.message().unwrap();
        assert!(xml.contains("<name>states</name>"));
        assert!(xml.contains("<maxFeatures>10</maxFeatures>"));
        assert!(xml.contains("<contactPerson>Claudius</contactPerson>"));
        assert!(!xml.contains("<store>"));
    }

    #[test]
    fn test_needs_snapshot() {
        let mut state = ResourceState::new(&LAYERISH);
        assert!(state.needs_snapshot());
        state.set("enabled", true.into()).unwrap();
        state.set("advertised", false.into()).unwrap();
        assert!(!state.needs_snapshot());
        assert!(!fetched().needs_snapshot());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut state = fetched();
        state.set("abstract", "x".into()).unwrap();
        state.clear();
        assert!(!state.is_fetched());
        assert!(!state.has_pending_edits());
        assert_eq!(state.get("abstract").unwrap(), None);
    }
}
