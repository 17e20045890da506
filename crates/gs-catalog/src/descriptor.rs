//! Resource Descriptors: static schema tables, one per entity kind.

use gs_common::{GsError, GsResult};

use crate::convert::{FieldValue, Shape};
use crate::locator::Locator;

/// When a field is written to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Never written.
    ReadOnly,
    /// Written only when edited locally.
    IfDirty,
    /// Always written with its effective value. The server treats an omitted
    /// `<enabled>` or `<advertised>` as false, so these cannot be left out.
    Always,
}

/// Value used when the fetched document has no element for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    None,
    Bool(bool),
    Int(i64),
    Text(&'static str),
}

impl FieldDefault {
    pub fn value(&self) -> Option<FieldValue> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Bool(b) => Some(FieldValue::Bool(*b)),
            FieldDefault::Int(i) => Some(FieldValue::Int(*i)),
            FieldDefault::Text(s) => Some(FieldValue::Text(s.to_string())),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Name callers use with `get`/`set`/`delete`.
    pub name: &'static str,
    /// Slash separated element path below the root element.
    pub element: &'static str,
    pub shape: Shape,
    pub write: WritePolicy,
    pub default: FieldDefault,
}

impl FieldSpec {
    pub const fn new(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            element: name,
            shape,
            write: WritePolicy::IfDirty,
            default: FieldDefault::None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, Shape::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, Shape::Bool)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, Shape::Int)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, Shape::Float)
    }

    pub const fn nested(name: &'static str, descriptor: &'static ResourceDescriptor) -> Self {
        Self::new(name, Shape::Nested(descriptor))
    }

    /// A boolean the server disables when omitted: always written, true unless
    /// fetched otherwise.
    pub const fn forced_flag(name: &'static str) -> Self {
        Self::new(name, Shape::Bool).always().default_value(FieldDefault::Bool(true))
    }

    /// Read from (and written to) a different element path.
    pub const fn at(mut self, element: &'static str) -> Self {
        self.element = element;
        self
    }

    pub const fn always(mut self) -> Self {
        self.write = WritePolicy::Always;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.write = WritePolicy::ReadOnly;
        self
    }

    pub const fn default_value(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn is_writable(&self) -> bool {
        self.write != WritePolicy::ReadOnly
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.shape, Shape::Nested(_))
    }
}

/// Static schema of one entity kind.
#[derive(Debug)]
pub struct ResourceDescriptor {
    /// Root element name of the entity's documents.
    pub resource_type: &'static str,
    pub locator: Locator,
    /// Serialize every writable field, not only edited ones. Used by nested
    /// settings documents the server replaces wholesale.
    pub write_all: bool,
    pub fields: &'static [FieldSpec],
}

impl ResourceDescriptor {
    pub fn field(&self, name: &str) -> GsResult<&'static FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| GsError::UnknownField {
                resource_type: self.resource_type.to_string(),
                field: name.to_string(),
            })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

impl PartialEq for ResourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    static SAMPLE: ResourceDescriptor = ResourceDescriptor {
        resource_type: "sample",
        locator: Locator::embedded(),
        write_all: false,
        fields: &[
            FieldSpec::text("name"),
            FieldSpec::forced_flag("enabled"),
            FieldSpec::text("style").at("defaultStyle/name").read_only(),
        ],
    };

    #[test]
    fn test_field_lookup() {
        assert_eq!(SAMPLE.field("enabled").unwrap().write, WritePolicy::Always);
        assert_eq!(SAMPLE.field("enabled").unwrap().default.value(), Some(FieldValue::Bool(true)));
        assert_eq!(SAMPLE.field("style").unwrap().element, "defaultStyle/name");
        assert!(!SAMPLE.field("style").unwrap().is_writable());
        assert!(matches!(
            SAMPLE.field("nope"),
            Err(GsError::UnknownField { .. })
        ));
    }
}
