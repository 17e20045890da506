//! Owned XML element tree.
//!
//! Responses from the configuration API are small documents that get queried
//! by path many times (once per field access), so they are parsed once into
//! this tree and kept as the raw snapshot of a resource.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::writer::XmlBuilder;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML parsing error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unbalanced XML: {0}")]
    Unbalanced(String),

    #[error("Document has no root element")]
    Empty,

    #[error("XML writing error: {0}")]
    Write(String),
}

/// One XML element with its attributes, text and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a document and return its root element.
    ///
    /// Leaf text is kept verbatim. Whitespace between child elements is
    /// indentation and is dropped.
    pub fn parse(xml: &str) -> Result<Element, XmlError> {
        let mut reader = Reader::from_str(xml);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => stack.push(Self::from_start(&e)?),
                Ok(Event::Empty(e)) => {
                    let element = Self::from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(e)) => {
                    let mut element = stack.pop().ok_or_else(|| {
                        XmlError::Unbalanced(String::from_utf8_lossy(e.name().as_ref()).into_owned())
                    })?;
                    element.drop_indentation();
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(t)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| XmlError::Parse {
                            position: reader.buffer_position(),
                            message: e.to_string(),
                        })?;
                        top.push_text(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.push_text(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XmlError::Parse {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Unbalanced(open.name.clone()));
        }
        root.ok_or(XmlError::Empty)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
        let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Parse {
                position: 0,
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::Parse {
                    position: 0,
                    message: e.to_string(),
                })?
                .into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    fn drop_indentation(&mut self) {
        if !self.children.is_empty() && self.text.as_deref().map_or(false, |t| t.trim().is_empty()) {
            self.text = None;
        }
    }

    /// Name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// First element matching a slash separated path of child names.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// All elements matching a slash separated path of child names.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut current = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |c| c.name == segment))
                .collect();
        }
        current
    }

    /// Text of the first element matching `path`.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(Element::text)
    }

    /// Every descendant (at any depth) with the given name, in document order.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            out.extend(child.descendants(name));
        }
        out
    }

    /// Self-referential link: an `href` attribute on the element itself or on
    /// an embedded atom link child.
    pub fn href(&self) -> Option<&str> {
        self.attr("href").or_else(|| {
            self.children
                .iter()
                .find(|c| c.local_name() == "link")
                .and_then(|c| c.attr("href"))
        })
    }

    /// Replace the first child with the same name, or append.
    pub fn set_child(&mut self, child: Element) {
        match self.children.iter_mut().find(|c| c.name == child.name) {
            Some(existing) => *existing = child,
            None => self.children.push(child),
        }
    }

    /// Remove every direct child matching the predicate.
    pub fn remove_children<F>(&mut self, predicate: F)
    where
        F: Fn(&Element) -> bool,
    {
        self.children.retain(|c| !predicate(c));
    }

    /// Replay this tree into a builder.
    pub fn write_to(&self, builder: &mut XmlBuilder) {
        let attrs: Vec<(&str, &str)> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        builder.start_with(&self.name, &attrs);
        if let Some(text) = &self.text {
            builder.data(text);
        }
        for child in &self.children {
            child.write_to(builder);
        }
        builder.end(&self.name);
    }

    /// Serialize this tree back to a document string.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut builder = XmlBuilder::new();
        self.write_to(&mut builder);
        builder.render()
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::Unbalanced(format!(
            "second root element <{}>",
            element.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = r#"<?xml version="1.0"?>
<layer>
    <name>states</name>
    <type>VECTOR</type>
    <defaultStyle>
        <name>population</name>
        <atom:link xmlns:atom="http://www.w3.org/2005/Atom" rel="alternate" href="http://localhost:8080/geoserver/rest/styles/population.xml" type="application/xml"/>
    </defaultStyle>
    <styles class="linked-hash-set">
        <style><name>polygon</name></style>
        <style><name>topp:pophatch</name></style>
    </styles>
    <enabled>true</enabled>
    <title>A &amp; B</title>
</layer>"#;

    #[test]
    fn test_parse_and_find() {
        let root = Element::parse(LAYER).unwrap();
        assert_eq!(root.name, "layer");
        assert_eq!(root.find_text("name"), Some("states"));
        assert_eq!(root.find_text("defaultStyle/name"), Some("population"));
        assert_eq!(root.find_text("title"), Some("A & B"));
        assert_eq!(root.find("styles").unwrap().attr("class"), Some("linked-hash-set"));
        assert!(root.find("missing/path").is_none());
    }

    #[test]
    fn test_find_all() {
        let root = Element::parse(LAYER).unwrap();
        let names: Vec<_> = root
            .find_all("styles/style/name")
            .into_iter()
            .filter_map(Element::text)
            .collect();
        assert_eq!(names, vec!["polygon", "topp:pophatch"]);
    }

    #[test]
    fn test_atom_href() {
        let root = Element::parse(LAYER).unwrap();
        let style = root.find("defaultStyle").unwrap();
        assert_eq!(
            style.href(),
            Some("http://localhost:8080/geoserver/rest/styles/population.xml")
        );
        assert_eq!(style.children[1].local_name(), "link");
    }

    #[test]
    fn test_empty_element_has_no_text() {
        let root = Element::parse("<workspace><name>acme</name><isolated/></workspace>").unwrap();
        assert_eq!(root.find("isolated").unwrap().text(), None);
    }

    #[test]
    fn test_plain_text_is_not_a_document() {
        let err = Element::parse("No such workspace: 'gone'").unwrap_err();
        assert!(matches!(err, XmlError::Empty));
    }

    #[test]
    fn test_leaf_whitespace_is_kept() {
        let root = Element::parse("<featureType>\n  <abstract>  indented abstract </abstract>\n  <title> </title>\n</featureType>")
            .unwrap();
        assert_eq!(root.text(), None);
        assert_eq!(root.find_text("abstract"), Some("  indented abstract "));
        assert_eq!(root.find_text("title"), Some(" "));
    }

    #[test]
    fn test_unbalanced_document() {
        assert!(Element::parse("<a><b></a>").is_err());
        assert!(Element::parse("<a><b>").is_err());
    }

    #[test]
    fn test_to_xml_reparses_identically() {
        let root = Element::parse(LAYER).unwrap();
        let again = Element::parse(&root.to_xml().unwrap()).unwrap();
        assert_eq!(root, again);
    }

    #[test]
    fn test_set_child_replaces() {
        let mut root = Element::parse("<a><b>1</b><c>2</c></a>").unwrap();
        root.set_child(Element::new("b").with_text("3"));
        root.set_child(Element::new("d").with_text("4"));
        assert_eq!(root.find_text("b"), Some("3"));
        assert_eq!(root.find_text("d"), Some("4"));
        assert_eq!(root.children.len(), 3);
    }
}
