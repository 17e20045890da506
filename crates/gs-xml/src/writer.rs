//! Ordered XML emission.
//!
//! Field writers never touch a serializer directly: they append open/text/close
//! instructions to an [`XmlBuilder`], and the whole message is rendered once.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::element::XmlError;

/// One emission instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    End(String),
}

/// Accumulates [`XmlEvent`]s in document order.
#[derive(Debug, Clone, Default)]
pub struct XmlBuilder {
    events: Vec<XmlEvent>,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: &str) -> &mut Self {
        self.start_with(name, &[])
    }

    pub fn start_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> &mut Self {
        self.events.push(XmlEvent::Start {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    pub fn data(&mut self, text: &str) -> &mut Self {
        self.events.push(XmlEvent::Text(text.to_string()));
        self
    }

    pub fn end(&mut self, name: &str) -> &mut Self {
        self.events.push(XmlEvent::End(name.to_string()));
        self
    }

    /// `<name>text</name>`; an empty text yields `<name></name>`.
    pub fn text_element(&mut self, name: &str, text: &str) -> &mut Self {
        self.start(name);
        if !text.is_empty() {
            self.data(text);
        }
        self.end(name)
    }

    /// Emit `<name>text</name>` only when a value is present.
    pub fn optional_element(&mut self, name: &str, text: Option<&str>) -> &mut Self {
        if let Some(text) = text {
            self.text_element(name, text);
        }
        self
    }

    pub fn empty(&mut self, name: &str) -> &mut Self {
        self.start(name).end(name)
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<XmlEvent> {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn render(&self) -> Result<String, XmlError> {
        render(&self.events)
    }
}

/// Render events into a document string, checking that every open element is closed.
pub fn render(events: &[XmlEvent]) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    let mut open: Vec<&str> = Vec::new();
    let write_err = |e: quick_xml::Error| XmlError::Write(e.to_string());

    for event in events {
        match event {
            XmlEvent::Start { name, attributes } => {
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                writer.write_event(Event::Start(start)).map_err(write_err)?;
                open.push(name);
            }
            XmlEvent::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(write_err)?;
            }
            XmlEvent::End(name) => {
                match open.pop() {
                    Some(expected) if expected == name.as_str() => {}
                    Some(expected) => {
                        return Err(XmlError::Unbalanced(format!(
                            "closing <{}> while <{}> is open",
                            name, expected
                        )))
                    }
                    None => return Err(XmlError::Unbalanced(format!("stray </{}>", name))),
                }
                writer
                    .write_event(Event::End(BytesEnd::new(name.as_str())))
                    .map_err(write_err)?;
            }
        }
    }

    if let Some(name) = open.pop() {
        return Err(XmlError::Unbalanced(format!("<{}> never closed", name)));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_text_and_attributes() {
        let mut b = XmlBuilder::new();
        b.start("metadata")
            .start_with("entry", &[("key", "a<b")])
            .data("x & y")
            .end("entry")
            .end("metadata");
        let xml = b.render().unwrap();
        assert_eq!(
            xml,
            r#"<metadata><entry key="a&lt;b">x &amp; y</entry></metadata>"#
        );
    }

    #[test]
    fn test_text_element_empty() {
        let mut b = XmlBuilder::new();
        b.text_element("abstract", "");
        assert_eq!(b.render().unwrap(), "<abstract></abstract>");
    }

    #[test]
    fn test_unbalanced_is_rejected() {
        let mut b = XmlBuilder::new();
        b.start("a").start("b").end("a");
        assert!(b.render().is_err());

        let mut b = XmlBuilder::new();
        b.start("a");
        assert!(b.render().is_err());
    }
}
