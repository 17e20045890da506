//! XML plumbing for the configuration API.
//!
//! - [`Element`]: a small owned element tree parsed from response bodies
//! - [`XmlBuilder`] / [`XmlEvent`]: ordered open/text/close instructions that
//!   field writers emit, rendered to a request body with [`render`]

pub mod element;
pub mod writer;

pub use element::{Element, XmlError};
pub use writer::{render, XmlBuilder, XmlEvent};

/// Namespace of the atom links embedded in catalog listings.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
