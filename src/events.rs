//! Element events read from a descriptor document
//!
//! [`EventReader`] turns a namespace-aware quick-xml stream into a flat
//! sequence of [`ElementEvent`]s. Compared to the raw XML events:
//!
//! - names are resolved and reported in `{uri}local` notation
//! - attributes and text are delivered with the element's `End` event
//! - text is only the text before the element's first child, trimmed
//! - empty elements (`<Info/>`) produce a `Start` followed by an `End`
//! - resource elements (`Item` by default) also carry their immediate
//!   children's names and text, so hardware facts can be read at `End`
//!
//! # Example
//!
//! ```
//! use ovaimport::events::{ElementEvent, EventReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let xml = r#"<Envelope><Name lang="en">demo</Name></Envelope>"#;
//! let events = EventReader::from_reader(xml.as_bytes()).collect::<Result<Vec<_>, _>>()?;
//!
//! assert_eq!(events.len(), 4);
//! match &events[2] {
//!     ElementEvent::End(end) => {
//!         assert_eq!(end.name, "Name");
//!         assert_eq!(end.text, "demo");
//!         assert_eq!(end.attributes, vec![("lang".to_string(), "en".to_string())]);
//!     }
//!     other => panic!("unexpected event {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::namespace::{clark_name, strip_namespace};
use log::trace;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::io::BufRead;

/// Local name of the elements whose children are collected by default
pub const DEFAULT_RESOURCE_ELEMENT: &str = "Item";

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// An immediate child of a resource element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildElement {
    /// Resolved child name in `{uri}local` notation
    pub name: String,
    /// Trimmed text, or `None` if the child had no text at all
    pub text: Option<String>,
}

/// Everything known about an element once it closes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementEnd {
    /// Resolved element name in `{uri}local` notation
    pub name: String,
    /// Attributes in document order, names resolved like element names
    pub attributes: Vec<(String, String)>,
    /// Trimmed text before the first child element (possibly empty)
    pub text: String,
    /// Immediate children, only populated for resource elements
    pub children: Option<Vec<ChildElement>>,
}

/// A single step of the walk over a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementEvent {
    /// An element was opened
    Start {
        /// Resolved element name in `{uri}local` notation
        name: String,
    },
    /// An element was closed
    End(ElementEnd),
}

impl ElementEvent {
    /// Resolved name of the element this event belongs to
    pub fn name(&self) -> &str {
        match self {
            ElementEvent::Start { name } => name,
            ElementEvent::End(end) => &end.name,
        }
    }
}

struct OpenElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    // Set once the first child opens; later text is tail text of that child
    text_closed: bool,
    children: Option<Vec<ChildElement>>,
}

/// Owned data pulled out of a quick-xml event before it is acted upon
enum Parsed {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
        empty: bool,
    },
    Close {
        name: String,
    },
    Text(String),
    Eof,
}

/// Streaming reader producing [`ElementEvent`]s from XML
pub struct EventReader<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    open: Vec<OpenElement>,
    pending: Option<ElementEvent>,
    resource_element: String,
    done: bool,
}

impl<R: BufRead> EventReader<R> {
    /// Create a reader that collects children of `Item` elements
    pub fn from_reader(reader: R) -> Self {
        Self::with_resource_element(reader, DEFAULT_RESOURCE_ELEMENT)
    }

    /// Create a reader that collects children of elements with the given local name
    pub fn with_resource_element(reader: R, resource_element: impl Into<String>) -> Self {
        Self {
            reader: NsReader::from_reader(reader),
            buf: Vec::with_capacity(XML_BUFFER_CAPACITY),
            open: Vec::new(),
            pending: None,
            resource_element: resource_element.into(),
            done: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<ElementEvent>> {
        if let Some(event) = self.pending.take() {
            return Ok(Some(event));
        }
        if self.done {
            return Ok(None);
        }

        loop {
            self.buf.clear();

            let parsed = {
                let (resolved, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
                let namespace = namespace_uri(resolved, event_name(&event))?;

                match event {
                    Event::Start(ref e) | Event::Empty(ref e) => {
                        let local = e.local_name();
                        let local = std::str::from_utf8(local.as_ref())?;
                        let name = clark_name(namespace.as_deref(), local);
                        let attributes = extract_attributes(&self.reader, e)?;
                        Some(Parsed::Open {
                            name,
                            attributes,
                            empty: matches!(event, Event::Empty(_)),
                        })
                    }
                    Event::End(ref e) => {
                        let local = e.local_name();
                        let local = std::str::from_utf8(local.as_ref())?;
                        Some(Parsed::Close {
                            name: clark_name(namespace.as_deref(), local),
                        })
                    }
                    Event::Text(ref e) => {
                        let text = e.xml_content().map_err(|e| Error::InvalidXml(e.to_string()))?;
                        Some(Parsed::Text(text.into_owned()))
                    }
                    Event::CData(ref e) => {
                        Some(Parsed::Text(std::str::from_utf8(e)?.to_string()))
                    }
                    Event::GeneralRef(ref e) => {
                        let resolved = match e
                            .resolve_char_ref()
                            .map_err(|e| Error::InvalidXml(e.to_string()))?
                        {
                            Some(ch) => ch.to_string(),
                            None => {
                                let entity =
                                    e.decode().map_err(|e| Error::InvalidXml(e.to_string()))?;
                                resolve_predefined_entity(&entity)
                                    .ok_or_else(|| {
                                        Error::InvalidXml(format!(
                                            "Unknown entity reference '&{};'",
                                            entity
                                        ))
                                    })?
                                    .to_string()
                            }
                        };
                        Some(Parsed::Text(resolved))
                    }
                    Event::Eof => Some(Parsed::Eof),
                    _ => None,
                }
            };

            match parsed {
                Some(Parsed::Open {
                    name,
                    attributes,
                    empty,
                }) => {
                    let start = self.open_element(name, attributes);
                    if empty {
                        let name = start.name().to_string();
                        self.pending = Some(self.close_element(&name)?);
                    }
                    return Ok(Some(start));
                }
                Some(Parsed::Close { name }) => {
                    return self.close_element(&name).map(Some);
                }
                Some(Parsed::Text(text)) => self.push_text(&text),
                Some(Parsed::Eof) => {
                    self.done = true;
                    if let Some(unclosed) = self.open.last() {
                        return Err(Error::invalid_xml_element(
                            &unclosed.name,
                            &format!(
                                "document ended with {} element(s) still open",
                                self.open.len()
                            ),
                        ));
                    }
                    return Ok(None);
                }
                None => {}
            }
        }
    }

    fn open_element(&mut self, name: String, attributes: Vec<(String, String)>) -> ElementEvent {
        if let Some(parent) = self.open.last_mut() {
            parent.text_closed = true;
        }

        let children = (strip_namespace(&name) == self.resource_element).then(Vec::new);
        trace!("open <{}> at depth {}", name, self.open.len());
        self.open.push(OpenElement {
            name: name.clone(),
            attributes,
            text: None,
            text_closed: false,
            children,
        });

        ElementEvent::Start { name }
    }

    fn close_element(&mut self, name: &str) -> Result<ElementEvent> {
        let element = self.open.pop().ok_or_else(|| {
            Error::invalid_xml_element(name, "closing tag without a matching opening tag")
        })?;

        let text = element.text.map(|t| t.trim().to_string());
        if let Some(parent) = self.open.last_mut() {
            if let Some(children) = parent.children.as_mut() {
                children.push(ChildElement {
                    name: element.name.clone(),
                    text: text.clone(),
                });
            }
        }

        Ok(ElementEvent::End(ElementEnd {
            name: element.name,
            attributes: element.attributes,
            text: text.unwrap_or_default(),
            children: element.children,
        }))
    }

    fn push_text(&mut self, text: &str) {
        if let Some(current) = self.open.last_mut() {
            if !current.text_closed {
                current
                    .text
                    .get_or_insert_with(String::new)
                    .push_str(text);
            }
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<ElementEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                self.pending = None;
                Some(Err(e))
            }
        }
    }
}

/// Raw (prefixed) name of an element event, used for error messages
fn event_name<'e>(event: &'e Event<'_>) -> &'e [u8] {
    match event {
        Event::Start(e) | Event::Empty(e) => e.name().into_inner(),
        Event::End(e) => e.name().into_inner(),
        _ => &[],
    }
}

fn namespace_uri(resolved: ResolveResult<'_>, raw_name: &[u8]) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.as_ref())?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::invalid_xml_element(
            &String::from_utf8_lossy(raw_name),
            &format!(
                "namespace prefix '{}' is not declared",
                String::from_utf8_lossy(&prefix)
            ),
        )),
    }
}

/// Extract attributes as owned, resolved name/value pairs
///
/// Namespace declarations (`xmlns`, `xmlns:*`) are not attributes.
fn extract_attributes<R>(
    reader: &NsReader<R>,
    element: &BytesStart<'_>,
) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = namespace_uri(resolved, attr.key.as_ref())?;
        let local = std::str::from_utf8(local.as_ref())?;
        let value = normalize_attribute_value(&attr.value)?;
        attributes.push((clark_name(namespace.as_deref(), local), value));
    }
    Ok(attributes)
}

/// Decode an attribute value the way a conforming XML processor does
///
/// Line breaks, tabs and carriage returns written literally become spaces
/// before references are expanded, so `&#9;` still yields a tab.
fn normalize_attribute_value(raw: &[u8]) -> Result<String> {
    let raw = std::str::from_utf8(raw)?;
    let normalized: String = raw
        .replace("\r\n", "\n")
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    let value = unescape(&normalized).map_err(|e| Error::XmlAttr(e.to_string()))?;
    Ok(value.into_owned())
}
