//! Flattening of OVF descriptors into image properties
//!
//! The flattener walks the element events of a descriptor and assigns every
//! element a dotted path made of the local names from the top-level sections
//! down to the element itself. The `Envelope` wrapper is never part of a path.
//!
//! Descriptors repeat element names freely (`Item`, `Section`, `Disk`), so
//! paths are made unique in document order: the first `Item` under a parent
//! is `Item`, the next ones `Item2`, `Item3`, and so on. A path handed out
//! once is never handed out again, even after its element has closed.
//!
//! For each element, its attributes become `<path>.<attribute>` entries and
//! its text (if any) becomes a `<path>` entry. `Item` elements are also
//! inspected for the virtual CPU count (`ResourceType` 3) and memory size
//! (`ResourceType` 4), the last qualifying `Item` winning.
//!
//! # Example
//!
//! ```
//! use ovaimport::Flattener;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let xml = r#"<Envelope>
//!   <VirtualSystem id="vm">
//!     <Name>demo</Name>
//!     <Item><ResourceType>3</ResourceType><VirtualQuantity>2</VirtualQuantity></Item>
//!   </VirtualSystem>
//! </Envelope>"#;
//!
//! let flattened = Flattener::new().flatten_str(xml)?;
//! assert_eq!(flattened.properties.get("VirtualSystem.id"), Some("vm"));
//! assert_eq!(flattened.properties.get("VirtualSystem.Name"), Some("demo"));
//! assert_eq!(flattened.facts.cpu, Some(2));
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::events::{ChildElement, DEFAULT_RESOURCE_ELEMENT, ElementEnd, ElementEvent, EventReader};
use crate::flavor::{Flavor, select_flavor};
use crate::namespace::strip_namespace;
use crate::properties::{MAX_PROPERTIES, PropertyMap};
use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::BufRead;

/// Local name of the wrapper element that never takes part in paths
pub const DEFAULT_ROOT_ELEMENT: &str = "Envelope";

const RESOURCE_TYPE: &str = "ResourceType";
const VIRTUAL_QUANTITY: &str = "VirtualQuantity";

/// Configuration for flattening descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenConfig {
    max_properties: usize,
    root_element: String,
    resource_element: String,
}

impl FlattenConfig {
    /// Create a configuration with the image store defaults
    pub fn new() -> Self {
        Self {
            max_properties: MAX_PROPERTIES,
            root_element: DEFAULT_ROOT_ELEMENT.to_string(),
            resource_element: DEFAULT_RESOURCE_ELEMENT.to_string(),
        }
    }

    /// Set the maximum number of properties kept
    pub fn with_max_properties(mut self, max_properties: usize) -> Self {
        self.max_properties = max_properties;
        self
    }

    /// Set the local name of the wrapper element excluded from paths
    pub fn with_root_element(mut self, name: impl Into<String>) -> Self {
        self.root_element = name.into();
        self
    }

    /// Set the local name of the elements describing hardware resources
    pub fn with_resource_element(mut self, name: impl Into<String>) -> Self {
        self.resource_element = name.into();
        self
    }

    /// Maximum number of properties kept
    pub fn max_properties(&self) -> usize {
        self.max_properties
    }

    /// Local name of the wrapper element excluded from paths
    pub fn root_element(&self) -> &str {
        &self.root_element
    }

    /// Local name of the elements describing hardware resources
    pub fn resource_element(&self) -> &str {
        &self.resource_element
    }
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Hardware resource kinds the flattener extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Virtual CPU count (`ResourceType` 3)
    Cpu,
    /// Memory size in MB (`ResourceType` 4)
    Memory,
}

impl ResourceKind {
    /// Map a CIM `ResourceType` value onto a kind the flattener cares about
    pub fn from_resource_type(value: &str) -> Option<Self> {
        match value {
            "3" => Some(ResourceKind::Cpu),
            "4" => Some(ResourceKind::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => f.write_str("CPU"),
            ResourceKind::Memory => f.write_str("memory"),
        }
    }
}

/// Hardware facts extracted from one descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceFacts {
    /// Number of virtual CPUs
    pub cpu: Option<u64>,
    /// Memory size, assumed to be in MB
    pub memory_mb: Option<u64>,
}

impl ResourceFacts {
    /// Pick the deployment flavor for these facts
    pub fn flavor(&self) -> Flavor {
        select_flavor(self.cpu, self.memory_mb)
    }

    fn set(&mut self, kind: ResourceKind, value: u64) {
        match kind {
            ResourceKind::Cpu => self.cpu = Some(value),
            ResourceKind::Memory => self.memory_mb = Some(value),
        }
    }
}

/// A resource element claimed a CPU or memory type without a usable quantity
///
/// The fact is left untouched and flattening carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactWarning {
    /// Which fact could not be extracted
    pub kind: ResourceKind,
    /// Path of the offending element
    pub path: String,
    /// The `VirtualQuantity` text, or `None` when the child is absent
    pub quantity: Option<String>,
}

impl fmt::Display for FactWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.quantity {
            Some(quantity) => write!(
                f,
                "'{}' declares {} with a non-numeric VirtualQuantity '{}'",
                self.path, self.kind, quantity
            ),
            None => write!(
                f,
                "'{}' declares {} without a VirtualQuantity",
                self.path, self.kind
            ),
        }
    }
}

/// Result of flattening one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flattened {
    /// Flattened properties, in traversal order
    pub properties: PropertyMap,
    /// CPU and memory facts
    pub facts: ResourceFacts,
    /// Fact extraction problems encountered along the way
    pub warnings: Vec<FactWarning>,
}

impl Flattened {
    /// Whether properties were dropped because the limit was reached
    pub fn truncated(&self) -> bool {
        self.properties.dropped() > 0
    }
}

/// Dotted paths of the currently open elements
///
/// Each entry is the full, already disambiguated path of an open element, so
/// closing an element is a plain pop. Every path ever assigned is remembered
/// for collision checks.
#[derive(Debug, Default)]
struct PathStack {
    open: Vec<String>,
    seen: HashSet<String>,
}

impl PathStack {
    fn current(&self) -> &str {
        self.open.last().map(String::as_str).unwrap_or("")
    }

    /// Open an element, returning its unique path
    ///
    /// The first collision appends `2`; every further collision replaces the
    /// last character with the next count. Past nine siblings the count no
    /// longer fits in one character and the suffixes degrade (`Item10`,
    /// `Item111`, `Item1112`, ...), but they stay unique.
    fn push(&mut self, tag: &str) -> &str {
        let mut candidate = join(self.current(), tag);
        let mut count = 1u32;
        while self.seen.contains(&candidate) {
            count += 1;
            if count > 2 {
                candidate.pop();
            }
            candidate.push_str(&count.to_string());
        }
        if count > 1 {
            debug!("'{}' renamed to '{}' to keep paths unique", join(self.current(), tag), candidate);
        }

        self.seen.insert(candidate.clone());
        self.open.push(candidate);
        self.current()
    }

    fn pop(&mut self) -> Option<String> {
        self.open.pop()
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// State of a single flatten run
struct Traversal<'c> {
    config: &'c FlattenConfig,
    paths: PathStack,
    properties: PropertyMap,
    facts: ResourceFacts,
    warnings: Vec<FactWarning>,
}

impl<'c> Traversal<'c> {
    fn new(config: &'c FlattenConfig) -> Self {
        Self {
            config,
            paths: PathStack::default(),
            properties: PropertyMap::with_capacity(config.max_properties),
            facts: ResourceFacts::default(),
            warnings: Vec::new(),
        }
    }

    fn on_start(&mut self, name: &str) {
        let tag = strip_namespace(name);
        if tag == self.config.root_element {
            return;
        }
        let path = self.paths.push(tag);
        trace!("start {}", path);
    }

    fn on_end(&mut self, end: &ElementEnd) {
        let tag = strip_namespace(&end.name);
        if tag == self.config.root_element {
            return;
        }

        let path = self.paths.current().to_string();
        for (name, value) in &end.attributes {
            self.record(join(&path, strip_namespace(name)), value);
        }
        if !end.text.is_empty() {
            self.record(path.clone(), &end.text);
        }
        if tag == self.config.resource_element {
            if let Some(children) = &end.children {
                self.extract_fact(&path, children);
            }
        }

        if self.paths.pop().is_none() {
            debug!("end of <{}> without an open element", tag);
        }
    }

    fn record(&mut self, key: String, value: &str) {
        if self.properties.insert(key.as_str(), value) {
            return;
        }
        if self.properties.dropped() == 1 {
            warn!(
                "Property limit of {} reached, dropping '{}' and any later properties",
                self.properties.capacity(),
                key
            );
        } else {
            debug!("dropping property '{}'", key);
        }
    }

    fn extract_fact(&mut self, path: &str, children: &[ChildElement]) {
        let values: HashMap<&str, Option<&str>> = children
            .iter()
            .map(|child| (strip_namespace(&child.name), child.text.as_deref()))
            .collect();

        let Some(kind) = values
            .get(RESOURCE_TYPE)
            .copied()
            .flatten()
            .and_then(ResourceKind::from_resource_type)
        else {
            return;
        };

        let quantity = values.get(VIRTUAL_QUANTITY).copied().flatten();
        match quantity.map(str::parse::<u64>) {
            Some(Ok(value)) => {
                debug!("{} = {} from '{}'", kind, value, path);
                self.facts.set(kind, value);
            }
            _ => {
                let warning = FactWarning {
                    kind,
                    path: path.to_string(),
                    quantity: quantity.map(str::to_string),
                };
                warn!("Ignoring resource item: {}", warning);
                self.warnings.push(warning);
            }
        }
    }

    fn finish(self) -> Flattened {
        if self.properties.dropped() > 0 {
            debug!(
                "{} properties kept, {} dropped",
                self.properties.len(),
                self.properties.dropped()
            );
        }
        Flattened {
            properties: self.properties,
            facts: self.facts,
            warnings: self.warnings,
        }
    }
}

/// Streaming descriptor flattener
///
/// A `Flattener` holds only configuration; every call starts from empty
/// state, so one instance can be reused for any number of descriptors.
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    /// Create a flattener with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flattener with a custom configuration
    pub fn with_config(config: FlattenConfig) -> Self {
        Self { config }
    }

    /// The configuration in use
    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Flatten a descriptor read from `reader`
    pub fn flatten_reader<R: BufRead>(&self, reader: R) -> Result<Flattened> {
        let events = EventReader::with_resource_element(reader, self.config.resource_element.clone());
        self.flatten_events(events)
    }

    /// Flatten a descriptor held in memory
    pub fn flatten_str(&self, xml: &str) -> Result<Flattened> {
        self.flatten_reader(xml.as_bytes())
    }

    /// Flatten an already produced event sequence
    ///
    /// The first error in the sequence aborts the run.
    pub fn flatten_events<I>(&self, events: I) -> Result<Flattened>
    where
        I: IntoIterator<Item = Result<ElementEvent>>,
    {
        let mut traversal = Traversal::new(&self.config);
        for event in events {
            match event? {
                ElementEvent::Start { name } => traversal.on_start(&name),
                ElementEvent::End(end) => traversal.on_end(&end),
            }
        }
        Ok(traversal.finish())
    }
}

/// Flatten a descriptor with the default configuration
pub fn parse_descriptor<R: BufRead>(reader: R) -> Result<Flattened> {
    Flattener::new().flatten_reader(reader)
}
