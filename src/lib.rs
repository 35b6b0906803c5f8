//! # ovaimport
//!
//! Import OVA appliance packages into an OpenStack-style cloud.
//!
//! An OVA package is a tar archive holding an OVF descriptor and a disk
//! image. This library flattens the descriptor into a bounded set of image
//! properties, registers the disk image together with those properties, and
//! writes a Heat template that boots the image with a flavor sized from the
//! descriptor's CPU and memory settings.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Streaming, namespace-aware descriptor flattening
//! - Unique dotted property paths for repeated elements
//! - CPU and memory extraction from hardware `Item` sections
//! - Flavor selection and Heat template generation
//!
//! ## Example
//!
//! ```
//! use ovaimport::{Flavor, Flattener, emit_template};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let xml = r#"<Envelope xmlns="http://schemas.dmtf.org/ovf/envelope/1">
//!   <VirtualSystem id="web">
//!     <Item><ResourceType>4</ResourceType><VirtualQuantity>4096</VirtualQuantity></Item>
//!   </VirtualSystem>
//! </Envelope>"#;
//!
//! let flattened = Flattener::new().flatten_str(xml)?;
//! assert_eq!(flattened.properties.get("VirtualSystem.id"), Some("web"));
//! assert_eq!(flattened.facts.flavor(), Flavor::Medium);
//!
//! let yaml = emit_template("web", flattened.facts.flavor()).to_yaml()?;
//! assert!(yaml.contains("m1.medium"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod flatten;
pub mod flavor;
pub mod importer;
pub mod namespace;
pub mod package;
pub mod properties;
pub mod registry;
pub mod template;

pub use error::{Error, Result};
pub use events::{ChildElement, ElementEnd, ElementEvent, EventReader};
pub use flatten::{
    FactWarning, FlattenConfig, Flattened, Flattener, ResourceFacts, ResourceKind,
    parse_descriptor,
};
pub use flavor::{Flavor, select_flavor};
pub use importer::{DEFAULT_IMAGE_NAME, ImportConfig, ImportReport, Importer};
pub use namespace::strip_namespace;
pub use package::{DISK_FORMATS, Package, PackageLayout, extracted_path, identify_members};
pub use properties::{MAX_PROPERTIES, PropertyMap};
pub use registry::{GlanceCli, ImageRegistrar, ImageRequest, RegistrationOutcome};
pub use template::{HeatTemplate, emit_template};
