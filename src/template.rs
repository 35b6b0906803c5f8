//! Heat orchestration template for a freshly imported image
//!
//! The template launches one server from the imported image with the flavor
//! chosen from the descriptor's hardware section.

use crate::error::Result;
use crate::flavor::Flavor;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Heat template format version written to every template
pub const HEAT_TEMPLATE_VERSION: &str = "2015-04-30";

/// Description written to every template
pub const TEMPLATE_DESCRIPTION: &str = "Heat template for OVA image";

/// Resource type of the single server in the template
pub const SERVER_RESOURCE_TYPE: &str = "OS::Nova::Server";

/// Default location of the written template
pub const DEFAULT_TEMPLATE_PATH: &str = "template.yaml";

/// A Heat template with a single server resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatTemplate {
    /// Template format version
    pub heat_template_version: String,
    /// Human readable description
    pub description: String,
    /// Template resources
    pub resources: Resources,
}

/// Resources section of a [`HeatTemplate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resources {
    /// The server booted from the imported image
    pub instance: Instance,
}

/// The server resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    /// Heat resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Server properties
    pub properties: InstanceProperties,
}

/// Properties of the server resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceProperties {
    /// Image to boot from
    pub image: String,
    /// Flavor to boot with
    pub flavor: Flavor,
}

/// Build the template for `image_id` deployed with `flavor`
pub fn emit_template(image_id: &str, flavor: Flavor) -> HeatTemplate {
    HeatTemplate {
        heat_template_version: HEAT_TEMPLATE_VERSION.to_string(),
        description: TEMPLATE_DESCRIPTION.to_string(),
        resources: Resources {
            instance: Instance {
                resource_type: SERVER_RESOURCE_TYPE.to_string(),
                properties: InstanceProperties {
                    image: image_id.to_string(),
                    flavor,
                },
            },
        },
    }
}

impl HeatTemplate {
    /// Serialize the template as a block-style YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize the template and write it to `path`, returning the YAML text
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<String> {
        let yaml = self.to_yaml()?;
        fs::write(path, &yaml)?;
        Ok(yaml)
    }
}
