//! End-to-end import of an OVA package
//!
//! An import runs the steps in a fixed order:
//!
//! 1. locate the descriptor and disk image in the package
//! 2. flatten the descriptor into properties and hardware facts
//! 3. unpack the package into the working directory
//! 4. register the disk image, passing the properties along
//! 5. remove the extracted descriptor and disk image
//! 6. pick a flavor and write the Heat template
//!
//! A package without a descriptor or disk image fails at step 1, before
//! anything is extracted or uploaded.

use crate::error::{Error, Result};
use crate::flatten::{Flattened, Flattener};
use crate::flavor::Flavor;
use crate::package::{Package, PackageLayout, extracted_path};
use crate::registry::{
    DEFAULT_CONTAINER_FORMAT, DEFAULT_GLANCE_PROGRAM, GlanceCli, ImageRegistrar, ImageRequest,
    RegistrationOutcome,
};
use crate::template::{DEFAULT_TEMPLATE_PATH, HeatTemplate, emit_template};
use log::{info, warn};
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// Image name used when none is given
pub const DEFAULT_IMAGE_NAME: &str = "demo_image";

/// Configuration for an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    image_name: String,
    glance_program: String,
    container_format: String,
    template_path: PathBuf,
    work_dir: PathBuf,
    remove_extracted: bool,
}

impl ImportConfig {
    /// Create a configuration with the default settings
    pub fn new() -> Self {
        Self {
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            glance_program: DEFAULT_GLANCE_PROGRAM.to_string(),
            container_format: DEFAULT_CONTAINER_FORMAT.to_string(),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            work_dir: PathBuf::from("."),
            remove_extracted: true,
        }
    }

    /// Set the name of the created image
    pub fn with_image_name(mut self, name: impl Into<String>) -> Self {
        self.image_name = name.into();
        self
    }

    /// Set the program used by [`Importer::new`] to register images
    pub fn with_glance_program(mut self, program: impl Into<String>) -> Self {
        self.glance_program = program.into();
        self
    }

    /// Set the container format passed at registration
    pub fn with_container_format(mut self, format: impl Into<String>) -> Self {
        self.container_format = format.into();
        self
    }

    /// Set where the Heat template is written
    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    /// Set the directory the package is unpacked into
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Keep the extracted descriptor and disk image after registration
    pub fn keep_extracted(mut self, keep: bool) -> Self {
        self.remove_extracted = !keep;
        self
    }

    /// Name of the created image
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Program used to register images
    pub fn glance_program(&self) -> &str {
        &self.glance_program
    }

    /// Where the Heat template is written
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Directory the package is unpacked into
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What an import did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Descriptor and disk image members that were used
    pub layout: PackageLayout,
    /// Flattened descriptor
    pub flattened: Flattened,
    /// The registration request that was submitted
    pub request: ImageRequest,
    /// How registration ended
    pub registration: RegistrationOutcome,
    /// Flavor chosen from the descriptor's hardware facts
    pub flavor: Flavor,
    /// The template written to disk
    pub template: HeatTemplate,
    /// The template as written, in YAML
    pub template_yaml: String,
}

/// Imports OVA packages into the image service
pub struct Importer<G: ImageRegistrar> {
    config: ImportConfig,
    flattener: Flattener,
    registrar: G,
}

impl Importer<GlanceCli> {
    /// Create an importer that registers images with the configured `glance` program
    pub fn new(config: ImportConfig) -> Self {
        let registrar = GlanceCli::with_program(config.glance_program.clone());
        Self::with_registrar(config, registrar)
    }
}

impl<G: ImageRegistrar> Importer<G> {
    /// Create an importer with a custom registrar
    pub fn with_registrar(config: ImportConfig, registrar: G) -> Self {
        Self {
            config,
            flattener: Flattener::new(),
            registrar,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// The registrar in use
    pub fn registrar(&self) -> &G {
        &self.registrar
    }

    /// Import the package file at `path`
    pub fn import_path(&self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let path = path.as_ref();
        info!("Unpacking OVA file {}", path.display());
        let package = Package::open_path(path)?;
        self.import_package(package)
    }

    /// Import a package read from `reader`
    pub fn import<R: Read + Seek>(&self, reader: R) -> Result<ImportReport> {
        self.import_package(Package::open(reader)?)
    }

    fn import_package<R: Read + Seek>(&self, mut package: Package<R>) -> Result<ImportReport> {
        let layout = package.layout()?;

        let descriptor = package.get_file_binary(&layout.descriptor)?;
        let flattened = self.flattener.flatten_reader(descriptor.as_slice())?;
        info!(
            "Parsed {} into {} properties",
            layout.descriptor,
            flattened.properties.len()
        );

        let work_dir = &self.config.work_dir;
        package.unpack(work_dir)?;

        let disk_path = extracted_location(work_dir, &layout.disk_image)?;
        let request = ImageRequest::new(&self.config.image_name, &layout.disk_format, &disk_path)
            .with_container_format(&self.config.container_format)
            .with_properties(&flattened.properties);
        let registration = self.registrar.register(&request)?;

        if self.config.remove_extracted {
            remove_extracted(&disk_path);
            remove_extracted(&extracted_location(work_dir, &layout.descriptor)?);
        }

        let flavor = flattened.facts.flavor();
        info!(
            "Writing Heat template for {} CPU and {} MB memory ({})",
            or_unknown(flattened.facts.cpu),
            or_unknown(flattened.facts.memory_mb),
            flavor
        );
        let template = emit_template(&self.config.image_name, flavor);
        let template_yaml = template.write_to(&self.config.template_path)?;

        Ok(ImportReport {
            layout,
            flattened,
            request,
            registration,
            flavor,
            template,
            template_yaml,
        })
    }
}

fn extracted_location(work_dir: &Path, member: &str) -> Result<PathBuf> {
    extracted_path(work_dir, member)
        .ok_or_else(|| Error::Archive(format!("member '{}' is not extracted", member)))
}

fn remove_extracted(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

fn or_unknown(fact: Option<u64>) -> String {
    fact.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
