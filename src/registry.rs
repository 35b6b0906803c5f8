//! Image registration with the image service
//!
//! Registration is done by the `glance` command line client. The command is
//! built from an [`ImageRequest`]; [`ImageRegistrar`] is the seam that lets the
//! import pipeline run without spawning anything.

use crate::error::{Error, Result};
use crate::properties::PropertyMap;
use log::{info, warn};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// Default registration program
pub const DEFAULT_GLANCE_PROGRAM: &str = "glance";

/// Container format passed for every image
pub const DEFAULT_CONTAINER_FORMAT: &str = "bare";

/// Everything needed to create one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Image name
    pub name: String,
    /// Disk format (`vmdk`, `qcow2`, ...)
    pub disk_format: String,
    /// Container format
    pub container_format: String,
    /// Path of the extracted disk image
    pub file: PathBuf,
    /// Image properties, in the order they are passed
    pub properties: Vec<(String, String)>,
}

impl ImageRequest {
    /// Create a request without properties
    pub fn new(name: impl Into<String>, disk_format: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            disk_format: disk_format.into(),
            container_format: DEFAULT_CONTAINER_FORMAT.to_string(),
            file: file.into(),
            properties: Vec::new(),
        }
    }

    /// Set the container format
    pub fn with_container_format(mut self, container_format: impl Into<String>) -> Self {
        self.container_format = container_format.into();
        self
    }

    /// Attach the flattened descriptor properties
    pub fn with_properties(mut self, properties: &PropertyMap) -> Self {
        self.properties = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    /// Arguments for `glance`, starting with the subcommand
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "image-create".into(),
            "--name".into(),
            self.name.as_str().into(),
            "--disk-format".into(),
            self.disk_format.as_str().into(),
            "--container-format".into(),
            self.container_format.as_str().into(),
            "--file".into(),
            self.file.as_os_str().to_os_string(),
        ];
        for (key, value) in &self.properties {
            args.push("--property".into());
            args.push(format!("{}={}", key, value).into());
        }
        args
    }
}

/// How a registration attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Exit code of the registration command, `None` if killed by a signal
    pub exit_code: Option<i32>,
}

impl RegistrationOutcome {
    /// Outcome of a command that exited with status 0
    pub fn succeeded() -> Self {
        Self { exit_code: Some(0) }
    }

    /// Whether the command reported success
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that can create an image from a request
pub trait ImageRegistrar {
    /// Create the image described by `request`
    ///
    /// Only a failure to attempt the registration is an error; a rejected
    /// request is reported through the outcome.
    fn register(&self, request: &ImageRequest) -> Result<RegistrationOutcome>;
}

/// Registers images by running the `glance` client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlanceCli {
    program: OsString,
}

impl GlanceCli {
    /// Use `glance` from `PATH`
    pub fn new() -> Self {
        Self::with_program(DEFAULT_GLANCE_PROGRAM)
    }

    /// Use a specific client program
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the command for `request` without running it
    pub fn command(&self, request: &ImageRequest) -> Command {
        let mut command = Command::new(&self.program);
        command.args(request.arguments());
        command
    }
}

impl Default for GlanceCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageRegistrar for GlanceCli {
    fn register(&self, request: &ImageRequest) -> Result<RegistrationOutcome> {
        info!(
            "Uploading image '{}' ({} properties)",
            request.name,
            request.properties.len()
        );
        let status = self
            .command(request)
            .status()
            .map_err(|source| Error::Registration {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;

        let outcome = RegistrationOutcome {
            exit_code: status.code(),
        };
        if !outcome.success() {
            warn!(
                "{} exited with {}",
                self.program.to_string_lossy(),
                status
            );
        }
        Ok(outcome)
    }
}
