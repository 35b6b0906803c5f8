//! Error types for OVA import
//!
//! All errors carry an error code for categorization. Fact extraction problems
//! and property truncation are not errors: they are reported as
//! values on [`crate::Flattened`].
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Template output errors
//! - **E4xxx**: Image registration errors
//! - **E5xxx**: Usage errors
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading or writing a file
//! - `E1002`: Tar archive error
//! - `E1003`: No descriptor (`.ovf`) member in the package
//! - `E1004`: No disk image member in the package
//! - `E2001`: XML parsing error
//! - `E2002`: XML attribute error
//! - `E2003`: Invalid XML structure or encoding
//! - `E3001`: Template serialization error
//! - `E4001`: Registration command could not be started
//! - `E5001`: Required input missing

use std::io;
use thiserror::Error;

/// Result type for OVA import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while importing an OVA package
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// Tar archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - The package is not a tar archive
    /// - Truncated or corrupted archive
    /// - A member could not be extracted to the working directory
    #[error("[E1002] Archive error: {0}")]
    Archive(String),

    /// The package contains no descriptor member
    ///
    /// **Error Code**: E1003
    ///
    /// **Suggestions**:
    /// - Verify the package contains exactly one `.ovf` file
    #[error("[E1003] OVF file expected in OVA package: {0}")]
    MissingDescriptor(String),

    /// The package contains no disk image member
    ///
    /// **Error Code**: E1004
    ///
    /// **Suggestions**:
    /// - Verify the package contains a disk in one of the supported
    ///   formats (raw, iso, vhd, vdi, qcow2, vmdk, aki, ari, ami)
    #[error("[E1004] Disk image expected in OVA package: {0}")]
    MissingDiskImage(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Malformed XML syntax
    /// - Mismatched or unclosed tags
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Element or attribute names that are not valid UTF-8
    /// - Namespace prefixes that are never declared
    /// - Unknown entity references
    /// - Document ends while elements are still open
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Template serialization error
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Template serialization error: {0}")]
    Template(#[from] serde_yaml::Error),

    /// The image registration command could not be started
    ///
    /// **Error Code**: E4001
    ///
    /// A command that starts and exits with a failure status is not an
    /// error; see [`crate::registry::RegistrationOutcome`].
    #[error("[E4001] Failed to run registration command '{program}': {source}")]
    Registration {
        /// The program that was invoked
        program: String,
        /// The underlying spawn failure
        source: io::Error,
    },

    /// Required input missing at the boundary
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Usage error: {0}")]
    Usage(String),
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::InvalidXml(format!("Name is not valid UTF-8: {}", err))
    }
}

impl Error {
    /// Create an Archive error describing what was being done with the package
    ///
    /// # Arguments
    /// * `context` - What was being attempted (e.g., "listing members")
    /// * `err` - The underlying I/O error reported by the tar reader
    pub fn archive(context: &str, err: io::Error) -> Self {
        Error::Archive(format!("{}: {}", context, err))
    }

    /// Create an InvalidXml error with element context
    ///
    /// # Example
    /// ```ignore
    /// Error::invalid_xml_element("ovf:Item", "undeclared namespace prefix")
    /// ```
    pub fn invalid_xml_element(element: &str, message: &str) -> Self {
        Error::InvalidXml(format!("Element '<{}>': {}", element, message))
    }

    /// Whether this error means the package itself is structurally unusable
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::MissingDescriptor(_) | Error::MissingDiskImage(_))
    }
}
