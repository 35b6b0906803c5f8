//! OVA package handling
//!
//! An OVA package is a tar archive holding an OVF descriptor next to one or
//! more disk images (plus optional manifests and certificates). This module
//! lists and reads members and locates the descriptor and the disk image.

use crate::error::{Error, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Suffix of the descriptor member
pub const DESCRIPTOR_EXTENSION: &str = ".ovf";

/// Disk image extensions recognized inside a package, in matching order
pub const DISK_FORMATS: [&str; 9] = [
    ".aki", ".ari", ".ami", ".raw", ".iso", ".vhd", ".vdi", ".qcow2", ".vmdk",
];

/// The members of a package that an import needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    /// Member name of the OVF descriptor
    pub descriptor: String,
    /// Member name of the disk image
    pub disk_image: String,
    /// Disk format of the image (`vmdk`, `qcow2`, ...)
    pub disk_format: String,
}

/// Disk format implied by a member name, if any
///
/// Extensions are matched anywhere in the name, and the last matching entry
/// of [`DISK_FORMATS`] decides.
pub fn disk_format_of(name: &str) -> Option<&'static str> {
    DISK_FORMATS
        .iter()
        .rev()
        .find(|ext| name.contains(**ext))
        .map(|ext| &ext[1..])
}

/// Where a member lands when the package is unpacked into `dir`
///
/// Root, prefix and `.` components are dropped, the way [`Package::unpack`]
/// drops them. Members with a `..` component are never extracted, so they
/// have no path.
pub fn extracted_path(dir: &Path, member: &str) -> Option<PathBuf> {
    let mut path = dir.to_path_buf();
    for component in Path::new(member).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::ParentDir => return None,
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }
    Some(path)
}

/// Pick the descriptor and disk image out of a list of member names
///
/// When several members qualify, the last one in archive order is used.
/// Members that unpacking would skip (names with `..`) never qualify.
/// A missing disk image is reported before a missing descriptor.
pub fn identify_members<S: AsRef<str>>(names: &[S]) -> Result<PackageLayout> {
    let mut descriptor = None;
    let mut disk = None;

    for name in names.iter().map(AsRef::as_ref) {
        if extracted_path(Path::new(""), name).is_none() {
            debug!("skipping member '{}' outside the package root", name);
            continue;
        }
        if name.ends_with(DESCRIPTOR_EXTENSION) {
            descriptor = Some(name);
            continue;
        }
        if let Some(format) = disk_format_of(name) {
            disk = Some((name, format));
        }
    }

    let (disk_image, disk_format) = disk.ok_or_else(|| {
        Error::MissingDiskImage(format!(
            "none of the {} member(s) has a recognized disk extension ({})",
            names.len(),
            DISK_FORMATS.join(", ")
        ))
    })?;
    let descriptor = descriptor.ok_or_else(|| {
        Error::MissingDescriptor(format!(
            "none of the {} member(s) ends in '{}'",
            names.len(),
            DESCRIPTOR_EXTENSION
        ))
    })?;

    Ok(PackageLayout {
        descriptor: descriptor.to_string(),
        disk_image: disk_image.to_string(),
        disk_format: disk_format.to_string(),
    })
}

/// An OVA package backed by a seekable reader
///
/// Every operation rewinds the reader and walks the archive again. Listing
/// and lookups seek over member data instead of reading it.
pub struct Package<R: Read + Seek> {
    reader: R,
}

impl Package<BufReader<File>> {
    /// Open a package file from disk
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> Package<R> {
    /// Open a package from a reader
    ///
    /// The archive is walked once up front so that a file that is not a tar
    /// archive is rejected here rather than halfway through an import.
    pub fn open(reader: R) -> Result<Self> {
        let mut package = Self { reader };
        let names = package.file_names()?;
        debug!("package holds {} member(s)", names.len());
        Ok(package)
    }

    fn archive(&mut self) -> Result<Archive<&mut R>> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(Archive::new(&mut self.reader))
    }

    /// Get a list of all member names in archive order
    pub fn file_names(&mut self) -> Result<Vec<String>> {
        let mut archive = self.archive()?;
        let entries = archive
            .entries_with_seek()
            .map_err(|e| Error::archive("listing members", e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::archive("reading member header", e))?;
            let path = entry
                .path()
                .map_err(|e| Error::archive("decoding member name", e))?;
            names.push(path.to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Check if a member exists in the package
    pub fn has_file(&mut self, name: &str) -> Result<bool> {
        Ok(self.file_names()?.iter().any(|n| n == name))
    }

    /// Get a member's content as binary data
    pub fn get_file_binary(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.archive()?;
        let entries = archive
            .entries_with_seek()
            .map_err(|e| Error::archive("listing members", e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| Error::archive("reading member header", e))?;
            let matches = entry
                .path()
                .map_err(|e| Error::archive("decoding member name", e))?
                .to_string_lossy()
                == name;
            if matches {
                let mut content = Vec::new();
                entry
                    .read_to_end(&mut content)
                    .map_err(|e| Error::archive(&format!("reading member '{}'", name), e))?;
                return Ok(content);
            }
        }

        Err(Error::Archive(format!("no member named '{}'", name)))
    }

    /// Locate the descriptor and disk image members
    pub fn layout(&mut self) -> Result<PackageLayout> {
        let names = self.file_names()?;
        let layout = identify_members(&names)?;
        debug!(
            "descriptor '{}', {} disk '{}'",
            layout.descriptor, layout.disk_format, layout.disk_image
        );
        Ok(layout)
    }

    /// Extract every member into `dir`
    pub fn unpack(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        info!("Unpacking OVA package into {}", dir.display());
        let mut archive = self.archive()?;
        archive
            .unpack(dir)
            .map_err(|e| Error::archive(&format!("extracting into {}", dir.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build_tar(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_disk_format_of() {
        assert_eq!(disk_format_of("disk1.vmdk"), Some("vmdk"));
        assert_eq!(disk_format_of("image.qcow2"), Some("qcow2"));
        assert_eq!(disk_format_of("appliance.mf"), None);
        // Matched anywhere in the name, last listed extension wins
        assert_eq!(disk_format_of("backup.raw.vmdk"), Some("vmdk"));
        assert_eq!(disk_format_of("old.vmdk.raw"), Some("vmdk"));
    }

    #[test]
    fn test_identify_members() {
        let names = ["appliance.ovf", "appliance.mf", "disk1.vmdk"];
        let layout = identify_members(&names).unwrap();

        assert_eq!(
            layout,
            PackageLayout {
                descriptor: "appliance.ovf".to_string(),
                disk_image: "disk1.vmdk".to_string(),
                disk_format: "vmdk".to_string(),
            }
        );
    }

    #[test]
    fn test_last_matching_member_wins() {
        let names = ["a.ovf", "disk1.vmdk", "b.ovf", "disk2.qcow2"];
        let layout = identify_members(&names).unwrap();
        assert_eq!(layout.descriptor, "b.ovf");
        assert_eq!(layout.disk_image, "disk2.qcow2");
        assert_eq!(layout.disk_format, "qcow2");
    }

    #[test]
    fn test_missing_disk_reported_first() {
        let err = identify_members::<&str>(&[]).unwrap_err();
        assert!(matches!(err, Error::MissingDiskImage(_)));

        let err = identify_members(&["appliance.ovf"]).unwrap_err();
        assert!(matches!(err, Error::MissingDiskImage(_)));
    }

    #[test]
    fn test_missing_descriptor() {
        let err = identify_members(&["disk.vmdk", "appliance.mf"]).unwrap_err();
        assert!(matches!(err, Error::MissingDescriptor(_)));
        assert!(err.is_structural());
    }

    #[test]
    fn test_extracted_path_stays_in_dir() {
        let dir = Path::new("/work");
        assert_eq!(
            extracted_path(dir, "disk.vmdk"),
            Some(PathBuf::from("/work/disk.vmdk"))
        );
        assert_eq!(
            extracted_path(dir, "/etc/disk.raw"),
            Some(PathBuf::from("/work/etc/disk.raw"))
        );
        assert_eq!(
            extracted_path(dir, "./vm/./disk.vmdk"),
            Some(PathBuf::from("/work/vm/disk.vmdk"))
        );
        assert_eq!(extracted_path(dir, "../disk.raw"), None);
        assert_eq!(extracted_path(dir, "vm/../../disk.raw"), None);
    }

    #[test]
    fn test_members_escaping_the_root_never_qualify() {
        let err = identify_members(&["vm.ovf", "../disk.raw"]).unwrap_err();
        assert!(matches!(err, Error::MissingDiskImage(_)));

        let layout = identify_members(&["vm.ovf", "disk.vmdk", "../other.ovf"]).unwrap();
        assert_eq!(layout.descriptor, "vm.ovf");
    }

    #[test]
    fn test_package_reads_members() {
        let data = build_tar(&[("appliance.ovf", b"<Envelope/>"), ("disk.vmdk", b"\0\0\0\0")]);
        let mut package = Package::open(Cursor::new(data)).unwrap();

        assert_eq!(package.file_names().unwrap(), vec!["appliance.ovf", "disk.vmdk"]);
        assert!(package.has_file("disk.vmdk").unwrap());
        assert!(!package.has_file("missing.vmdk").unwrap());
        assert_eq!(package.get_file_binary("appliance.ovf").unwrap(), b"<Envelope/>");
        // Reads can be repeated in any order
        assert_eq!(package.get_file_binary("disk.vmdk").unwrap().len(), 4);
        assert_eq!(package.layout().unwrap().disk_format, "vmdk");
    }

    #[test]
    fn test_lookup_past_large_member() {
        let disk = vec![0u8; 1 << 20];
        let data = build_tar(&[("disk.raw", &disk), ("appliance.ovf", b"<Envelope/>")]);
        let mut package = Package::open(Cursor::new(data)).unwrap();

        assert_eq!(package.file_names().unwrap(), vec!["disk.raw", "appliance.ovf"]);
        assert_eq!(package.get_file_binary("appliance.ovf").unwrap(), b"<Envelope/>");
        assert_eq!(package.get_file_binary("disk.raw").unwrap().len(), 1 << 20);
    }

    #[test]
    fn test_missing_member_is_an_error() {
        let data = build_tar(&[("appliance.ovf", b"<Envelope/>")]);
        let mut package = Package::open(Cursor::new(data)).unwrap();
        let err = package.get_file_binary("disk.vmdk").unwrap_err();
        assert!(err.to_string().contains("[E1002]"));
    }

    #[test]
    fn test_unpack() {
        let data = build_tar(&[("appliance.ovf", b"<Envelope/>"), ("disk.raw", b"raw")]);
        let mut package = Package::open(Cursor::new(data)).unwrap();
        let dir = tempfile::tempdir().unwrap();

        package.unpack(dir.path()).unwrap();
        assert_eq!(std::fs::read(dir.path().join("disk.raw")).unwrap(), b"raw");
        assert!(dir.path().join("appliance.ovf").exists());
    }
}
