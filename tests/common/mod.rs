//! Shared helpers for integration tests
//!
//! Packages are built in memory with `tar::Builder` so no fixture files are
//! needed.

#![allow(dead_code)]

use std::path::Path;

/// A descriptor in the shape produced by common virtualization tools
pub const SAMPLE_OVF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Envelope xmlns="http://schemas.dmtf.org/ovf/envelope/1"
          xmlns:ovf="http://schemas.dmtf.org/ovf/envelope/1"
          xmlns:rasd="http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ResourceAllocationSettingData"
          ovf:version="1.0">
  <References>
    <File ovf:href="appliance-disk1.vmdk" ovf:id="file1" ovf:size="4096"/>
  </References>
  <DiskSection>
    <Info>Virtual disk information</Info>
    <Disk ovf:capacity="16" ovf:diskId="vmdisk1" ovf:fileRef="file1"/>
  </DiskSection>
  <NetworkSection>
    <Info>The list of logical networks</Info>
    <Network ovf:name="bridged">
      <Description>The bridged network</Description>
    </Network>
  </NetworkSection>
  <VirtualSystem ovf:id="appliance">
    <Info>A virtual machine</Info>
    <Name>appliance</Name>
    <VirtualHardwareSection>
      <Info>Virtual hardware requirements</Info>
      <Item>
        <rasd:AllocationUnits>hertz * 10^6</rasd:AllocationUnits>
        <rasd:Description>Number of Virtual CPUs</rasd:Description>
        <rasd:ElementName>2 virtual CPU(s)</rasd:ElementName>
        <rasd:InstanceID>1</rasd:InstanceID>
        <rasd:ResourceType>3</rasd:ResourceType>
        <rasd:VirtualQuantity>2</rasd:VirtualQuantity>
      </Item>
      <Item>
        <rasd:AllocationUnits>byte * 2^20</rasd:AllocationUnits>
        <rasd:Description>Memory Size</rasd:Description>
        <rasd:ElementName>1024MB of memory</rasd:ElementName>
        <rasd:InstanceID>2</rasd:InstanceID>
        <rasd:ResourceType>4</rasd:ResourceType>
        <rasd:VirtualQuantity>1024</rasd:VirtualQuantity>
      </Item>
      <Item>
        <rasd:AddressOnParent>0</rasd:AddressOnParent>
        <rasd:ElementName>Hard disk 1</rasd:ElementName>
        <rasd:HostResource>ovf:/disk/vmdisk1</rasd:HostResource>
        <rasd:InstanceID>3</rasd:InstanceID>
        <rasd:ResourceType>17</rasd:ResourceType>
      </Item>
    </VirtualHardwareSection>
  </VirtualSystem>
</Envelope>
"#;

/// Build a tar archive holding `members` in the given order
pub fn build_package(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, *data)
            .expect("Failed to append tar member");
    }
    builder.into_inner().expect("Failed to finish tar archive")
}

/// Build a tar archive whose member names are written into the headers as is
///
/// `tar::Builder::append_data` refuses absolute names and names containing
/// `..`, but archives found in the wild may carry them.
pub fn build_package_with_raw_names(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in members {
        let mut header = tar::Header::new_old();
        let bytes = name.as_bytes();
        header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append(&header, *data)
            .expect("Failed to append tar member");
    }
    builder.into_inner().expect("Failed to finish tar archive")
}

/// A package with [`SAMPLE_OVF`], a manifest and a small vmdk disk
pub fn sample_package() -> Vec<u8> {
    build_package(&[
        ("appliance.ovf", SAMPLE_OVF.as_bytes()),
        ("appliance.mf", b"SHA1(appliance.ovf)= 00"),
        ("appliance-disk1.vmdk", b"KDMV\x01\x00\x00\x00"),
    ])
}

/// Write [`sample_package`] into `dir` and return its path
pub fn write_sample_package(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("appliance.ova");
    std::fs::write(&path, sample_package()).expect("Failed to write package");
    path
}

/// A descriptor with `count` leaf elements, each carrying text
pub fn descriptor_with_leaves(count: usize) -> String {
    let mut xml = String::from("<Envelope><Section>");
    for i in 0..count {
        xml.push_str(&format!("<Leaf>value{}</Leaf>", i));
    }
    xml.push_str("</Section></Envelope>");
    xml
}
