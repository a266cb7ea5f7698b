//! Firmware record tables loaded at runtime
//!
//! Bootstrap firmware is not compiled in. It is read once, either from a RON
//! table or from a binary record stream, and handed to the programmer as a
//! [`FirmwareImage`].

use alloc::{string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use super::image::{build_record_sequence, FirmwareImage};
use super::record::RecordDef;

/// Error type for firmware table loading
#[derive(Debug)]
pub enum FirmwareTableError {
    /// I/O error reading the file
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// The table parsed but does not form a valid image
    Invalid(crate::Error),
}

impl From<io::Error> for FirmwareTableError {
    fn from(e: io::Error) -> Self {
        FirmwareTableError::Io(e)
    }
}

impl From<ron::error::SpannedError> for FirmwareTableError {
    fn from(e: ron::error::SpannedError) -> Self {
        FirmwareTableError::Parse(e)
    }
}

impl From<crate::Error> for FirmwareTableError {
    fn from(e: crate::Error) -> Self {
        FirmwareTableError::Invalid(e)
    }
}

impl std::fmt::Display for FirmwareTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirmwareTableError::Io(e) => write!(f, "I/O error: {}", e),
            FirmwareTableError::Parse(e) => write!(f, "Parse error: {}", e),
            FirmwareTableError::Invalid(e) => write!(f, "Invalid firmware table: {}", e),
        }
    }
}

impl std::error::Error for FirmwareTableError {}

#[derive(Debug, Clone, serde::Deserialize)]
struct RecordEntry {
    count: u8,
    address: u16,
    #[serde(default)]
    kind: u8,
    #[serde(default)]
    data: Vec<u8>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct TableDef {
    name: String,
    records: Vec<RecordEntry>,
}

/// A named firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareTable {
    /// Human-readable name of the firmware
    pub name: String,
    /// The built image
    pub image: FirmwareImage,
}

impl FirmwareTable {
    /// Parse a table from a RON string
    pub fn load_ron(content: &str) -> Result<Self, FirmwareTableError> {
        let def: TableDef = ron::from_str(content)?;
        let defs: Vec<RecordDef<'_>> = def
            .records
            .iter()
            .map(|r| RecordDef::new(r.count, r.address, r.kind, &r.data))
            .collect();
        let image = build_record_sequence(&defs)?;
        Ok(Self {
            name: def.name,
            image,
        })
    }

    /// Parse a table from a RON file
    pub fn load_file(path: &Path) -> Result<Self, FirmwareTableError> {
        let content = fs::read_to_string(path)?;
        Self::load_ron(&content)
    }
}

/// Load a firmware image from a file
///
/// `.ron` files are parsed as record tables; anything else is decoded as a
/// binary record stream.
pub fn load_image_file(path: &Path) -> Result<FirmwareImage, FirmwareTableError> {
    if path.extension().is_some_and(|ext| ext == "ron") {
        let table = FirmwareTable::load_file(path)?;
        log::info!("Loaded firmware '{}' from {}", table.name, path.display());
        Ok(table.image)
    } else {
        let bytes = fs::read(path)?;
        let image = FirmwareImage::decode(&bytes)?;
        log::info!("Loaded firmware record stream from {}", path.display());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnpackFault;
    use std::io::Write;

    const TABLE: &str = r#"
    (
        name: "bootstrap",
        records: [
            (count: 3, address: 0x0000, kind: 0, data: [0x02, 0x01, 0x00]),
            (count: 2, address: 0x0edb, data: [0x90, 0xe6, 0x00, 0x00]),
            (count: 0, address: 0x0000, kind: 1),
        ],
    )
    "#;

    #[test]
    fn test_load_ron() {
        let table = FirmwareTable::load_ron(TABLE).unwrap();
        assert_eq!(table.name, "bootstrap");
        assert_eq!(table.image.data_records().len(), 2);
        assert_eq!(table.image.records()[1].load_address, 0x0EDB);
        assert_eq!(table.image.records()[1].payload(), &[0x90, 0xE6]);
    }

    #[test]
    fn test_load_ron_without_sentinel() {
        let ron = r#"(name: "broken", records: [(count: 1, address: 0, data: [1])])"#;
        match FirmwareTable::load_ron(ron) {
            Err(FirmwareTableError::Invalid(crate::Error::Unpack(UnpackFault::MissingSentinel))) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_ron_syntax_error() {
        assert!(matches!(
            FirmwareTable::load_ron("(name: "),
            Err(FirmwareTableError::Parse(_))
        ));
    }

    #[test]
    fn test_load_image_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let ron_path = dir.path().join("loader.ron");
        fs::write(&ron_path, TABLE).unwrap();
        let from_ron = load_image_file(&ron_path).unwrap();

        let bin_path = dir.path().join("loader.bin");
        let mut file = fs::File::create(&bin_path).unwrap();
        file.write_all(&from_ron.encode()).unwrap();
        drop(file);

        assert_eq!(load_image_file(&bin_path).unwrap(), from_ron);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_image_file(&dir.path().join("nope.ron")),
            Err(FirmwareTableError::Io(_))
        ));
    }
}
