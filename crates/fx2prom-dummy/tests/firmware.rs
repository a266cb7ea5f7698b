//! Firmware image loading and RAM download

use std::fs;

use fx2prom_core::error::{Error, TransportFault};
use fx2prom_core::firmware::{
    build_record_sequence, download_firmware, load_image_file, FirmwareImage, RecordDef,
    RECORD_TYPE_DATA, RECORD_TYPE_EOF,
};
use fx2prom_dummy::{DummyConfig, DummyDevice, Operation};

const LOADER: &str = r#"
(
    name: "test loader",
    records: [
        (count: 4, address: 0x0000, data: [0x02, 0x00, 0x06, 0x00]),
        (count: 2, address: 0x0006, data: [0x80, 0xFE]),
        (count: 0, address: 0x0000, kind: 1),
        (count: 3, address: 0x1000, data: [1, 2, 3]),
    ],
)
"#;

#[test]
fn test_download_ron_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loader.ron");
    fs::write(&path, LOADER).unwrap();
    let image = load_image_file(&path).unwrap();

    let mut dev = DummyDevice::new(DummyConfig::unprogrammed());
    download_firmware(&mut dev, &image).unwrap();

    assert!(dev.firmware_running());
    assert_eq!(&dev.ram()[..8], &[0x02, 0x00, 0x06, 0x00, 0x00, 0x00, 0x80, 0xFE]);
    // Records after the end-of-image entry are never loaded
    assert_eq!(dev.ram()[0x1000], 0);
    assert_eq!(
        dev.journal(),
        &[
            Operation::CpuReset(true),
            Operation::RamWrite { address: 0, len: 4 },
            Operation::RamWrite { address: 6, len: 2 },
            Operation::CpuReset(false),
        ]
    );
}

#[test]
fn test_binary_stream_matches_table() {
    let table = [
        RecordDef::new(16, 0x0100, RECORD_TYPE_DATA, &[0x5A; 16]),
        RecordDef::new(1, 0x0110, RECORD_TYPE_DATA, &[0x22]),
        RecordDef::new(0, 0, RECORD_TYPE_EOF, &[]),
    ];
    let image = build_record_sequence(&table).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loader.bin");
    fs::write(&path, image.encode()).unwrap();

    assert_eq!(load_image_file(&path).unwrap(), image);
    assert_eq!(FirmwareImage::decode(&image.encode()).unwrap(), image);
}

#[test]
fn test_failed_record_leaves_cpu_in_reset() {
    let image = build_record_sequence(&[
        RecordDef::new(1, 0x0000, RECORD_TYPE_DATA, &[1]),
        RecordDef::new(1, 0x0001, RECORD_TYPE_DATA, &[2]),
        RecordDef::new(0, 0, RECORD_TYPE_EOF, &[]),
    ])
    .unwrap();

    let mut dev = DummyDevice::new(DummyConfig::unprogrammed());
    dev.faults_mut().ram_load_fail_at = Some(2);

    assert_eq!(
        download_firmware(&mut dev, &image),
        Err(Error::Transport(TransportFault::RequestFailed))
    );
    assert!(dev.in_reset());
    assert!(!dev.firmware_running());
}

#[test]
fn test_shipped_bootstrap_table() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../data/ascent-bootstrap.ron");
    let image = load_image_file(&path).unwrap();
    let first = image.records()[0];

    let mut dev = DummyDevice::new(DummyConfig::unprogrammed());
    download_firmware(&mut dev, &image).unwrap();

    assert!(dev.firmware_running());
    let start = first.load_address as usize;
    assert_eq!(&dev.ram()[start..start + first.payload().len()], first.payload());
    assert_eq!(
        dev.journal().len(),
        image.data_records().len() + 2,
        "every data record plus the reset hold and release"
    );
}
