//! End-to-end programming scenarios

use std::fs;

use fx2prom_core::eeprom::{HeaderFields, PromState, HEADER_LEN};
use fx2prom_core::error::{Error, TransportFault};
use fx2prom_core::family::DeviceFamily;
use fx2prom_core::firmware::{build_record_sequence, FirmwareImage, RecordDef, RECORD_TYPE_DATA, RECORD_TYPE_EOF};
use fx2prom_core::program::{
    ImageSource, NoProgress, ProgramOptions, ProgramProgress, ProgramSources, ProgramStage,
    PROGRESS_COMPLETE,
};
use fx2prom_core::prom::Prom;
use fx2prom_dummy::{DummyConfig, DummyDevice, Operation};

const FAMILY: DeviceFamily = DeviceFamily::STANDARD;

fn fpga() -> Vec<u8> {
    (0..20_000u32).map(|i| (i % 251) as u8).collect()
}

fn controller() -> Vec<u8> {
    (0..6_000u32).map(|i| (i % 13) as u8).collect()
}

fn descriptors() -> Vec<u8> {
    vec![0x12, 0x01, 0x00, 0x02, 0xFF, 0xFF, 0xFF, 0x40]
}

fn loader() -> FirmwareImage {
    build_record_sequence(&[
        RecordDef::new(3, 0x0000, RECORD_TYPE_DATA, &[0x02, 0x01, 0x00]),
        RecordDef::new(0, 0x0000, RECORD_TYPE_EOF, &[]),
    ])
    .unwrap()
}

#[derive(Default)]
struct Recorder {
    started: Vec<ProgramStage>,
    reports: Vec<(ProgramStage, u8)>,
}

impl ProgramProgress for Recorder {
    fn stage_started(&mut self, stage: ProgramStage) {
        self.started.push(stage);
    }

    fn report(&mut self, stage: ProgramStage, percent: u8) {
        self.reports.push((stage, percent));
    }
}

fn run(
    dev: &mut DummyDevice,
    bootstrap: Option<&FirmwareImage>,
    progress: &mut Recorder,
) -> fx2prom_core::Result<fx2prom_core::program::ProgramReport> {
    let (fpga, controller, descriptors) = (fpga(), controller(), descriptors());
    let sources = ProgramSources {
        fpga: ImageSource::Bytes(&fpga),
        controller: ImageSource::Bytes(&controller),
        descriptors: ImageSource::Bytes(&descriptors),
    };
    Prom::new(dev, FAMILY).program(
        &sources,
        bootstrap,
        &ProgramOptions { verify: true },
        progress,
    )
}

#[test]
fn test_programmed_device_skips_bootstrap() {
    let mut dev = DummyDevice::new_default();
    let mut progress = Recorder::default();

    let report = run(&mut dev, Some(&loader()), &mut progress).unwrap();

    assert!(!report.bootstrapped);
    assert!(!dev
        .journal()
        .iter()
        .any(|op| matches!(op, Operation::CpuReset(_) | Operation::RamWrite { .. })));
    assert_eq!(report.header.fields, HeaderFields::all());
    assert_eq!(report.header.buf_con_size, 20_000);

    assert_eq!(dev.region(FAMILY.fpga_image, 20_000).unwrap(), &fpga()[..]);
    assert_eq!(dev.region(FAMILY.controller_image, 6_000).unwrap(), &controller()[..]);
    assert_eq!(dev.region(FAMILY.descriptors, 8).unwrap(), &descriptors()[..]);
    assert_eq!(
        dev.region(FAMILY.header, HEADER_LEN).unwrap(),
        &report.header.to_bytes()[..]
    );

    let mut prom = Prom::new(&mut dev, FAMILY);
    assert_eq!(prom.read_state().unwrap(), PromState::Programmed(report.header));
}

#[test]
fn test_fresh_device_is_bootstrapped_first() {
    let mut dev = DummyDevice::new(DummyConfig::unprogrammed());
    let mut progress = Recorder::default();

    let report = run(&mut dev, Some(&loader()), &mut progress).unwrap();

    assert!(report.bootstrapped);
    let journal = dev.journal();
    assert_eq!(journal[0], Operation::CpuReset(true));
    assert_eq!(journal[1], Operation::RamWrite { address: 0, len: 3 });
    assert_eq!(journal[2], Operation::CpuReset(false));
    assert!(matches!(journal[3], Operation::EepromWrite { .. }));
    assert!(matches!(
        journal.last(),
        Some(Operation::EepromRead { len: HEADER_LEN, .. })
    ));
}

#[test]
fn test_fresh_device_without_loader() {
    let mut dev = DummyDevice::new(DummyConfig::unprogrammed());
    let mut progress = Recorder::default();

    assert_eq!(run(&mut dev, None, &mut progress), Err(Error::MissingFirmware));
    assert!(dev.journal().is_empty());
    assert!(progress.reports.is_empty());
}

#[test]
fn test_fpga_fault_leaves_device_unprogrammed() {
    let mut dev = DummyDevice::new_default();
    let fpga_start = FAMILY.geometry.linear(FAMILY.fpga_image).unwrap();
    dev.faults_mut().eeprom_write_fail_range = Some(fpga_start + 10_000..fpga_start + 10_001);
    let mut progress = Recorder::default();

    let result = run(&mut dev, None, &mut progress);

    assert_eq!(result, Err(Error::Transport(TransportFault::RequestFailed)));
    assert_eq!(progress.reports, vec![(ProgramStage::Bootstrap, 20)]);
    assert_eq!(
        progress.started,
        vec![ProgramStage::Bootstrap, ProgramStage::FpgaImage]
    );
    // Nothing at all was written outside the FPGA region
    assert!(dev
        .region(FAMILY.header, HEADER_LEN)
        .unwrap()
        .iter()
        .all(|&b| b == 0xFF));

    let mut prom = Prom::new(&mut dev, FAMILY);
    assert_eq!(prom.read_state().unwrap(), PromState::Unprogrammed);
}

#[test]
fn test_descriptor_fault_leaves_device_unprogrammed() {
    let mut dev = DummyDevice::new_default();
    let start = FAMILY.geometry.linear(FAMILY.descriptors).unwrap();
    dev.faults_mut().eeprom_write_fail_range = Some(start..start + 1);
    let mut progress = Recorder::default();

    assert!(run(&mut dev, None, &mut progress).unwrap_err().is_transport());
    assert_eq!(progress.reports.last(), Some(&(ProgramStage::ControllerImage, 60)));

    let mut prom = Prom::new(&mut dev, FAMILY);
    assert_eq!(prom.read_state().unwrap(), PromState::Unprogrammed);
}

#[test]
fn test_progress_is_monotonic_and_completes() {
    let mut dev = DummyDevice::new(DummyConfig::unprogrammed());
    let mut progress = Recorder::default();
    run(&mut dev, Some(&loader()), &mut progress).unwrap();

    let percents: Vec<u8> = progress.reports.iter().map(|(_, p)| *p).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&PROGRESS_COMPLETE));
    assert_eq!(
        progress.reports.iter().map(|(s, _)| *s).collect::<Vec<_>>(),
        ProgramStage::ALL.to_vec()
    );
    assert_eq!(progress.started, ProgramStage::ALL.to_vec());
}

#[test]
fn test_program_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let fpga_path = dir.path().join("camera.bin");
    let fx2_path = dir.path().join("fx2.bix");
    let dscr_path = dir.path().join("descriptors.bin");
    fs::write(&fpga_path, fpga()).unwrap();
    fs::write(&fx2_path, controller()).unwrap();
    fs::write(&dscr_path, descriptors()).unwrap();

    let mut dev = DummyDevice::new_default();
    let sources = ProgramSources {
        fpga: ImageSource::File(&fpga_path),
        controller: ImageSource::File(&fx2_path),
        descriptors: ImageSource::File(&dscr_path),
    };
    let report = Prom::new(&mut dev, FAMILY)
        .program(&sources, None, &ProgramOptions::default(), &mut NoProgress)
        .unwrap();

    assert_eq!(report.header.buf_con_size, 20_000);
    assert_eq!(dev.region(FAMILY.controller_image, 6_000).unwrap(), &controller()[..]);
}

#[test]
fn test_missing_image_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.bin");
    let present = dir.path().join("present.bin");
    fs::write(&present, [1u8, 2, 3]).unwrap();

    let mut dev = DummyDevice::new_default();
    let sources = ProgramSources {
        fpga: ImageSource::File(&present),
        controller: ImageSource::File(&missing),
        descriptors: ImageSource::File(&present),
    };
    let result = Prom::new(&mut dev, FAMILY).program(
        &sources,
        None,
        &ProgramOptions::default(),
        &mut NoProgress,
    );

    assert_eq!(result, Err(Error::Io));
    let mut prom = Prom::new(&mut dev, FAMILY);
    assert_eq!(prom.read_state().unwrap(), PromState::Unprogrammed);
}

#[test]
fn test_oversized_controller_file_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fpga_path = dir.path().join("camera.bin");
    let fx2_path = dir.path().join("fx2.bix");
    let dscr_path = dir.path().join("descriptors.bin");
    fs::write(&fpga_path, fpga()).unwrap();
    fs::write(&fx2_path, vec![0x5Au8; 0x4300]).unwrap();
    fs::write(&dscr_path, descriptors()).unwrap();

    let mut dev = DummyDevice::new_default();
    let before = dev.eeprom().to_vec();
    let sources = ProgramSources {
        fpga: ImageSource::File(&fpga_path),
        controller: ImageSource::File(&fx2_path),
        descriptors: ImageSource::File(&dscr_path),
    };
    let mut progress = Recorder::default();
    let result = Prom::new(&mut dev, FAMILY).program(
        &sources,
        None,
        &ProgramOptions { verify: true },
        &mut progress,
    );

    assert_eq!(
        result,
        Err(Error::ImageTooLarge {
            len: 0x4300,
            max: 0x4000
        })
    );
    assert!(dev.journal().is_empty());
    assert!(progress.started.is_empty());
    assert_eq!(dev.eeprom(), &before[..]);
}
