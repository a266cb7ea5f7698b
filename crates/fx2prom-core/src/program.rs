//! End-to-end device programming
//!
//! Programming runs as a fixed sequence of stages:
//!
//! ```text
//! Bootstrap -> FpgaImage -> ControllerImage -> Descriptors -> Header
//! ```
//!
//! The bootstrap stage only does work when the controller still enumerates
//! with the factory vendor ID. Each image stage writes one region and marks
//! it valid in the header under construction. The header is written last,
//! so a failure at any earlier stage leaves no header behind and the device
//! reads back as unprogrammed.

use alloc::borrow::Cow;

use crate::eeprom::{
    verify_eeprom, write_eeprom, write_header, EepromAddress, EepromHeader, HeaderFields,
};
use crate::error::{Error, Result};
use crate::family::DeviceFamily;
use crate::firmware::{download_firmware, FirmwareImage};
use crate::transport::VendorTransport;

/// Progress value reported when programming finishes
pub const PROGRESS_COMPLETE: u8 = 100;

/// A programming stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    /// Download bootstrap firmware into controller RAM (if needed)
    Bootstrap,
    /// Write the FPGA configuration image
    FpgaImage,
    /// Write the controller boot image
    ControllerImage,
    /// Write the USB descriptor table
    Descriptors,
    /// Write the header
    Header,
}

impl ProgramStage {
    /// All stages in execution order
    pub const ALL: [ProgramStage; 5] = [
        ProgramStage::Bootstrap,
        ProgramStage::FpgaImage,
        ProgramStage::ControllerImage,
        ProgramStage::Descriptors,
        ProgramStage::Header,
    ];

    /// Progress percentage reported once this stage completes
    pub const fn percent(self) -> u8 {
        match self {
            ProgramStage::Bootstrap => 20,
            ProgramStage::FpgaImage => 40,
            ProgramStage::ControllerImage => 60,
            ProgramStage::Descriptors => 80,
            ProgramStage::Header => PROGRESS_COMPLETE,
        }
    }

    /// Short human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            ProgramStage::Bootstrap => "bootstrap",
            ProgramStage::FpgaImage => "FPGA image",
            ProgramStage::ControllerImage => "controller image",
            ProgramStage::Descriptors => "descriptors",
            ProgramStage::Header => "header",
        }
    }
}

impl core::fmt::Display for ProgramStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress callback for [`program`]
pub trait ProgramProgress {
    /// Called when a stage is about to run
    fn stage_started(&mut self, _stage: ProgramStage) {}

    /// Called after `stage` completed; `percent` never decreases
    fn report(&mut self, stage: ProgramStage, percent: u8);
}

/// No-op progress implementation
pub struct NoProgress;

impl ProgramProgress for NoProgress {
    fn report(&mut self, _stage: ProgramStage, _percent: u8) {}
}

impl<P: ProgramProgress + ?Sized> ProgramProgress for &mut P {
    fn stage_started(&mut self, stage: ProgramStage) {
        (**self).stage_started(stage)
    }

    fn report(&mut self, stage: ProgramStage, percent: u8) {
        (**self).report(stage, percent)
    }
}

/// Where an image's bytes come from
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    /// Bytes already in memory
    Bytes(&'a [u8]),
    /// A file read in full before anything is written
    #[cfg(feature = "std")]
    File(&'a std::path::Path),
}

impl<'a> ImageSource<'a> {
    /// Get the image bytes
    pub fn load(&self) -> Result<Cow<'a, [u8]>> {
        match *self {
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            #[cfg(feature = "std")]
            ImageSource::File(path) => crate::eeprom::load_region_file(path).map(Cow::Owned),
        }
    }
}

/// The three images written by [`program`]
#[derive(Debug, Clone, Copy)]
pub struct ProgramSources<'a> {
    /// FPGA configuration image
    pub fpga: ImageSource<'a>,
    /// Controller boot image
    pub controller: ImageSource<'a>,
    /// USB descriptor table
    pub descriptors: ImageSource<'a>,
}

/// Options for [`program`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramOptions {
    /// Read back and compare every region after writing it
    pub verify: bool,
}

/// Outcome of a successful [`program`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramReport {
    /// Whether bootstrap firmware was downloaded
    pub bootstrapped: bool,
    /// The header as written
    pub header: EepromHeader,
}

/// Load an image and check that it fits the region reserved for it
fn load_region<'a>(
    stage: ProgramStage,
    source: &ImageSource<'a>,
    max: u32,
) -> Result<Cow<'a, [u8]>> {
    let data = source.load()?;
    if data.len() > max as usize {
        log::error!("{} is {} bytes, region holds {}", stage, data.len(), max);
        return Err(Error::ImageTooLarge {
            len: data.len(),
            max: max as usize,
        });
    }
    Ok(data)
}

fn write_region<T: VendorTransport + ?Sized>(
    transport: &mut T,
    family: &DeviceFamily,
    stage: ProgramStage,
    data: &[u8],
    addr: EepromAddress,
    verify: bool,
) -> Result<()> {
    log::debug!("Writing {} ({} bytes) at {}", stage, data.len(), addr);
    write_eeprom(transport, family.geometry, addr, data)?;
    if verify {
        log::debug!("Verifying {}", stage);
        verify_eeprom(transport, family.geometry, addr, data)?;
    }
    Ok(())
}

/// Program a device end to end
///
/// All three images are loaded and checked against their regions before
/// the device is touched; an oversized image is [`Error::ImageTooLarge`].
/// `bootstrap` is only consulted when the device enumerates with
/// `family.default_vendor_id`; in that case it is required and its absence
/// is [`Error::MissingFirmware`]. No stage is retried, and the first error
/// aborts the sequence before the header is written.
pub fn program<T, P>(
    transport: &mut T,
    family: &DeviceFamily,
    sources: &ProgramSources<'_>,
    bootstrap: Option<&FirmwareImage>,
    options: &ProgramOptions,
    progress: &mut P,
) -> Result<ProgramReport>
where
    T: VendorTransport + ?Sized,
    P: ProgramProgress + ?Sized,
{
    let fpga = load_region(ProgramStage::FpgaImage, &sources.fpga, family.fpga_image_len)?;
    let controller = load_region(
        ProgramStage::ControllerImage,
        &sources.controller,
        family.controller_image_len,
    )?;
    let descriptors = load_region(
        ProgramStage::Descriptors,
        &sources.descriptors,
        family.descriptors_len,
    )?;
    let mut header = EepromHeader::default();

    progress.stage_started(ProgramStage::Bootstrap);
    let info = transport.vendor_info()?;
    log::info!(
        "Device {:04X}:{:04X} (release {:04X})",
        info.vendor_id,
        info.product_id,
        info.device_id
    );
    let bootstrapped = if family.needs_bootstrap(info.vendor_id) {
        let image = bootstrap.ok_or(Error::MissingFirmware)?;
        log::info!("Unprogrammed controller, downloading bootstrap firmware");
        download_firmware(transport, image)?;
        true
    } else {
        log::debug!("Controller already enumerates as a programmed device");
        false
    };
    progress.report(ProgramStage::Bootstrap, ProgramStage::Bootstrap.percent());

    progress.stage_started(ProgramStage::FpgaImage);
    write_region(
        transport,
        family,
        ProgramStage::FpgaImage,
        &fpga,
        family.fpga_image,
        options.verify,
    )?;
    header.buf_con_size = fpga.len() as u32;
    header.fields |= HeaderFields::BUF_CON_VALID;
    progress.report(ProgramStage::FpgaImage, ProgramStage::FpgaImage.percent());

    progress.stage_started(ProgramStage::ControllerImage);
    write_region(
        transport,
        family,
        ProgramStage::ControllerImage,
        &controller,
        family.controller_image,
        options.verify,
    )?;
    header.fields |= HeaderFields::BOOTROM_VALID;
    progress.report(
        ProgramStage::ControllerImage,
        ProgramStage::ControllerImage.percent(),
    );

    progress.stage_started(ProgramStage::Descriptors);
    write_region(
        transport,
        family,
        ProgramStage::Descriptors,
        &descriptors,
        family.descriptors,
        options.verify,
    )?;
    header.fields |= HeaderFields::DESCRIPTOR_VALID;
    progress.report(ProgramStage::Descriptors, ProgramStage::Descriptors.percent());

    progress.stage_started(ProgramStage::Header);
    let header = write_header(transport, family.geometry, &header, family.header)?;
    if options.verify {
        verify_eeprom(transport, family.geometry, family.header, &header.to_bytes())?;
    }
    progress.report(ProgramStage::Header, ProgramStage::Header.percent());

    log::info!("Programming complete");
    Ok(ProgramReport {
        bootstrapped,
        header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eeprom::{read_header, read_state, PromState};
    use crate::error::TransportFault;
    use crate::firmware::{build_record_sequence, RecordDef, RECORD_TYPE_DATA, RECORD_TYPE_EOF};
    use crate::transport::mock::{MockTransport, Request};
    use crate::transport::{VendorInfo, REQ_RAM_LOAD};
    use alloc::vec;
    use alloc::vec::Vec;

    const FPGA: &[u8] = &[0xA5; 300];
    const FX2: &[u8] = &[0x5A; 100];
    const DSCR: &[u8] = &[0x12, 0x01, 0x00, 0x02];

    fn sources() -> ProgramSources<'static> {
        ProgramSources {
            fpga: ImageSource::Bytes(FPGA),
            controller: ImageSource::Bytes(FX2),
            descriptors: ImageSource::Bytes(DSCR),
        }
    }

    fn loader() -> FirmwareImage {
        build_record_sequence(&[
            RecordDef::new(2, 0x0000, RECORD_TYPE_DATA, &[0x02, 0x00]),
            RecordDef::new(0, 0x0000, RECORD_TYPE_EOF, &[]),
        ])
        .unwrap()
    }

    fn device(vendor_id: u16) -> MockTransport {
        let mut t = MockTransport::new(128);
        t.info = VendorInfo {
            vendor_id,
            product_id: 0x0020,
            device_id: 0x0001,
        };
        t
    }

    #[derive(Default)]
    struct Recorder(Vec<(ProgramStage, u8)>);

    impl ProgramProgress for Recorder {
        fn report(&mut self, stage: ProgramStage, percent: u8) {
            self.0.push((stage, percent));
        }
    }

    #[test]
    fn test_program_without_bootstrap() {
        let family = DeviceFamily::STANDARD;
        let mut t = device(0x125C);
        let mut progress = Recorder::default();

        let report = program(
            &mut t,
            &family,
            &sources(),
            None,
            &ProgramOptions::default(),
            &mut progress,
        )
        .unwrap();

        assert!(!report.bootstrapped);
        assert_eq!(report.header.buf_con_size, FPGA.len() as u32);
        assert_eq!(report.header.fields, HeaderFields::all());
        assert_eq!(read_header(&mut t, family.geometry, family.header).unwrap(), report.header);
        assert!(!t
            .requests
            .iter()
            .any(|r| matches!(r, Request::Write { request: REQ_RAM_LOAD, .. })));

        let stages: Vec<_> = progress.0.iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, ProgramStage::ALL.to_vec());
        let percents: Vec<_> = progress.0.iter().map(|(_, p)| *p).collect();
        assert_eq!(percents, vec![20, 40, 60, 80, 100]);
    }

    #[test]
    fn test_program_with_bootstrap() {
        let mut t = device(0x04B4);
        let report = program(
            &mut t,
            &DeviceFamily::STANDARD,
            &sources(),
            Some(&loader()),
            &ProgramOptions { verify: true },
            &mut NoProgress,
        )
        .unwrap();

        assert!(report.bootstrapped);
        assert!(matches!(
            t.requests[0],
            Request::Write { request: REQ_RAM_LOAD, .. }
        ));
    }

    #[test]
    fn test_missing_bootstrap_firmware() {
        let mut t = device(0x04B4);
        let result = program(
            &mut t,
            &DeviceFamily::STANDARD,
            &sources(),
            None,
            &ProgramOptions::default(),
            &mut NoProgress,
        );
        assert_eq!(result, Err(Error::MissingFirmware));
        assert!(t.requests.is_empty());
    }

    #[test]
    fn test_oversized_controller_image_rejected() {
        let family = DeviceFamily::STANDARD;
        let mut t = device(0x125C);
        let controller = vec![0x5A; 0x4300];
        let sources = ProgramSources {
            controller: ImageSource::Bytes(&controller),
            ..sources()
        };
        let mut progress = Recorder::default();

        let result = program(
            &mut t,
            &family,
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
        assert!(t.requests.is_empty());
        assert!(progress.0.is_empty());
        assert_eq!(
            read_state(&mut t, family.geometry, family.header).unwrap(),
            PromState::Unprogrammed
        );
    }

    #[test]
    fn test_image_filling_its_region_is_accepted() {
        let mut t = device(0x125C);
        let controller = vec![0x5A; 0x4000];
        let descriptors = vec![0x12; 0x0E00];
        let sources = ProgramSources {
            controller: ImageSource::Bytes(&controller),
            descriptors: ImageSource::Bytes(&descriptors),
            ..sources()
        };

        let report = program(
            &mut t,
            &DeviceFamily::STANDARD,
            &sources,
            None,
            &ProgramOptions { verify: true },
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(report.header.fields, HeaderFields::all());
        assert!(t.memory[..0x4000].iter().all(|&b| b == 0x5A));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_file_source_loads_like_bytes() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FX2).unwrap();
        assert_eq!(
            ImageSource::File(file.path()).load().unwrap(),
            ImageSource::Bytes(FX2).load().unwrap()
        );

        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.bin");
        assert_eq!(ImageSource::File(&absent).load(), Err(Error::Io));
    }

    #[test]
    fn test_fpga_failure_leaves_no_header() {
        let family = DeviceFamily::STANDARD;
        let mut t = device(0x125C);
        // 300 bytes at 128 per request: fail on the third chunk
        t.fail_write_at = Some(2);
        let mut progress = Recorder::default();

        let result = program(
            &mut t,
            &family,
            &sources(),
            None,
            &ProgramOptions::default(),
            &mut progress,
        );

        assert_eq!(result, Err(TransportFault::RequestFailed.into()));
        assert_eq!(progress.0, vec![(ProgramStage::Bootstrap, 20)]);
        assert_eq!(
            read_state(&mut t, family.geometry, family.header).unwrap(),
            PromState::Unprogrammed
        );
    }
}
